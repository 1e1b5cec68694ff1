/*!

Offset and capacity arithmetic shared by the pool and the array.

*/

/// Rounds `offset` up to the next multiple of `align`, which must be a power of two.
///
/// Returns `None` on overflow.
#[inline(always)]
pub fn align_up(offset: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two(), "align_up: align is a power of two");
    let mask = align - 1;
    offset.checked_add(mask).map(|v| v & !mask)
}

/// Smallest multiple of `granularity` that is `>= value`.
#[inline(always)]
pub fn round_up_to_granularity(value: usize, granularity: usize) -> Option<usize> {
    debug_assert!(granularity > 0, "round_up_to_granularity: granularity > 0");
    let padded = value.checked_add(granularity - 1)?;
    Some(padded - padded % granularity)
}

/// Capacity after one growth step: one more granularity block, snapped down to a multiple of it.
#[inline(always)]
pub fn next_block_capacity(capacity: usize, granularity: usize) -> Option<usize> {
    let grown = capacity.checked_add(granularity)?;
    Some(grown - grown % granularity)
}
