use std::alloc::Layout;
use std::ptr::NonNull;
use thiserror::Error;

/// Reasons an allocation strategy could not hand out storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("static pool is not initialized")]
    PoolNotInitialized,
    #[error("static pool exhausted: requested {requested} bytes, {remaining} bytes remaining")]
    PoolExhausted { requested: usize, remaining: usize },
    #[error("element alignment {align} exceeds the pool base alignment {max}")]
    UnsupportedAlignment { align: usize, max: usize },
    #[error("requested capacity overflows the address space")]
    CapacityOverflow,
}

/// Storage strategy used by `Array` for its backing slots.
///
/// The array never asks for zero slots.
///
/// # Safety
///
/// `Array` reads and writes through the returned pointer without further checks, so an
/// implementation must guarantee that a successful `alloc(count)` returns a pointer that is
/// properly aligned for `T`, points to `count` contiguous slots each holding an initialized `T`,
/// does not overlap any other live allocation, and stays valid until it is passed to `free`.
///
/// A plain `impl` is rejected:
///
/// ```compile_fail
/// use granlist::{AllocError, Allocator};
/// use std::ptr::NonNull;
///
/// struct Lying;
///
/// impl Allocator<u64> for Lying {
///     fn alloc(&self, _count: usize) -> Result<NonNull<u64>, AllocError> {
///         Ok(NonNull::from(Box::leak(Box::new(0u64))))
///     }
///     unsafe fn free(&self, _ptr: NonNull<u64>, _count: usize) {}
/// }
/// ```
pub unsafe trait Allocator<T> {
    fn alloc(&self, count: usize) -> Result<NonNull<T>, AllocError>;

    /// Gives storage back to the strategy.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `alloc` on the same strategy with the same `count`,
    /// and must not be used afterwards.
    unsafe fn free(&self, ptr: NonNull<T>, count: usize);
}

/// Global heap strategy. Every allocation is an independent boxed slice, freed immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Heap;

unsafe impl<T: Default> Allocator<T> for Heap {
    fn alloc(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        Layout::array::<T>(count).map_err(|_| AllocError::CapacityOverflow)?;
        let mut slots = Vec::with_capacity(count);
        slots.resize_with(count, T::default);
        let slice = Box::into_raw(slots.into_boxed_slice());
        // a boxed slice pointer is never null
        Ok(unsafe { NonNull::new_unchecked(slice as *mut T) })
    }

    unsafe fn free(&self, ptr: NonNull<T>, count: usize) {
        let slice = std::ptr::slice_from_raw_parts_mut(ptr.as_ptr(), count);
        drop(Box::from_raw(slice));
    }
}
