use crate::allocator::{AllocError, Allocator};
use crate::layout::align_up;
use std::alloc::Layout;
use std::cell::Cell;
use std::ptr::NonNull;

/// Alignment of the pool region itself. No element may require more.
pub const POOL_BASE_ALIGN: usize = 16;

const DEFAULT_ALIGNMENT: usize = 4;

/// Headroom kept free past every allocation of element types that need drop.
const CONSTRUCTED_OVERHEAD: usize = 4;

struct Region {
    ptr: NonNull<u8>,
    layout: Layout,
}

/// A bump pool carving slabs out of one pre-reserved byte region.
///
/// Allocations are handed out by advancing a high-water mark and are never reclaimed one by one.
/// The only way to reuse the region is `clear_memory`, which resets the mark to zero.
///
/// Arrays borrow the pool through a `PoolAlloc` handle, while `init`, `clear_memory` and
/// `destroy` need `&mut self`. Because of that, the region can not be reset or released while
/// any array still points into it:
///
/// ```compile_fail
/// use granlist::{Array, StaticPool};
///
/// let mut pool = StaticPool::new();
/// pool.init(1024).unwrap();
/// let mut items: Array<u32, _> = Array::with_allocator(4, pool.allocator());
/// items.push(1).unwrap();
/// pool.clear_memory();
/// items.push(2).unwrap();
/// ```
///
/// All element types allocated from one pool share its high-water mark.
/// Values placed in the pool are not dropped when the pool is cleared or destroyed.
///
/// The pool is single-threaded (`!Send`, `!Sync`).
pub struct StaticPool {
    region: Option<Region>,
    used: Cell<usize>,
    alignment: usize,
}

impl StaticPool {
    /// Creates an uninitialized pool that rounds allocation sizes to 4 bytes.
    pub fn new() -> StaticPool {
        StaticPool::with_alignment(DEFAULT_ALIGNMENT)
    }

    /// Creates an uninitialized pool that rounds allocation sizes to `alignment` bytes.
    pub fn with_alignment(alignment: usize) -> StaticPool {
        assert!(alignment.is_power_of_two(), "pool alignment must be a power of two");
        assert!(alignment <= POOL_BASE_ALIGN, "pool alignment must not exceed {}", POOL_BASE_ALIGN);
        StaticPool {
            region: None,
            used: Cell::new(0),
            alignment,
        }
    }

    /// Reserves the backing region of `size` bytes. An existing region is released first.
    pub fn init(&mut self, size: usize) -> Result<(), AllocError> {
        assert!(size > 0, "pool size must be positive");
        self.destroy();

        let layout = Layout::from_size_align(size, POOL_BASE_ALIGN)
            .map_err(|_| AllocError::CapacityOverflow)?;
        let raw = unsafe { std::alloc::alloc_zeroed(layout) };
        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => std::alloc::handle_alloc_error(layout),
        };

        debug!("init pool of {} bytes", size);
        self.region = Some(Region { ptr, layout });
        self.used.set(0);
        Ok(())
    }

    /// Resets the high-water mark so the whole region can be handed out again.
    ///
    /// Debug builds wipe the consumed bytes to `0xFF` first.
    pub fn clear_memory(&mut self) {
        #[cfg(debug_assertions)]
        {
            if let Some(region) = &self.region {
                if self.used.get() > 0 {
                    unsafe { std::ptr::write_bytes(region.ptr.as_ptr(), 0xFF, self.used.get()) };
                }
            }
        }
        trace!("clear pool, {} bytes were used", self.used.get());
        self.used.set(0);
    }

    /// Clears the pool and releases its region. The pool may be `init`-ed again afterwards.
    pub fn destroy(&mut self) {
        self.clear_memory();
        if let Some(region) = self.region.take() {
            debug!("destroy pool of {} bytes", region.layout.size());
            unsafe { std::alloc::dealloc(region.ptr.as_ptr(), region.layout) };
        }
    }

    #[inline(always)]
    pub fn is_initialized(&self) -> bool {
        self.region.is_some()
    }

    /// Size of the region in bytes, 0 when uninitialized.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.region.as_ref().map_or(0, |r| r.layout.size())
    }

    /// Bytes consumed so far.
    #[inline(always)]
    pub fn used(&self) -> usize {
        self.used.get()
    }

    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.size() - self.used()
    }

    #[inline(always)]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Returns the allocation strategy handle to pass into arrays.
    pub fn allocator(&self) -> PoolAlloc<'_> {
        PoolAlloc { pool: self }
    }

    fn carve<T: Default>(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        let region = self.region.as_ref().ok_or(AllocError::PoolNotInitialized)?;

        let align = std::mem::align_of::<T>().max(self.alignment);
        if align > POOL_BASE_ALIGN {
            return Err(AllocError::UnsupportedAlignment { align, max: POOL_BASE_ALIGN });
        }

        let bytes = count
            .checked_mul(std::mem::size_of::<T>())
            .and_then(|bytes| align_up(bytes, self.alignment))
            .ok_or(AllocError::CapacityOverflow)?;
        let used = self.used.get();
        let start = align_up(used, align).ok_or(AllocError::CapacityOverflow)?;
        let end = start.checked_add(bytes).ok_or(AllocError::CapacityOverflow)?;

        // scalar-like types are carved as raw bytes, everything else keeps headroom
        let margin = if std::mem::needs_drop::<T>() { CONSTRUCTED_OVERHEAD } else { 0 };
        let size = region.layout.size();
        if end.checked_add(margin).map_or(true, |limit| limit >= size) {
            debug!("pool exhausted: requested {} bytes, {} of {} used", bytes, used, size);
            return Err(AllocError::PoolExhausted { requested: bytes, remaining: size - used });
        }

        let first = unsafe { region.ptr.as_ptr().add(start) } as *mut T;
        for i in 0..count {
            unsafe { first.add(i).write(T::default()) };
        }
        self.used.set(end);
        trace!("pool carved {} bytes at {}", bytes, start);

        Ok(unsafe { NonNull::new_unchecked(first) })
    }
}

impl Default for StaticPool {
    fn default() -> Self {
        StaticPool::new()
    }
}

impl Drop for StaticPool {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for StaticPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticPool")
            .field("size", &self.size())
            .field("used", &self.used())
            .field("alignment", &self.alignment)
            .finish()
    }
}

/// Allocation strategy drawing from a `StaticPool`. Freeing is a no-op.
#[derive(Clone, Copy)]
pub struct PoolAlloc<'p> {
    pool: &'p StaticPool,
}

impl<'p> PoolAlloc<'p> {
    pub fn pool(&self) -> &'p StaticPool {
        self.pool
    }
}

impl<'p> std::fmt::Debug for PoolAlloc<'p> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PoolAlloc").field(self.pool).finish()
    }
}

unsafe impl<'p, T: Default> Allocator<T> for PoolAlloc<'p> {
    #[inline(always)]
    fn alloc(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        self.pool.carve::<T>(count)
    }

    #[inline(always)]
    unsafe fn free(&self, _ptr: NonNull<T>, _count: usize) {}
}
