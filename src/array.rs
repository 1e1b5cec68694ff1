use crate::allocator::{AllocError, Allocator, Heap};
use crate::layout::{next_block_capacity, round_up_to_granularity};
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Capacity step used when none is given.
pub const DEFAULT_GRANULARITY: usize = 16;

/// Index-addressable sequence growing its storage in blocks of `granularity` slots.
///
/// Storage comes from the allocation strategy `A`: `Heap` frees every block as soon as the array
/// lets go of it, `PoolAlloc` bumps through a `StaticPool` and never gives memory back.
///
/// Every slot of the storage always holds a value. Slots past `len` keep whatever they last held
/// (the allocator default, or a value left behind by `remove_index_fast` or a shrinking `resize`);
/// such values are dropped only when the storage itself is freed.
///
/// Operations that may allocate return `AllocError` on failure and leave the array as it was.
pub struct Array<T, A: Allocator<T> = Heap> {
    storage: Option<NonNull<T>>,
    len: usize,
    capacity: usize,
    granularity: usize,
    alloc: A,
    _owns: PhantomData<T>,
}

unsafe impl<T: Send, A: Allocator<T> + Send> Send for Array<T, A> {}
unsafe impl<T: Sync, A: Allocator<T> + Sync> Sync for Array<T, A> {}

impl<T: Default> Array<T, Heap> {
    /// Creates an empty heap array with the default granularity. Nothing is allocated.
    pub fn new() -> Array<T, Heap> {
        Array::with_allocator(DEFAULT_GRANULARITY, Heap)
    }

    pub fn with_granularity(granularity: usize) -> Array<T, Heap> {
        Array::with_allocator(granularity, Heap)
    }
}

impl<T, A: Allocator<T>> Array<T, A> {
    /// Creates an empty array drawing its storage from `alloc`.
    pub fn with_allocator(granularity: usize, alloc: A) -> Array<T, A> {
        assert!(granularity > 0, "granularity must be positive");
        Array {
            storage: None,
            len: 0,
            capacity: 0,
            granularity,
            alloc,
            _owns: PhantomData,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn granularity(&self) -> usize {
        self.granularity
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Frees the storage and resets the array to its freshly constructed state.
    pub fn clear(&mut self) {
        if let Some(storage) = self.storage.take() {
            unsafe { self.alloc.free(storage, self.capacity) };
        }
        self.len = 0;
        self.capacity = 0;
    }

    /// Sets the number of elements to `len`.
    ///
    /// When `resize_capacity` is set, or `len` does not fit, the storage is reallocated to exactly
    /// `len` slots, ignoring granularity. Elements below the old length are kept. New elements
    /// hold the allocator default, or, when the storage was not reallocated, whatever the slot
    /// held before. In particular, shrinking with `resize_capacity == false` and growing back
    /// brings the old elements back.
    pub fn resize(&mut self, len: usize, resize_capacity: bool) -> Result<(), AllocError> {
        if resize_capacity || len > self.capacity {
            self.set_capacity(len)?;
        }
        self.len = len;
        Ok(())
    }

    /// Makes sure at least `capacity` slots are allocated, without changing the length.
    pub fn pre_allocate(&mut self, capacity: usize) -> Result<(), AllocError> {
        if capacity > self.capacity {
            let rounded = round_up_to_granularity(capacity, self.granularity)
                .ok_or(AllocError::CapacityOverflow)?;
            self.set_capacity(rounded)?;
        }
        Ok(())
    }

    /// Changes the growth step. Allocated storage is immediately resized to the smallest
    /// multiple of `granularity` holding the current elements.
    pub fn set_granularity(&mut self, granularity: usize) -> Result<(), AllocError> {
        assert!(granularity > 0, "granularity must be positive");
        if self.storage.is_some() {
            let rounded = round_up_to_granularity(self.len, granularity)
                .ok_or(AllocError::CapacityOverflow)?;
            if rounded != self.capacity {
                self.set_capacity(rounded)?;
            }
        }
        self.granularity = granularity;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    /// Grows the array by one slot and returns it.
    ///
    /// The slot is not reset: it holds the allocator default, or a value left behind
    /// by an earlier removal.
    pub fn push_default(&mut self) -> Result<&mut T, AllocError> {
        self.reserve_one()?;
        let index = self.len;
        self.len += 1;
        Ok(unsafe { &mut *self.slot(index) })
    }

    /// Appends `value` and returns its index.
    pub fn push(&mut self, value: T) -> Result<usize, AllocError> {
        self.reserve_one()?;
        let index = self.len;
        unsafe { *self.slot(index) = value };
        self.len += 1;
        Ok(index)
    }

    /// Appends a clone of `value` and returns its index.
    ///
    /// `value` can not borrow from this array, the exclusive borrow of `self` rules it out.
    pub fn push_clone(&mut self, value: &T) -> Result<usize, AllocError> where T: Clone {
        self.push(value.clone())
    }

    /// Appends clones of all elements of `other`, in order, and returns the new length.
    ///
    /// Capacity for the combined length is reserved up front, so either every element
    /// is appended or none is.
    pub fn extend_from_array<B: Allocator<T>>(&mut self, other: &Array<T, B>) -> Result<usize, AllocError>
        where T: Clone
    {
        let combined = self.len.checked_add(other.len).ok_or(AllocError::CapacityOverflow)?;
        self.pre_allocate(combined)?;
        for item in other.iter() {
            self.push(item.clone())?;
        }
        Ok(self.len)
    }

    /// Appends `value` unless an equal element exists. Returns the index of the element either way.
    pub fn add_unique(&mut self, value: T) -> Result<usize, AllocError> where T: PartialEq {
        match self.find_index(&value) {
            Some(index) => Ok(index),
            None => self.push(value),
        }
    }

    /// Index of the first element equal to `value`.
    pub fn find_index(&self, value: &T) -> Option<usize> where T: PartialEq {
        self.iter().position(|item| item == value)
    }

    /// Removes the element at `index` by moving the last element into its place.
    ///
    /// Order is not preserved. The removed value is parked past the end and is not dropped
    /// until the storage is freed or the slot is overwritten.
    pub fn remove_index_fast(&mut self, index: usize) {
        assert!(index < self.len, "remove index {} out of range for length {}", index, self.len);
        self.len -= 1;
        if index != self.len {
            unsafe { std::ptr::swap(self.slot(index), self.slot(self.len)) };
        }
    }

    /// Removes the first element equal to `value` with `remove_index_fast`.
    /// Returns `false` if there is no such element.
    pub fn remove_fast(&mut self, value: &T) -> bool where T: PartialEq {
        match self.find_index(value) {
            Some(index) => {
                self.remove_index_fast(index);
                true
            },
            None => false,
        }
    }

    /// Sorts the elements by their natural order. The sort is not stable.
    pub fn sort(&mut self) where T: Ord {
        self.as_mut_slice().sort_unstable();
    }

    /// Sorts the elements with `compare`. The sort is not stable.
    pub fn sort_by<F>(&mut self, compare: F) where F: FnMut(&T, &T) -> Ordering {
        self.as_mut_slice().sort_unstable_by(compare);
    }

    /// Exchanges storage, length, capacity, granularity and allocator with `other`.
    pub fn swap(&mut self, other: &mut Array<T, A>) {
        std::mem::swap(self, other);
    }

    pub fn as_slice(&self) -> &[T] {
        match self.storage {
            Some(storage) => unsafe { std::slice::from_raw_parts(storage.as_ptr(), self.len) },
            None => &[],
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self.storage {
            Some(storage) => unsafe { std::slice::from_raw_parts_mut(storage.as_ptr(), self.len) },
            None => &mut [],
        }
    }

    /// Iterates over exactly the live elements.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Copies this array into fresh storage from the same strategy, keeping capacity and granularity.
    pub fn try_clone(&self) -> Result<Array<T, A>, AllocError> where T: Clone, A: Clone {
        let mut copy = Array::with_allocator(self.granularity, self.alloc.clone());
        if self.capacity > 0 {
            copy.set_capacity(self.capacity)?;
            for (target, item) in copy.slots_mut(self.len).iter_mut().zip(self.iter()) {
                *target = item.clone();
            }
            copy.len = self.len;
        }
        Ok(copy)
    }

    #[inline(always)]
    unsafe fn slot(&self, index: usize) -> *mut T {
        debug_assert!(index < self.capacity, "slot {} within capacity {}", index, self.capacity);
        match self.storage {
            Some(storage) => storage.as_ptr().add(index),
            None => unreachable!("slot access without storage"),
        }
    }

    fn slots_mut(&mut self, count: usize) -> &mut [T] {
        debug_assert!(count <= self.capacity, "slots_mut count within capacity");
        match self.storage {
            Some(storage) => unsafe { std::slice::from_raw_parts_mut(storage.as_ptr(), count) },
            None => &mut [],
        }
    }

    /// Makes room for one more element, growing by one granularity block when full.
    fn reserve_one(&mut self) -> Result<(), AllocError> {
        if self.storage.is_none() {
            return self.set_capacity(self.granularity);
        }
        if self.len == self.capacity {
            let grown = next_block_capacity(self.capacity, self.granularity)
                .ok_or(AllocError::CapacityOverflow)?;
            self.set_capacity(grown)?;
        }
        Ok(())
    }

    /// Reallocates to exactly `capacity` slots, moving the live elements over.
    fn set_capacity(&mut self, capacity: usize) -> Result<(), AllocError> {
        if capacity == 0 {
            self.clear();
            return Ok(());
        }
        if capacity == self.capacity {
            return Ok(());
        }

        let fresh = self.alloc.alloc(capacity)?;
        let keep = self.len.min(capacity);
        if let Some(old) = self.storage {
            for i in 0..keep {
                unsafe { std::ptr::swap(fresh.as_ptr().add(i), old.as_ptr().add(i)) };
            }
            unsafe { self.alloc.free(old, self.capacity) };
        }
        trace!("array storage {} -> {} slots, {} kept", self.capacity, capacity, keep);

        self.storage = Some(fresh);
        self.capacity = capacity;
        self.len = keep;
        Ok(())
    }
}

impl<T, A: Allocator<T>> Drop for Array<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, A: Allocator<T> + Default> Default for Array<T, A> {
    fn default() -> Self {
        Array::with_allocator(DEFAULT_GRANULARITY, A::default())
    }
}

impl<T: Clone + Default> Clone for Array<T, Heap> {
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(copy) => copy,
            Err(e) => unreachable!("heap allocation does not fail: {}", e),
        }
    }
}

impl<T, A: Allocator<T>> std::ops::Index<usize> for Array<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        assert!(index < self.len, "index {} out of range for length {}", index, self.len);
        unsafe { &*self.slot(index) }
    }
}

impl<T, A: Allocator<T>> std::ops::IndexMut<usize> for Array<T, A> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        assert!(index < self.len, "index {} out of range for length {}", index, self.len);
        unsafe { &mut *self.slot(index) }
    }
}

impl<'a, T, A: Allocator<T>> IntoIterator for &'a Array<T, A> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator<T>> IntoIterator for &'a mut Array<T, A> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, A, B> PartialEq<Array<T, B>> for Array<T, A>
    where T: PartialEq, A: Allocator<T>, B: Allocator<T>
{
    fn eq(&self, other: &Array<T, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, A: Allocator<T>> std::fmt::Debug for Array<T, A> where T: std::fmt::Debug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
