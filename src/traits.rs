use crate::{AllocError, Allocator, Array, Heap};
use crate::array::DEFAULT_GRANULARITY;

/// Implements collect to granularity-grown `Array`s.
pub trait CollectArray: Iterator {
    fn collect_array<A>(self, granularity: usize, alloc: A) -> Result<Array<Self::Item, A>, AllocError>
        where A: Allocator<Self::Item>;

    fn collect_heap_array(self) -> Result<Array<Self::Item>, AllocError> where Self::Item: Default;
}

impl<Q: Iterator> CollectArray for Q {
    fn collect_array<A>(self, granularity: usize, alloc: A) -> Result<Array<Self::Item, A>, AllocError>
        where A: Allocator<Self::Item>
    {
        let (lower, _) = self.size_hint();
        let mut array = Array::with_allocator(granularity, alloc);
        array.pre_allocate(lower)?;
        for item in self {
            array.push(item)?;
        }
        Ok(array)
    }

    fn collect_heap_array(self) -> Result<Array<Self::Item>, AllocError> where Self::Item: Default {
        self.collect_array(DEFAULT_GRANULARITY, Heap)
    }
}
