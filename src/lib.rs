/*!

A dynamic array that grows in blocks of a configurable granularity, with pluggable storage:
the global heap, or a static bump pool that carves slabs out of one pre-reserved region.

```
use granlist::{Array, StaticPool};

let mut on_heap: Array<u32> = Array::with_granularity(8);
on_heap.push(3).unwrap();
assert_eq!(8, on_heap.capacity());

let mut pool = StaticPool::new();
pool.init(1024).unwrap();
{
    let mut pooled: Array<u32, _> = Array::with_allocator(8, pool.allocator());
    pooled.extend_from_array(&on_heap).unwrap();
    assert_eq!(32, pool.used());
}
pool.clear_memory();
```

*/

mod logging;
mod layout;
mod allocator;
mod pool;
mod array;
mod traits;

pub use allocator::{Allocator, AllocError, Heap};
pub use pool::{StaticPool, PoolAlloc, POOL_BASE_ALIGN};
pub use array::{Array, DEFAULT_GRANULARITY};
pub use traits::CollectArray;

#[cfg(test)]
pub mod dropflag;
