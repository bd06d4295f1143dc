//! A fixed-capacity object pool, used to recycle scratch buffers between ray queries.
//!
//! Storage and recycling come from [opool]. On top of that the pool counts how many items are checked out, and
//! never hands out more than its capacity: when every item is in use, [FixedPool::try_acquire] fails with a
//! [PoolExhaustedError], and the caller decides whether to fall back to a normal allocation.

use std::fmt::{Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use opool::{Pool, PoolAllocator, RefGuard};
use thiserror::Error;
use tracing::trace;
use valuable::Valuable;

use crate::core::targets::POOL;

#[derive(Error, Copy, Clone, Debug, PartialEq, Eq, Valuable)]
#[error("pool exhausted: all {capacity} items are in use")]
pub struct PoolExhaustedError {
    pub capacity: usize,
}

/// Allocator that creates and resets items through plain function pointers
pub struct FnAllocator<T> {
    create: fn() -> T,
    reset: fn(&mut T),
}

impl<T> PoolAllocator<T> for FnAllocator<T> {
    #[inline]
    fn allocate(&self) -> T { (self.create)() }

    #[inline]
    fn reset(&self, obj: &mut T) { (self.reset)(obj) }
}

/// A pool holding at most `capacity` items of type `T`
///
/// Items are created lazily with `create`, and passed through `reset` whenever they are returned
pub struct FixedPool<T> {
    capacity: usize,
    in_use: AtomicUsize,
    pool: Pool<FnAllocator<T>, T>,
}

impl<T> FixedPool<T> {
    pub fn new(capacity: usize, create: fn() -> T, reset: fn(&mut T)) -> Self {
        Self {
            capacity,
            in_use: AtomicUsize::new(0),
            pool: Pool::new(capacity.max(1), FnAllocator { create, reset }),
        }
    }

    pub fn capacity(&self) -> usize { self.capacity }

    /// How many items are currently checked out
    pub fn in_use(&self) -> usize { self.in_use.load(Ordering::Acquire) }

    /// Takes an item out of the pool, creating one if none are free
    pub fn try_acquire(&self) -> Result<Pooled<'_, T>, PoolExhaustedError> {
        // Reserve a slot first, so concurrent callers can't overshoot the capacity
        let reserved = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < self.capacity).then_some(n + 1));

        match reserved {
            Ok(_) => Ok(Pooled {
                item: self.pool.get(),
                in_use: &self.in_use,
            }),
            Err(_) => {
                trace!(target: POOL, capacity = self.capacity, "pool exhausted");
                Err(PoolExhaustedError { capacity: self.capacity })
            }
        }
    }
}

impl<T> Debug for FixedPool<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedPool")
            .field("capacity", &self.capacity)
            .field("in_use", &self.in_use())
            .finish_non_exhaustive()
    }
}

/// An item checked out of a [FixedPool]. Returned to the pool (and reset) when dropped
pub struct Pooled<'p, T> {
    item: RefGuard<'p, FnAllocator<T>, T>,
    in_use: &'p AtomicUsize,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T { &self.item }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T { &mut self.item }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) { self.in_use.fetch_sub(1, Ordering::AcqRel); }
}
