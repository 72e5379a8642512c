//! A small object pool for per-transaction scratch collections.
//!
//! Workers check a collection out with [`ObjectPool::get`], use it for one
//! unit of work and hand it back by dropping the [`Pooled`] guard. Returned
//! objects are reset before they go back into the pool, so the next borrower
//! never sees entries from a previous transaction. The pool keeps at most
//! `capacity` idle objects; surplus ones are simply dropped.

use std::collections::HashSet;
use std::hash::{BuildHasher, Hash};
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Restores an object to its freshly constructed state.
pub trait Reset {
    fn reset(&mut self);
}

impl<K: Eq + Hash, S: BuildHasher> Reset for HashSet<K, S> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<T> Reset for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

#[derive(Debug)]
pub struct ObjectPool<T> {
    idle: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T: Default + Reset> ObjectPool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn get(&self) -> Pooled<'_, T> {
        // a poisoned pool only costs us the reuse, never correctness
        let value = self
            .idle
            .lock()
            .ok()
            .and_then(|mut idle| idle.pop())
            .unwrap_or_default();
        Pooled { pool: self, value }
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    fn put(&self, mut value: T) {
        value.reset();
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.capacity {
                idle.push(value);
            }
        }
    }
}

/// Borrowed pool object; goes back to the pool on drop.
pub struct Pooled<'a, T: Default + Reset> {
    pool: &'a ObjectPool<T>,
    value: T,
}

impl<T: Default + Reset> Deref for Pooled<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Default + Reset> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Default + Reset> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        let value = std::mem::take(&mut self.value);
        self.pool.put(value);
    }
}
