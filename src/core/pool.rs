//! Reusable object pools
//!
//! A [`Pool`] hands out [`Pooled`] guards. The guard owns its object
//! exclusively and returns it to the pool when dropped, so an object goes back
//! on every exit path including early returns, `?` and unwinding.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Objects that can be recycled through a [`Pool`].
pub trait Reset {
    /// Clear per-use state before the object is stored for reuse.
    fn reset(&mut self);
}

impl Reset for Vec<u8> {
    fn reset(&mut self) {
        self.clear();
    }
}

/// Idle objects beyond this count are dropped instead of stored.
pub const DEFAULT_MAX_IDLE: usize = 64;

pub struct Pool<T: Reset> {
    idle: Mutex<Vec<T>>,
    factory: fn() -> T,
    max_idle: usize,
    created: AtomicUsize,
}

impl<T: Reset> Pool<T> {
    pub const fn new(factory: fn() -> T) -> Self {
        Self::with_max_idle(factory, DEFAULT_MAX_IDLE)
    }

    pub const fn with_max_idle(factory: fn() -> T, max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            factory,
            max_idle,
            created: AtomicUsize::new(0),
        }
    }

    /// Take an idle object, constructing one if none is available.
    pub fn get(&self) -> Pooled<'_, T> {
        let item = self.take();
        Pooled {
            pool: self,
            item: Some(item),
        }
    }

    /// Like [`get`](Self::get) but detached from the guard. The caller is
    /// responsible for handing the object back with [`put`](Self::put).
    pub fn take(&self) -> T {
        if let Some(item) = self.idle.lock().pop() {
            return item;
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        (self.factory)()
    }

    pub fn put(&self, mut item: T) {
        item.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(item);
        }
    }

    /// Number of objects this pool has constructed so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Number of objects currently waiting for reuse.
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

/// Exclusive handle to a pooled object.
pub struct Pooled<'a, T: Reset> {
    pool: &'a Pool<T>,
    item: Option<T>,
}

impl<T: Reset> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("pooled item present until drop")
    }
}

impl<T: Reset> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("pooled item present until drop")
    }
}

impl<T: Reset> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.put(item);
        }
    }
}

/// Pool of formatting buffers.
pub type BufferPool = Pool<Vec<u8>>;

fn new_buffer() -> Vec<u8> {
    Vec::with_capacity(256)
}

impl BufferPool {
    pub const fn buffers() -> Self {
        Pool::new(new_buffer)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::buffers()
    }
}

/// Pool shared by every logger that was not given its own.
pub fn default_buffer_pool() -> &'static BufferPool {
    static DEFAULT: OnceLock<BufferPool> = OnceLock::new();
    DEFAULT.get_or_init(BufferPool::buffers)
}
