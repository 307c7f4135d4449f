//! Reusable object pools for response envelopes and error records
//!
//! A [`Pool`] hands out [`Pooled`] guards. Dropping a guard resets the object
//! and puts it back on the free list, so release happens on every exit path
//! of the code holding it. Pools are owned by a dispatcher instance rather
//! than living in process-wide statics.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Serialize, Serializer};

use crate::envelope::{ErrorObject, ResponseEnvelope};

/// Default number of idle objects kept per pool
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// Objects that can be recycled through a [`Pool`]
pub trait Poolable: Default + Send + 'static {
    /// Clear every field so no state leaks to the next user
    fn reset(&mut self);
}

struct Shared<T> {
    idle: Mutex<Vec<T>>,
    max_idle: usize,
    created: AtomicUsize,
    outstanding: AtomicUsize,
}

/// A free list of reusable objects
pub struct Pool<T: Poolable> {
    shared: Arc<Shared<T>>,
}

impl<T: Poolable> Pool<T> {
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Create a pool that keeps at most `max_idle` released objects around
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                idle: Mutex::new(Vec::new()),
                max_idle,
                created: AtomicUsize::new(0),
                outstanding: AtomicUsize::new(0),
            }),
        }
    }

    /// Take an object from the free list, or build a fresh one
    pub fn acquire(&self) -> Pooled<T> {
        let recycled = self.shared.idle.lock().pop();
        let value = recycled.unwrap_or_else(|| {
            self.shared.created.fetch_add(1, Ordering::Relaxed);
            T::default()
        });
        self.shared.outstanding.fetch_add(1, Ordering::AcqRel);
        Pooled {
            value,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Return an object early. Equivalent to dropping the guard.
    pub fn release(&self, object: Pooled<T>) {
        drop(object);
    }

    /// Objects currently handed out and not yet released
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.load(Ordering::Acquire)
    }

    /// Objects sitting on the free list
    pub fn idle(&self) -> usize {
        self.shared.idle.lock().len()
    }

    /// Total objects ever allocated by this pool
    pub fn created(&self) -> usize {
        self.shared.created.load(Ordering::Relaxed)
    }
}

impl<T: Poolable> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Poolable> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Poolable> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("max_idle", &self.shared.max_idle)
            .field("created", &self.created())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// Guard over a pooled object. Dropping it resets and releases the object.
pub struct Pooled<T: Poolable> {
    value: T,
    shared: Arc<Shared<T>>,
}

impl<T: Poolable> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Poolable> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Poolable> Drop for Pooled<T> {
    fn drop(&mut self) {
        let mut value = std::mem::take(&mut self.value);
        value.reset();
        self.shared.outstanding.fetch_sub(1, Ordering::AcqRel);

        let mut idle = self.shared.idle.lock();
        if idle.len() < self.shared.max_idle {
            idle.push(value);
        }
    }
}

impl<T: Poolable + fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl<T: Poolable + Serialize> Serialize for Pooled<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

/// The pools a dispatcher draws from while handling requests
#[derive(Debug, Clone, Default)]
pub struct ObjectPools {
    envelopes: Pool<ResponseEnvelope>,
    errors: Pool<ErrorObject>,
}

impl ObjectPools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            envelopes: Pool::with_max_idle(max_idle),
            errors: Pool::with_max_idle(max_idle),
        }
    }

    pub fn envelopes(&self) -> &Pool<ResponseEnvelope> {
        &self.envelopes
    }

    pub fn errors(&self) -> &Pool<ErrorObject> {
        &self.errors
    }

    /// True when every acquired envelope and error record has been released
    pub fn is_quiescent(&self) -> bool {
        self.envelopes.outstanding() == 0 && self.errors.outstanding() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Scratch {
        text: String,
        hits: u32,
    }

    impl Poolable for Scratch {
        fn reset(&mut self) {
            self.text.clear();
            self.hits = 0;
        }
    }

    #[test]
    fn test_release_resets_before_reuse() {
        let pool: Pool<Scratch> = Pool::new();

        let mut first = pool.acquire();
        first.text.push_str("secret");
        first.hits = 7;
        pool.release(first);

        let second = pool.acquire();
        assert!(second.text.is_empty());
        assert_eq!(second.hits, 0);
        assert_eq!(pool.created(), 1);
    }

    #[test]
    fn test_outstanding_tracks_guards() {
        let pool: Pool<Scratch> = Pool::new();
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(pool.outstanding(), 2);

        drop(a);
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(pool.idle(), 1);

        drop(b);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_max_idle_bounds_free_list() {
        let pool: Pool<Scratch> = Pool::with_max_idle(1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 1);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_envelope_release_returns_nested_error_record() {
        let pools = ObjectPools::new();

        let mut envelope = pools.envelopes().acquire();
        let record = pools.errors().acquire();
        envelope.set_error(record);
        assert_eq!(pools.errors().outstanding(), 1);

        drop(envelope);
        assert!(pools.is_quiescent());
        assert_eq!(pools.errors().idle(), 1);
    }
}
