//! Latest-snapshot slot shared between the audio and UI threads
//!
//! The audio callback publishes level snapshots; the UI thread takes the
//! most recent one each frame. Only the newest snapshot matters to the
//! meter, so an unread snapshot is simply overwritten.
//!
//! ## Design Notes
//!
//! `Arc<Mutex<T>>` with `try_lock()` on the audio side: the audio thread
//! never waits, it drops a publish if the UI thread holds the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::meter::Snapshot;

/// Thread-safe single-slot snapshot buffer
pub struct LevelBuffer {
    inner: Arc<Mutex<BufferInner>>,
}

struct BufferInner {
    latest: Option<Snapshot>,
    /// Snapshots accepted since creation
    published: u64,
    /// Snapshots overwritten before the UI took them
    overwritten: u64,
}

impl LevelBuffer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufferInner {
                latest: None,
                published: 0,
                overwritten: 0,
            })),
        }
    }

    /// Publish a snapshot from the audio thread
    ///
    /// # Returns
    /// `true` if the snapshot was stored, `false` if the lock was busy
    pub fn publish(&self, snapshot: Snapshot) -> bool {
        if let Ok(mut inner) = self.inner.try_lock() {
            if inner.latest.replace(snapshot).is_some() {
                inner.overwritten += 1;
            }
            inner.published += 1;
            true
        } else {
            false
        }
    }

    /// Take the newest snapshot, leaving the slot empty
    pub fn take(&self) -> Option<Snapshot> {
        self.lock().latest.take()
    }

    pub fn published(&self) -> u64 {
        self.lock().published
    }

    pub fn overwritten(&self) -> u64 {
        self.lock().overwritten
    }

    pub fn clear(&self) {
        self.lock().latest = None;
    }

    /// Clone the Arc to share with the audio thread
    pub fn clone_ref(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }

    // A panic on the audio thread must not take the meter down with it
    fn lock(&self) -> MutexGuard<'_, BufferInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LevelBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LevelBuffer {
    fn clone(&self) -> Self {
        self.clone_ref()
    }
}
