//! Cooperative cancellation shared by every pipeline stage
//!
//! A [`CancelToken`] owns the sending half of a channel that never carries a
//! message. Cancelling drops the sender, which disconnects the channel and
//! makes `recv(token.done())` ready for every waiter at once, so a stage
//! blocked on a handoff can race it in `crossbeam::select!`.

use crate::error::{Result, SyncError};
use crossbeam::channel::{self, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread;
use std::time::Duration;

struct Inner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn new() -> Self {
        let (trigger, done) = channel::bounded(0);
        Self {
            cancelled: AtomicBool::new(false),
            trigger: Mutex::new(Some(trigger)),
            done,
            children: Mutex::new(Vec::new()),
        }
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        drop(
            self.trigger
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let children = std::mem::take(
            &mut *self.children.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

/// Shared cancellation signal.
///
/// Clones observe the same signal. Cancelling is idempotent and cascades to
/// every token created with [`CancelToken::child`].
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new()),
        }
    }

    /// Fire the signal
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Check whether the signal has fired
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Receiver that becomes ready (disconnected) once the token is cancelled.
    ///
    /// Meant for `crossbeam::select!`; no value is ever delivered on it.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done
    }

    /// Return `Err(SyncError::Cancelled)` if the signal has fired
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Create a token cancelled together with this one.
    ///
    /// Cancelling the child does not affect the parent.
    pub fn child(&self) -> CancelToken {
        let child = CancelToken::new();
        {
            let mut children = self
                .inner
                .children
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            children.retain(|c| c.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        // A cancel that raced the registration above has already drained
        // the child list.
        if self.is_cancelled() {
            child.cancel();
        }
        child
    }

    /// Cancel this token once `timeout` elapses, unless it fires first
    pub fn cancel_after(&self, timeout: Duration) {
        let token = self.clone();
        let deadline = channel::after(timeout);
        thread::spawn(move || {
            crossbeam::select! {
                recv(token.done()) -> _ => {}
                recv(deadline) -> _ => {
                    tracing::debug!(?timeout, "deadline reached, cancelling");
                    token.cancel();
                }
            }
        });
    }

    /// Guard that cancels this token when dropped
    pub fn drop_guard(&self) -> CancelGuard {
        CancelGuard {
            token: self.clone(),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Cancels its token on drop, on every exit path
#[must_use = "the token is cancelled as soon as the guard is dropped"]
pub struct CancelGuard {
    token: CancelToken,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
