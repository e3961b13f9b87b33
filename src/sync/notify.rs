//! One-shot notifications.
//!
//! A notification fires at most once. Reactions registered before it fires
//! run when it fires, in registration order; reactions registered afterwards
//! run immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Reaction = Box<dyn FnOnce()>;
type SharedReaction = Box<dyn FnOnce() + Send>;

/// Single-thread one-shot notification.
#[derive(Default)]
pub struct Notification {
    fired: bool,
    reactions: Vec<Reaction>,
}

impl Notification {
    /// Create an unfired notification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the notification has fired.
    pub fn is_fired(&self) -> bool {
        self.fired
    }

    /// Register `reaction`. Runs it now if already fired.
    pub fn when_fired(&mut self, reaction: impl FnOnce() + 'static) {
        if self.fired {
            reaction();
        } else {
            self.reactions.push(Box::new(reaction));
        }
    }

    /// Fire, running every pending reaction.
    ///
    /// Returns `true` on the first call only.
    pub fn fire(&mut self) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;

        for reaction in std::mem::take(&mut self.reactions) {
            reaction();
        }
        true
    }
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("fired", &self.fired)
            .field("pending", &self.reactions.len())
            .finish()
    }
}

struct SharedInner {
    fired: AtomicBool,
    reactions: Mutex<Vec<SharedReaction>>,
}

/// Thread-safe one-shot notification. Clones share the same state.
///
/// Reactions run on the thread that fires, or on the registering thread if
/// the notification already fired. The lock is never held while a reaction
/// runs, so reactions may use the notification themselves.
#[derive(Clone)]
pub struct SharedNotification {
    inner: Arc<SharedInner>,
}

impl SharedNotification {
    /// Create an unfired notification.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SharedInner {
                fired: AtomicBool::new(false),
                reactions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Check if the notification has fired.
    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Register `reaction`. Runs it now if already fired.
    pub fn when_fired(&self, reaction: impl FnOnce() + Send + 'static) {
        {
            let mut reactions = self
                .inner
                .reactions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            // Checked under the lock so a concurrent fire cannot miss it.
            if !self.inner.fired.load(Ordering::Acquire) {
                reactions.push(Box::new(reaction));
                return;
            }
        }
        reaction();
    }

    /// Fire, running every pending reaction on this thread.
    ///
    /// Returns `true` for exactly one caller.
    pub fn fire(&self) -> bool {
        let reactions = {
            let mut reactions = self
                .inner
                .reactions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.inner.fired.swap(true, Ordering::AcqRel) {
                return false;
            }
            std::mem::take(&mut *reactions)
        };

        for reaction in reactions {
            reaction();
        }
        true
    }
}

impl Default for SharedNotification {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedNotification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedNotification")
            .field("fired", &self.is_fired())
            .finish()
    }
}
