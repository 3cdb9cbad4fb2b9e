//! Notifier
//!
//! The pub/sub primitive behind every observed cell. A notifier holds an
//! insertion-ordered list of bindings and broadcasts to them when the
//! cell's value changes. It knows nothing about dependency tracking; the
//! cell decides *when* to subscribe (see `observer`), the notifier only
//! keeps the list.
//!
//! The list is not deduplicated: a binding whose expression reads the same
//! cell twice subscribes twice and is updated twice per broadcast.
//! Subscriptions are never removed; there is no unsubscription path.

use std::sync::RwLock;

use super::binding::Binding;
use crate::error::BindError;

/// The per-cell broadcast list of subscribed bindings.
pub struct Notifier {
    subscribers: RwLock<Vec<Binding>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Append a binding to the subscriber list.
    pub fn subscribe(&self, binding: Binding) {
        self.subscribers
            .write()
            .expect("subscriber lock poisoned")
            .push(binding);
    }

    /// Invoke `update()` on every subscriber, in insertion order, on the
    /// calling thread.
    ///
    /// The list is snapshotted and the lock released before any update
    /// runs, since update effects read back through the data tree and may
    /// subscribe to other notifiers. A failing subscriber aborts the
    /// remainder of the broadcast; the error propagates to the caller of
    /// the mutating assignment.
    pub fn broadcast(&self) -> Result<(), BindError> {
        let subscribers = self
            .subscribers
            .read()
            .expect("subscriber lock poisoned")
            .clone();
        for binding in subscribers {
            binding.update()?;
        }
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("subscriber lock poisoned")
            .len()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
