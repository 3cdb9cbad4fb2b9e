//! Binding (Watcher)
//!
//! A binding is one live link between a path expression and an update
//! effect. Construction evaluates the expression under a tracking scope,
//! so every cell the read touches subscribes the binding to its notifier;
//! from then on, any write to one of those cells broadcasts back into
//! `update()`.
//!
//! `update()` re-reads the path as a plain (untracked) read and invokes
//! the effect only when the value actually changed, caching the new value.
//! The effect is never invoked during construction; the directive
//! handlers perform the initial render themselves.
//!
//! Bindings are never disposed: the notifier clones created during
//! evaluation keep a binding alive for the life of the bound node.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::context::TrackingContext;
use super::observer::DataObject;
use super::value::Value;
use crate::error::BindError;
use crate::path::PathExpr;

/// Counter for generating unique binding IDs.
static BINDING_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_binding_id() -> u64 {
    BINDING_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// The update effect invoked with the freshly resolved value.
pub type EffectFn = dyn Fn(&Value) -> Result<(), BindError> + Send + Sync;

/// A live expression-to-effect link.
///
/// Cheap to clone; clones share one inner allocation, so the copies held
/// by notifiers and the copy on the tracking stack are the same binding.
#[derive(Clone)]
pub struct Binding {
    inner: Arc<BindingInner>,
}

struct BindingInner {
    id: u64,
    data: DataObject,
    path: PathExpr,
    effect: Box<EffectFn>,
    last_value: RwLock<Value>,
}

impl Binding {
    /// Create a binding and evaluate its expression under a tracking
    /// scope, subscribing it to every cell the read touches.
    ///
    /// The initial value is cached as `last_value`; the effect does not
    /// run here.
    pub fn new<F>(data: &DataObject, path: PathExpr, effect: F) -> Result<Self, BindError>
    where
        F: Fn(&Value) -> Result<(), BindError> + Send + Sync + 'static,
    {
        let binding = Self {
            inner: Arc::new(BindingInner {
                id: next_binding_id(),
                data: data.clone(),
                path,
                effect: Box::new(effect),
                last_value: RwLock::new(Value::Null),
            }),
        };

        let initial = {
            let _ctx = TrackingContext::enter(binding.clone());
            binding.inner.data.resolve(&binding.inner.path)?
        };
        *binding
            .inner
            .last_value
            .write()
            .expect("last value lock poisoned") = initial;

        Ok(binding)
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn path(&self) -> &PathExpr {
        &self.inner.path
    }

    /// The value cached by the most recent evaluation.
    pub fn last_value(&self) -> Value {
        self.inner
            .last_value
            .read()
            .expect("last value lock poisoned")
            .clone()
    }

    /// Re-read the path (untracked) and run the effect if the value
    /// changed since the last evaluation.
    pub fn update(&self) -> Result<(), BindError> {
        let new_value = self.inner.data.resolve(&self.inner.path)?;
        let changed = {
            let last = self
                .inner
                .last_value
                .read()
                .expect("last value lock poisoned");
            *last != new_value
        };
        if changed {
            (self.inner.effect)(&new_value)?;
            *self
                .inner
                .last_value
                .write()
                .expect("last value lock poisoned") = new_value;
        }
        Ok(())
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.inner.id)
            .field("path", &self.inner.path.raw())
            .field("last_value", &self.last_value())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI32, Ordering};

    use super::*;
    use serde_json::json;

    fn data() -> DataObject {
        DataObject::observe(Value::from(json!({ "user": { "name": "Ann" }, "count": 1 })))
    }

    #[test]
    fn construction_caches_the_initial_value() {
        let data = data();
        let binding = Binding::new(&data, PathExpr::parse("user.name").unwrap(), |_| Ok(()))
            .unwrap();
        assert_eq!(binding.last_value(), Value::from("Ann"));
    }

    #[test]
    fn construction_does_not_run_the_effect() {
        let data = data();
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        let _binding = Binding::new(&data, PathExpr::parse("count").unwrap(), move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn construction_fails_on_a_missing_path() {
        let data = data();
        let result = Binding::new(&data, PathExpr::parse("user.missing").unwrap(), |_| Ok(()));
        assert!(result.is_err());
    }

    #[test]
    fn update_fires_only_on_change() {
        let data = data();
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        let binding = Binding::new(&data, PathExpr::parse("user.name").unwrap(), move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        // Unchanged: no effect.
        binding.update().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Changed through the data: the cell broadcast already drives the
        // binding; last_value follows the new value.
        data.set("user.name", "Bob").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(binding.last_value(), Value::from("Bob"));

        // A redundant manual update after the broadcast is a no-op.
        binding.update().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bindings_over_the_same_path_keep_independent_last_values() {
        let data = data();
        let first_count = Arc::new(AtomicI32::new(0));
        let first_clone = first_count.clone();
        let first = Binding::new(&data, PathExpr::parse("user.name").unwrap(), move |_| {
            first_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        // The first binding has already seen "Bob" when the second one is
        // constructed, so their caches start out different.
        data.set("user.name", "Bob").unwrap();
        assert_eq!(first_count.load(Ordering::SeqCst), 1);

        let second_count = Arc::new(AtomicI32::new(0));
        let second_clone = second_count.clone();
        let second = Binding::new(&data, PathExpr::parse("user.name").unwrap(), move |_| {
            second_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_ne!(first.id(), second.id());

        data.set("user.name", "Cid").unwrap();
        assert_eq!(first_count.load(Ordering::SeqCst), 2);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);
        assert_eq!(first.last_value(), Value::from("Cid"));
        assert_eq!(second.last_value(), Value::from("Cid"));
    }

    #[test]
    fn effect_receives_the_new_value() {
        let data = data();
        let seen = Arc::new(RwLock::new(Value::Null));
        let seen_clone = seen.clone();
        let _binding = Binding::new(&data, PathExpr::parse("count").unwrap(), move |value| {
            *seen_clone.write().unwrap() = value.clone();
            Ok(())
        })
        .unwrap();

        data.set("count", 7i64).unwrap();
        assert_eq!(*seen.read().unwrap(), Value::from(7i64));
    }
}
