//! Tracking Context
//!
//! The tracking context records which binding is currently evaluating its
//! expression. This enables automatic dependency wiring: when an observed
//! cell is read, it checks for an active context and, if one exists,
//! subscribes that binding to its notifier.
//!
//! # Implementation
//!
//! A thread-local stack with a drop guard. Entering pushes the binding;
//! the guard pops it on drop, so the context is released on every exit
//! path, including `?` returns from a failed resolution. The stack shape
//! tolerates a binding being constructed from inside another binding's
//! evaluation, but that is a documented constraint of the engine, not a
//! supported pattern; nothing in the compiler does it.

use std::cell::RefCell;

use super::binding::Binding;

thread_local! {
    static ACTIVE_BINDINGS: RefCell<Vec<Binding>> = const { RefCell::new(Vec::new()) };
}

/// Guard marking a binding as "currently evaluating" for this thread.
///
/// While the guard is alive, any observed cell that is read subscribes the
/// binding to itself.
pub struct TrackingContext {
    binding_id: u64,
}

impl TrackingContext {
    /// Enter a tracking scope for the given binding.
    pub fn enter(binding: Binding) -> Self {
        let binding_id = binding.id();
        ACTIVE_BINDINGS.with(|stack| stack.borrow_mut().push(binding));
        Self { binding_id }
    }

    /// Whether any binding is currently evaluating on this thread.
    pub fn is_active() -> bool {
        ACTIVE_BINDINGS.with(|stack| !stack.borrow().is_empty())
    }

    /// The binding currently evaluating, if any.
    pub fn current() -> Option<Binding> {
        ACTIVE_BINDINGS.with(|stack| stack.borrow().last().cloned())
    }
}

impl Drop for TrackingContext {
    fn drop(&mut self) {
        ACTIVE_BINDINGS.with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(binding) = popped {
                debug_assert_eq!(
                    binding.id(),
                    self.binding_id,
                    "tracking context mismatch: expected binding {}, got {}",
                    self.binding_id,
                    binding.id()
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::super::observer::DataObject;
    use super::*;
    use crate::path::PathExpr;
    use crate::reactive::Value;
    use serde_json::json;

    fn binding() -> Binding {
        let data = DataObject::observe(Value::from(json!({ "msg": "hi" })));
        Binding::new(&data, PathExpr::parse("msg").unwrap(), |_| Ok(())).unwrap()
    }

    #[test]
    fn context_tracks_current_binding() {
        let b = binding();

        assert!(!TrackingContext::is_active());
        assert!(TrackingContext::current().is_none());

        {
            let _ctx = TrackingContext::enter(b.clone());
            assert!(TrackingContext::is_active());
            assert_eq!(TrackingContext::current().unwrap().id(), b.id());
        }

        // Cleared when the guard drops.
        assert!(!TrackingContext::is_active());
        assert!(TrackingContext::current().is_none());
    }

    #[test]
    fn nested_contexts_restore_the_outer_binding() {
        let outer = binding();
        let inner = binding();

        {
            let _outer_ctx = TrackingContext::enter(outer.clone());
            assert_eq!(TrackingContext::current().unwrap().id(), outer.id());

            {
                let _inner_ctx = TrackingContext::enter(inner.clone());
                assert_eq!(TrackingContext::current().unwrap().id(), inner.id());
            }

            assert_eq!(TrackingContext::current().unwrap().id(), outer.id());
        }

        assert!(TrackingContext::current().is_none());
    }

    #[test]
    fn context_is_released_on_error_paths() {
        // Binding construction resolves its path under a tracking scope;
        // a failed resolution must still clear the context.
        let data = DataObject::observe(Value::from(json!({ "msg": "hi" })));
        let result = Binding::new(&data, PathExpr::parse("no.such.path").unwrap(), |_| Ok(()));
        assert!(result.is_err());
        assert!(!TrackingContext::is_active());
    }
}
