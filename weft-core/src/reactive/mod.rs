//! Reactive Primitives
//!
//! This module implements the observable data layer: plain values, the
//! observed cell tree, the notification protocol, and the bindings that
//! tie a path expression to an update effect.
//!
//! # Concepts
//!
//! ## Observation
//!
//! `DataObject::observe` walks a plain value and backs every object field
//! and array index with a cell (value slot + lazy notifier). Reads and
//! writes go through the cells from then on.
//!
//! ## Dependency tracking
//!
//! When a binding evaluates its expression, it enters a tracking scope.
//! Every cell read while the scope is active subscribes the binding to
//! its notifier. This "transparent reactivity" wiring is the same scheme
//! used by Vue-style view layers.
//!
//! ## Notification
//!
//! Writing a changed value through a cell broadcasts to its subscribers
//! in insertion order, synchronously, on the calling thread. A mutation's
//! effects are fully applied before the mutating call returns; there is
//! no batching and no scheduler.

mod binding;
mod context;
mod notifier;
mod observer;
mod value;

pub use binding::{Binding, EffectFn};
pub use context::TrackingContext;
pub use notifier::Notifier;
pub use observer::{Cell, DataObject, ObservedValue};
pub use value::Value;
