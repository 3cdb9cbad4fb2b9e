//! Observed Data
//!
//! Observation converts a plain `Value` tree into a tree where every
//! object field and array index is backed by a `Cell`: a hidden slot
//! holding the current value plus a lazily-created `Notifier`. This is the
//! explicit key-to-cell rendition of property interception: reads and
//! writes go through the cell, which gives the engine its side channel:
//!
//! - A read under an active tracking context subscribes the currently
//!   evaluating binding to the cell's notifier. Resolution touches every
//!   cell along a path, so a binding on `user.name` is subscribed to both
//!   `user` and `name` and fires when either is written.
//!
//! - A write compares against the current value; an equal write is a
//!   no-op. A differing write re-observes the new value (a fresh subtree
//!   becomes fully reactive), stores it, then broadcasts.
//!
//! Only containers are walked: scalars become inert leaves. Children are
//! observed before the parent cell is installed. Properties present at
//! observation time are reactive; arrays are treated as plain objects
//! (indices become cells, length and mutation methods are not observed).

use std::sync::{Arc, OnceLock, RwLock};

use tracing::{debug, trace};

use super::context::TrackingContext;
use super::notifier::Notifier;
use super::value::Value;
use crate::error::BindError;
use crate::path::{PathError, PathExpr};

/// Convert a plain value into its observed form, children first.
pub(crate) fn observe(value: Value) -> ObservedValue {
    match value {
        Value::Object(fields) => ObservedValue::Object(
            fields
                .into_iter()
                .map(|(key, child)| (key, Cell::new(observe(child))))
                .collect(),
        ),
        Value::Array(items) => ObservedValue::Array(
            items
                .into_iter()
                .map(|child| Cell::new(observe(child)))
                .collect(),
        ),
        scalar => ObservedValue::Scalar(scalar),
    }
}

/// A value in observed form: scalars are leaves, containers hold cells.
pub enum ObservedValue {
    Scalar(Value),
    Array(Vec<Cell>),
    Object(indexmap::IndexMap<String, Cell>),
}

impl ObservedValue {
    /// Deep copy back into a plain value.
    pub fn snapshot(&self) -> Value {
        match self {
            ObservedValue::Scalar(value) => value.clone(),
            ObservedValue::Array(items) => {
                Value::Array(items.iter().map(Cell::snapshot).collect())
            }
            ObservedValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, cell)| (key.clone(), cell.snapshot()))
                    .collect(),
            ),
        }
    }

    /// Look up the cell behind one path segment.
    fn child(&self, path: &PathExpr, segment: &str) -> Result<Cell, PathError> {
        match self {
            ObservedValue::Object(fields) => {
                fields
                    .get(segment)
                    .cloned()
                    .ok_or_else(|| PathError::MissingSegment {
                        path: path.raw().to_string(),
                        segment: segment.to_string(),
                    })
            }
            ObservedValue::Array(items) => {
                let index: usize = segment.parse().map_err(|_| PathError::BadIndex {
                    path: path.raw().to_string(),
                    segment: segment.to_string(),
                })?;
                items
                    .get(index)
                    .cloned()
                    .ok_or_else(|| PathError::MissingSegment {
                        path: path.raw().to_string(),
                        segment: segment.to_string(),
                    })
            }
            ObservedValue::Scalar(_) => Err(PathError::NotAContainer {
                path: path.raw().to_string(),
                segment: segment.to_string(),
            }),
        }
    }

    /// Locate the cell a final segment assigns into, or `None` when the
    /// segment names a missing object key (insertable).
    fn assign_target(&self, path: &PathExpr, segment: &str) -> Result<Option<Cell>, PathError> {
        match self {
            ObservedValue::Object(fields) => Ok(fields.get(segment).cloned()),
            ObservedValue::Array(_) => self.child(path, segment).map(Some),
            ObservedValue::Scalar(_) => Err(PathError::NotAContainer {
                path: path.raw().to_string(),
                segment: segment.to_string(),
            }),
        }
    }
}

/// The hidden slot behind one observed property.
#[derive(Clone)]
pub struct Cell {
    slot: Arc<RwLock<ObservedValue>>,
    notifier: Arc<OnceLock<Arc<Notifier>>>,
}

impl Cell {
    pub(crate) fn new(value: ObservedValue) -> Self {
        Self {
            slot: Arc::new(RwLock::new(value)),
            notifier: Arc::new(OnceLock::new()),
        }
    }

    /// The cell's notifier, created on first use.
    fn notifier(&self) -> &Arc<Notifier> {
        self.notifier.get_or_init(|| Arc::new(Notifier::new()))
    }

    /// Subscribe the currently evaluating binding, if any.
    fn touch(&self) {
        if let Some(binding) = TrackingContext::current() {
            self.notifier().subscribe(binding);
        }
    }

    /// Tracked read: subscribes the current binding, then snapshots.
    pub fn get(&self) -> Value {
        self.touch();
        self.snapshot()
    }

    /// Untracked read.
    pub fn snapshot(&self) -> Value {
        self.slot
            .read()
            .expect("cell slot lock poisoned")
            .snapshot()
    }

    fn child(&self, path: &PathExpr, segment: &str) -> Result<Cell, PathError> {
        self.slot
            .read()
            .expect("cell slot lock poisoned")
            .child(path, segment)
    }

    /// Write a new value. An equal write is a no-op; a differing write
    /// re-observes the value, stores it, and broadcasts.
    pub fn set(&self, value: Value) -> Result<(), BindError> {
        {
            let mut slot = self.slot.write().expect("cell slot lock poisoned");
            if slot.snapshot() == value {
                return Ok(());
            }
            *slot = observe(value);
        }
        // The slot lock is released before subscribers run: updates read
        // back through this cell.
        match self.notifier.get() {
            Some(notifier) => {
                trace!(subscribers = notifier.subscriber_count(), "observed cell changed");
                notifier.broadcast()
            }
            None => Ok(()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifier
            .get()
            .map(|notifier| notifier.subscriber_count())
            .unwrap_or(0)
    }
}

/// The caller-facing handle over an observed data root.
///
/// Cheap to clone; clones share the same observed tree.
#[derive(Clone)]
pub struct DataObject {
    root: Arc<RwLock<ObservedValue>>,
}

impl DataObject {
    /// Observe a plain value. Containers are walked recursively; a scalar
    /// root is left untouched and stays inert.
    pub fn observe(value: Value) -> Self {
        debug!("observing data root");
        Self {
            root: Arc::new(RwLock::new(observe(value))),
        }
    }

    /// Deep copy of the current data as a plain value.
    pub fn snapshot(&self) -> Value {
        self.root
            .read()
            .expect("data root lock poisoned")
            .snapshot()
    }

    /// Resolve a path, touching every cell along it.
    ///
    /// Under an active tracking context this is what wires a binding to
    /// its dependencies; outside one it is a plain read.
    pub fn resolve(&self, path: &PathExpr) -> Result<Value, PathError> {
        let segments = path.segments();
        let mut cell = self
            .root
            .read()
            .expect("data root lock poisoned")
            .child(path, &segments[0])?;
        cell.touch();
        for segment in &segments[1..] {
            cell = cell.child(path, segment)?;
            cell.touch();
        }
        Ok(cell.snapshot())
    }

    /// Assign on the final segment's key: walks all segments but the
    /// last, then writes through the target cell (broadcast semantics),
    /// or inserts a fresh observed cell when an object key is missing.
    pub fn assign(&self, path: &PathExpr, value: Value) -> Result<(), BindError> {
        let (parents, last) = path.split_last();
        if parents.is_empty() {
            return assign_into(&self.root, path, last, value);
        }
        let mut cell = self
            .root
            .read()
            .expect("data root lock poisoned")
            .child(path, &parents[0])?;
        for segment in &parents[1..] {
            cell = cell.child(path, segment)?;
        }
        assign_into(&cell.slot, path, last, value)
    }

    /// Convenience: resolve a path given as text.
    pub fn get(&self, expr: &str) -> Result<Value, BindError> {
        Ok(self.resolve(&PathExpr::parse(expr)?)?)
    }

    /// Convenience: assign a path given as text.
    pub fn set(&self, expr: &str, value: impl Into<Value>) -> Result<(), BindError> {
        self.assign(&PathExpr::parse(expr)?, value.into())
    }
}

fn assign_into(
    slot_lock: &RwLock<ObservedValue>,
    path: &PathExpr,
    last: &str,
    value: Value,
) -> Result<(), BindError> {
    let target = {
        let slot = slot_lock.read().expect("cell slot lock poisoned");
        slot.assign_target(path, last)?
    };
    match target {
        Some(cell) => cell.set(value),
        None => {
            debug!(key = last, "inserting new observed key");
            let mut slot = slot_lock.write().expect("cell slot lock poisoned");
            if let ObservedValue::Object(fields) = &mut *slot {
                fields.insert(last.to_string(), Cell::new(observe(value)));
            }
            Ok(())
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI32, Ordering};

    use super::super::Binding;
    use super::*;
    use serde_json::json;

    fn observed(json: serde_json::Value) -> DataObject {
        DataObject::observe(Value::from(json))
    }

    fn counter_on(data: &DataObject, expr: &str) -> (Binding, Arc<AtomicI32>) {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        let binding = Binding::new(data, PathExpr::parse(expr).unwrap(), move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        (binding, count)
    }

    #[test]
    fn observation_is_value_transparent() {
        let source = json!({
            "msg": "hi",
            "user": { "name": "Ann", "tags": ["a", "b"] },
            "count": 3,
            "flag": true,
            "nothing": null
        });
        let data = observed(source.clone());
        assert_eq!(data.snapshot(), Value::from(source));
    }

    #[test]
    fn resolve_reads_nested_values() {
        let data = observed(json!({ "user": { "name": "Ann" } }));
        assert_eq!(data.get("user.name").unwrap(), Value::from("Ann"));
        assert_eq!(
            data.get("user").unwrap(),
            Value::from(json!({ "name": "Ann" }))
        );
    }

    #[test]
    fn resolve_errors_name_the_offending_segment() {
        let data = observed(json!({ "user": { "name": "Ann" } }));

        let err = data.resolve(&PathExpr::parse("user.age").unwrap()).unwrap_err();
        assert_eq!(
            err,
            PathError::MissingSegment {
                path: "user.age".to_string(),
                segment: "age".to_string()
            }
        );

        let err = data
            .resolve(&PathExpr::parse("user.name.first").unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            PathError::NotAContainer {
                path: "user.name.first".to_string(),
                segment: "first".to_string()
            }
        );
    }

    #[test]
    fn equal_write_triggers_nothing() {
        let data = observed(json!({ "msg": "hi" }));
        let (_binding, count) = counter_on(&data, "msg");

        data.set("msg", "hi").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        data.set("msg", "bye").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn write_triggers_every_subscribed_binding() {
        let data = observed(json!({ "msg": "hi" }));
        let (_first, first_count) = counter_on(&data, "msg");
        let (_second, second_count) = counter_on(&data, "msg");

        data.set("msg", "bye").unwrap();
        assert_eq!(first_count.load(Ordering::SeqCst), 1);
        assert_eq!(second_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn binding_subscribes_to_every_cell_along_its_path() {
        let data = observed(json!({ "user": { "name": "Ann" } }));
        let (binding, count) = counter_on(&data, "user.name");

        // Replacing the whole subtree fires the binding through the
        // parent cell's notifier.
        data.set("user", Value::from(json!({ "name": "Bob" }))).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(binding.last_value(), Value::from("Bob"));
    }

    #[test]
    fn replaced_subtree_is_fully_reactive() {
        let data = observed(json!({ "user": { "name": "Ann" } }));
        data.set("user", Value::from(json!({ "name": "Bob" }))).unwrap();

        // A binding constructed after the replacement wires into the new
        // subtree's cells and fires on mutation.
        let (_binding, count) = counter_on(&data, "user.name");
        data.set("user.name", "Cid").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(data.get("user.name").unwrap(), Value::from("Cid"));
    }

    #[test]
    fn assign_inserts_a_missing_object_key_as_observed() {
        let data = observed(json!({ "user": {} }));
        data.set("user.nick", "zed").unwrap();
        assert_eq!(data.get("user.nick").unwrap(), Value::from("zed"));

        // The inserted cell is reactive.
        let (_binding, count) = counter_on(&data, "user.nick");
        data.set("user.nick", "wyrm").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn array_indices_behave_as_properties() {
        let data = observed(json!({ "items": ["a", "b"] }));
        assert_eq!(data.get("items.0").unwrap(), Value::from("a"));

        let (_binding, count) = counter_on(&data, "items.1");
        data.set("items.1", "z").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(data.get("items.1").unwrap(), Value::from("z"));

        assert!(matches!(
            data.get("items.x").unwrap_err(),
            BindError::Path(PathError::BadIndex { .. })
        ));
        assert!(matches!(
            data.get("items.9").unwrap_err(),
            BindError::Path(PathError::MissingSegment { .. })
        ));
    }

    #[test]
    fn scalar_root_is_inert() {
        let data = DataObject::observe(Value::from("just a string"));
        assert_eq!(data.snapshot(), Value::from("just a string"));
        assert!(matches!(
            data.get("anything").unwrap_err(),
            BindError::Path(PathError::NotAContainer { .. })
        ));
    }
}
