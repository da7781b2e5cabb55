#![forbid(unsafe_code)]

//! Per-class observable property tables.
//!
//! A type opts in by implementing [`Observable`] and declaring its
//! properties once through the [`Properties`] builder. The resulting table
//! is immutable and cached per `TypeId`, so declaration runs exactly once
//! per class. A property absent from the table is a plain field and cannot
//! be subscribed to.
//!
//! # Invariants
//!
//! 1. At most one [`Descriptor`] exists per (class, property name);
//!    declaring a duplicate name panics at class-definition time.
//! 2. A table never changes after it is built.
//! 3. Reading or writing through a descriptor is behaviorally identical to
//!    direct field access when no observers are attached.

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::PropertyError;
use crate::value::Value;

/// A type whose instances expose observable properties.
///
/// Implementations declare the property table once; the runtime caches it
/// by `TypeId` and reuses it for every instance.
pub trait Observable: Sized + 'static {
    /// Declare the observable properties of this class.
    fn properties() -> Properties<Self>;
}

type Getter<T> = Box<dyn Fn(&T) -> Value>;
type Setter<T> = Box<dyn Fn(&mut T, &Value) -> Result<(), PropertyError>>;

/// Descriptor binding a property name to its getter/setter pair.
///
/// The setter is optional: a setterless property is still observable via
/// scoped updates or explicit notification.
pub struct Descriptor<T> {
    name: &'static str,
    get: Getter<T>,
    set: Option<Setter<T>>,
}

impl<T> Descriptor<T> {
    /// Property name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the property declared a setter.
    #[must_use]
    pub fn has_setter(&self) -> bool {
        self.set.is_some()
    }

    pub(crate) fn read(&self, instance: &T) -> Value {
        (self.get)(instance)
    }

    pub(crate) fn write(&self, instance: &mut T, value: &Value) -> Result<(), PropertyError> {
        match &self.set {
            Some(set) => set(instance, value),
            None => Err(PropertyError::ReadOnly {
                class: type_name::<T>(),
                property: self.name.to_string(),
            }),
        }
    }
}

impl<T> std::fmt::Debug for Descriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("has_setter", &self.has_setter())
            .finish()
    }
}

/// Immutable table of a class's observable properties, in declaration
/// order.
pub struct Properties<T> {
    entries: Vec<Descriptor<T>>,
}

impl<T> Default for Properties<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Properties<T> {
    /// Start an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Declare a read/write property.
    ///
    /// The getter and setter are stored type-erased; a write with a value
    /// of the wrong concrete type fails with
    /// [`PropertyError::TypeMismatch`] at the write site.
    ///
    /// # Panics
    ///
    /// Panics if `name` was already declared on this table.
    #[must_use]
    pub fn read_write<V: Clone + 'static>(
        self,
        name: &'static str,
        get: impl Fn(&T) -> V + 'static,
        set: impl Fn(&mut T, V) + 'static,
    ) -> Self
    where
        T: 'static,
    {
        let setter: Setter<T> = Box::new(move |instance, value| {
            let v = value
                .downcast_ref::<V>()
                .cloned()
                .ok_or_else(|| PropertyError::TypeMismatch {
                    class: type_name::<T>(),
                    property: name.to_string(),
                    expected: type_name::<V>(),
                    actual: value.type_name(),
                })?;
            set(instance, v);
            Ok(())
        });
        self.push(Descriptor {
            name,
            get: Box::new(move |instance| Value::new(get(instance))),
            set: Some(setter),
        })
    }

    /// Declare a read-only property.
    ///
    /// Read-only properties are typically computed from other state and
    /// are notified through [`Subject::update`](crate::Subject::update) or
    /// [`Subject::notify`](crate::Subject::notify).
    ///
    /// # Panics
    ///
    /// Panics if `name` was already declared on this table.
    #[must_use]
    pub fn read_only<V: Clone + 'static>(
        self,
        name: &'static str,
        get: impl Fn(&T) -> V + 'static,
    ) -> Self
    where
        T: 'static,
    {
        self.push(Descriptor {
            name,
            get: Box::new(move |instance| Value::new(get(instance))),
            set: None,
        })
    }

    fn push(mut self, descriptor: Descriptor<T>) -> Self {
        assert!(
            self.entries.iter().all(|d| d.name != descriptor.name),
            "observable property `{}` declared twice on `{}`",
            descriptor.name,
            type_name::<T>(),
        );
        self.entries.push(descriptor);
        self
    }

    /// Look up a descriptor by property name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Descriptor<T>> {
        self.entries.iter().find(|d| d.name == name)
    }

    /// Whether `name` is a declared observable property.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Declared property names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|d| d.name)
    }

    /// Number of declared properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table declares no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

thread_local! {
    /// One cached table per observable class.
    static CLASSES: RefCell<HashMap<TypeId, Rc<dyn Any>>> = RefCell::new(HashMap::new());
}

/// Fetch the cached property table for `T`, building it on first use.
pub(crate) fn class_of<T: Observable>() -> Rc<Properties<T>> {
    CLASSES.with(|classes| {
        let mut classes = classes.borrow_mut();
        let entry = classes.entry(TypeId::of::<T>()).or_insert_with(|| {
            tracing::debug!(class = type_name::<T>(), "registering observable class");
            Rc::new(T::properties()) as Rc<dyn Any>
        });
        let Ok(table) = Rc::clone(entry).downcast::<Properties<T>>() else {
            unreachable!("class table stored under its own TypeId");
        };
        table
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Gauge {
        level: u32,
        limit: u32,
    }

    impl Observable for Gauge {
        fn properties() -> Properties<Self> {
            Properties::new()
                .read_write("level", |g: &Gauge| g.level, |g, v| g.level = v)
                .read_only("headroom", |g: &Gauge| g.limit - g.level)
        }
    }

    #[test]
    fn table_lookup_and_order() {
        let table = Gauge::properties();
        assert_eq!(table.len(), 2);
        assert!(table.contains("level"));
        assert!(table.contains("headroom"));
        assert!(!table.contains("limit"));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["level", "headroom"]);
    }

    #[test]
    fn read_write_descriptor_round_trips() {
        let table = Gauge::properties();
        let mut gauge = Gauge {
            level: 1,
            limit: 10,
        };
        let descriptor = table.get("level").unwrap();
        assert!(descriptor.has_setter());
        descriptor.write(&mut gauge, &Value::new(7u32)).unwrap();
        assert_eq!(gauge.level, 7);
        let value = descriptor.read(&gauge);
        assert_eq!(value.downcast_ref::<u32>(), Some(&7));
    }

    #[test]
    fn read_only_descriptor_rejects_writes() {
        let table = Gauge::properties();
        let mut gauge = Gauge {
            level: 3,
            limit: 10,
        };
        let descriptor = table.get("headroom").unwrap();
        assert!(!descriptor.has_setter());
        let err = descriptor.write(&mut gauge, &Value::new(5u32)).unwrap_err();
        assert!(matches!(err, PropertyError::ReadOnly { .. }));
        assert_eq!(descriptor.read(&gauge).downcast_ref::<u32>(), Some(&7));
    }

    #[test]
    fn wrong_typed_write_is_a_type_mismatch() {
        let table = Gauge::properties();
        let mut gauge = Gauge {
            level: 3,
            limit: 10,
        };
        let descriptor = table.get("level").unwrap();
        let err = descriptor
            .write(&mut gauge, &Value::new("nope"))
            .unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { .. }));
        assert_eq!(gauge.level, 3);
    }

    #[test]
    #[should_panic(expected = "declared twice")]
    fn duplicate_declaration_panics() {
        let _ = Properties::<Gauge>::new()
            .read_write("level", |g: &Gauge| g.level, |g, v| g.level = v)
            .read_only("level", |g: &Gauge| g.level);
    }

    #[test]
    fn class_table_is_cached() {
        let first = class_of::<Gauge>();
        let second = class_of::<Gauge>();
        assert!(Rc::ptr_eq(&first, &second));
    }
}
