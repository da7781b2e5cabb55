#![forbid(unsafe_code)]

//! Type-erased property values.
//!
//! Observable properties are heterogeneous over their value types, so the
//! registry and dispatcher traffic in [`Value`] rather than generics. The
//! typed ends of the system (getters, setters, observers that care about
//! the concrete type) erase and recover values here.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// A type-erased, cheaply clonable property value.
///
/// Cloning shares the underlying allocation, so one `Value` can be handed
/// to every observer in a dispatch cycle without copying the payload.
#[derive(Clone)]
pub struct Value {
    inner: Rc<dyn Any>,
    type_name: &'static str,
}

impl Value {
    /// Wrap a concrete value.
    #[must_use]
    pub fn new<V: 'static>(value: V) -> Self {
        Self {
            inner: Rc::new(value),
            type_name: std::any::type_name::<V>(),
        }
    }

    /// Borrow the payload as `V`, or `None` if it holds a different type.
    #[must_use]
    pub fn downcast_ref<V: 'static>(&self) -> Option<&V> {
        self.inner.downcast_ref::<V>()
    }

    /// Whether the payload is a `V`.
    #[must_use]
    pub fn is<V: 'static>(&self) -> bool {
        self.inner.is::<V>()
    }

    /// Name of the concrete type stored inside, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
