#![forbid(unsafe_code)]

//! Shared handle to an observed instance.
//!
//! [`Subject<T>`] owns the instance state behind `Rc<RefCell<..>>`:
//! cloning a handle shares the same instance, and dropping the last handle
//! reclaims the state and purges its subscriptions. The registry only ever
//! sees the instance's [`InstanceId`], so bookkeeping cannot keep an
//! instance alive.
//!
//! # Borrow discipline
//!
//! No `RefCell` borrow is held while observers run: the write path reads
//! what it needs, releases the borrow, and only then dispatches. Observers
//! may therefore read any property of the subject and write *other*
//! properties; a write to the property under dispatch is rejected by the
//! reentrancy guard rather than by a borrow panic.

use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::class::{self, Descriptor, Observable, Properties};
use crate::dispatch::{self, CycleGuard};
use crate::error::PropertyError;
use crate::registry::{self, Phase};
use crate::value::Value;

/// Stable, non-owning identity token for one observed instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    #[cfg(test)]
    pub(crate) fn for_tests(raw: u64) -> Self {
        // Offset well past anything the counter will issue in a test run.
        Self(u64::MAX - raw)
    }
}

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(0) };
}

fn next_id() -> InstanceId {
    NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        InstanceId(id)
    })
}

struct Inner<T: Observable> {
    id: InstanceId,
    class: Rc<Properties<T>>,
    state: RefCell<T>,
}

impl<T: Observable> Drop for Inner<T> {
    fn drop(&mut self) {
        registry::purge(self.id);
    }
}

/// Shared handle to an observed instance of `T`.
///
/// # Invariants
///
/// 1. The identity token is stable for the instance's lifetime.
/// 2. Before-phase observers run to completion before the value mutates;
///    after-phase observers run once the mutation is visible to readers.
/// 3. A write to a property under dispatch fails and does not mutate.
pub struct Subject<T: Observable> {
    inner: Rc<Inner<T>>,
}

impl<T: Observable> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Observable + std::fmt::Debug> std::fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("id", &self.inner.id)
            .field("state", &self.inner.state.borrow())
            .finish()
    }
}

impl<T: Observable> Subject<T> {
    /// Wrap `state` as an observed instance.
    ///
    /// Builds (or reuses) the class's property table and issues the
    /// instance identity.
    #[must_use]
    pub fn new(state: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                id: next_id(),
                class: class::class_of::<T>(),
                state: RefCell::new(state),
            }),
        }
    }

    /// Stable identity token for this instance.
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// The class's property table.
    #[must_use]
    pub fn class(&self) -> &Properties<T> {
        &self.inner.class
    }

    pub(crate) fn descriptor(&self, property: &str) -> Result<&Descriptor<T>, PropertyError> {
        self.inner
            .class
            .get(property)
            .ok_or_else(|| PropertyError::NotObservable {
                class: type_name::<T>(),
                property: property.to_string(),
            })
    }

    /// Read `property` through its getter.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotObservable`] for an undeclared property name.
    pub fn get(&self, property: &str) -> Result<Value, PropertyError> {
        let descriptor = self.descriptor(property)?;
        Ok(descriptor.read(&self.inner.state.borrow()))
    }

    /// Access the state directly by shared reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.state.borrow())
    }

    /// Write `property`, notifying observers in both phases.
    ///
    /// Order of operations: reentrancy check, before-phase dispatch
    /// (reads still see the old value), setter, after-phase dispatch with
    /// the freshly read value. A before-phase observer failure aborts the
    /// write before mutation.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotObservable`] for an undeclared property,
    /// [`PropertyError::ReadOnly`] for a setterless one,
    /// [`PropertyError::TypeMismatch`] if `value`'s type does not match,
    /// [`PropertyError::ReentrantWrite`] if the property is under
    /// dispatch, and [`PropertyError::Observer`] if an observer fails.
    pub fn set<V: 'static>(&self, property: &str, value: V) -> Result<(), PropertyError> {
        self.set_value(property, Value::new(value))
    }

    /// [`set`](Self::set) with an already-erased value.
    ///
    /// # Errors
    ///
    /// As for [`set`](Self::set).
    pub fn set_value(&self, property: &str, value: Value) -> Result<(), PropertyError> {
        let descriptor = self.descriptor(property)?;
        if !descriptor.has_setter() {
            return Err(PropertyError::ReadOnly {
                class: type_name::<T>(),
                property: property.to_string(),
            });
        }
        let _cycle = CycleGuard::enter(self.id(), type_name::<T>(), property)?;
        dispatch::run(self.id(), self, property, &value, Phase::Before)?;
        descriptor.write(&mut *self.inner.state.borrow_mut(), &value)?;
        let current = descriptor.read(&self.inner.state.borrow());
        dispatch::run(self.id(), self, property, &current, Phase::After)
    }

    /// Invoke the dispatcher directly with a caller-supplied value.
    ///
    /// Intended for the owning code of a subject: this is the only way to
    /// fire a before-phase notification for a property without a setter,
    /// since the caller already knows the prospective value. The
    /// (instance, property) pair is under the reentrancy guard for the
    /// duration.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotObservable`], [`PropertyError::ReentrantWrite`],
    /// or [`PropertyError::Observer`].
    pub fn notify(&self, property: &str, value: &Value, phase: Phase) -> Result<(), PropertyError> {
        self.descriptor(property)?;
        let _cycle = CycleGuard::enter(self.id(), type_name::<T>(), property)?;
        dispatch::run(self.id(), self, property, value, phase)
    }

    /// Scoped update for a computed property.
    ///
    /// Runs `f` over the state, then reads `property` through its getter
    /// and fires exactly one after-phase dispatch with the recomputed
    /// value. Before-phase dispatch is not attempted: the new value is
    /// unknowable before `f` runs. A panic in `f` unwinds before any
    /// dispatch is attempted.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotObservable`], [`PropertyError::ReentrantWrite`],
    /// or [`PropertyError::Observer`].
    pub fn update<R>(
        &self,
        property: &str,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, PropertyError> {
        let descriptor = self.descriptor(property)?;
        let result = f(&mut *self.inner.state.borrow_mut());
        let current = descriptor.read(&self.inner.state.borrow());
        let _cycle = CycleGuard::enter(self.id(), type_name::<T>(), property)?;
        dispatch::run(self.id(), self, property, &current, Phase::After)?;
        Ok(result)
    }

    /// Fallible scoped update.
    ///
    /// An `Err` from `f` is the failure exit: it propagates unchanged and
    /// no dispatch occurs. Runtime failures (undeclared property, observer
    /// error) convert into `E` through `From`.
    ///
    /// # Errors
    ///
    /// Whatever `f` fails with, or a converted [`PropertyError`].
    pub fn try_update<R, E>(
        &self,
        property: &str,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<PropertyError>,
    {
        let descriptor = self.descriptor(property).map_err(E::from)?;
        let result = f(&mut *self.inner.state.borrow_mut())?;
        let current = descriptor.read(&self.inner.state.borrow());
        let _cycle = CycleGuard::enter(self.id(), type_name::<T>(), property).map_err(E::from)?;
        dispatch::run(self.id(), self, property, &current, Phase::After).map_err(E::from)?;
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
