#![forbid(unsafe_code)]

//! Instance-bound subscription sugar.
//!
//! Pure pass-through to the core registry; carries no invariants of its
//! own. Everything here can be written against the free functions in
//! `propwatch-core` — these methods just read better at call sites that
//! already hold the subject.

use std::rc::Rc;

use propwatch_core::{
    Observable, Observer, Phase, PropertyError, Subject, Value, subscribe, unsubscribe,
};

/// Instance-bound subscription methods for [`Subject`].
pub trait SubjectExt<T: Observable> {
    /// Subscribe an after-phase observer to `property`.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotObservable`] for an undeclared property.
    fn subscribe(&self, property: &str, observer: Observer<T>) -> Result<(), PropertyError>;

    /// Subscribe an observer for an explicit phase.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotObservable`] for an undeclared property.
    fn subscribe_phase(
        &self,
        property: &str,
        phase: Phase,
        observer: Observer<T>,
    ) -> Result<(), PropertyError>;

    /// Remove an observer from `property`, whichever phase(s) it watches.
    /// An empty `property` removes it from every property of the
    /// instance.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotObservable`] for an undeclared (non-empty)
    /// property name.
    fn unsubscribe(&self, property: &str, observer: &Observer<T>)
    -> Result<bool, PropertyError>;

    /// Register a value-only callback as an after-phase observer in one
    /// expression.
    ///
    /// Returns the observer handle so the caller can unsubscribe it
    /// later.
    ///
    /// # Errors
    ///
    /// [`PropertyError::NotObservable`] for an undeclared property.
    fn observe(
        &self,
        property: &str,
        f: impl Fn(&Value) + 'static,
    ) -> Result<Observer<T>, PropertyError>;
}

impl<T: Observable> SubjectExt<T> for Subject<T> {
    fn subscribe(&self, property: &str, observer: Observer<T>) -> Result<(), PropertyError> {
        subscribe(observer, self, property, Phase::After)
    }

    fn subscribe_phase(
        &self,
        property: &str,
        phase: Phase,
        observer: Observer<T>,
    ) -> Result<(), PropertyError> {
        subscribe(observer, self, property, phase)
    }

    fn unsubscribe(
        &self,
        property: &str,
        observer: &Observer<T>,
    ) -> Result<bool, PropertyError> {
        unsubscribe(observer, self, property)
    }

    fn observe(
        &self,
        property: &str,
        f: impl Fn(&Value) + 'static,
    ) -> Result<Observer<T>, PropertyError> {
        let observer: Observer<T> = Rc::new(move |_, _, value| {
            f(value);
            Ok(())
        });
        subscribe(observer.clone(), self, property, Phase::After)?;
        Ok(observer)
    }
}
