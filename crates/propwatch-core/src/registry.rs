#![forbid(unsafe_code)]

//! Process-wide subscription registry.
//!
//! The registry is a side table owned by this module: it maps
//! (instance identity, property name, phase) to the ordered list of
//! observers for that key. It stores instance *identities*, never the
//! instances themselves, so bookkeeping cannot keep an instance alive.
//! Observer callables, by contrast, are held strongly until explicitly
//! unsubscribed or purged with their instance.
//!
//! # Invariants
//!
//! 1. A key's list holds no duplicate observers; re-subscription is a
//!    no-op.
//! 2. Insertion order within a key is preserved and defines dispatch
//!    order.
//! 3. Subscribing to a name absent from the class table fails; nothing is
//!    inserted.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::class::Observable;
use crate::error::{BoxError, PropertyError};
use crate::subject::{InstanceId, Subject};
use crate::value::Value;

/// Dispatch phase an observer registers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Runs before the mutation; reading the property still yields the
    /// old value.
    Before,
    /// Runs after the mutation; reading the property yields the new
    /// value.
    After,
}

/// Observer callback.
///
/// Receives the subject, the property name, and the value the
/// notification is about: the prospective value for [`Phase::Before`],
/// the current value for [`Phase::After`].
///
/// The `Rc` is the observer's identity, mirroring callable identity in
/// registries of this kind: re-subscribing a clone of the same `Rc` under
/// the same key is a no-op, and [`unsubscribe`] matches by it.
pub type Observer<T> = Rc<dyn Fn(&Subject<T>, &str, &Value) -> Result<(), BoxError>>;

/// Observer as stored in the registry, erased over the subject type.
type ErasedObserver = Rc<dyn Fn(&dyn Any, &str, &Value) -> Result<(), BoxError>>;

/// Pointer-identity token for an observer callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ObserverToken(*const ());

impl ObserverToken {
    fn of<T: Observable>(observer: &Observer<T>) -> Self {
        Self(Rc::as_ptr(observer) as *const ())
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct SubscriptionKey {
    instance: InstanceId,
    property: String,
    phase: Phase,
}

#[derive(Clone)]
pub(crate) struct Entry {
    token: ObserverToken,
    call: ErasedObserver,
}

impl Entry {
    pub(crate) fn invoke(
        &self,
        subject: &dyn Any,
        property: &str,
        value: &Value,
    ) -> Result<(), BoxError> {
        (self.call)(subject, property, value)
    }
}

thread_local! {
    static TABLE: RefCell<HashMap<SubscriptionKey, Vec<Entry>>> = RefCell::new(HashMap::new());
}

/// Subscribe `observer` to changes of `property` on `subject`.
///
/// The observer is appended to the end of the ordered list for the
/// (instance, property, phase) key. Subscribing the same observer under
/// the same key again is a no-op.
///
/// # Errors
///
/// [`PropertyError::NotObservable`] if `property` is not declared on the
/// subject's class.
pub fn subscribe<T: Observable>(
    observer: Observer<T>,
    subject: &Subject<T>,
    property: &str,
    phase: Phase,
) -> Result<(), PropertyError> {
    subject.descriptor(property)?;
    let token = ObserverToken::of(&observer);
    let call: ErasedObserver = Rc::new(move |subject, name, value| {
        let subject = subject
            .downcast_ref::<Subject<T>>()
            .expect("dispatch passes the subject registered under this key");
        observer(subject, name, value)
    });
    TABLE.with(|table| {
        let mut table = table.borrow_mut();
        let key = SubscriptionKey {
            instance: subject.id(),
            property: property.to_string(),
            phase,
        };
        let entries = table.entry(key).or_default();
        if entries.iter().any(|e| e.token == token) {
            return;
        }
        tracing::trace!(property, ?phase, "observer subscribed");
        entries.push(Entry { token, call });
    });
    Ok(())
}

/// Remove `observer` from `property` on `subject`, whichever phase(s) it
/// is registered under. An empty `property` is the wildcard: the observer
/// is removed from every observable property of the instance.
///
/// Returns `Ok(true)` if at least one entry was removed, `Ok(false)` if
/// the observer was not subscribed. Benign absence is not an error.
///
/// # Errors
///
/// [`PropertyError::NotObservable`] if a non-empty `property` is not
/// declared on the subject's class.
pub fn unsubscribe<T: Observable>(
    observer: &Observer<T>,
    subject: &Subject<T>,
    property: &str,
) -> Result<bool, PropertyError> {
    if !property.is_empty() {
        subject.descriptor(property)?;
    }
    let token = ObserverToken::of(observer);
    let instance = subject.id();
    let removed = TABLE.with(|table| {
        let mut table = table.borrow_mut();
        let mut removed = false;
        table.retain(|key, entries| {
            if key.instance == instance && (property.is_empty() || key.property == property) {
                let before = entries.len();
                entries.retain(|e| e.token != token);
                removed |= entries.len() != before;
            }
            !entries.is_empty()
        });
        removed
    });
    if removed {
        tracing::trace!(property, "observer unsubscribed");
    }
    Ok(removed)
}

/// Number of observers currently registered for one key.
#[must_use]
pub fn observer_count<T: Observable>(subject: &Subject<T>, property: &str, phase: Phase) -> usize {
    TABLE.with(|table| {
        table
            .borrow()
            .get(&SubscriptionKey {
                instance: subject.id(),
                property: property.to_string(),
                phase,
            })
            .map_or(0, Vec::len)
    })
}

/// Whether any subscription exists for `instance`, in any property or
/// phase.
#[must_use]
pub fn has_subscriptions(instance: InstanceId) -> bool {
    TABLE.with(|table| table.borrow().keys().any(|key| key.instance == instance))
}

/// Drop every subscription for `instance`.
///
/// Called when the last handle to an instance goes away; subscriber
/// storage must not outlive its subject.
pub(crate) fn purge(instance: InstanceId) {
    TABLE.with(|table| {
        let mut table = table.borrow_mut();
        let before = table.len();
        table.retain(|key, _| key.instance != instance);
        if table.len() != before {
            tracing::trace!(?instance, "purged subscriptions for dropped instance");
        }
    });
}

/// Snapshot the ordered observer list for one key.
///
/// Dispatch works off the snapshot, so registry mutations from within a
/// running observer affect the next cycle, never the one in flight.
pub(crate) fn snapshot(instance: InstanceId, property: &str, phase: Phase) -> Vec<Entry> {
    TABLE.with(|table| {
        table
            .borrow()
            .get(&SubscriptionKey {
                instance,
                property: property.to_string(),
                phase,
            })
            .cloned()
            .unwrap_or_default()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{Observable, Properties};

    struct Probe {
        value: i64,
        label: String,
    }

    impl Observable for Probe {
        fn properties() -> Properties<Self> {
            Properties::new()
                .read_write("value", |p: &Probe| p.value, |p, v| p.value = v)
                .read_write(
                    "label",
                    |p: &Probe| p.label.clone(),
                    |p, v: String| p.label = v,
                )
        }
    }

    fn probe() -> Subject<Probe> {
        Subject::new(Probe {
            value: 0,
            label: String::new(),
        })
    }

    fn noop() -> Observer<Probe> {
        Rc::new(|_, _, _| Ok(()))
    }

    #[test]
    fn subscribe_is_idempotent_per_key() {
        let subject = probe();
        let observer = noop();
        subscribe(observer.clone(), &subject, "value", Phase::After).unwrap();
        subscribe(observer.clone(), &subject, "value", Phase::After).unwrap();
        assert_eq!(observer_count(&subject, "value", Phase::After), 1);
    }

    #[test]
    fn same_observer_may_watch_both_phases() {
        let subject = probe();
        let observer = noop();
        subscribe(observer.clone(), &subject, "value", Phase::Before).unwrap();
        subscribe(observer.clone(), &subject, "value", Phase::After).unwrap();
        assert_eq!(observer_count(&subject, "value", Phase::Before), 1);
        assert_eq!(observer_count(&subject, "value", Phase::After), 1);
    }

    #[test]
    fn subscribe_rejects_undeclared_property() {
        let subject = probe();
        let err = subscribe(noop(), &subject, "missing", Phase::After).unwrap_err();
        assert!(matches!(err, PropertyError::NotObservable { .. }));
        assert_eq!(observer_count(&subject, "missing", Phase::After), 0);
    }

    #[test]
    fn unsubscribe_removes_from_both_phases() {
        let subject = probe();
        let observer = noop();
        subscribe(observer.clone(), &subject, "value", Phase::Before).unwrap();
        subscribe(observer.clone(), &subject, "value", Phase::After).unwrap();
        assert!(unsubscribe(&observer, &subject, "value").unwrap());
        assert_eq!(observer_count(&subject, "value", Phase::Before), 0);
        assert_eq!(observer_count(&subject, "value", Phase::After), 0);
    }

    #[test]
    fn unsubscribe_reports_benign_absence() {
        let subject = probe();
        let observer = noop();
        assert!(!unsubscribe(&observer, &subject, "value").unwrap());
        subscribe(observer.clone(), &subject, "value", Phase::After).unwrap();
        assert!(unsubscribe(&observer, &subject, "value").unwrap());
        assert!(!unsubscribe(&observer, &subject, "value").unwrap());
    }

    #[test]
    fn unsubscribe_validates_named_property() {
        let subject = probe();
        let err = unsubscribe(&noop(), &subject, "missing").unwrap_err();
        assert!(matches!(err, PropertyError::NotObservable { .. }));
    }

    #[test]
    fn wildcard_unsubscribe_sweeps_the_instance() {
        let subject = probe();
        let observer = noop();
        subscribe(observer.clone(), &subject, "value", Phase::Before).unwrap();
        subscribe(observer.clone(), &subject, "value", Phase::After).unwrap();
        subscribe(observer.clone(), &subject, "label", Phase::After).unwrap();
        assert!(unsubscribe(&observer, &subject, "").unwrap());
        assert!(!has_subscriptions(subject.id()));
    }

    #[test]
    fn wildcard_leaves_other_instances_alone() {
        let first = probe();
        let second = probe();
        let observer = noop();
        subscribe(observer.clone(), &first, "value", Phase::After).unwrap();
        subscribe(observer.clone(), &second, "value", Phase::After).unwrap();
        assert!(unsubscribe(&observer, &first, "").unwrap());
        assert_eq!(observer_count(&second, "value", Phase::After), 1);
    }

    #[test]
    fn distinct_observers_keep_insertion_order() {
        let subject = probe();
        let a = noop();
        let b = noop();
        let c = noop();
        subscribe(a, &subject, "value", Phase::After).unwrap();
        subscribe(b, &subject, "value", Phase::After).unwrap();
        subscribe(c, &subject, "value", Phase::After).unwrap();
        assert_eq!(observer_count(&subject, "value", Phase::After), 3);
        let entries = snapshot(subject.id(), "value", Phase::After);
        assert_eq!(entries.len(), 3);
    }
}
