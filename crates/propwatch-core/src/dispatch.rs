#![forbid(unsafe_code)]

//! Notification dispatcher and reentrancy guard.
//!
//! A dispatch cycle runs every observer registered for one
//! (instance, property, phase) key synchronously, one at a time, in
//! subscription order. While a (instance, property) pair is under
//! dispatch, any attempt to start another cycle on that pair — most
//! importantly a write from one of its own observers — fails with
//! [`PropertyError::ReentrantWrite`]. The pair is released when the full
//! cycle completes, whether normally or through an observer failure.
//!
//! # Failure Modes
//!
//! - **Observer error**: the first `Err` aborts the remaining observers in
//!   the cycle and surfaces as [`PropertyError::Observer`] to the caller
//!   of the triggering write or notify. For a before-phase failure the
//!   write is abandoned before mutation.
//! - **Observer panic**: unwinds through the dispatcher; the RAII cycle
//!   guard still releases the pair.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;

use crate::error::PropertyError;
use crate::registry::{self, Phase};
use crate::subject::InstanceId;
use crate::value::Value;

thread_local! {
    /// (instance, property) pairs currently under active dispatch.
    static ACTIVE: RefCell<HashSet<(InstanceId, String)>> = RefCell::new(HashSet::new());
}

/// RAII marker for one notification cycle.
///
/// Dropping releases the pair, also on unwind or early return through `?`.
pub(crate) struct CycleGuard {
    instance: InstanceId,
    property: String,
}

impl CycleGuard {
    /// Mark (instance, property) active for a cycle.
    ///
    /// # Errors
    ///
    /// [`PropertyError::ReentrantWrite`] if the pair is already under
    /// dispatch on this call stack.
    pub(crate) fn enter(
        instance: InstanceId,
        class: &'static str,
        property: &str,
    ) -> Result<Self, PropertyError> {
        let entered =
            ACTIVE.with(|active| active.borrow_mut().insert((instance, property.to_string())));
        if !entered {
            return Err(PropertyError::ReentrantWrite {
                class,
                property: property.to_string(),
            });
        }
        Ok(Self {
            instance,
            property: property.to_string(),
        })
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            active
                .borrow_mut()
                .remove(&(self.instance, std::mem::take(&mut self.property)));
        });
    }
}

/// Run one phase of a cycle: invoke the current snapshot of observers in
/// subscription order, passing each (subject, property, value).
///
/// # Errors
///
/// [`PropertyError::Observer`] wrapping the first observer failure; the
/// remaining observers in the cycle do not run.
pub(crate) fn run(
    instance: InstanceId,
    subject: &dyn Any,
    property: &str,
    value: &Value,
    phase: Phase,
) -> Result<(), PropertyError> {
    let entries = registry::snapshot(instance, property, phase);
    if entries.is_empty() {
        return Ok(());
    }
    tracing::trace!(property, ?phase, observers = entries.len(), "dispatching");
    for entry in &entries {
        entry
            .invoke(subject, property, value)
            .map_err(|source| PropertyError::Observer {
                property: property.to_string(),
                source,
            })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
