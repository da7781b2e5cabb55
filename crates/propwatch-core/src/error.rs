#![forbid(unsafe_code)]

//! Error types for observable property operations.

use thiserror::Error;

/// Error type observers may fail with. The dispatcher boxes whatever the
/// observer produced and aborts the running cycle.
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// Errors raised by property operations.
///
/// `NotObservable`, `ReadOnly`, and `TypeMismatch` are configuration
/// errors: the named property does not support the attempted operation.
/// `ReentrantWrite` is raised at the write site when an observer attempts
/// to modify the property it is currently being notified about.
/// `Observer` wraps a failure raised by an observer during dispatch.
///
/// All variants surface synchronously to the immediate caller; nothing is
/// retried or swallowed.
#[derive(Debug, Error)]
pub enum PropertyError {
    /// The property does not exist on the class, or exists but was never
    /// declared observable.
    #[error("`{property}` is not an observable property of `{class}`")]
    NotObservable {
        class: &'static str,
        property: String,
    },

    /// Write attempted on a property declared without a setter.
    #[error("observable property `{class}.{property}` has no setter")]
    ReadOnly {
        class: &'static str,
        property: String,
    },

    /// The written value's concrete type does not match the property's.
    #[error("`{class}.{property}` expects `{expected}`, got `{actual}`")]
    TypeMismatch {
        class: &'static str,
        property: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A write to a property that is currently under dispatch.
    #[error("reentrant write to `{class}.{property}` from within its own dispatch")]
    ReentrantWrite {
        class: &'static str,
        property: String,
    },

    /// An observer failed; the dispatch cycle was aborted.
    #[error("observer for `{property}` failed")]
    Observer {
        property: String,
        #[source]
        source: BoxError,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
