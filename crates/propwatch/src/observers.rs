#![forbid(unsafe_code)]

//! Observer constructors.
//!
//! An [`Observer`] is an `Rc`'d callable; the `Rc` doubles as its identity
//! for idempotent subscription and for unsubscribing. These helpers build
//! the common shapes without spelling out the `Rc` and the `Result`
//! plumbing at every call site.

use std::future::Future;
use std::rc::Rc;

use futures::executor::block_on;
use propwatch_core::{BoxError, Observable, Observer, Subject, Value};

/// Wrap an infallible callback as an [`Observer`] handle.
///
/// Keep the returned handle (or a clone) around to unsubscribe later.
pub fn observer<T, F>(f: F) -> Observer<T>
where
    T: Observable,
    F: Fn(&Subject<T>, &str, &Value) + 'static,
{
    Rc::new(move |subject, property, value| {
        f(subject, property, value);
        Ok(())
    })
}

/// Wrap a fallible callback as an [`Observer`] handle.
///
/// An `Err` aborts the dispatch cycle and surfaces to the caller of the
/// triggering write or notify.
pub fn try_observer<T, F>(f: F) -> Observer<T>
where
    T: Observable,
    F: Fn(&Subject<T>, &str, &Value) -> Result<(), BoxError> + 'static,
{
    Rc::new(f)
}

/// Adapt an asynchronous callback into an observer.
///
/// The dispatcher runs observers strictly one at a time, so the future is
/// driven to completion inside this observer's dispatch slot, before the
/// next observer in subscription order runs.
pub fn blocking<T, F, Fut>(f: F) -> Observer<T>
where
    T: Observable,
    F: Fn(&Subject<T>, &str, &Value) -> Fut + 'static,
    Fut: Future<Output = Result<(), BoxError>>,
{
    Rc::new(move |subject, property, value| block_on(f(subject, property, value)))
}
