#![forbid(unsafe_code)]

//! Core runtime for observable object properties.
//!
//! # Role in propwatch
//! `propwatch-core` is the subscription/notification runtime. A type opts in
//! by declaring a per-class table of named properties once; instances are
//! then held behind a [`Subject`] handle whose writes notify externally
//! registered observers without the observed type knowing about them.
//!
//! # Primary responsibilities
//! - **Class tables**: one immutable [`Properties`] table per class, mapping
//!   property name to its getter/setter pair.
//! - **Subscription registry**: a process-wide side table keyed by
//!   (instance identity, property name, phase) holding ordered observer
//!   lists.
//! - **Dispatch**: synchronous, two-phase (before/after) notification in
//!   subscription order, guarded against reentrant writes.
//! - **Scoped updates**: [`Subject::update`] batches mutation of a computed
//!   property's inputs and fires a single after-phase dispatch on clean
//!   exit.
//!
//! # Execution model
//! Single-threaded and cooperative: all runtime state is thread-local and
//! [`Subject`] is not `Send`, so cross-thread misuse is unrepresentable.
//! Observers run one at a time, in subscription order, to completion.

pub mod class;
pub mod error;
pub mod registry;
pub mod subject;
pub mod value;

mod dispatch;

pub use class::{Descriptor, Observable, Properties};
pub use error::{BoxError, PropertyError};
pub use registry::{Observer, Phase, has_subscriptions, observer_count, subscribe, unsubscribe};
pub use subject::{InstanceId, Subject};
pub use value::Value;
