#![forbid(unsafe_code)]

//! Observable object properties: public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users: the
//! core runtime re-exported, instance-bound subscription methods, and
//! observer constructors.
//!
//! ```
//! use propwatch::prelude::*;
//!
//! struct Ticket {
//!     price: u64,
//! }
//!
//! impl Observable for Ticket {
//!     fn properties() -> Properties<Self> {
//!         Properties::new().read_write("price", |t: &Ticket| t.price, |t, v| t.price = v)
//!     }
//! }
//!
//! # fn main() -> Result<(), PropertyError> {
//! let ticket = Subject::new(Ticket { price: 1000 });
//! let logger = observer(|_: &Subject<Ticket>, name: &str, value: &Value| {
//!     println!("{name} is now {:?}", value.downcast_ref::<u64>());
//! });
//! ticket.subscribe("price", logger.clone())?;
//! ticket.set("price", 2000u64)?;
//! assert!(ticket.unsubscribe("price", &logger)?);
//! # Ok(())
//! # }
//! ```

pub mod facade;
pub mod observers;

pub use facade::SubjectExt;
pub use observers::{blocking, observer, try_observer};
pub use propwatch_core::{
    BoxError, Descriptor, InstanceId, Observable, Observer, Phase, Properties, PropertyError,
    Subject, Value, has_subscriptions, observer_count, subscribe, unsubscribe,
};

pub mod prelude {
    //! One-stop imports for the common case.
    pub use crate::facade::SubjectExt;
    pub use crate::observers::{blocking, observer, try_observer};
    pub use propwatch_core::{
        Observable, Observer, Phase, Properties, PropertyError, Subject, Value, subscribe,
        unsubscribe,
    };
}
