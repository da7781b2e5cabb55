//! Watch a ticket price: subscribe a transition logger, change the price,
//! unsubscribe, change it again.
//!
//! Run with `cargo run --example price_watch`.

use propwatch::prelude::*;

struct Ticket {
    price: u64,
}

impl Observable for Ticket {
    fn properties() -> Properties<Self> {
        Properties::new().read_write("price", |t: &Ticket| t.price, |t, v| t.price = v)
    }
}

fn main() -> Result<(), PropertyError> {
    let ticket = Subject::new(Ticket { price: 1000 });

    // Before-phase observers still see the old value on the subject while
    // receiving the prospective one.
    let logger = observer(|subject: &Subject<Ticket>, property: &str, incoming: &Value| {
        let old = subject.with(|t| t.price);
        if let Some(new) = incoming.downcast_ref::<u64>() {
            println!("Ticket.{property} changes from {old} to {new}");
        }
    });
    subscribe(logger.clone(), &ticket, "price", Phase::Before)?;

    ticket.set("price", 2000u64)?;

    ticket.unsubscribe("price", &logger)?;
    ticket.set("price", 500u64)?;

    println!("Final price: {}", ticket.with(|t| t.price));
    Ok(())
}
