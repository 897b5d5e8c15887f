//! Entitlement ledger
//!
//! Session cards in three kinds behind one lifecycle. Consumption is the
//! invariant-critical path: an optimistic version guard makes exhaustible
//! counters safe under concurrency, and exhaustion is a queryable fact, not
//! an implicit status change.

mod service;


pub use service::CardService;
