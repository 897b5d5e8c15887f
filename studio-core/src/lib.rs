//! Studio booking core
//!
//! Conflict-free scheduling over a shared SQLite store: the time-conflict
//! checker, the booking and class-session state machines, and the
//! entitlement (session card) ledger. Invoked as in-process calls from a
//! request layer that has already authenticated the caller and resolved a
//! [`shared::ScopeFilter`]; returns entity snapshots, paginated lists or
//! typed [`shared::AppError`] failures.

pub mod bookings;
pub mod cards;
pub mod config;
pub mod conflict;
pub mod db;
pub mod logger;
pub mod schedules;
pub mod stats;

#[cfg(test)]
mod test_support;

pub use bookings::BookingService;
pub use cards::CardService;
pub use config::{CancellationPolicy, Config};
pub use db::Db;
pub use schedules::ScheduleService;
