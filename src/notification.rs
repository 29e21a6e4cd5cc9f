//! Outage matching and notification idempotency engine.
//!
//! One poll tick runs [`cycle::NotificationCycle::run_once`], which for every
//! subscriber finds the relevant outage ([`matcher`]), skips it if it was
//! already communicated ([`idempotency`]), renders it ([`formatter`]) and hands
//! it to the [`delivery`] coordinator.

pub mod cycle;
pub mod delivery;
pub mod error;
pub mod formatter;
pub mod idempotency;
pub mod matcher;

pub use cycle::CancellationFlag;
pub use cycle::CycleOptions;
pub use cycle::CycleOptionsBuilder;
pub use cycle::CycleReport;
pub use cycle::NotificationCycle;
pub use delivery::DeliveryCoordinator;
pub use delivery::DeliveryOutcome;
pub use matcher::Matcher;
pub use matcher::TieBreak;
