//! Background tasks driving the notification cycle.

pub mod notifier_task;
pub mod quiet_hours;
