//! outage-bot - notifies chat subscribers about power outages on their street.
//!
//! This crate provides:
//! - An outage feed client for the LOE outage API
//! - Subscriber storage adapters (flat-file and in-memory)
//! - A Telegram delivery transport
//! - The matching and idempotent notification cycle, run on an interval

pub mod config;
pub mod entity;
pub mod error;
pub mod feed;
pub mod logging;
pub mod notification;
pub mod repository;
pub mod sender;
pub mod service;
pub mod task;
