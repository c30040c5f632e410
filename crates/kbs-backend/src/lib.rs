//! Backend runtime entry point and public API surface.
//!
//! This crate owns the notification center (store, permission manager and
//! change summarizer), follows the change feeds of the hosted database,
//! routes bridge messages to services and manages shared state used by
//! asynchronous tasks.

mod app;
pub mod bridge_platform;
pub mod center;
pub mod config;
pub mod feeds;
pub mod ledger;
pub mod permission;
pub mod platform;
mod runtime;
mod services;
mod state;
pub mod storage;
pub mod store;
pub mod summarizer;

pub use crate::runtime::run;
