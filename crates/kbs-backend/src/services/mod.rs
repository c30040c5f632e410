//! Backend service handlers for frontend-driven requests.
//!
//! This module groups async request handlers that operate on the shared
//! `AppContext`, perform side effects (network, local storage), and emit
//! updates or inline notifications back to the frontend.

pub mod change_feed_service;
pub mod config_service;
pub mod entries_service;
pub mod keep_alive_service;
pub mod notification_service;
pub mod permission_service;

/// Represents a type that is used in all handlers as an application context.
pub(crate) type AppContextHandle = std::sync::Arc<crate::app::AppContext>;
