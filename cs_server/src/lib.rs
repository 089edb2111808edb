//! HTTP server for convention table queues.
//!
//! Serves queue ETAs to kiosk screens and staff tools, backed by the
//! `conseater` library.

pub mod api;
pub mod config;
pub mod logging;
pub mod maintenance;
pub mod metrics;
