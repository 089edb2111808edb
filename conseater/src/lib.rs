//! # Conseater
//!
//! Queue-to-table seating for game rooms at conventions.
//!
//! Parties wait in a queue per table type (mahjong, go, ...). Each table
//! type has a fixed session length and seat count, and its tables are either
//! available for rotation or reserved to start at a fixed time. Every read of
//! a queue projects each waiting party onto a future table round and reports
//! an estimated seating time.
//!
//! ## Architecture
//!
//! - **Estimation**: a pure pass over a consistent snapshot of one table type
//! - **Seating**: request validation, mutations, and the event log
//! - **Storage**: repository traits with PostgreSQL and in-memory backends
//!
//! ## Core Modules
//!
//! - [`queue`]: Queue models and the ETA estimator
//! - [`seating`]: `SeatingManager` and request models
//! - [`db`]: Connection pooling and repositories
//! - [`time_format`]: Timestamp and duration formatting
//!
//! ## Example
//!
//! ```
//! use conseater::time_format::format_duration;
//!
//! assert_eq!(format_duration(3000.0), "50m");
//! ```

/// Storage backends and repository traits.
pub mod db;

/// Activity event log.
pub mod events;

/// Queue models and ETA estimation.
pub mod queue;
pub use queue::{
    Eta, QueueError, QueueResult, QueueSnapshot, QueueTypeResult, Remaining, Table, TableType,
    estimate,
};

/// Seating operations.
pub mod seating;
pub use seating::SeatingManager;

pub mod time_format;
