//! Queue module: waiting parties, tables, and seating ETA estimation.
//!
//! This module implements:
//! - Table types, queue entries, and tables as read from storage
//! - `QueueSnapshot`: a consistent, pre-ordered read of one table type
//! - `estimate`: a pure pass projecting every entry onto a table round
//!
//! ## Example
//!
//! ```
//! use conseater::queue::{QueueEntry, QueueSnapshot, Table, TableType};
//! use conseater::time_format::parse_timestamp;
//!
//! let snapshot = QueueSnapshot::new(
//!     TableType::new("mahjong", 60, 4),
//!     vec![QueueEntry {
//!         id: 1,
//!         name: "Alice".to_string(),
//!         phone: None,
//!         added_at: parse_timestamp("2024-01-01 10:00:00").unwrap(),
//!     }],
//!     vec![Table {
//!         id: 1,
//!         table_type: "mahjong".to_string(),
//!         playing: true,
//!         started: Some(parse_timestamp("2024-01-01 10:00:00").unwrap()),
//!         scheduled_start: None,
//!     }],
//! );
//!
//! let result = snapshot.estimate(parse_timestamp("2024-01-01 10:10:00").unwrap()).unwrap();
//! assert_eq!(result.queue[0].eta.to_string(), "2024-01-01 11:00:00");
//! assert_eq!(result.queue[0].remaining.to_string(), "50m");
//! ```

pub mod errors;
pub mod estimator;
pub mod models;

pub use errors::{QueueError, QueueResult};
pub use estimator::estimate;
pub use models::{
    AnnotatedEntry, Eta, MAX_DURATION_MINUTES, PersonId, QueueEntry, QueueSnapshot,
    QueueTypeResult, Remaining, Table, TableId, TableType,
};
