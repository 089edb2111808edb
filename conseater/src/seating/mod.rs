//! Seating module: queue and table operations on top of storage.
//!
//! [`SeatingManager`] validates requests, applies them through a
//! [`SeatingRepository`](crate::db::SeatingRepository), records an event for
//! every mutation, and answers queue reads with fresh ETA estimates.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use conseater::db::MemoryRepository;
//! use conseater::queue::TableType;
//! use conseater::seating::{EnqueueRequest, SeatingManager};
//!
//! # #[tokio::main]
//! # async fn main() -> conseater::queue::QueueResult<()> {
//! let manager = SeatingManager::new(Arc::new(MemoryRepository::new()));
//! manager.add_table_type(TableType::new("mahjong", 60, 4)).await?;
//!
//! let added = manager
//!     .enqueue(EnqueueRequest {
//!         name: "Alice".to_string(),
//!         phone: None,
//!         table_type: "mahjong".to_string(),
//!         num_players: 2,
//!     })
//!     .await?;
//! assert_eq!(added[1].name, "Alice (1)");
//!
//! let queue = manager.queue_for_type("mahjong").await?;
//! assert_eq!(queue.queue.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod models;

pub use manager::SeatingManager;
pub use models::{
    DEFAULT_MAX_GROUP_SIZE, EnqueueRequest, PartyMember, Person, QueuedPerson, TableSummary,
};
