//! Periodic housekeeping.
//!
//! Removes people who are neither queued nor seated and refreshes the
//! queue-length gauges. A failed pass is logged and retried on the next tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use conseater::queue::QueueResult;
use conseater::seating::SeatingManager;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

use crate::{logging, metrics};

/// Run one maintenance pass, returning how many orphans were removed.
pub async fn run_once(manager: &SeatingManager) -> QueueResult<u64> {
    let start = Instant::now();
    let removed = manager.cleanup_orphans().await?;
    logging::log_database_operation("delete_orphans", removed, start.elapsed().as_millis() as u64);
    metrics::orphans_removed_total(removed);

    for (table_type, waiting) in manager.queue_lengths().await? {
        metrics::queue_length(&table_type, waiting);
    }

    Ok(removed)
}

/// Run maintenance every `period` until `shutdown` flips to true.
pub async fn run(manager: Arc<SeatingManager>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    tracing::info!(period_secs = period.as_secs(), "Maintenance task starting");

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_once(&manager).await {
                    metrics::maintenance_failures_total();
                    tracing::error!(error = %e, "Maintenance pass failed");
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("Maintenance task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use conseater::db::MemoryRepository;
    use conseater::queue::TableType;
    use conseater::seating::EnqueueRequest;

    async fn manager_with_orphans() -> Arc<SeatingManager> {
        let manager = Arc::new(SeatingManager::new(Arc::new(MemoryRepository::new())));
        manager
            .add_table_type(TableType::new("mahjong", 60, 4))
            .await
            .unwrap();
        let table = manager.add_table("mahjong", None).await.unwrap();
        let added = manager
            .enqueue(EnqueueRequest {
                name: "Alice".to_string(),
                phone: None,
                table_type: "mahjong".to_string(),
                num_players: 3,
            })
            .await
            .unwrap();
        for person in &added[..2] {
            manager.seat_at_table(person.id, table).await.unwrap();
        }
        manager.clear_table(table).await.unwrap();
        manager
    }

    #[tokio::test]
    async fn test_run_once_removes_orphans() {
        let manager = manager_with_orphans().await;
        assert_eq!(run_once(&manager).await.unwrap(), 2);
        assert_eq!(run_once(&manager).await.unwrap(), 0);
        assert_eq!(
            manager.queue_lengths().await.unwrap(),
            vec![("mahjong".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let manager = manager_with_orphans().await;
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(run(manager.clone(), Duration::from_millis(10), rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        // First tick fires immediately, so cleanup already happened
        assert_eq!(manager.cleanup_orphans().await.unwrap(), 0);
    }
}
