//! Seating manager implementation.

use std::sync::Arc;

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde_json::json;

use super::models::{
    DEFAULT_MAX_GROUP_SIZE, EnqueueRequest, PartyMember, QueuedPerson, TableSummary,
};
use crate::db::SeatingRepository;
use crate::events::{EventCount, EventKind};
use crate::queue::{PersonId, QueueError, QueueResult, QueueTypeResult, TableId, TableType};
use crate::time_format::local_now;

/// Seating manager
#[derive(Clone)]
pub struct SeatingManager {
    repository: Arc<dyn SeatingRepository>,
    clock: fn() -> NaiveDateTime,
    max_group_size: usize,
}

impl SeatingManager {
    /// Create a new seating manager reading the local wall clock
    ///
    /// # Arguments
    ///
    /// * `repository` - Storage backend
    pub fn new(repository: Arc<dyn SeatingRepository>) -> Self {
        Self::with_clock(repository, local_now)
    }

    /// Create a seating manager with an explicit clock
    pub fn with_clock(repository: Arc<dyn SeatingRepository>, clock: fn() -> NaiveDateTime) -> Self {
        Self {
            repository,
            clock,
            max_group_size: DEFAULT_MAX_GROUP_SIZE,
        }
    }

    /// Override how many people one enqueue request may add
    pub fn with_max_group_size(mut self, max_group_size: usize) -> Self {
        self.max_group_size = max_group_size.max(1);
        self
    }

    /// Current time as seen by this manager
    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub fn repository(&self) -> &Arc<dyn SeatingRepository> {
        &self.repository
    }

    /// Append to the event log after a committed change.
    ///
    /// The change already happened, so a failed write is only logged.
    async fn record(&self, kind: EventKind, details: serde_json::Value) {
        if let Err(e) = self.repository.log_event(kind, details, self.now()).await {
            warn!("Failed to record {} event: {}", kind, e);
        }
    }

    // === Queue ===

    /// Estimate every table type's queue, ordered by type name
    ///
    /// Types deleted while the list is being built are left out.
    pub async fn queues(&self) -> QueueResult<Vec<QueueTypeResult>> {
        let now = self.now();
        let mut results = Vec::new();
        for table_type in self.repository.list_table_types().await? {
            match self.repository.load_snapshot(&table_type.name).await {
                Ok(snapshot) => results.push(snapshot.estimate(now)?),
                Err(QueueError::TableTypeNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(results)
    }

    /// Estimate one table type's queue
    ///
    /// # Errors
    ///
    /// * `QueueError::TableTypeNotFound` - Unknown table type
    pub async fn queue_for_type(&self, table_type: &str) -> QueueResult<QueueTypeResult> {
        let snapshot = self.repository.load_snapshot(table_type).await?;
        snapshot.estimate(self.now())
    }

    /// Add a party to a table type's queue
    ///
    /// The first member keeps the given name and phone. Further members are
    /// named `"{name} ({i})"` and have no phone. The party is stored in one
    /// step, so a failure queues nobody.
    ///
    /// # Errors
    ///
    /// * `QueueError::InvalidInput` - Empty name or group size out of range
    /// * `QueueError::TableTypeNotFound` - Unknown table type
    pub async fn enqueue(&self, request: EnqueueRequest) -> QueueResult<Vec<QueuedPerson>> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(QueueError::InvalidInput("Please enter a name".to_string()));
        }
        if request.num_players == 0 || request.num_players > self.max_group_size {
            return Err(QueueError::InvalidInput(format!(
                "Number of players must be between 1 and {}",
                self.max_group_size
            )));
        }
        let phone = request
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let members: Vec<PartyMember> = (0..request.num_players)
            .map(|i| {
                if i == 0 {
                    PartyMember {
                        name: name.to_string(),
                        phone: phone.map(str::to_string),
                    }
                } else {
                    PartyMember {
                        name: format!("{name} ({i})"),
                        phone: None,
                    }
                }
            })
            .collect();

        let ids = self
            .repository
            .add_party_to_queue(&members, &request.table_type, self.now())
            .await?;
        let added: Vec<QueuedPerson> = ids
            .into_iter()
            .zip(members)
            .map(|(id, member)| QueuedPerson {
                id,
                name: member.name,
            })
            .collect();

        for person in &added {
            self.record(
                EventKind::PlayerQueueAdd,
                json!({
                    "person": person.id,
                    "name": person.name,
                    "type": request.table_type,
                    "group": request.num_players,
                }),
            )
            .await;
        }

        info!(
            "Queued {} player(s) for {} as '{}'",
            added.len(),
            request.table_type,
            name
        );
        Ok(added)
    }

    /// Move a person into a table type's queue, leaving any other queue or seat
    ///
    /// The person keeps their original arrival time.
    ///
    /// # Errors
    ///
    /// * `QueueError::PersonNotFound` - No such person
    /// * `QueueError::TableTypeNotFound` - Unknown table type
    pub async fn move_to_queue(&self, person: PersonId, table_type: &str) -> QueueResult<()> {
        self.repository.move_to_queue(person, table_type).await?;
        self.record(
            EventKind::PlayerQueueMove,
            json!({ "person": person, "type": table_type }),
        )
        .await;
        debug!("Moved person {} to {} queue", person, table_type);
        Ok(())
    }

    /// Seat a person at a table, leaving any queue or other seat
    pub async fn seat_at_table(&self, person: PersonId, table: TableId) -> QueueResult<()> {
        self.repository.seat_at_table(person, table).await?;
        self.record(
            EventKind::PlayerMoveToTable,
            json!({ "person": person, "table": table }),
        )
        .await;
        debug!("Seated person {} at table {}", person, table);
        Ok(())
    }

    /// Delete a person
    ///
    /// # Errors
    ///
    /// * `QueueError::PersonNotFound` - No such person
    pub async fn delete_person(&self, person: PersonId) -> QueueResult<()> {
        if !self.repository.delete_person(person).await? {
            return Err(QueueError::PersonNotFound(person));
        }
        self.record(EventKind::PlayerDelete, json!({ "person": person })).await;
        Ok(())
    }

    /// Rename a person
    ///
    /// # Errors
    ///
    /// * `QueueError::InvalidInput` - Empty name
    /// * `QueueError::PersonNotFound` - No such person
    pub async fn rename_person(&self, person: PersonId, new_name: &str) -> QueueResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(QueueError::InvalidInput("Please enter a name".to_string()));
        }
        if !self.repository.rename_person(person, new_name).await? {
            return Err(QueueError::PersonNotFound(person));
        }
        self.record(
            EventKind::PlayerRename,
            json!({ "person": person, "name": new_name }),
        )
        .await;
        Ok(())
    }

    /// Delete people who are neither queued nor seated
    pub async fn cleanup_orphans(&self) -> QueueResult<u64> {
        let removed = self.repository.delete_orphans().await?;
        if removed > 0 {
            info!("Removed {} orphaned people", removed);
        }
        Ok(removed)
    }

    /// Queue length per table type
    pub async fn queue_lengths(&self) -> QueueResult<Vec<(String, i64)>> {
        self.repository.queue_lengths().await
    }

    // === Tables ===

    /// All tables with their seated players
    pub async fn list_tables(&self) -> QueueResult<Vec<TableSummary>> {
        let mut summaries = Vec::new();
        for table in self.repository.list_tables().await? {
            let players = self.repository.seated_players(table.id).await?;
            summaries.push(TableSummary { table, players });
        }
        Ok(summaries)
    }

    /// Add an idle table, optionally reserved to start at a fixed time
    ///
    /// # Errors
    ///
    /// * `QueueError::TableTypeNotFound` - Unknown table type
    pub async fn add_table(
        &self,
        table_type: &str,
        scheduled_start: Option<NaiveDateTime>,
    ) -> QueueResult<TableId> {
        let id = self
            .repository
            .create_table(table_type, scheduled_start)
            .await?;
        info!("Added {} table {}", table_type, id);
        Ok(id)
    }

    /// Start a table now
    pub async fn start_table(&self, table: TableId) -> QueueResult<()> {
        if !self.repository.start_table(table, self.now()).await? {
            return Err(QueueError::TableNotFound(table));
        }
        self.record(EventKind::TableStart, json!({ "table": table })).await;
        debug!("Started table {}", table);
        Ok(())
    }

    /// Stop a table and release its seats
    pub async fn clear_table(&self, table: TableId) -> QueueResult<()> {
        if !self.repository.clear_table(table).await? {
            return Err(QueueError::TableNotFound(table));
        }
        self.record(EventKind::TableClear, json!({ "table": table })).await;
        debug!("Cleared table {}", table);
        Ok(())
    }

    /// Delete a table
    pub async fn delete_table(&self, table: TableId) -> QueueResult<()> {
        if !self.repository.delete_table(table).await? {
            return Err(QueueError::TableNotFound(table));
        }
        info!("Deleted table {}", table);
        Ok(())
    }

    // === Table types ===

    pub async fn list_table_types(&self) -> QueueResult<Vec<TableType>> {
        self.repository.list_table_types().await
    }

    /// Add a table type
    ///
    /// # Errors
    ///
    /// * `QueueError::InvalidConfig` - Non-positive seat count, negative
    ///   duration, or empty name
    /// * `QueueError::InvalidInput` - Type already exists
    pub async fn add_table_type(&self, table_type: TableType) -> QueueResult<()> {
        let table_type = TableType {
            name: table_type.name.trim().to_string(),
            ..table_type
        };
        table_type.validate()?;
        self.repository.create_table_type(&table_type).await?;
        info!(
            "Added table type {} ({} min, {} seats)",
            table_type.name, table_type.duration, table_type.player_count
        );
        Ok(())
    }

    /// Delete a table type together with its tables and queue
    pub async fn delete_table_type(&self, name: &str) -> QueueResult<()> {
        if !self.repository.delete_table_type(name).await? {
            return Err(QueueError::TableTypeNotFound(name.to_string()));
        }
        warn!("Deleted table type {} with its tables and queue", name);
        Ok(())
    }

    // === Events ===

    /// Record that the service started
    pub async fn record_start(&self) -> QueueResult<()> {
        self.repository
            .log_event(EventKind::Start, json!({}), self.now())
            .await?;
        Ok(())
    }

    /// Totals per event kind
    pub async fn event_counts(&self) -> QueueResult<Vec<EventCount>> {
        self.repository.event_counts().await
    }

    pub async fn health_check(&self) -> QueueResult<()> {
        self.repository.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        EventRepository, MemoryRepository, QueueRepository, TableRepository, TableTypeRepository,
    };
    use crate::queue::{Eta, QueueSnapshot, Remaining, Table};
    use crate::seating::Person;
    use crate::time_format::parse_timestamp;
    use async_trait::async_trait;

    /// Memory store whose event log is unavailable
    struct BrokenEventLog(MemoryRepository);

    #[async_trait]
    impl TableTypeRepository for BrokenEventLog {
        async fn list_table_types(&self) -> QueueResult<Vec<TableType>> {
            self.0.list_table_types().await
        }
        async fn find_table_type(&self, name: &str) -> QueueResult<Option<TableType>> {
            self.0.find_table_type(name).await
        }
        async fn create_table_type(&self, table_type: &TableType) -> QueueResult<()> {
            self.0.create_table_type(table_type).await
        }
        async fn delete_table_type(&self, name: &str) -> QueueResult<bool> {
            self.0.delete_table_type(name).await
        }
    }

    #[async_trait]
    impl QueueRepository for BrokenEventLog {
        async fn load_snapshot(&self, table_type: &str) -> QueueResult<QueueSnapshot> {
            self.0.load_snapshot(table_type).await
        }
        async fn add_party_to_queue(
            &self,
            members: &[PartyMember],
            table_type: &str,
            added_at: NaiveDateTime,
        ) -> QueueResult<Vec<PersonId>> {
            self.0.add_party_to_queue(members, table_type, added_at).await
        }
        async fn find_person(&self, person: PersonId) -> QueueResult<Option<Person>> {
            self.0.find_person(person).await
        }
        async fn move_to_queue(&self, person: PersonId, table_type: &str) -> QueueResult<()> {
            self.0.move_to_queue(person, table_type).await
        }
        async fn seat_at_table(&self, person: PersonId, table: TableId) -> QueueResult<()> {
            self.0.seat_at_table(person, table).await
        }
        async fn delete_person(&self, person: PersonId) -> QueueResult<bool> {
            self.0.delete_person(person).await
        }
        async fn rename_person(&self, person: PersonId, name: &str) -> QueueResult<bool> {
            self.0.rename_person(person, name).await
        }
        async fn delete_orphans(&self) -> QueueResult<u64> {
            self.0.delete_orphans().await
        }
        async fn queue_lengths(&self) -> QueueResult<Vec<(String, i64)>> {
            self.0.queue_lengths().await
        }
    }

    #[async_trait]
    impl TableRepository for BrokenEventLog {
        async fn list_tables(&self) -> QueueResult<Vec<Table>> {
            self.0.list_tables().await
        }
        async fn create_table(
            &self,
            table_type: &str,
            scheduled_start: Option<NaiveDateTime>,
        ) -> QueueResult<TableId> {
            self.0.create_table(table_type, scheduled_start).await
        }
        async fn start_table(&self, table: TableId, started: NaiveDateTime) -> QueueResult<bool> {
            self.0.start_table(table, started).await
        }
        async fn clear_table(&self, table: TableId) -> QueueResult<bool> {
            self.0.clear_table(table).await
        }
        async fn delete_table(&self, table: TableId) -> QueueResult<bool> {
            self.0.delete_table(table).await
        }
        async fn seated_players(&self, table: TableId) -> QueueResult<Vec<Person>> {
            self.0.seated_players(table).await
        }
    }

    #[async_trait]
    impl EventRepository for BrokenEventLog {
        async fn log_event(
            &self,
            _kind: EventKind,
            _details: serde_json::Value,
            _time: NaiveDateTime,
        ) -> QueueResult<i64> {
            Err(QueueError::Timeout(std::time::Duration::from_secs(5)))
        }
        async fn event_counts(&self) -> QueueResult<Vec<EventCount>> {
            self.0.event_counts().await
        }
    }

    #[async_trait]
    impl SeatingRepository for BrokenEventLog {
        async fn health_check(&self) -> QueueResult<()> {
            Ok(())
        }
    }

    fn fixed_clock() -> NaiveDateTime {
        parse_timestamp("2024-01-01 10:00:00").unwrap()
    }

    async fn manager_with_mahjong() -> SeatingManager {
        let manager =
            SeatingManager::with_clock(Arc::new(MemoryRepository::new()), fixed_clock);
        manager
            .add_table_type(TableType::new("mahjong", 60, 4))
            .await
            .unwrap();
        manager
    }

    fn request(name: &str, num_players: usize) -> EnqueueRequest {
        EnqueueRequest {
            name: name.to_string(),
            phone: Some("555-0100".to_string()),
            table_type: "mahjong".to_string(),
            num_players,
        }
    }

    #[tokio::test]
    async fn test_enqueue_group_names_and_phone() {
        let manager = manager_with_mahjong().await;
        let added = manager.enqueue(request("Alice", 3)).await.unwrap();

        let names: Vec<_> = added.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Alice (1)", "Alice (2)"]);

        let first = manager.repository().find_person(added[0].id).await.unwrap().unwrap();
        let second = manager.repository().find_person(added[1].id).await.unwrap().unwrap();
        assert_eq!(first.phone.as_deref(), Some("555-0100"));
        assert_eq!(second.phone, None);
        assert_eq!(first.added_at, fixed_clock());
    }

    #[tokio::test]
    async fn test_enqueue_rejects_bad_requests() {
        let manager = manager_with_mahjong().await.with_max_group_size(4);

        let err = manager.enqueue(request("  ", 1)).await.unwrap_err();
        assert_eq!(err.client_message(), "Please enter a name");

        assert!(matches!(
            manager.enqueue(request("Bob", 0)).await,
            Err(QueueError::InvalidInput(_))
        ));
        assert!(matches!(
            manager.enqueue(request("Bob", 5)).await,
            Err(QueueError::InvalidInput(_))
        ));

        let mut unknown = request("Bob", 1);
        unknown.table_type = "go".to_string();
        assert!(matches!(
            manager.enqueue(unknown).await,
            Err(QueueError::TableTypeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_phone_is_none() {
        let manager = manager_with_mahjong().await;
        let mut req = request("Carol", 1);
        req.phone = Some(String::new());
        let added = manager.enqueue(req).await.unwrap();

        let result = manager.queue_for_type("mahjong").await.unwrap();
        assert_eq!(result.queue[0].id, added[0].id);
        assert!(!result.queue[0].has_phone);
    }

    #[tokio::test]
    async fn test_queue_estimates_follow_table_state() {
        let manager = manager_with_mahjong().await;
        manager.enqueue(request("Alice", 1)).await.unwrap();

        let result = manager.queue_for_type("mahjong").await.unwrap();
        assert_eq!(result.queue[0].eta, Eta::Never);
        assert_eq!(result.queue[0].remaining, Remaining::Never);

        let table = manager.add_table("mahjong", None).await.unwrap();
        manager.start_table(table).await.unwrap();

        let result = manager.queue_for_type("mahjong").await.unwrap();
        assert_eq!(result.queue[0].eta.to_string(), "2024-01-01 11:00:00");
        assert_eq!(result.queue[0].remaining.to_string(), "1h");
    }

    #[tokio::test]
    async fn test_queues_cover_every_type() {
        let manager = manager_with_mahjong().await;
        manager
            .add_table_type(TableType::new("go", 90, 2))
            .await
            .unwrap();

        let results = manager.queues().await.unwrap();
        let names: Vec<_> = results.iter().map(|r| r.table_type.as_str()).collect();
        assert_eq!(names, ["go", "mahjong"]);
    }

    #[tokio::test]
    async fn test_moves_are_logged() {
        let manager = manager_with_mahjong().await;
        let added = manager.enqueue(request("Alice", 1)).await.unwrap();
        let table = manager.add_table("mahjong", None).await.unwrap();

        manager.seat_at_table(added[0].id, table).await.unwrap();
        manager.move_to_queue(added[0].id, "mahjong").await.unwrap();
        manager.rename_person(added[0].id, "Alicia").await.unwrap();
        manager.start_table(table).await.unwrap();
        manager.clear_table(table).await.unwrap();
        manager.delete_person(added[0].id).await.unwrap();

        let counts = manager.event_counts().await.unwrap();
        for count in counts {
            let expected = match count.kind {
                EventKind::Start => 0,
                _ => 1,
            };
            assert_eq!(count.count, expected, "{}", count.kind);
        }
    }

    #[tokio::test]
    async fn test_missing_targets_are_not_found() {
        let manager = manager_with_mahjong().await;

        assert!(matches!(
            manager.delete_person(42).await,
            Err(QueueError::PersonNotFound(42))
        ));
        assert!(matches!(
            manager.rename_person(42, "Zed").await,
            Err(QueueError::PersonNotFound(42))
        ));
        assert!(matches!(
            manager.start_table(7).await,
            Err(QueueError::TableNotFound(7))
        ));
        assert!(matches!(
            manager.clear_table(7).await,
            Err(QueueError::TableNotFound(7))
        ));
        assert!(matches!(
            manager.delete_table(7).await,
            Err(QueueError::TableNotFound(7))
        ));
        assert!(matches!(
            manager.delete_table_type("go").await,
            Err(QueueError::TableTypeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_table_type_validates() {
        let manager = manager_with_mahjong().await;
        assert!(matches!(
            manager.add_table_type(TableType::new("go", 60, 0)).await,
            Err(QueueError::InvalidConfig { .. })
        ));
        assert!(matches!(
            manager.add_table_type(TableType::new("go", -1, 2)).await,
            Err(QueueError::InvalidConfig { .. })
        ));
        assert!(matches!(
            manager.add_table_type(TableType::new("mahjong", 30, 4)).await,
            Err(QueueError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_list_tables_includes_players() {
        let manager = manager_with_mahjong().await;
        let added = manager.enqueue(request("Alice", 2)).await.unwrap();
        let table = manager.add_table("mahjong", None).await.unwrap();
        for person in &added {
            manager.seat_at_table(person.id, table).await.unwrap();
        }

        let tables = manager.list_tables().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].players.len(), 2);

        manager.clear_table(table).await.unwrap();
        assert!(manager.list_tables().await.unwrap()[0].players.is_empty());
        assert_eq!(manager.cleanup_orphans().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unknown_table_type_targets_are_not_found() {
        let manager = manager_with_mahjong().await;
        let added = manager.enqueue(request("Alice", 1)).await.unwrap();

        assert!(matches!(
            manager.move_to_queue(added[0].id, "go").await,
            Err(QueueError::TableTypeNotFound(ref name)) if name == "go"
        ));
        assert!(matches!(
            manager.add_table("go", None).await,
            Err(QueueError::TableTypeNotFound(ref name)) if name == "go"
        ));
        assert_eq!(manager.queue_for_type("mahjong").await.unwrap().queue.len(), 1);
    }

    #[tokio::test]
    async fn test_event_log_failure_does_not_fail_committed_changes() {
        let repository = BrokenEventLog(MemoryRepository::new());
        let manager = SeatingManager::with_clock(Arc::new(repository), fixed_clock);
        manager
            .add_table_type(TableType::new("mahjong", 60, 4))
            .await
            .unwrap();

        let added = manager.enqueue(request("Alice", 3)).await.unwrap();
        assert_eq!(added.len(), 3);
        assert_eq!(manager.queue_for_type("mahjong").await.unwrap().queue.len(), 3);

        let table = manager.add_table("mahjong", None).await.unwrap();
        manager.seat_at_table(added[0].id, table).await.unwrap();
        manager.start_table(table).await.unwrap();

        assert!(manager.record_start().await.is_err());
    }
}
