//! Repository trait definitions for testability and dependency injection.
//!
//! The seating manager only talks to storage through these traits. Two
//! implementations exist: [`PgSeatingRepository`] for PostgreSQL and
//! [`MemoryRepository`](super::MemoryRepository) for tests and demos.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

use super::timeouts::{TRANSACTION_TIMEOUT, with_query_timeout, with_timeout};
use crate::events::{EventCount, EventKind};
use crate::queue::{
    PersonId, QueueEntry, QueueError, QueueResult, QueueSnapshot, Table, TableId, TableType,
};
use crate::seating::{PartyMember, Person};

/// Trait for table type operations
#[async_trait]
pub trait TableTypeRepository: Send + Sync {
    /// All table types, ordered by name
    async fn list_table_types(&self) -> QueueResult<Vec<TableType>>;

    /// Find a table type by name
    async fn find_table_type(&self, name: &str) -> QueueResult<Option<TableType>>;

    /// Create a table type; fails if the name is taken
    async fn create_table_type(&self, table_type: &TableType) -> QueueResult<()>;

    /// Delete a table type with its queue and tables
    async fn delete_table_type(&self, name: &str) -> QueueResult<bool>;
}

/// Trait for people and queue operations
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Read one table type's queue and tables as a single consistent snapshot
    async fn load_snapshot(&self, table_type: &str) -> QueueResult<QueueSnapshot>;

    /// Create every member of a party and append them to a table type's
    /// queue. Either the whole party is queued or nobody is.
    ///
    /// Returns the new IDs in member order.
    async fn add_party_to_queue(
        &self,
        members: &[PartyMember],
        table_type: &str,
        added_at: NaiveDateTime,
    ) -> QueueResult<Vec<PersonId>>;

    /// Find person by ID
    async fn find_person(&self, person: PersonId) -> QueueResult<Option<Person>>;

    /// Remove a person from any queue or seat and queue them for `table_type`
    async fn move_to_queue(&self, person: PersonId, table_type: &str) -> QueueResult<()>;

    /// Remove a person from any queue or seat and seat them at `table`
    async fn seat_at_table(&self, person: PersonId, table: TableId) -> QueueResult<()>;

    /// Delete a person everywhere
    async fn delete_person(&self, person: PersonId) -> QueueResult<bool>;

    /// Change a person's display name
    async fn rename_person(&self, person: PersonId, name: &str) -> QueueResult<bool>;

    /// Delete people who are neither queued nor seated
    async fn delete_orphans(&self) -> QueueResult<u64>;

    /// Queue length per table type, ordered by type name
    async fn queue_lengths(&self) -> QueueResult<Vec<(String, i64)>>;
}

/// Trait for table operations
#[async_trait]
pub trait TableRepository: Send + Sync {
    /// All tables, ordered by type then ID
    async fn list_tables(&self) -> QueueResult<Vec<Table>>;

    /// Create an idle table, optionally reserved for a future start
    async fn create_table(
        &self,
        table_type: &str,
        scheduled_start: Option<NaiveDateTime>,
    ) -> QueueResult<TableId>;

    /// Mark a table as playing since `started`; drops any reservation
    async fn start_table(&self, table: TableId, started: NaiveDateTime) -> QueueResult<bool>;

    /// Mark a table idle and release its seats
    async fn clear_table(&self, table: TableId) -> QueueResult<bool>;

    /// Delete a table
    async fn delete_table(&self, table: TableId) -> QueueResult<bool>;

    /// People seated at a table, oldest first
    async fn seated_players(&self, table: TableId) -> QueueResult<Vec<Person>>;
}

/// Trait for event log operations
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Record an event
    async fn log_event(
        &self,
        kind: EventKind,
        details: serde_json::Value,
        time: NaiveDateTime,
    ) -> QueueResult<i64>;

    /// Totals for every event kind, including zero counts
    async fn event_counts(&self) -> QueueResult<Vec<EventCount>>;
}

/// Everything the seating manager needs from storage
#[async_trait]
pub trait SeatingRepository:
    TableTypeRepository + QueueRepository + TableRepository + EventRepository
{
    /// Check that the backing store is reachable
    async fn health_check(&self) -> QueueResult<()>;
}

/// Default PostgreSQL implementation of [`SeatingRepository`]
pub struct PgSeatingRepository {
    pool: PgPool,
}

impl PgSeatingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn read_snapshot(&self, table_type: &str) -> Result<Option<QueueSnapshot>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let Some(row) = sqlx::query(
            "SELECT name, duration, player_count FROM table_types WHERE name = $1",
        )
        .bind(table_type)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };
        let table_type = table_type_from_row(&row);

        let entries: Vec<QueueEntry> = sqlx::query(
            "SELECT p.id, p.name, p.phone, p.added
             FROM people p
             INNER JOIN queue q ON q.person_id = p.id
             WHERE q.table_type = $1
             ORDER BY p.added ASC, p.id ASC",
        )
        .bind(&table_type.name)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|r| QueueEntry {
            id: r.get("id"),
            name: r.get("name"),
            phone: r.get("phone"),
            added_at: r.get("added"),
        })
        .collect();

        let tables: Vec<Table> = sqlx::query(
            "SELECT id, table_type, playing, started, scheduled_start
             FROM tables
             WHERE table_type = $1
             ORDER BY playing ASC, started ASC NULLS FIRST, id ASC",
        )
        .bind(&table_type.name)
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(table_from_row)
        .collect();

        tx.commit().await?;

        Ok(Some(QueueSnapshot::new(table_type, entries, tables)))
    }
}

fn table_type_from_row(r: &PgRow) -> TableType {
    TableType {
        name: r.get("name"),
        duration: r.get("duration"),
        player_count: r.get("player_count"),
    }
}

fn table_from_row(r: &PgRow) -> Table {
    Table {
        id: r.get("id"),
        table_type: r.get("table_type"),
        playing: r.get("playing"),
        started: r.get("started"),
        scheduled_start: r.get("scheduled_start"),
    }
}

fn person_from_row(r: &PgRow) -> Person {
    Person {
        id: r.get("id"),
        name: r.get("name"),
        phone: r.get("phone"),
        added_at: r.get("added"),
    }
}

/// Drop a person from every queue and seat inside an open transaction
async fn release_person(conn: &mut PgConnection, person: PersonId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM queue WHERE person_id = $1")
        .bind(person)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM players WHERE person_id = $1")
        .bind(person)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Lock a table type row for the rest of the transaction; false if missing
async fn lock_table_type(conn: &mut PgConnection, name: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT name FROM table_types WHERE name = $1 FOR SHARE")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

async fn person_exists(conn: &mut PgConnection, person: PersonId) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM people WHERE id = $1) AS found")
        .bind(person)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.get("found"))
}

#[async_trait]
impl TableTypeRepository for PgSeatingRepository {
    async fn list_table_types(&self) -> QueueResult<Vec<TableType>> {
        let rows = with_query_timeout(
            sqlx::query("SELECT name, duration, player_count FROM table_types ORDER BY name")
                .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(table_type_from_row).collect())
    }

    async fn find_table_type(&self, name: &str) -> QueueResult<Option<TableType>> {
        let row = with_query_timeout(
            sqlx::query("SELECT name, duration, player_count FROM table_types WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(table_type_from_row))
    }

    async fn create_table_type(&self, table_type: &TableType) -> QueueResult<()> {
        let result = sqlx::query(
            "INSERT INTO table_types (name, duration, player_count) VALUES ($1, $2, $3)
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(&table_type.name)
        .bind(table_type.duration)
        .bind(table_type.player_count)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::InvalidInput(format!(
                "Table type already exists: {}",
                table_type.name
            )));
        }
        Ok(())
    }

    async fn delete_table_type(&self, name: &str) -> QueueResult<bool> {
        let result = sqlx::query("DELETE FROM table_types WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl QueueRepository for PgSeatingRepository {
    async fn load_snapshot(&self, table_type: &str) -> QueueResult<QueueSnapshot> {
        with_timeout(TRANSACTION_TIMEOUT, self.read_snapshot(table_type))
            .await?
            .ok_or_else(|| QueueError::TableTypeNotFound(table_type.to_string()))
    }

    async fn add_party_to_queue(
        &self,
        members: &[PartyMember],
        table_type: &str,
        added_at: NaiveDateTime,
    ) -> QueueResult<Vec<PersonId>> {
        let mut tx = self.pool.begin().await?;

        if !lock_table_type(&mut tx, table_type).await? {
            return Err(QueueError::TableTypeNotFound(table_type.to_string()));
        }

        let mut ids = Vec::with_capacity(members.len());
        for member in members {
            let row = sqlx::query(
                "INSERT INTO people (name, phone, added) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(&member.name)
            .bind(&member.phone)
            .bind(added_at)
            .fetch_one(&mut *tx)
            .await?;
            let id: PersonId = row.get("id");

            sqlx::query("INSERT INTO queue (person_id, table_type) VALUES ($1, $2)")
                .bind(id)
                .bind(table_type)
                .execute(&mut *tx)
                .await?;
            ids.push(id);
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn find_person(&self, person: PersonId) -> QueueResult<Option<Person>> {
        let row = with_query_timeout(
            sqlx::query("SELECT id, name, phone, added FROM people WHERE id = $1")
                .bind(person)
                .fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(person_from_row))
    }

    async fn move_to_queue(&self, person: PersonId, table_type: &str) -> QueueResult<()> {
        let mut tx = self.pool.begin().await?;

        if !person_exists(&mut tx, person).await? {
            return Err(QueueError::PersonNotFound(person));
        }
        if !lock_table_type(&mut tx, table_type).await? {
            return Err(QueueError::TableTypeNotFound(table_type.to_string()));
        }

        release_person(&mut tx, person).await?;
        sqlx::query("INSERT INTO queue (person_id, table_type) VALUES ($1, $2)")
            .bind(person)
            .bind(table_type)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn seat_at_table(&self, person: PersonId, table: TableId) -> QueueResult<()> {
        let mut tx = self.pool.begin().await?;

        if !person_exists(&mut tx, person).await? {
            return Err(QueueError::PersonNotFound(person));
        }

        let table_found: bool =
            sqlx::query("SELECT EXISTS(SELECT 1 FROM tables WHERE id = $1) AS found")
                .bind(table)
                .fetch_one(&mut *tx)
                .await?
                .get("found");
        if !table_found {
            return Err(QueueError::TableNotFound(table));
        }

        release_person(&mut tx, person).await?;
        sqlx::query("INSERT INTO players (person_id, table_id) VALUES ($1, $2)")
            .bind(person)
            .bind(table)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_person(&self, person: PersonId) -> QueueResult<bool> {
        let result = sqlx::query("DELETE FROM people WHERE id = $1")
            .bind(person)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn rename_person(&self, person: PersonId, name: &str) -> QueueResult<bool> {
        let result = sqlx::query("UPDATE people SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(person)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_orphans(&self) -> QueueResult<u64> {
        let result = sqlx::query(
            "DELETE FROM people
             WHERE id NOT IN (SELECT person_id FROM players)
               AND id NOT IN (SELECT person_id FROM queue)",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn queue_lengths(&self) -> QueueResult<Vec<(String, i64)>> {
        let rows = with_query_timeout(
            sqlx::query(
                "SELECT t.name, COUNT(q.person_id) AS waiting
                 FROM table_types t
                 LEFT JOIN queue q ON q.table_type = t.name
                 GROUP BY t.name
                 ORDER BY t.name",
            )
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows
            .iter()
            .map(|r| (r.get("name"), r.get("waiting")))
            .collect())
    }
}

#[async_trait]
impl TableRepository for PgSeatingRepository {
    async fn list_tables(&self) -> QueueResult<Vec<Table>> {
        let rows = with_query_timeout(
            sqlx::query(
                "SELECT id, table_type, playing, started, scheduled_start
                 FROM tables ORDER BY table_type, id",
            )
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(table_from_row).collect())
    }

    async fn create_table(
        &self,
        table_type: &str,
        scheduled_start: Option<NaiveDateTime>,
    ) -> QueueResult<TableId> {
        let mut tx = self.pool.begin().await?;

        if !lock_table_type(&mut tx, table_type).await? {
            return Err(QueueError::TableTypeNotFound(table_type.to_string()));
        }

        let row = sqlx::query(
            "INSERT INTO tables (table_type, playing, started, scheduled_start)
             VALUES ($1, FALSE, NULL, $2) RETURNING id",
        )
        .bind(table_type)
        .bind(scheduled_start)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.get("id"))
    }

    async fn start_table(&self, table: TableId, started: NaiveDateTime) -> QueueResult<bool> {
        let result = sqlx::query(
            "UPDATE tables SET playing = TRUE, started = $1, scheduled_start = NULL WHERE id = $2",
        )
        .bind(started)
        .bind(table)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_table(&self, table: TableId) -> QueueResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result =
            sqlx::query("UPDATE tables SET playing = FALSE, started = NULL WHERE id = $1")
                .bind(table)
                .execute(&mut *tx)
                .await?;
        sqlx::query("DELETE FROM players WHERE table_id = $1")
            .bind(table)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_table(&self, table: TableId) -> QueueResult<bool> {
        let result = sqlx::query("DELETE FROM tables WHERE id = $1")
            .bind(table)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn seated_players(&self, table: TableId) -> QueueResult<Vec<Person>> {
        let rows = with_query_timeout(
            sqlx::query(
                "SELECT p.id, p.name, p.phone, p.added
                 FROM people p
                 INNER JOIN players s ON s.person_id = p.id
                 WHERE s.table_id = $1
                 ORDER BY p.added, p.id",
            )
            .bind(table)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.iter().map(person_from_row).collect())
    }
}

#[async_trait]
impl EventRepository for PgSeatingRepository {
    async fn log_event(
        &self,
        kind: EventKind,
        details: serde_json::Value,
        time: NaiveDateTime,
    ) -> QueueResult<i64> {
        let row = sqlx::query("INSERT INTO events (kind, details, time) VALUES ($1, $2, $3) RETURNING id")
            .bind(kind.as_str())
            .bind(details.to_string())
            .bind(time)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("id"))
    }

    async fn event_counts(&self) -> QueueResult<Vec<EventCount>> {
        let rows = with_query_timeout(
            sqlx::query("SELECT kind, COUNT(*) AS total FROM events GROUP BY kind")
                .fetch_all(&self.pool),
        )
        .await?;

        let totals: Vec<(String, i64)> = rows
            .iter()
            .map(|r| (r.get("kind"), r.get("total")))
            .collect();

        Ok(EventKind::ALL
            .into_iter()
            .map(|kind| EventCount {
                kind,
                count: totals
                    .iter()
                    .find(|(name, _)| name == kind.as_str())
                    .map_or(0, |(_, total)| *total),
            })
            .collect())
    }
}

#[async_trait]
impl SeatingRepository for PgSeatingRepository {
    async fn health_check(&self) -> QueueResult<()> {
        with_query_timeout(sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}
