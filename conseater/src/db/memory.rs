//! In-memory storage backend.
//!
//! Mirrors the PostgreSQL schema with plain maps behind one lock, so every
//! snapshot is consistent. Used by tests and by the server's `--memory` mode.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;

use super::repository::{
    EventRepository, QueueRepository, SeatingRepository, TableRepository, TableTypeRepository,
};
use crate::events::{Event, EventCount, EventKind};
use crate::queue::{
    PersonId, QueueEntry, QueueError, QueueResult, QueueSnapshot, Table, TableId, TableType,
};
use crate::seating::{PartyMember, Person};

#[derive(Debug, Default)]
struct State {
    table_types: BTreeMap<String, TableType>,
    people: BTreeMap<PersonId, Person>,
    /// person -> table type
    queue: BTreeMap<PersonId, String>,
    tables: BTreeMap<TableId, Table>,
    /// person -> table
    players: BTreeMap<PersonId, TableId>,
    events: Vec<Event>,
    next_person_id: PersonId,
    next_table_id: TableId,
}

impl State {
    fn release(&mut self, person: PersonId) {
        self.queue.remove(&person);
        self.players.remove(&person);
    }

    fn ensure_table_type(&self, name: &str) -> QueueResult<()> {
        if self.table_types.contains_key(name) {
            Ok(())
        } else {
            Err(QueueError::TableTypeNotFound(name.to_string()))
        }
    }
}

/// In-memory implementation of [`SeatingRepository`]
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableTypeRepository for MemoryRepository {
    async fn list_table_types(&self) -> QueueResult<Vec<TableType>> {
        Ok(self.state.read().await.table_types.values().cloned().collect())
    }

    async fn find_table_type(&self, name: &str) -> QueueResult<Option<TableType>> {
        Ok(self.state.read().await.table_types.get(name).cloned())
    }

    async fn create_table_type(&self, table_type: &TableType) -> QueueResult<()> {
        let mut state = self.state.write().await;
        if state.table_types.contains_key(&table_type.name) {
            return Err(QueueError::InvalidInput(format!(
                "Table type already exists: {}",
                table_type.name
            )));
        }
        state
            .table_types
            .insert(table_type.name.clone(), table_type.clone());
        Ok(())
    }

    async fn delete_table_type(&self, name: &str) -> QueueResult<bool> {
        let mut state = self.state.write().await;
        if state.table_types.remove(name).is_none() {
            return Ok(false);
        }

        state.queue.retain(|_, queued_for| queued_for.as_str() != name);
        let removed: Vec<TableId> = state
            .tables
            .values()
            .filter(|t| t.table_type == name)
            .map(|t| t.id)
            .collect();
        state.tables.retain(|_, t| t.table_type != name);
        state.players.retain(|_, table| !removed.contains(table));
        Ok(true)
    }
}

#[async_trait]
impl QueueRepository for MemoryRepository {
    async fn load_snapshot(&self, table_type: &str) -> QueueResult<QueueSnapshot> {
        let state = self.state.read().await;
        let kind = state
            .table_types
            .get(table_type)
            .cloned()
            .ok_or_else(|| QueueError::TableTypeNotFound(table_type.to_string()))?;

        let entries: Vec<QueueEntry> = state
            .queue
            .iter()
            .filter(|(_, queued_for)| queued_for.as_str() == table_type)
            .filter_map(|(id, _)| state.people.get(id))
            .map(|p| QueueEntry {
                id: p.id,
                name: p.name.clone(),
                phone: p.phone.clone(),
                added_at: p.added_at,
            })
            .collect();

        let tables: Vec<Table> = state
            .tables
            .values()
            .filter(|t| t.table_type == table_type)
            .cloned()
            .collect();

        Ok(QueueSnapshot::new(kind, entries, tables))
    }

    async fn add_party_to_queue(
        &self,
        members: &[PartyMember],
        table_type: &str,
        added_at: NaiveDateTime,
    ) -> QueueResult<Vec<PersonId>> {
        let mut state = self.state.write().await;
        state.ensure_table_type(table_type)?;

        let mut ids = Vec::with_capacity(members.len());
        for member in members {
            state.next_person_id += 1;
            let id = state.next_person_id;
            state.people.insert(
                id,
                Person {
                    id,
                    name: member.name.clone(),
                    phone: member.phone.clone(),
                    added_at,
                },
            );
            state.queue.insert(id, table_type.to_string());
            ids.push(id);
        }
        Ok(ids)
    }

    async fn find_person(&self, person: PersonId) -> QueueResult<Option<Person>> {
        Ok(self.state.read().await.people.get(&person).cloned())
    }

    async fn move_to_queue(&self, person: PersonId, table_type: &str) -> QueueResult<()> {
        let mut state = self.state.write().await;
        if !state.people.contains_key(&person) {
            return Err(QueueError::PersonNotFound(person));
        }
        state.ensure_table_type(table_type)?;

        state.release(person);
        state.queue.insert(person, table_type.to_string());
        Ok(())
    }

    async fn seat_at_table(&self, person: PersonId, table: TableId) -> QueueResult<()> {
        let mut state = self.state.write().await;
        if !state.people.contains_key(&person) {
            return Err(QueueError::PersonNotFound(person));
        }
        if !state.tables.contains_key(&table) {
            return Err(QueueError::TableNotFound(table));
        }

        state.release(person);
        state.players.insert(person, table);
        Ok(())
    }

    async fn delete_person(&self, person: PersonId) -> QueueResult<bool> {
        let mut state = self.state.write().await;
        state.release(person);
        Ok(state.people.remove(&person).is_some())
    }

    async fn rename_person(&self, person: PersonId, name: &str) -> QueueResult<bool> {
        let mut state = self.state.write().await;
        Ok(match state.people.get_mut(&person) {
            Some(p) => {
                p.name = name.to_string();
                true
            }
            None => false,
        })
    }

    async fn delete_orphans(&self) -> QueueResult<u64> {
        let mut state = self.state.write().await;
        let State {
            people,
            queue,
            players,
            ..
        } = &mut *state;

        let before = people.len();
        people.retain(|id, _| queue.contains_key(id) || players.contains_key(id));
        Ok((before - people.len()) as u64)
    }

    async fn queue_lengths(&self) -> QueueResult<Vec<(String, i64)>> {
        let state = self.state.read().await;
        Ok(state
            .table_types
            .keys()
            .map(|name| {
                let waiting = state.queue.values().filter(|q| *q == name).count();
                (name.clone(), waiting as i64)
            })
            .collect())
    }
}

#[async_trait]
impl TableRepository for MemoryRepository {
    async fn list_tables(&self) -> QueueResult<Vec<Table>> {
        let mut tables: Vec<Table> = self.state.read().await.tables.values().cloned().collect();
        tables.sort_by(|a, b| a.table_type.cmp(&b.table_type).then(a.id.cmp(&b.id)));
        Ok(tables)
    }

    async fn create_table(
        &self,
        table_type: &str,
        scheduled_start: Option<NaiveDateTime>,
    ) -> QueueResult<TableId> {
        let mut state = self.state.write().await;
        state.ensure_table_type(table_type)?;

        state.next_table_id += 1;
        let id = state.next_table_id;
        state.tables.insert(
            id,
            Table {
                id,
                table_type: table_type.to_string(),
                playing: false,
                started: None,
                scheduled_start,
            },
        );
        Ok(id)
    }

    async fn start_table(&self, table: TableId, started: NaiveDateTime) -> QueueResult<bool> {
        let mut state = self.state.write().await;
        Ok(match state.tables.get_mut(&table) {
            Some(t) => {
                t.playing = true;
                t.started = Some(started);
                t.scheduled_start = None;
                true
            }
            None => false,
        })
    }

    async fn clear_table(&self, table: TableId) -> QueueResult<bool> {
        let mut state = self.state.write().await;
        let found = match state.tables.get_mut(&table) {
            Some(t) => {
                t.playing = false;
                t.started = None;
                true
            }
            None => false,
        };
        state.players.retain(|_, seated_at| *seated_at != table);
        Ok(found)
    }

    async fn delete_table(&self, table: TableId) -> QueueResult<bool> {
        let mut state = self.state.write().await;
        state.players.retain(|_, seated_at| *seated_at != table);
        Ok(state.tables.remove(&table).is_some())
    }

    async fn seated_players(&self, table: TableId) -> QueueResult<Vec<Person>> {
        let state = self.state.read().await;
        let mut seated: Vec<Person> = state
            .players
            .iter()
            .filter(|(_, seated_at)| **seated_at == table)
            .filter_map(|(id, _)| state.people.get(id).cloned())
            .collect();
        seated.sort_by_key(|p| (p.added_at, p.id));
        Ok(seated)
    }
}

#[async_trait]
impl EventRepository for MemoryRepository {
    async fn log_event(
        &self,
        kind: EventKind,
        details: serde_json::Value,
        time: NaiveDateTime,
    ) -> QueueResult<i64> {
        let mut state = self.state.write().await;
        let id = state.events.len() as i64 + 1;
        state.events.push(Event {
            id,
            kind,
            details,
            time,
        });
        Ok(id)
    }

    async fn event_counts(&self) -> QueueResult<Vec<EventCount>> {
        let state = self.state.read().await;
        Ok(EventKind::ALL
            .into_iter()
            .map(|kind| EventCount {
                kind,
                count: state.events.iter().filter(|e| e.kind == kind).count() as i64,
            })
            .collect())
    }
}

#[async_trait]
impl SeatingRepository for MemoryRepository {
    async fn health_check(&self) -> QueueResult<()> {
        Ok(())
    }
}
