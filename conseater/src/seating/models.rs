//! Seating request and response models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::queue::{PersonId, Table};
use crate::time_format::naive_timestamp;

/// Default cap on how many people one enqueue request may add
pub const DEFAULT_MAX_GROUP_SIZE: usize = 12;

/// A person known to the system, queued or seated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub phone: Option<String>,
    #[serde(with = "naive_timestamp")]
    pub added_at: NaiveDateTime,
}

/// Request to add a party to a table type's queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(rename = "type")]
    pub table_type: String,
    #[serde(default = "default_num_players")]
    pub num_players: usize,
}

fn default_num_players() -> usize {
    1
}

/// One member of a party about to be queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyMember {
    pub name: String,
    pub phone: Option<String>,
}

/// One person created by an enqueue request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedPerson {
    pub id: PersonId,
    pub name: String,
}

/// A table together with whoever is seated at it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    #[serde(flatten)]
    pub table: Table,
    pub players: Vec<Person>,
}
