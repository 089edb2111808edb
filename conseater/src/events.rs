//! Activity event log.
//!
//! Every queue and table mutation records an event with a small JSON payload.
//! Totals per kind back the statistics endpoint.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::time_format::naive_timestamp;

/// Event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    PlayerQueueAdd,
    PlayerQueueMove,
    PlayerMoveToTable,
    PlayerDelete,
    PlayerRename,
    TableStart,
    TableClear,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::Start,
        EventKind::PlayerQueueAdd,
        EventKind::PlayerQueueMove,
        EventKind::PlayerMoveToTable,
        EventKind::PlayerDelete,
        EventKind::PlayerRename,
        EventKind::TableStart,
        EventKind::TableClear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "start",
            EventKind::PlayerQueueAdd => "playerqueueadd",
            EventKind::PlayerQueueMove => "playerqueuemove",
            EventKind::PlayerMoveToTable => "playermovetotable",
            EventKind::PlayerDelete => "playerdelete",
            EventKind::PlayerRename => "playerrename",
            EventKind::TableStart => "tablestart",
            EventKind::TableClear => "tableclear",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown event kind: {s}"))
    }
}

/// A recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub kind: EventKind,
    pub details: serde_json::Value,
    #[serde(with = "naive_timestamp")]
    pub time: NaiveDateTime,
}

/// Number of events recorded for one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventCount {
    pub kind: EventKind,
    pub count: i64,
}
