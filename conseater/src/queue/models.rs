//! Queue data models.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize, Serializer};

use super::errors::{QueueError, QueueResult};
use crate::time_format::{self, naive_timestamp};

/// Person ID type
pub type PersonId = i64;

/// Table ID type
pub type TableId = i64;

/// Longest session a table type may declare, in minutes (one week)
pub const MAX_DURATION_MINUTES: i64 = 7 * 24 * 60;

/// A category of table with a fixed session length and seat count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableType {
    #[serde(rename = "type")]
    pub name: String,

    /// Session length in minutes
    pub duration: i64,

    /// Seats per table
    pub player_count: i64,
}

impl TableType {
    pub fn new(name: impl Into<String>, duration: i64, player_count: i64) -> Self {
        Self {
            name: name.into(),
            duration,
            player_count,
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] if the seat count is not
    /// positive or the duration is negative or above
    /// [`MAX_DURATION_MINUTES`].
    pub fn validate(&self) -> QueueResult<()> {
        if self.name.trim().is_empty() {
            return Err(QueueError::invalid_config("type", "must not be empty"));
        }

        if self.player_count <= 0 {
            return Err(QueueError::invalid_config(
                "player_count",
                format!("must be greater than 0, got {}", self.player_count),
            ));
        }

        if self.duration < 0 {
            return Err(QueueError::invalid_config(
                "duration",
                format!("must not be negative, got {}", self.duration),
            ));
        }

        if self.duration > MAX_DURATION_MINUTES {
            return Err(QueueError::invalid_config(
                "duration",
                format!(
                    "must be at most {MAX_DURATION_MINUTES} minutes, got {}",
                    self.duration
                ),
            ));
        }

        Ok(())
    }

    /// Session length as a time delta
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] if the duration does not fit a
    /// [`TimeDelta`].
    pub fn session_length(&self) -> QueueResult<TimeDelta> {
        TimeDelta::try_minutes(self.duration).ok_or_else(|| {
            QueueError::invalid_config("duration", format!("out of range: {}", self.duration))
        })
    }
}

/// One waiting party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: PersonId,
    pub name: String,
    pub phone: Option<String>,
    #[serde(with = "naive_timestamp")]
    pub added_at: NaiveDateTime,
}

/// A physical table of some type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    #[serde(rename = "type")]
    pub table_type: String,
    pub playing: bool,
    #[serde(default, with = "naive_timestamp::option")]
    pub started: Option<NaiveDateTime>,
    #[serde(default, with = "naive_timestamp::option")]
    pub scheduled_start: Option<NaiveDateTime>,
}

impl Table {
    /// Reserved for a future session instead of free rotation
    pub fn is_scheduled(&self) -> bool {
        self.scheduled_start.is_some()
    }

    /// When this table next frees up, ignoring any queued rotations.
    ///
    /// Only `playing` decides whether the session length applies; a stale
    /// `started` on an idle table is ignored. `None` if the end of the
    /// session falls outside the representable calendar.
    pub fn free_at(&self, session: TimeDelta, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match (self.playing, self.started) {
            (true, Some(started)) => started.checked_add_signed(session),
            _ => Some(now),
        }
    }

    /// Rotation order: idle tables first, then soonest-started.
    pub fn rotation_order(a: &Table, b: &Table) -> Ordering {
        a.playing
            .cmp(&b.playing)
            .then_with(|| a.started.cmp(&b.started))
    }
}

/// Estimated seating time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eta {
    At(NaiveDateTime),
    Never,
}

impl Eta {
    /// Seating time, if any
    pub fn time(&self) -> Option<NaiveDateTime> {
        match self {
            Eta::At(t) => Some(*t),
            Eta::Never => None,
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Eta::Never)
    }

    /// Time left until seating, relative to `now`
    pub fn remaining(&self, now: NaiveDateTime) -> Remaining {
        match self {
            Eta::At(t) => {
                let left = *t - now;
                if left > TimeDelta::zero() {
                    Remaining::In(left)
                } else {
                    Remaining::Now
                }
            }
            Eta::Never => Remaining::Never,
        }
    }
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::At(t) => write!(f, "{}", time_format::format_timestamp(t)),
            Eta::Never => write!(f, "None"),
        }
    }
}

impl Serialize for Eta {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Time left until seating, as shown to the waiting party
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    In(TimeDelta),
    Now,
    Never,
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Remaining::In(left) => {
                let secs = left.num_milliseconds() as f64 / 1000.0;
                write!(f, "{}", time_format::format_duration(secs))
            }
            Remaining::Now => write!(f, "NOW"),
            Remaining::Never => write!(f, "NEVER"),
        }
    }
}

impl Serialize for Remaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A queue entry annotated with its projected seating
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedEntry {
    pub id: PersonId,
    pub name: String,
    pub has_phone: bool,
    pub elapsed: String,
    #[serde(with = "naive_timestamp")]
    pub added: NaiveDateTime,
    pub eta: Eta,
    pub remaining: Remaining,

    /// Index in the queue
    #[serde(skip)]
    pub position: usize,

    /// Table rotation this entry is projected into
    #[serde(skip)]
    pub round: usize,
}

/// Estimation output for one table type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueTypeResult {
    #[serde(rename = "type")]
    pub table_type: String,
    pub queue: Vec<AnnotatedEntry>,

    /// ETA for a party joining at the back of the queue now
    pub eta: Eta,
    pub remaining: Remaining,
}

/// Consistent read of one table type's queue and tables.
///
/// Built by the storage side. Entries are ordered oldest first and tables
/// are split into immediate and scheduled lists, each in rotation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub table_type: TableType,
    pub entries: Vec<QueueEntry>,
    pub immediate_tables: Vec<Table>,
    pub scheduled_tables: Vec<Table>,
}

impl QueueSnapshot {
    pub fn new(table_type: TableType, mut entries: Vec<QueueEntry>, tables: Vec<Table>) -> Self {
        entries.sort_by_key(|e| e.added_at);

        let (mut scheduled_tables, mut immediate_tables): (Vec<_>, Vec<_>) =
            tables.into_iter().partition(Table::is_scheduled);
        immediate_tables.sort_by(Table::rotation_order);
        scheduled_tables.sort_by(Table::rotation_order);

        Self {
            table_type,
            entries,
            immediate_tables,
            scheduled_tables,
        }
    }

    /// Run one estimation pass over this snapshot
    pub fn estimate(&self, now: NaiveDateTime) -> QueueResult<QueueTypeResult> {
        super::estimator::estimate(
            &self.table_type,
            &self.entries,
            &self.immediate_tables,
            &self.scheduled_tables,
            now,
        )
    }
}
