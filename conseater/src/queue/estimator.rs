//! Queue-to-table assignment and seating ETA estimation.
//!
//! Each queue position maps to a round (`position / player_count`). Rounds
//! rotate over the immediate tables; every full pass over them adds one more
//! session length. With no immediate tables, rounds rotate over scheduled
//! tables instead, and each scheduled table seats at most one table-full at
//! its start time.

use chrono::{NaiveDateTime, TimeDelta};

use super::errors::QueueResult;
use super::models::{AnnotatedEntry, Eta, QueueEntry, QueueTypeResult, Table, TableType};
use crate::time_format::format_duration;

/// Seats already handed out per scheduled table during one pass.
///
/// Indexed like the scheduled table list. Lives only as long as the pass.
#[derive(Debug)]
struct SlotUsage {
    taken: Vec<usize>,
    capacity: usize,
}

impl SlotUsage {
    fn new(slots: usize, capacity: usize) -> Self {
        Self {
            taken: vec![0; slots],
            capacity,
        }
    }

    /// Claim one seat at `slot`; false once the slot is full.
    fn try_take(&mut self, slot: usize) -> bool {
        match self.taken.get_mut(slot) {
            Some(taken) if *taken < self.capacity => {
                *taken += 1;
                true
            }
            _ => false,
        }
    }
}

/// Project seating for every entry of one table type.
///
/// `entries` must already be ordered oldest first; this function never
/// reorders them. `immediate_tables` and `scheduled_tables` must each be in
/// rotation order (see [`Table::rotation_order`]).
///
/// # Errors
///
/// Returns [`QueueError::InvalidConfig`](super::QueueError::InvalidConfig)
/// if the table type has no seats or a duration outside
/// `0..=MAX_DURATION_MINUTES`.
///
/// ETAs that would fall past the end of the representable calendar are
/// reported as [`Eta::Never`].
///
/// # Example
///
/// ```
/// use conseater::queue::{estimate, Eta, TableType};
/// use conseater::time_format::parse_timestamp;
///
/// let now = parse_timestamp("2024-01-01 10:00:00").unwrap();
/// let result = estimate(&TableType::new("mahjong", 60, 4), &[], &[], &[], now).unwrap();
/// assert!(result.queue.is_empty());
/// assert_eq!(result.eta, Eta::Never);
/// ```
pub fn estimate(
    table_type: &TableType,
    entries: &[QueueEntry],
    immediate_tables: &[Table],
    scheduled_tables: &[Table],
    now: NaiveDateTime,
) -> QueueResult<QueueTypeResult> {
    table_type.validate()?;

    let seats = table_type.player_count as usize;
    let session = table_type.session_length()?;
    let mut usage = SlotUsage::new(scheduled_tables.len(), seats);

    let queue = entries
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let round = position / seats;
            let eta = if !immediate_tables.is_empty() {
                rotation_eta(immediate_tables, round, session, now)
            } else if !scheduled_tables.is_empty() {
                let slot = round % scheduled_tables.len();
                match scheduled_tables[slot].scheduled_start {
                    Some(start) if usage.try_take(slot) => Eta::At(start),
                    _ => Eta::Never,
                }
            } else {
                Eta::Never
            };

            let elapsed = (now - entry.added_at).max(TimeDelta::zero());

            AnnotatedEntry {
                id: entry.id,
                name: entry.name.clone(),
                has_phone: entry.phone.is_some(),
                elapsed: format_duration(elapsed.num_milliseconds() as f64 / 1000.0),
                added: entry.added_at,
                eta,
                remaining: eta.remaining(now),
                position,
                round,
            }
        })
        .collect();

    let eta = next_arrival_eta(
        entries.len() / seats,
        immediate_tables,
        scheduled_tables,
        session,
        now,
    );

    log::trace!(
        "Estimated {} entries for table type {}",
        entries.len(),
        table_type.name
    );

    Ok(QueueTypeResult {
        table_type: table_type.name.clone(),
        queue,
        eta,
        remaining: eta.remaining(now),
    })
}

/// ETA for `round` when rotating over tables that free up on their own.
fn rotation_eta(tables: &[Table], round: usize, session: TimeDelta, now: NaiveDateTime) -> Eta {
    let table = &tables[round % tables.len()];
    i32::try_from(round / tables.len())
        .ok()
        .and_then(|rotations| session.checked_mul(rotations))
        .zip(table.free_at(session, now))
        .and_then(|(extra, free)| free.checked_add_signed(extra))
        .map_or(Eta::Never, Eta::At)
}

/// Look-ahead ETA for a party appended to the queue.
///
/// Scheduled tables only count once the queue is past its second round, and
/// slot usage from the pass is neither read nor consumed.
fn next_arrival_eta(
    round: usize,
    immediate_tables: &[Table],
    scheduled_tables: &[Table],
    session: TimeDelta,
    now: NaiveDateTime,
) -> Eta {
    if !immediate_tables.is_empty() {
        return rotation_eta(immediate_tables, round, session, now);
    }

    if round > 1 && !scheduled_tables.is_empty() {
        if let Some(start) = scheduled_tables[round % scheduled_tables.len()].scheduled_start {
            return Eta::At(start);
        }
    }

    Eta::Never
}
