/// Property-based tests for seating ETA estimation using proptest
///
/// These tests check the estimator's guarantees over randomly generated
/// queues and table layouts.
use chrono::{NaiveDateTime, TimeDelta};
use conseater::queue::{Eta, QueueEntry, QueueSnapshot, Remaining, Table, TableType};
use conseater::time_format::parse_timestamp;
use proptest::prelude::*;

fn now() -> NaiveDateTime {
    parse_timestamp("2024-06-01 12:00:00").unwrap()
}

// Queue of `len` entries, one minute apart, oldest first
fn queue(len: usize) -> Vec<QueueEntry> {
    (0..len)
        .map(|i| QueueEntry {
            id: i as i64 + 1,
            name: format!("Guest {i}"),
            phone: None,
            added_at: now() - TimeDelta::minutes(200 - i as i64),
        })
        .collect()
}

// Immediate table that is idle or started within the last session
fn immediate_table_strategy(duration: i64) -> impl Strategy<Value = (bool, i64)> {
    (any::<bool>(), 0..=duration)
}

fn build_immediate(duration: i64, specs: &[(bool, i64)]) -> Vec<Table> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (playing, minutes_ago))| Table {
            id: i as i64 + 1,
            table_type: "mahjong".to_string(),
            playing: *playing,
            started: playing.then(|| now() - TimeDelta::minutes(*minutes_ago.min(&duration))),
            scheduled_start: None,
        })
        .collect()
}

// Scheduled tables with nondecreasing starts, in id order
fn build_scheduled(offsets: &[i64]) -> Vec<Table> {
    let mut sorted = offsets.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .map(|(i, offset)| Table {
            id: i as i64 + 1,
            table_type: "mahjong".to_string(),
            playing: false,
            started: None,
            scheduled_start: Some(now() + TimeDelta::minutes(*offset)),
        })
        .collect()
}

fn resolved(etas: impl Iterator<Item = Eta>) -> Vec<NaiveDateTime> {
    etas.filter_map(|eta| eta.time()).collect()
}

proptest! {
    #[test]
    fn test_round_is_position_over_player_count(
        len in 0usize..60,
        player_count in 1i64..10,
        tables in prop::collection::vec(immediate_table_strategy(60), 0..5),
    ) {
        let table_type = TableType::new("mahjong", 60, player_count);
        let snapshot = QueueSnapshot::new(table_type, queue(len), build_immediate(60, &tables));
        let result = snapshot.estimate(now()).unwrap();

        prop_assert_eq!(result.queue.len(), len);
        for (i, entry) in result.queue.iter().enumerate() {
            prop_assert_eq!(entry.position, i);
            prop_assert_eq!(entry.round, i / player_count as usize);
        }

        // Entries sharing a round share a table and therefore an ETA
        for pair in result.queue.windows(2) {
            if pair[0].round == pair[1].round {
                prop_assert_eq!(pair[0].eta, pair[1].eta);
            }
        }
    }

    #[test]
    fn test_rotation_etas_never_decrease(
        len in 1usize..80,
        player_count in 1i64..8,
        duration in 1i64..180,
        tables in prop::collection::vec((any::<bool>(), 0i64..=1000), 1..6),
    ) {
        let tables: Vec<(bool, i64)> = tables
            .into_iter()
            .map(|(playing, ago)| (playing, ago % (duration + 1)))
            .collect();
        let table_type = TableType::new("mahjong", duration, player_count);
        let snapshot =
            QueueSnapshot::new(table_type, queue(len), build_immediate(duration, &tables));
        let result = snapshot.estimate(now()).unwrap();

        let etas = resolved(result.queue.iter().map(|e| e.eta));
        prop_assert_eq!(etas.len(), len);
        for pair in etas.windows(2) {
            prop_assert!(pair[0] <= pair[1], "{} came after {}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_scheduled_etas_never_decrease(
        len in 1usize..60,
        player_count in 1i64..8,
        offsets in prop::collection::vec(0i64..600, 1..6),
    ) {
        let table_type = TableType::new("mahjong", 60, player_count);
        let snapshot = QueueSnapshot::new(table_type, queue(len), build_scheduled(&offsets));
        let result = snapshot.estimate(now()).unwrap();

        let etas = resolved(result.queue.iter().map(|e| e.eta));
        for pair in etas.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
    }

    #[test]
    fn test_estimate_is_idempotent(
        len in 0usize..40,
        player_count in 1i64..6,
        tables in prop::collection::vec(immediate_table_strategy(90), 0..4),
        offsets in prop::collection::vec(0i64..300, 0..4),
    ) {
        let mut all = build_immediate(90, &tables);
        all.extend(build_scheduled(&offsets).into_iter().map(|mut t| {
            t.id += 100;
            t
        }));
        let snapshot = QueueSnapshot::new(TableType::new("mahjong", 90, player_count), queue(len), all);

        let first = snapshot.estimate(now()).unwrap();
        let second = snapshot.estimate(now()).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_scheduled_slot_never_overfills(
        len in 1usize..60,
        player_count in 1i64..8,
        offsets in prop::collection::vec(0i64..600, 1..5),
    ) {
        let scheduled = build_scheduled(&offsets);
        let snapshot = QueueSnapshot::new(
            TableType::new("mahjong", 60, player_count),
            queue(len),
            scheduled.clone(),
        );
        let result = snapshot.estimate(now()).unwrap();

        for table in &scheduled {
            let seated = result
                .queue
                .iter()
                .filter(|e| e.round % scheduled.len() == (table.id - 1) as usize)
                .filter(|e| !e.eta.is_never())
                .count();
            prop_assert!(seated <= player_count as usize);
        }

        // Only the first pass over the slots resolves
        for entry in &result.queue {
            prop_assert_eq!(entry.eta.is_never(), entry.round >= scheduled.len());
        }
    }
}

#[test]
fn test_no_tables_means_never() {
    let snapshot = QueueSnapshot::new(TableType::new("mahjong", 60, 4), queue(9), Vec::new());
    let result = snapshot.estimate(now()).unwrap();

    assert!(result.queue.iter().all(|e| e.eta == Eta::Never));
    assert!(result.queue.iter().all(|e| e.remaining == Remaining::Never));
    assert_eq!(result.eta, Eta::Never);
    assert_eq!(result.remaining.to_string(), "NEVER");
}

#[test]
fn test_fifth_entry_on_four_seat_slot_is_never() {
    let snapshot = QueueSnapshot::new(
        TableType::new("mahjong", 60, 4),
        queue(5),
        build_scheduled(&[30]),
    );
    let result = snapshot.estimate(now()).unwrap();

    for entry in &result.queue[..4] {
        assert_eq!(entry.eta.to_string(), "2024-06-01 12:30:00");
    }
    assert_eq!(result.queue[4].eta, Eta::Never);
}
