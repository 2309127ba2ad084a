//! Convergence properties of the reconciliation engine.
//!
//! Every test here feeds the same logical change through several paths and
//! checks that the visible collection ends up the same regardless of order.

use proptest::prelude::*;
use shelf_engine::{
    Applied, Bookmark, ChangeEvent, DeletedRow, Draft, Engine, PushPayload, RemoteFailure,
};

fn row(id: &str, ts: u64) -> Bookmark {
    Bookmark::new(id, format!("Title {id}"), format!("https://{id}.example"), ts)
}

fn push_insert(b: Bookmark) -> ChangeEvent {
    ChangeEvent::pushed(PushPayload::Insert { record: b })
}

fn push_delete(id: &str) -> ChangeEvent {
    ChangeEvent::pushed(PushPayload::Delete {
        old: DeletedRow { id: id.into() },
    })
}

fn ids(engine: &Engine) -> Vec<String> {
    engine.current().into_iter().map(|b| b.id).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn optimistic_confirm_push_in_every_order() {
    let authoritative = Bookmark::new("5", "T", "http://x", 2_000);
    let draft = Draft::new("T", "http://x").unwrap();

    let optimistic = ChangeEvent::optimistic_insert("pending-1", draft, 1_999);
    let confirm = ChangeEvent::settled_insert("pending-1", Ok(authoritative.clone()));
    let push = push_insert(authoritative.clone());

    let orders: [[&ChangeEvent; 3]; 6] = [
        [&optimistic, &confirm, &push],
        [&optimistic, &push, &confirm],
        [&confirm, &optimistic, &push],
        [&confirm, &push, &optimistic],
        [&push, &optimistic, &confirm],
        [&push, &confirm, &optimistic],
    ];

    let mut finals = Vec::new();
    for order in orders {
        let mut engine = Engine::new(vec![row("old", 1_000)]);
        for event in order {
            engine.apply(event.clone());
        }

        let current = engine.current();
        assert_eq!(
            current.iter().filter(|b| b.id == "5").count(),
            1,
            "order {:?}",
            order.map(|e| e.tag())
        );
        assert_eq!(current[0], authoritative);
        assert!(engine.collection().entries().iter().all(|e| !e.is_provisional()));
        assert_eq!(engine.pending_count(), 0);
        finals.push(current);
    }

    assert!(finals.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn rollback_restores_original_order() {
    let mut engine = Engine::new(vec![row("A", 200), row("B", 100)]);

    let submission = engine.submit_delete("A", 5_000).unwrap();
    assert_eq!(ids(&engine), vec!["B"]);

    engine.apply(ChangeEvent::settled_delete(
        submission.pending,
        "A",
        Err(RemoteFailure::Rejected("row locked".into())),
    ));
    assert_eq!(ids(&engine), vec!["A", "B"]);
}

#[test]
fn rollback_of_middle_row_with_equal_timestamps() {
    let mut engine = Engine::new(vec![row("A", 100), row("B", 100), row("C", 100)]);

    let submission = engine.submit_delete("B", 5_000).unwrap();
    engine.apply(ChangeEvent::settled_delete(
        submission.pending,
        "B",
        Err(RemoteFailure::Timeout(10)),
    ));

    assert_eq!(ids(&engine), vec!["A", "B", "C"]);
}

#[test]
fn insert_rollback_empties_collection() {
    let mut engine = Engine::new(vec![]);

    let submission = engine.submit_insert("T", "http://x", 1_000).unwrap();
    assert_eq!(engine.current().len(), 1);

    engine.apply(ChangeEvent::settled_insert(
        submission.pending,
        Err(RemoteFailure::Transport("connection refused".into())),
    ));
    assert!(engine.current().is_empty());
    assert_eq!(engine.pending_count(), 0);
}

#[test]
fn own_action_replaces_rather_than_appends() {
    let mut engine = Engine::new(vec![row("B", 300), row("A", 100)]);

    // The clock on this device runs between the two existing rows.
    let submission = engine.submit_insert("T", "http://x", 200).unwrap();
    assert_eq!(submission.applied, Applied::Inserted { index: 1 });

    let applied = engine.apply(ChangeEvent::settled_insert(
        submission.pending,
        Ok(Bookmark::new("5", "T", "http://x", 250)),
    ));

    assert_eq!(applied, Applied::Replaced { index: 1 });
    assert_eq!(ids(&engine), vec!["B", "5", "A"]);
}

#[test]
fn confirmation_with_skewed_timestamp_is_reseated() {
    let mut engine = Engine::new(vec![row("B", 300), row("A", 100)]);

    let submission = engine.submit_insert("T", "http://x", 400).unwrap();
    let applied = engine.apply(ChangeEvent::settled_insert(
        submission.pending,
        Ok(Bookmark::new("5", "T", "http://x", 50)),
    ));

    assert_eq!(applied, Applied::Replaced { index: 2 });
    assert_eq!(ids(&engine), vec!["B", "A", "5"]);
    assert!(engine.collection().is_ordered());
}

#[test]
fn concurrent_actions_settle_independently() {
    let mut engine = Engine::new(vec![row("A", 100)]);

    let first = engine.submit_insert("one", "http://1", 1_000).unwrap();
    let second = engine.submit_insert("two", "http://2", 1_001).unwrap();
    let delete = engine.submit_delete("A", 1_002).unwrap();
    assert_eq!(engine.pending_count(), 3);

    engine.apply(ChangeEvent::settled_insert(
        second.pending,
        Err(RemoteFailure::Rejected("quota".into())),
    ));
    engine.apply(ChangeEvent::settled_delete(delete.pending, "A", Ok(())));
    engine.apply(ChangeEvent::settled_insert(
        first.pending,
        Ok(Bookmark::new("7", "one", "http://1", 1_000)),
    ));

    assert_eq!(ids(&engine), vec!["7"]);
    assert_eq!(engine.pending_count(), 0);
}

#[test]
fn settlement_twice_is_harmless() {
    let mut engine = Engine::new(vec![]);
    let submission = engine.submit_insert("T", "http://x", 1_000).unwrap();
    let confirm =
        ChangeEvent::settled_insert(submission.pending, Ok(Bookmark::new("5", "T", "http://x", 1_000)));

    engine.apply(confirm.clone());
    assert_eq!(engine.apply(confirm), Applied::Deduplicated);
    assert_eq!(ids(&engine), vec!["5"]);
}

// ============================================================================
// Properties
// ============================================================================

/// One step of a random event stream over a small id space.
#[derive(Debug, Clone)]
enum Step {
    Insert(u8, u64),
    Delete(u8),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u8..6, 0u64..50).prop_map(|(id, ts)| Step::Insert(id, ts)),
        (0u8..6).prop_map(Step::Delete),
    ]
}

fn to_event(step: &Step) -> ChangeEvent {
    match step {
        Step::Insert(id, ts) => push_insert(row(&format!("r{id}"), *ts)),
        Step::Delete(id) => push_delete(&format!("r{id}")),
    }
}

proptest! {
    #[test]
    fn prop_insert_dedup(copies in 1usize..8, ts in 0u64..10_000) {
        let mut engine = Engine::new(vec![]);
        for _ in 0..copies {
            engine.apply(push_insert(row("5", ts)));
        }
        prop_assert_eq!(ids(&engine), vec!["5".to_string()]);
    }

    #[test]
    fn prop_delete_idempotent(deletes in 1usize..5, others in prop::collection::vec(0u64..100, 0..5)) {
        let mut seed: Vec<Bookmark> = others
            .iter()
            .enumerate()
            .map(|(i, ts)| row(&format!("o{i}"), *ts))
            .collect();
        seed.push(row("5", 0));
        seed.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut engine = Engine::new(seed);
        for i in 0..deletes {
            engine.apply(push_delete("5"));
            engine.apply(push_insert(row(&format!("n{i}"), 50)));
        }
        prop_assert!(!ids(&engine).contains(&"5".to_string()));
        prop_assert_eq!(engine.current().len(), others.len() + deletes);
    }

    #[test]
    fn prop_invariants_hold_after_every_event(steps in prop::collection::vec(arb_step(), 0..40)) {
        let mut engine = Engine::new(vec![]);
        for step in &steps {
            engine.apply(to_event(step));

            prop_assert!(engine.collection().is_ordered());
            let mut seen = std::collections::HashSet::new();
            for b in engine.current() {
                prop_assert!(seen.insert(b.id));
            }
        }
    }

    #[test]
    fn prop_rollback_restores_seed(
        timestamps in prop::collection::vec(0u64..20, 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut seed: Vec<Bookmark> = timestamps
            .iter()
            .enumerate()
            .map(|(i, ts)| row(&format!("r{i}"), *ts))
            .collect();
        seed.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut engine = Engine::new(seed.clone());
        let victim = seed[pick.index(seed.len())].id.clone();
        let submission = engine.submit_delete(&victim, 1_000).unwrap();
        engine.apply(ChangeEvent::settled_delete(
            submission.pending,
            victim,
            Err(RemoteFailure::Timeout(10)),
        ));

        prop_assert_eq!(engine.current(), seed);
    }
}
