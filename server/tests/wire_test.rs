//! Wire format tests.
//!
//! The UI and the push adapter exchange engine types as JSON. These tests pin
//! the shapes a UI or a recorded push stream depends on, and replay a
//! recorded stream through the engine.

use serde_json::json;
use shelf_engine::{
    Bookmark, ChangeEvent, Engine, Entry, PushPayload, RemoteFailure, RowState,
};

#[cfg(test)]
mod ui_shapes {
    use super::*;

    #[test]
    fn test_confirmed_entry_shape() {
        let entry = Entry::confirmed(Bookmark::new("5", "Rust", "https://rust-lang.org", 1_000));

        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "bookmark": {"id": "5", "title": "Rust", "url": "https://rust-lang.org", "createdAt": 1000},
                "state": {"kind": "confirmed"}
            })
        );
    }

    #[test]
    fn test_provisional_entry_shape() {
        let mut engine = Engine::new(vec![]);
        let submission = engine.submit_insert("Rust", "https://rust-lang.org", 42).unwrap();

        let value = serde_json::to_value(&engine.collection().entries()[0]).unwrap();
        assert_eq!(value["bookmark"]["id"], json!(submission.pending));
        assert_eq!(
            value["state"],
            json!({"kind": "provisional", "pending": "pending-1"})
        );
    }

    #[test]
    fn test_remote_failure_shapes() {
        assert_eq!(
            serde_json::to_value(RemoteFailure::Timeout(10)).unwrap(),
            json!({"kind": "timeout", "detail": 10})
        );
        assert_eq!(
            serde_json::to_value(RemoteFailure::Transport("reset".into())).unwrap(),
            json!({"kind": "transport", "detail": "reset"})
        );
    }

    #[test]
    fn test_entry_state_parses_back() {
        let state: RowState =
            serde_json::from_value(json!({"kind": "provisional", "pending": "pending-9"}))
                .unwrap();
        assert_eq!(
            state,
            RowState::Provisional {
                pending: "pending-9".into()
            }
        );
    }
}

#[cfg(test)]
mod push_stream {
    use super::*;

    fn recorded_stream() -> Vec<serde_json::Value> {
        vec![
            json!({"type": "insert", "record": {"id": "1", "title": "A", "url": "http://a", "createdAt": 100}}),
            json!({"type": "insert", "record": {"id": "2", "title": "B", "url": "http://b", "createdAt": 200}}),
            // Redelivered after a reconnect.
            json!({"type": "insert", "record": {"id": "1", "title": "A", "url": "http://a", "createdAt": 100}}),
            json!({"type": "update", "record": {"id": "2", "title": "B2", "url": "http://b2", "createdAt": 200}}),
            json!({"type": "delete", "old": {"id": "1"}}),
            json!({"type": "delete", "old": {"id": "1"}}),
            json!({"type": "insert", "record": {"id": "3", "title": "C", "url": "http://c", "createdAt": 150}}),
        ]
    }

    #[test]
    fn test_replay_recorded_stream() {
        let mut engine = Engine::new(vec![]);

        for frame in recorded_stream() {
            let payload: PushPayload = serde_json::from_value(frame).unwrap();
            engine.apply(ChangeEvent::pushed(payload));
        }

        let current = engine.current();
        let ids: Vec<&str> = current.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert_eq!(current[0].title, "B2");
        assert!(engine.collection().is_ordered());
    }

    #[test]
    fn test_replay_is_order_insensitive_for_duplicates() {
        let mut forward = Engine::new(vec![]);
        let mut shuffled = Engine::new(vec![]);

        let frames = recorded_stream();
        let inserts: Vec<PushPayload> = frames
            .iter()
            .filter(|f| f["type"] == "insert")
            .map(|f| serde_json::from_value(f.clone()).unwrap())
            .collect();

        for payload in &inserts {
            forward.apply(ChangeEvent::pushed(payload.clone()));
        }
        for payload in inserts.iter().rev() {
            shuffled.apply(ChangeEvent::pushed(payload.clone()));
        }

        assert_eq!(forward.current(), shuffled.current());
    }

    #[test]
    fn test_unknown_push_type_is_rejected() {
        let frame = json!({"type": "truncate"});
        assert!(serde_json::from_value::<PushPayload>(frame).is_err());
    }
}
