//! # Shelf Engine
//!
//! Client-side reconciliation for a personal bookmark collection.
//!
//! A user's bookmark list changes along three independent paths that arrive
//! in no particular order: the user's own optimistic edit, the store's answer
//! to that edit, and push notifications describing the same (or someone
//! else's) change. This crate keeps one ordered collection consistent across
//! all three: no duplicate ids, no silently dropped action, and convergence to
//! the store's state when any path fails or races.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never talks to the network; callers feed it events
//! - **Deterministic**: time is passed in, never read
//! - **Order-invariant**: the transition rules are idempotent per row
//! - **Single owner**: only [`Engine`] mutates the collection or pending set
//!
//! ## Core Concepts
//!
//! - [`ChangeEvent`] - one normalized shape for optimistic, settled and
//!   pushed changes
//! - [`RowIdentity`] - decides whether two events describe the same row
//! - [`PendingTracker`] - in-flight actions, keyed by a client-generated
//!   temporary id, with the snapshot needed to undo them
//! - [`Engine`] - the ordered [`Collection`] and the merge/rollback rules
//!
//! ## Quick Start
//!
//! ```rust
//! use shelf_engine::{Applied, Bookmark, ChangeEvent, Engine, PushPayload};
//!
//! let mut engine = Engine::new(vec![]);
//!
//! // The user adds a bookmark: it shows up immediately.
//! let submission = engine.submit_insert("Rust", "https://rust-lang.org", 1_000).unwrap();
//! assert_eq!(engine.current().len(), 1);
//!
//! // The store confirms it and assigns an id.
//! let row = Bookmark::new("5", "Rust", "https://rust-lang.org", 1_000);
//! engine.apply(ChangeEvent::settled_insert(submission.pending, Ok(row.clone())));
//!
//! // The push notification for the same insert is a no-op.
//! let applied = engine.apply(ChangeEvent::pushed(PushPayload::Insert { record: row }));
//! assert_eq!(applied, Applied::Deduplicated);
//! assert_eq!(engine.current()[0].id, "5");
//! ```

pub mod bookmark;
pub mod collection;
pub mod engine;
pub mod error;
pub mod event;
pub mod identity;
pub mod pending;

// Re-export main types at crate root
pub use bookmark::{Bookmark, Draft, Entry, RowState};
pub use collection::Collection;
pub use engine::{Applied, Engine, RemoteRequest, Submission};
pub use error::{Error, RemoteFailure, Result};
pub use event::{ChangeEvent, DeletedRow, EventTag, LocalChange, PushPayload, RowChange, Settlement};
pub use identity::{same_row, RowIdentity};
pub use pending::{PendingKind, PendingOp, PendingTracker, Removed};

/// Type aliases for clarity
pub type BookmarkId = String;
pub type PendingId = String;
pub type UserId = String;
pub type Timestamp = u64;
