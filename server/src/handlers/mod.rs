//! Request handlers for bookmark actions.

mod bookmarks;
pub mod websocket;

pub use bookmarks::*;
