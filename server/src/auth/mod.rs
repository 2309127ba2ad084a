//! Who is signed in, and who may drive the session.

mod identity;
mod middleware;

pub use identity::{HttpIdentity, Identity};
pub use middleware::UiUser;
