//! Per-lead session management
//!
//! Sessions live in memory, keyed by lead ID. Each session sits behind its
//! own async lock so exactly one handler mutates it at a time; two inbounds
//! for the same lead are processed in arrival order, the second blocking on
//! the first. Idle sessions are evicted lazily on access and by a background
//! sweeper.

pub mod session;
pub mod store;

pub use session::{BehaviorProfile, LeadSession, ResponderKind, SessionSeed, SessionSnapshot};
pub use store::SessionStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no session for lead {0}")]
    NotFound(String),
}
