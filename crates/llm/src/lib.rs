//! Response drafter collaborator
//!
//! The LLM is a text-assembly tool, not an intelligence source: the
//! workflows hand it tone, classification and stall-breaker hints as
//! structured fields and it returns prose. Failures and deadlines are the
//! caller's cue to fall back to templates; this crate never retries beyond
//! its own configured budget.

pub mod drafter;
pub mod template;

pub use drafter::HttpResponseDrafter;
pub use template::TemplateDrafter;
