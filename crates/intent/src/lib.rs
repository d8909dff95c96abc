//! Pure intent analysis for lead conversations
//!
//! Three analyzers, all deterministic and free of I/O:
//! - [`IntentDecoder`] — full conversation history to a scored
//!   [`leadflow_core::IntentProfile`] (FRS + PCS + classification)
//! - [`StallDetector`] — recent messages to a stall kind, table-driven
//! - [`RealtimeIntentUpdater`] — one new message to an incremental score
//!   delta with detected signals
//!
//! None of these suspend; they are called inline on the inbound path and
//! complete in microseconds.

pub mod decoder;
pub mod markers;
pub mod realtime;
pub mod stall;
pub mod trajectory;

pub use decoder::{DecoderConfig, IntentDecoder};
pub use realtime::{detect_emotion, RealtimeIntentUpdater, RealtimeOutcome};
pub use stall::{StallDetection, StallDetector};
pub use trajectory::{forecast_trajectory, monotonic_decline};
