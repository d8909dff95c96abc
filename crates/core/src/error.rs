//! Core error types

use thiserror::Error;

/// Errors raised by core type construction and validation
#[derive(Error, Debug)]
pub enum Error {
    /// A raw history message is missing its role or content. Raised at the
    /// boundary where untyped input is converted into [`crate::Turn`]s; a
    /// malformed history is a caller bug and is never absorbed.
    #[error("malformed history at message {index}: missing {missing}")]
    MalformedHistory { index: usize, missing: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
