//! Error types for the optimization engine.
//!
//! Only [`SlimError::UnreadableInput`] (and a failure to serialize the output
//! bytes) ever reach the caller of [`crate::optimize`]. The other variants
//! exist so passes can use `?` internally; the pipeline catches them and
//! records the message in the failing pass's report entry, while per-object
//! decode and encode problems are downgraded to skips before they get that far.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlimError {
    /// The input is not parseable as an unencrypted PDF. Fatal.
    #[error("unreadable input: {0}")]
    UnreadableInput(String),

    /// A stream declares a filter the engine cannot decode.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// A filter chain failed to decode.
    #[error("decode error: {0}")]
    Decode(String),

    /// Re-encoding (deflate or JPEG) failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// The font subsetter rejected a font program.
    #[error("font subset error: {0}")]
    FontSubset(String),

    /// Serializing the optimized document failed.
    #[error("write error: {0}")]
    Write(String),
}

pub type Result<T> = std::result::Result<T, SlimError>;
