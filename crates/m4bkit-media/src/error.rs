//! Error types for m4bkit-media.

use std::io;
use thiserror::Error;

/// Result type for m4bkit-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for m4bkit-media operations.
///
/// Only [`Error::Io`] ever escapes the public extraction API. The other
/// variants are raised by individual extractors and absorbed by the
/// orchestrator, which treats them as "nothing found".
#[derive(Debug, Error)]
pub enum Error {
    /// Reading the input file failed.
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),

    /// An atom is present but its contents cannot be used.
    #[error("malformed MP4: {0}")]
    InvalidMp4(String),

    /// A step needed an atom the file does not have.
    #[error("no `{0}` atom")]
    MissingAtom(&'static str),

    /// Read past the end of the buffer.
    #[error("read of {need} bytes with only {have} available")]
    BufferUnderflow { need: usize, have: usize },
}

impl Error {
    /// Shorthand for [`Error::InvalidMp4`].
    pub fn invalid_mp4(msg: impl Into<String>) -> Self {
        Self::InvalidMp4(msg.into())
    }
}
