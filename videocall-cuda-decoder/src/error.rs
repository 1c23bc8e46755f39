/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

use crate::frame::PixelFormat;
use crate::session::SessionError;
use thiserror::Error;

/// Result type for decoder adapter operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors surfaced by [`CudaDecoder`](crate::CudaDecoder).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The session produced a picture in a layout the adapter cannot wrap.
    /// Fatal: the adapter or session is misconfigured.
    #[error("Unsupported pixel format: expected {expected:?}, got {actual:?}")]
    UnsupportedPixelFormat {
        expected: PixelFormat,
        actual: PixelFormat,
    },

    /// The session rejected the submitted bytes. The adapter stays usable.
    #[error("Decoder session rejected access unit: {0}")]
    SessionSubmission(String),

    /// The session is no longer usable. The adapter must be recreated.
    #[error("Decoder session terminated: {0}")]
    SessionTerminal(String),

    #[error("Failed to create decoder session: {0}")]
    SessionCreation(String),

    /// A call was made after an earlier fatal error.
    #[error("Decoder is faulted: {0}")]
    Faulted(Box<DecodeError>),
}

impl DecodeError {
    /// Whether this error leaves the adapter unusable for further calls.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DecodeError::UnsupportedPixelFormat { .. }
                | DecodeError::SessionTerminal(_)
                | DecodeError::SessionCreation(_)
                | DecodeError::Faulted(_)
        )
    }
}

impl From<SessionError> for DecodeError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Rejected(msg) => DecodeError::SessionSubmission(msg),
            SessionError::Terminal(msg) => DecodeError::SessionTerminal(msg),
        }
    }
}
