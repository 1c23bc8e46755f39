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

//! The interface to the hardware decoder session the adapter drives.
//!
//! Sessions do their own bitstream parsing, reference-picture management and
//! output reordering. A picture may come back zero, one or several submissions
//! after the bytes that produced it.

use crate::frame::PixelFormat;
use crate::tensor::DeviceImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An enumeration of the codecs a session can be opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoCodec {
    #[default]
    H264,
    Hevc,
    Av1,
    Vp9,
}

/// Where the session places decoded pictures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MemoryResidency {
    /// Pictures stay in GPU memory.
    #[default]
    Device,
    /// Pictures are mapped into page-locked host memory.
    Host,
}

/// Parameters a session is opened with. Fixed for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub codec: VideoCodec,
    pub memory_residency: MemoryResidency,
    /// Let the session allocate output surfaces on a stream-ordered allocator.
    pub async_allocations: bool,
}

/// Flags accompanying a submitted packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketFlags(u32);

impl PacketFlags {
    pub const NONE: PacketFlags = PacketFlags(0);
    /// No more data follows; the session should emit every picture it holds.
    pub const END_OF_STREAM: PacketFlags = PacketFlags(1 << 0);

    pub fn contains(self, other: PacketFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

/// A borrowed view of staged bitstream bytes plus metadata.
#[derive(Debug, Clone, Copy)]
pub struct BitstreamPacket<'a> {
    pub data: &'a [u8],
    /// Timestamp of the access unit the bytes belong to.
    pub timestamp: i64,
    pub flags: PacketFlags,
}

/// Failures reported by a session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The submitted bytes could not be decoded; the session is still healthy.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The session cannot be used again.
    #[error("terminal: {0}")]
    Terminal(String),
}

/// A raw picture as returned by a session.
///
/// Its memory belongs to the session and may be overwritten once the session
/// recycles the surface it lives in.
pub trait DecodedPicture {
    fn pixel_format(&self) -> PixelFormat;

    /// Descriptor of the device memory holding the picture.
    ///
    /// The dimensions it carries come from the picture object itself and may
    /// be zero or stale.
    fn device_image(&self) -> DeviceImage;
}

/// A stateful hardware decoder session.
pub trait DecoderSession {
    /// The picture type this session emits.
    type Picture: DecodedPicture;

    /// Creates a session for the given codec and memory residency.
    fn open(config: &SessionConfig) -> Result<Self, SessionError>
    where
        Self: Sized;

    /// Submits one packet and returns every picture that became available,
    /// in output order.
    fn submit(&mut self, packet: BitstreamPacket<'_>) -> Result<Vec<Self::Picture>, SessionError>;

    /// Currently negotiated coded width.
    fn width(&self) -> u32;

    /// Currently negotiated coded height.
    fn height(&self) -> u32;

    /// How many further submissions a picture's surface is guaranteed to
    /// survive. `None` when the session does not say.
    fn retention_depth(&self) -> Option<u64> {
        None
    }
}
