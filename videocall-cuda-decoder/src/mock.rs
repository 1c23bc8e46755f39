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

//! A scripted decoder session that does nothing, for testing and simulation.

use crate::frame::PixelFormat;
use crate::session::{
    BitstreamPacket, DecodedPicture, DecoderSession, PacketFlags, SessionConfig, SessionError,
};
use crate::tensor::{DeviceImage, DevicePtr};
use std::collections::VecDeque;

/// A picture handed out by [`MockSession`].
///
/// By default it reports zero width and height, like a raw session picture
/// whose own geometry fields were never filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPicture {
    format: PixelFormat,
    image: DeviceImage,
}

impl MockPicture {
    pub fn nv12(ptr: u64) -> Self {
        Self::with_format(ptr, PixelFormat::Nv12)
    }

    pub fn with_format(ptr: u64, format: PixelFormat) -> Self {
        Self {
            format,
            image: DeviceImage {
                ptr: DevicePtr(ptr),
                ..DeviceImage::default()
            },
        }
    }

    pub fn with_reported_dimensions(mut self, width: u32, height: u32) -> Self {
        self.image.width = width;
        self.image.height = height;
        self
    }

    pub fn with_pitch(mut self, pitch: u32) -> Self {
        self.image.pitch = pitch;
        self
    }
}

impl DecodedPicture for MockPicture {
    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn device_image(&self) -> DeviceImage {
        self.image
    }
}

/// What the session does with the next submitted packet.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    Pictures(Vec<MockPicture>),
    Reject(String),
    Terminate(String),
}

/// A copy of a packet the session received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedPacket {
    pub data: Vec<u8>,
    /// Address of the caller's buffer at submission time.
    pub data_addr: usize,
    pub timestamp: i64,
    pub flags: PacketFlags,
}

/// A decoder session that replays queued responses.
///
/// Each submission pops one [`MockResponse`]; when the queue is empty the
/// session behaves as if it buffered the bytes and returns no pictures.
#[derive(Debug, Default)]
pub struct MockSession {
    config: SessionConfig,
    width: u32,
    height: u32,
    retention_depth: Option<u64>,
    responses: VecDeque<MockResponse>,
    submitted: Vec<SubmittedPacket>,
    terminated: bool,
}

impl MockSession {
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Changes the dimensions the session reports, as after a new SPS.
    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn set_retention_depth(&mut self, depth: Option<u64>) {
        self.retention_depth = depth;
    }

    pub fn push_response(&mut self, response: MockResponse) {
        self.responses.push_back(response);
    }

    pub fn push_pictures(&mut self, pictures: Vec<MockPicture>) {
        self.push_response(MockResponse::Pictures(pictures));
    }

    /// Every packet received so far, oldest first.
    pub fn submitted(&self) -> &[SubmittedPacket] {
        &self.submitted
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl DecoderSession for MockSession {
    type Picture = MockPicture;

    fn open(config: &SessionConfig) -> Result<Self, SessionError> {
        Ok(Self {
            config: *config,
            ..Self::default()
        })
    }

    fn submit(&mut self, packet: BitstreamPacket<'_>) -> Result<Vec<MockPicture>, SessionError> {
        if self.terminated {
            return Err(SessionError::Terminal("session already terminated".to_string()));
        }
        self.submitted.push(SubmittedPacket {
            data: packet.data.to_vec(),
            data_addr: packet.data.as_ptr() as usize,
            timestamp: packet.timestamp,
            flags: packet.flags,
        });
        match self.responses.pop_front() {
            None => Ok(Vec::new()),
            Some(MockResponse::Pictures(pictures)) => Ok(pictures),
            Some(MockResponse::Reject(reason)) => Err(SessionError::Rejected(reason)),
            Some(MockResponse::Terminate(reason)) => {
                self.terminated = true;
                Err(SessionError::Terminal(reason))
            }
        }
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn retention_depth(&self) -> Option<u64> {
        self.retention_depth
    }
}
