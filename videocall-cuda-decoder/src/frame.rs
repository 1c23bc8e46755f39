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

//! Contains the fundamental data structures for encoded input and decoded output.

use serde::{Deserialize, Serialize};

/// RTP clock rate for video, in Hz.
pub const VIDEO_CLOCK_RATE: u32 = 90_000;

/// The time base every decoded frame's `pts` is expressed in.
pub const VIDEO_TIME_BASE: TimeBase = TimeBase::new(1, VIDEO_CLOCK_RATE);

/// A rational unit of time, `num / den` seconds per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBase {
    pub num: u32,
    pub den: u32,
}

impl TimeBase {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Converts a timestamp in this time base to seconds.
    pub fn seconds(&self, pts: i64) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        pts as f64 * self.num as f64 / self.den as f64
    }
}

/// Sample and plane layout of a decoded picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit 4:2:0, a luma plane followed by one interleaved UV plane.
    Nv12,
    /// 16-bit 4:2:0 with interleaved chroma (10/12-bit content).
    P016,
    /// 8-bit 4:4:4 planar.
    Yuv444,
    /// 16-bit 4:4:4 planar.
    Yuv444_16Bit,
}

impl PixelFormat {
    /// The one layout [`CudaFrame`](crate::CudaFrame) knows how to expose.
    pub const SUPPORTED: PixelFormat = PixelFormat::Nv12;
}

/// One reassembled access unit, as handed over by the jitter buffer.
///
/// `data` holds one or more complete encoded packets for a single
/// presentation instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedAccessUnit {
    /// The encoded video data.
    pub data: Vec<u8>,
    /// Presentation time in [`VIDEO_TIME_BASE`] ticks.
    pub timestamp: i64,
}

impl EncodedAccessUnit {
    pub fn new(data: Vec<u8>, timestamp: i64) -> Self {
        Self { data, timestamp }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// The read-only view downstream processing expects of a decoded video frame.
pub trait FrameInfo {
    /// Width of the image, in pixels.
    fn width(&self) -> u32;

    /// Height of the image, in pixels.
    fn height(&self) -> u32;

    fn pixel_format(&self) -> PixelFormat;

    /// Presentation timestamp in [`FrameInfo::time_base`] units.
    fn pts(&self) -> i64;

    fn time_base(&self) -> TimeBase;
}
