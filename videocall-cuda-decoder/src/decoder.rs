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

//! The decoder adapter: access units in, device-resident frames out.

use crate::cuda_frame::CudaFrame;
use crate::error::{DecodeError, Result};
use crate::frame::{EncodedAccessUnit, PixelFormat, VIDEO_TIME_BASE};
use crate::session::{
    BitstreamPacket, DecodedPicture, DecoderSession, MemoryResidency, PacketFlags, SessionConfig,
    VideoCodec,
};
use crate::staging::StagingBuffer;
use log::{debug, error, trace, warn};
use serde::{Deserialize, Serialize};

/// Counters describing what a decoder has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    /// Access units passed to [`CudaDecoder::decode`].
    pub access_units: u64,
    /// Bytes accepted by the session.
    pub bytes_submitted: u64,
    pub frames_emitted: u64,
    /// Submissions the session answered with no picture.
    pub empty_outputs: u64,
    /// Submissions the session answered with more than one picture.
    pub multi_picture_calls: u64,
    /// Recoverable rejections by the session.
    pub submission_failures: u64,
    pub staging_reallocations: u64,
}

#[derive(Debug)]
enum DecoderState {
    Active,
    Faulted(DecodeError),
}

/// Builder for constructing a [`CudaDecoder`].
#[derive(Debug, Clone, Default)]
pub struct CudaDecoderBuilder {
    /// Parameters the session is opened with.
    pub config: SessionConfig,
    /// Bytes reserved in the staging buffer up front.
    pub initial_staging_capacity: usize,
}

impl CudaDecoderBuilder {
    /// Device-resident output, synchronous allocations, no reserved staging space.
    pub fn new(codec: VideoCodec) -> Self {
        Self {
            config: SessionConfig {
                codec,
                ..SessionConfig::default()
            },
            initial_staging_capacity: 0,
        }
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            initial_staging_capacity: 0,
        }
    }

    pub fn set_memory_residency(mut self, residency: MemoryResidency) -> Self {
        self.config.memory_residency = residency;
        self
    }

    pub fn set_async_allocations(mut self, enabled: bool) -> Self {
        self.config.async_allocations = enabled;
        self
    }

    /// Reserve room for access units up to `bytes` long.
    pub fn set_initial_staging_capacity(mut self, bytes: usize) -> Self {
        self.initial_staging_capacity = bytes;
        self
    }

    /// Opens the session and returns an active decoder.
    pub fn build<S: DecoderSession>(&self) -> Result<CudaDecoder<S>> {
        let session = S::open(&self.config).map_err(|e| {
            error!(
                "[CudaDecoder] Failed to open {:?} session: {}",
                self.config.codec, e
            );
            DecodeError::SessionCreation(e.to_string())
        })?;
        debug!(
            "[CudaDecoder] Opened {:?} session ({:?} memory, async allocations: {})",
            self.config.codec, self.config.memory_residency, self.config.async_allocations
        );
        Ok(CudaDecoder::from_session(session, self.initial_staging_capacity))
    }
}

/// Translates encoded access units into [`CudaFrame`]s using one hardware
/// decoder session.
///
/// Calls are synchronous and must not overlap; the staging buffer and the
/// session belong to whichever thread holds `&mut self`.
///
/// Every frame returned by one call carries that call's access unit
/// timestamp, including when the session releases several pictures at once.
/// The session's own picture timestamps are ignored.
pub struct CudaDecoder<S: DecoderSession> {
    session: S,
    staging: StagingBuffer,
    state: DecoderState,
    submissions: u64,
    last_timestamp: Option<i64>,
    stats: DecodeStats,
}

impl<S: DecoderSession> CudaDecoder<S> {
    /// Opens a session with `config` and no reserved staging space.
    pub fn new(config: &SessionConfig) -> Result<Self> {
        CudaDecoderBuilder::with_config(*config).build()
    }

    /// Wraps a session the caller already opened.
    pub fn from_session(session: S, initial_staging_capacity: usize) -> Self {
        Self {
            session,
            staging: StagingBuffer::with_capacity(initial_staging_capacity),
            state: DecoderState::Active,
            submissions: 0,
            last_timestamp: None,
            stats: DecodeStats::default(),
        }
    }

    /// Decodes one access unit and returns the frames the session released,
    /// in the order it released them.
    ///
    /// An empty result means the session is holding the data internally.
    /// On error no frames are returned for this access unit, including any
    /// the session produced alongside an unsupported picture.
    pub fn decode(
        &mut self,
        access_unit: &EncodedAccessUnit,
    ) -> Result<Vec<CudaFrame<S::Picture>>> {
        self.ensure_active()?;
        self.stats.access_units += 1;
        self.last_timestamp = Some(access_unit.timestamp);
        self.submit(&access_unit.data, access_unit.timestamp, PacketFlags::NONE)
    }

    /// Signals end of stream and returns whatever the session was still
    /// holding for reordering.
    ///
    /// The frames carry the timestamp of the last decoded access unit.
    pub fn flush(&mut self) -> Result<Vec<CudaFrame<S::Picture>>> {
        self.ensure_active()?;
        let timestamp = self.last_timestamp.unwrap_or(0);
        self.submit(&[], timestamp, PacketFlags::END_OF_STREAM)
    }

    fn submit(
        &mut self,
        data: &[u8],
        timestamp: i64,
        flags: PacketFlags,
    ) -> Result<Vec<CudaFrame<S::Picture>>> {
        let staged = self.staging.stage(data);
        self.submissions += 1;
        trace!(
            "[CudaDecoder] Submitting {} bytes, ts {} (submission {})",
            staged.len(),
            timestamp,
            self.submissions
        );
        let packet = BitstreamPacket {
            data: staged,
            timestamp,
            flags,
        };
        let pictures = match self.session.submit(packet) {
            Ok(pictures) => pictures,
            Err(e) => return Err(self.fail(e.into())),
        };
        self.stats.bytes_submitted += data.len() as u64;

        if let Some(bad) = pictures
            .iter()
            .find(|p| p.pixel_format() != PixelFormat::SUPPORTED)
        {
            let err = DecodeError::UnsupportedPixelFormat {
                expected: PixelFormat::SUPPORTED,
                actual: bad.pixel_format(),
            };
            return Err(self.fail(err));
        }

        match pictures.len() {
            0 => self.stats.empty_outputs += 1,
            1 => {}
            n => {
                self.stats.multi_picture_calls += 1;
                debug!(
                    "[CudaDecoder] Session released {} pictures for ts {}; all share that timestamp",
                    n, timestamp
                );
            }
        }

        let width = self.session.width();
        let height = self.session.height();
        let submission = self.submissions;
        let frames: Vec<_> = pictures
            .into_iter()
            .map(|picture| {
                CudaFrame::new(picture, width, height)
                    .with_timing(timestamp, VIDEO_TIME_BASE)
                    .with_submission(submission)
            })
            .collect();
        self.stats.frames_emitted += frames.len() as u64;
        Ok(frames)
    }

    fn ensure_active(&self) -> Result<()> {
        match &self.state {
            DecoderState::Active => Ok(()),
            DecoderState::Faulted(cause) => Err(DecodeError::Faulted(Box::new(cause.clone()))),
        }
    }

    fn fail(&mut self, err: DecodeError) -> DecodeError {
        if err.is_fatal() {
            error!("[CudaDecoder] Fatal decode error, decoder disabled: {}", err);
            self.state = DecoderState::Faulted(err.clone());
        } else {
            warn!("[CudaDecoder] Decode error: {}", err);
            self.stats.submission_failures += 1;
        }
        err
    }

    /// Whether the session can still be relied on to hold `frame`'s surface.
    ///
    /// Always true for sessions that do not report a retention depth.
    pub fn is_frame_retained(&self, frame: &CudaFrame<S::Picture>) -> bool {
        match self.session.retention_depth() {
            None => true,
            Some(depth) => self.submissions.saturating_sub(frame.submission()) <= depth,
        }
    }

    pub fn is_faulted(&self) -> bool {
        matches!(self.state, DecoderState::Faulted(_))
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn staging_capacity(&self) -> usize {
        self.staging.capacity()
    }

    /// Number of packets handed to the session, flushes included.
    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    pub fn stats(&self) -> DecodeStats {
        DecodeStats {
            staging_reallocations: self.staging.reallocations(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPicture, MockResponse, MockSession};
    use crate::session::SessionError;

    fn create_test_decoder() -> CudaDecoder<MockSession> {
        let mut decoder = CudaDecoderBuilder::new(VideoCodec::H264)
            .build::<MockSession>()
            .unwrap();
        decoder.session_mut().set_dimensions(1920, 1080);
        decoder
    }

    fn au(len: usize, timestamp: i64) -> EncodedAccessUnit {
        EncodedAccessUnit::new(vec![0x42; len], timestamp)
    }

    struct BrokenSession;

    impl DecoderSession for BrokenSession {
        type Picture = MockPicture;

        fn open(_config: &SessionConfig) -> std::result::Result<Self, SessionError> {
            Err(SessionError::Terminal("no device".to_string()))
        }

        fn submit(
            &mut self,
            _packet: BitstreamPacket<'_>,
        ) -> std::result::Result<Vec<MockPicture>, SessionError> {
            unreachable!()
        }

        fn width(&self) -> u32 {
            0
        }

        fn height(&self) -> u32 {
            0
        }
    }

    #[test]
    fn builder_passes_config_to_session() {
        let decoder = CudaDecoderBuilder::new(VideoCodec::Hevc)
            .set_memory_residency(MemoryResidency::Host)
            .set_async_allocations(true)
            .set_initial_staging_capacity(4096)
            .build::<MockSession>()
            .unwrap();
        let config = decoder.session().config();
        assert_eq!(config.codec, VideoCodec::Hevc);
        assert_eq!(config.memory_residency, MemoryResidency::Host);
        assert!(config.async_allocations);
        assert_eq!(decoder.staging_capacity(), 4096);
    }

    #[test]
    fn session_open_failure_is_reported() {
        let result = CudaDecoder::<BrokenSession>::new(&SessionConfig::default());
        match result {
            Err(DecodeError::SessionCreation(msg)) => assert!(msg.contains("no device")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("open should have failed"),
        }
    }

    #[test]
    fn rejected_submission_keeps_decoder_usable() {
        let mut decoder = create_test_decoder();
        decoder
            .session_mut()
            .push_response(MockResponse::Reject("corrupt slice".to_string()));
        decoder.session_mut().push_pictures(vec![MockPicture::nv12(0x10)]);

        let err = decoder.decode(&au(100, 1)).unwrap_err();
        assert_eq!(err, DecodeError::SessionSubmission("corrupt slice".to_string()));
        assert!(!decoder.is_faulted());

        let frames = decoder.decode(&au(100, 2)).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].pts(), 2);
        assert_eq!(decoder.stats().submission_failures, 1);
    }

    #[test]
    fn terminal_error_faults_decoder() {
        let mut decoder = create_test_decoder();
        decoder
            .session_mut()
            .push_response(MockResponse::Terminate("device lost".to_string()));

        let err = decoder.decode(&au(10, 1)).unwrap_err();
        assert_eq!(err, DecodeError::SessionTerminal("device lost".to_string()));
        assert!(decoder.is_faulted());
        assert!(decoder.session().is_terminated());

        let err = decoder.decode(&au(10, 2)).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Faulted(Box::new(DecodeError::SessionTerminal(
                "device lost".to_string()
            )))
        );
        // The faulted decoder does not touch the session again.
        assert_eq!(decoder.session().submitted().len(), 1);
        assert!(decoder.flush().is_err());
    }

    #[test]
    fn unsupported_format_faults_decoder() {
        let mut decoder = create_test_decoder();
        decoder
            .session_mut()
            .push_pictures(vec![MockPicture::with_format(0x10, PixelFormat::Yuv444)]);

        let err = decoder.decode(&au(10, 1)).unwrap_err();
        assert!(err.is_fatal());
        assert!(decoder.is_faulted());
        assert!(matches!(
            decoder.decode(&au(10, 2)),
            Err(DecodeError::Faulted(_))
        ));
    }

    #[test]
    fn flush_drains_with_last_timestamp() {
        let mut decoder = create_test_decoder();
        decoder.decode(&au(50, 3000)).unwrap();
        decoder
            .session_mut()
            .push_pictures(vec![MockPicture::nv12(0x10), MockPicture::nv12(0x20)]);

        let frames = decoder.flush().unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.pts() == 3000));

        let last = decoder.session().submitted().last().unwrap();
        assert!(last.data.is_empty());
        assert!(last.flags.contains(PacketFlags::END_OF_STREAM));
        assert_eq!(last.timestamp, 3000);
        // A flush is not an access unit.
        assert_eq!(decoder.stats().access_units, 1);
        assert_eq!(decoder.submissions(), 2);
    }

    #[test]
    fn flush_before_any_input_uses_zero_timestamp() {
        let mut decoder = create_test_decoder();
        assert!(decoder.flush().unwrap().is_empty());
        assert_eq!(decoder.session().submitted()[0].timestamp, 0);
    }

    #[test]
    fn retention_window_tracks_submissions() {
        let mut decoder = create_test_decoder();
        decoder.session_mut().set_retention_depth(Some(2));
        decoder.session_mut().push_pictures(vec![MockPicture::nv12(0x10)]);

        let frame = decoder.decode(&au(10, 1)).unwrap().remove(0);
        assert_eq!(frame.submission(), 1);
        assert!(decoder.is_frame_retained(&frame));

        decoder.decode(&au(10, 2)).unwrap();
        decoder.decode(&au(10, 3)).unwrap();
        assert!(decoder.is_frame_retained(&frame));

        decoder.decode(&au(10, 4)).unwrap();
        assert!(!decoder.is_frame_retained(&frame));

        decoder.session_mut().set_retention_depth(None);
        assert!(decoder.is_frame_retained(&frame));
    }

    #[test]
    fn stats_count_outputs() {
        let mut decoder = create_test_decoder();
        decoder.session_mut().push_pictures(vec![]);
        decoder.session_mut().push_pictures(vec![MockPicture::nv12(0x10)]);
        decoder
            .session_mut()
            .push_pictures(vec![MockPicture::nv12(0x20), MockPicture::nv12(0x30)]);

        decoder.decode(&au(200, 1)).unwrap();
        decoder.decode(&au(100, 2)).unwrap();
        decoder.decode(&au(300, 3)).unwrap();

        let stats = decoder.stats();
        assert_eq!(stats.access_units, 3);
        assert_eq!(stats.bytes_submitted, 600);
        assert_eq!(stats.frames_emitted, 3);
        assert_eq!(stats.empty_outputs, 1);
        assert_eq!(stats.multi_picture_calls, 1);
        assert_eq!(stats.staging_reallocations, 2);
    }
}
