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

//! The handle wrapping one decoded, device-resident picture.

use crate::frame::{FrameInfo, PixelFormat, TimeBase, VIDEO_TIME_BASE};
use crate::session::DecodedPicture;
use crate::tensor::{DeviceImage, GpuTensorView, SampleType};

/// A decoded frame whose pixels stay where the decoder session put them.
///
/// The handle holds the session's picture object and never allocates plane
/// storage of its own. Downstream GPU processing reads the pixels through
/// [`CudaFrame::as_gpu_tensor`], and is expected to rebuild a regular frame
/// before anything is handed to an encoder.
///
/// Width and height are the session's values at the time the frame was
/// produced; the picture object's own fields are not trusted.
///
/// A handle is only valid while its session is alive and has not reused the
/// surface behind it. See [`CudaDecoder::is_frame_retained`](crate::CudaDecoder::is_frame_retained).
#[derive(Debug)]
pub struct CudaFrame<P> {
    picture: P,
    width: u32,
    height: u32,
    pts: i64,
    time_base: TimeBase,
    submission: u64,
}

impl<P: DecodedPicture> CudaFrame<P> {
    pub fn new(picture: P, width: u32, height: u32) -> Self {
        Self {
            picture,
            width,
            height,
            pts: 0,
            time_base: VIDEO_TIME_BASE,
            submission: 0,
        }
    }

    pub fn with_timing(mut self, pts: i64, time_base: TimeBase) -> Self {
        self.pts = pts;
        self.time_base = time_base;
        self
    }

    pub(crate) fn with_submission(mut self, submission: u64) -> Self {
        self.submission = submission;
        self
    }

    /// Width of the image, in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the image, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pts(&self) -> i64 {
        self.pts
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Index of the submission that returned this frame, counted from 1.
    pub fn submission(&self) -> u64 {
        self.submission
    }

    pub fn picture(&self) -> &P {
        &self.picture
    }

    pub fn into_picture(self) -> P {
        self.picture
    }

    pub fn device_image(&self) -> DeviceImage {
        self.picture.device_image()
    }

    /// A view of the frame's device memory as 8-bit samples, shaped with the
    /// frame's own width and height. No copy is made.
    pub fn as_gpu_tensor(&self) -> GpuTensorView<'_> {
        GpuTensorView::wrap(
            self.picture.device_image(),
            self.width,
            self.height,
            SampleType::U8,
        )
    }
}

impl<P: DecodedPicture> FrameInfo for CudaFrame<P> {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel_format(&self) -> PixelFormat {
        self.picture.pixel_format()
    }

    fn pts(&self) -> i64 {
        self.pts
    }

    fn time_base(&self) -> TimeBase {
        self.time_base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPicture;
    use crate::tensor::DevicePtr;

    #[test]
    fn dimensions_come_from_constructor_not_picture() {
        let picture = MockPicture::nv12(0x2000).with_reported_dimensions(0, 0);
        let frame = CudaFrame::new(picture, 1280, 720);
        assert_eq!(frame.width(), 1280);
        assert_eq!(frame.height(), 720);
        assert_eq!(frame.device_image().width, 0);
    }

    #[test]
    fn tensor_view_points_at_picture_memory() {
        let frame = CudaFrame::new(MockPicture::nv12(0xdead_0000), 640, 480);
        let view = frame.as_gpu_tensor();
        assert_eq!(view.data_ptr(), DevicePtr(0xdead_0000));
        assert_eq!(view.sample_type(), SampleType::U8);
        assert_eq!(view.shape(), [720, 640, 1]);
    }

    #[test]
    fn chroma_plane_uses_frame_height_for_stale_picture() {
        let picture = MockPicture::nv12(0x1000)
            .with_reported_dimensions(0, 0)
            .with_pitch(2048);
        let frame = CudaFrame::new(picture, 1920, 1080);
        let view = frame.as_gpu_tensor();
        assert_eq!(view.shape(), [1620, 1920, 1]);
        assert_eq!(view.strides(), [2048, 1, 1]);
        assert_eq!(view.luma_ptr(), DevicePtr(0x1000));
        assert_eq!(view.chroma_ptr(), DevicePtr(0x1000 + 2048 * 1080));
    }

    #[test]
    fn into_picture_returns_wrapped_picture() {
        let picture = MockPicture::nv12(0x4000).with_pitch(512);
        let frame = CudaFrame::new(picture.clone(), 256, 144);
        assert_eq!(frame.picture(), &picture);
        assert_eq!(frame.into_picture(), picture);
    }

    #[test]
    fn timing_defaults_and_overrides() {
        let frame = CudaFrame::new(MockPicture::nv12(0x10), 16, 16);
        assert_eq!(frame.pts(), 0);
        assert_eq!(frame.time_base(), VIDEO_TIME_BASE);

        let frame = frame.with_timing(4500, TimeBase::new(1, 1000));
        assert_eq!(FrameInfo::pts(&frame), 4500);
        assert_eq!(FrameInfo::time_base(&frame), TimeBase::new(1, 1000));
        assert_eq!(FrameInfo::pixel_format(&frame), PixelFormat::Nv12);
    }
}
