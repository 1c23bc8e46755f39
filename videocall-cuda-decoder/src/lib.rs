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

//! A hardware video decoder adapter that keeps decoded pictures on the GPU.
//!
//! [`CudaDecoder`] owns one [`DecoderSession`] and a reusable
//! [`StagingBuffer`]. Each call to [`CudaDecoder::decode`] takes one
//! reassembled [`EncodedAccessUnit`] and returns zero or more [`CudaFrame`]s,
//! lightweight handles over pictures that stay resident in the memory the
//! session decoded them into.
//!
//! ```
//! use videocall_cuda_decoder::mock::{MockPicture, MockSession};
//! use videocall_cuda_decoder::{CudaDecoderBuilder, EncodedAccessUnit, VideoCodec};
//!
//! let mut decoder = CudaDecoderBuilder::new(VideoCodec::H264)
//!     .build::<MockSession>()
//!     .unwrap();
//! decoder.session_mut().set_dimensions(1280, 720);
//! decoder.session_mut().push_pictures(vec![MockPicture::nv12(0x1000)]);
//!
//! let frames = decoder
//!     .decode(&EncodedAccessUnit::new(vec![0, 0, 0, 1, 0x65], 3000))
//!     .unwrap();
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].pts(), 3000);
//! assert_eq!((frames[0].width(), frames[0].height()), (1280, 720));
//! ```

pub mod cuda_frame;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod mock;
pub mod session;
pub mod staging;
pub mod tensor;

pub use cuda_frame::CudaFrame;
pub use decoder::{CudaDecoder, CudaDecoderBuilder, DecodeStats};
pub use error::{DecodeError, Result};
pub use frame::{EncodedAccessUnit, FrameInfo, PixelFormat, TimeBase, VIDEO_TIME_BASE};
pub use session::{
    BitstreamPacket, DecodedPicture, DecoderSession, MemoryResidency, PacketFlags, SessionConfig,
    SessionError, VideoCodec,
};
pub use staging::StagingBuffer;
pub use tensor::{DeviceImage, DevicePtr, GpuTensorView, SampleType};
