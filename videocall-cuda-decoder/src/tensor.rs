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

//! Non-owning descriptors over device-resident picture memory.

use std::fmt;
use std::marker::PhantomData;

/// A raw device address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DevicePtr(pub u64);

impl DevicePtr {
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn offset(self, bytes: u64) -> DevicePtr {
        DevicePtr(self.0.wrapping_add(bytes))
    }
}

impl fmt::Debug for DevicePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevicePtr({:#x})", self.0)
    }
}

/// Where a decoded picture lives in device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceImage {
    /// Start of the luma plane.
    pub ptr: DevicePtr,
    /// Bytes between consecutive rows, shared by both planes.
    pub pitch: u32,
    /// Width as recorded on the picture.
    pub width: u32,
    /// Height as recorded on the picture.
    pub height: u32,
}

impl DeviceImage {
    pub fn new(ptr: DevicePtr, pitch: u32, width: u32, height: u32) -> Self {
        Self {
            ptr,
            pitch,
            width,
            height,
        }
    }
}

/// Element type of a tensor view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
}

impl SampleType {
    pub fn size_in_bytes(self) -> usize {
        match self {
            SampleType::U8 => 1,
        }
    }
}

/// A view of a 4:2:0 two-plane picture as a single-channel tensor of
/// `height * 3 / 2` rows by `width` columns.
///
/// Planes are tightly stacked: chroma starts `height` rows after luma, with
/// `height` taken from the frame rather than from the picture object.
///
/// The view never owns or copies the memory it points at. It is only handed
/// out by [`CudaFrame::as_gpu_tensor`](crate::CudaFrame::as_gpu_tensor),
/// borrows that frame, and is only meaningful while the session has not
/// recycled the underlying surface.
#[derive(Debug, Clone, Copy)]
pub struct GpuTensorView<'a> {
    image: DeviceImage,
    width: u32,
    height: u32,
    sample: SampleType,
    _frame: PhantomData<&'a ()>,
}

impl GpuTensorView<'_> {
    /// Wraps `image` using the given geometry rather than the image's own.
    pub(crate) fn wrap(image: DeviceImage, width: u32, height: u32, sample: SampleType) -> Self {
        Self {
            image,
            width,
            height,
            sample,
            _frame: PhantomData,
        }
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample
    }

    pub fn data_ptr(&self) -> DevicePtr {
        self.image.ptr
    }

    pub fn luma_ptr(&self) -> DevicePtr {
        self.image.ptr
    }

    pub fn chroma_ptr(&self) -> DevicePtr {
        self.image
            .ptr
            .offset(self.image.pitch as u64 * self.height as u64)
    }

    /// `[rows, columns, channels]`.
    pub fn shape(&self) -> [usize; 3] {
        let luma_rows = self.height as usize;
        let chroma_rows = (self.height as usize).div_ceil(2);
        [luma_rows + chroma_rows, self.width as usize, 1]
    }

    /// Byte strides matching [`GpuTensorView::shape`].
    pub fn strides(&self) -> [usize; 3] {
        let elem = self.sample.size_in_bytes();
        [self.image.pitch as usize, elem, elem]
    }
}
