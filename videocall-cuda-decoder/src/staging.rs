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

//! The reusable input buffer bitstream bytes are staged in before submission.

use log::debug;

/// A grow-only byte region owned by one decoder.
///
/// Storage is reallocated only when an access unit is larger than every one
/// staged before it; otherwise the bytes are copied over the existing
/// storage. Capacity never shrinks.
#[derive(Debug, Default)]
pub struct StagingBuffer {
    storage: Box<[u8]>,
    len: usize,
    reallocations: u64,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sizes the buffer so access units up to `capacity` bytes never allocate.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            reallocations: 0,
        }
    }

    /// Copies `data` into the buffer, growing it first if needed, and returns
    /// the staged bytes.
    pub fn stage(&mut self, data: &[u8]) -> &[u8] {
        if data.len() > self.storage.len() {
            debug!(
                "[STAGING] Growing staging buffer from {} to {} bytes",
                self.storage.len(),
                data.len()
            );
            self.storage = data.to_vec().into_boxed_slice();
            self.reallocations += 1;
        } else {
            self.storage[..data.len()].copy_from_slice(data);
        }
        self.len = data.len();
        &self.storage[..self.len]
    }

    /// The most recently staged bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of times the backing storage has been replaced.
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }
}
