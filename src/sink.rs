use alloc::vec::Vec;
use bytes::Bytes;

use crate::common::SinkError;

/// Destination for serialized gif blocks.
///
/// Every call hands over one indivisible piece of the stream; an implementation either takes all
/// of it or fails without keeping any of it.
pub trait ByteSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError>;
}

impl ByteSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.try_reserve(bytes.len())
            .map_err(|_| SinkError::Allocation {
                requested: self.len().saturating_add(bytes.len()),
            })?;
        self.extend_from_slice(bytes);
        Ok(())
    }
}

/// Append-only byte buffer that grows by a factor of 1.5.
///
/// `capacity` is tracked separately from the allocation so the growth sequence is exact and the
/// high-water mark survives [`drain`](GrowableSink::drain).
#[derive(Debug)]
pub struct GrowableSink {
    buf: Vec<u8>,
    capacity: usize,
    /// Largest capacity the allocator will hand out, `None` for no ceiling.
    limit: Option<usize>,
}

impl GrowableSink {
    /// Allocates an empty sink holding `capacity` bytes up front.
    pub fn with_capacity(capacity: usize) -> Result<Self, SinkError> {
        Self::with_limit(capacity, None)
    }

    /// Like [`with_capacity`](GrowableSink::with_capacity), refusing any capacity above `limit`.
    pub fn with_limit(capacity: usize, limit: Option<usize>) -> Result<Self, SinkError> {
        let mut sink = Self {
            buf: Vec::new(),
            capacity: 0,
            limit,
        };
        sink.reserve_exact(capacity)?;
        Ok(sink)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Hands all buffered bytes over as one chunk and starts again from an empty buffer.
    ///
    /// Capacity is kept, the next frame won't have to regrow.
    pub fn drain(&mut self) -> Result<Bytes, SinkError> {
        let mut chunk = Vec::new();
        chunk
            .try_reserve_exact(self.buf.len())
            .map_err(|_| SinkError::Allocation {
                requested: self.buf.len(),
            })?;
        chunk.extend_from_slice(&self.buf);
        self.buf.clear();
        Ok(Bytes::from(chunk))
    }

    /// Drops everything written after `mark`.
    pub fn truncate(&mut self, mark: usize) {
        self.buf.truncate(mark);
    }

    /// Capacity after growing from `capacity` until `required` bytes fit.
    fn grown_capacity(capacity: usize, required: usize) -> Option<usize> {
        if capacity == 0 {
            return Some(required);
        }
        let mut capacity = capacity;
        while capacity < required {
            capacity = capacity.checked_mul(2)? - (capacity >> 1);
        }
        Some(capacity)
    }

    fn reserve_exact(&mut self, capacity: usize) -> Result<(), SinkError> {
        let refused = SinkError::Allocation {
            requested: capacity,
        };
        if self.limit.is_some_and(|limit| capacity > limit) {
            return Err(refused);
        }
        self.buf
            .try_reserve_exact(capacity - self.buf.len())
            .map_err(|_| refused)?;
        self.capacity = capacity;
        Ok(())
    }
}

impl ByteSink for GrowableSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        let required = self
            .buf
            .len()
            .checked_add(bytes.len())
            .ok_or(SinkError::Allocation {
                requested: usize::MAX,
            })?;
        if required > self.capacity {
            let capacity = Self::grown_capacity(self.capacity, required).ok_or(
                SinkError::Allocation {
                    requested: required,
                },
            )?;
            self.reserve_exact(capacity)?;
        }
        self.buf.extend_from_slice(bytes);
        debug_assert!(self.buf.len() <= self.capacity);
        Ok(())
    }
}
