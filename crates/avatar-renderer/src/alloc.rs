//! Allocation capability for output segments.
//!
//! The chain builder asks an injected [`SegmentAllocator`] for every segment
//! and every byte copy it makes, instead of reaching for a global pool. Each
//! render owns its allocator, so a host can bound per-request memory
//! ([`BoundedAllocator`]) or just use the heap ([`HeapAllocator`]).

use bytes::Bytes;

use crate::error::WriteFailure;

/// Bookkeeping size charged for one segment header.
pub const SEGMENT_OVERHEAD: usize = std::mem::size_of::<crate::chain::BufferSegment>();

/// Source of memory for output segments.
pub trait SegmentAllocator {
    /// Return an owned, exact-length copy of `data`.
    fn copy_bytes(&mut self, data: &[u8]) -> Result<Bytes, WriteFailure>;

    /// Account for one new segment header.
    fn reserve_segment(&mut self) -> Result<(), WriteFailure>;
}

impl<A: SegmentAllocator + ?Sized> SegmentAllocator for &mut A {
    fn copy_bytes(&mut self, data: &[u8]) -> Result<Bytes, WriteFailure> {
        (**self).copy_bytes(data)
    }

    fn reserve_segment(&mut self) -> Result<(), WriteFailure> {
        (**self).reserve_segment()
    }
}

/// Fallible copy onto the heap.
fn heap_copy(data: &[u8]) -> Result<Bytes, WriteFailure> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(data.len())
        .map_err(|_| WriteFailure::Allocation {
            requested: data.len(),
        })?;
    buffer.extend_from_slice(data);
    Ok(Bytes::from(buffer))
}

/// Plain heap allocation; only fails when the system allocator does.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl SegmentAllocator for HeapAllocator {
    fn copy_bytes(&mut self, data: &[u8]) -> Result<Bytes, WriteFailure> {
        heap_copy(data)
    }

    fn reserve_segment(&mut self) -> Result<(), WriteFailure> {
        Ok(())
    }
}

/// Heap allocation within a fixed byte budget.
///
/// Both segment headers ([`SEGMENT_OVERHEAD`] each) and payload bytes count
/// against the budget. Once exhausted, every further request fails.
#[derive(Debug, Clone)]
pub struct BoundedAllocator {
    budget: usize,
    used: usize,
}

impl BoundedAllocator {
    pub fn new(budget: usize) -> Self {
        Self { budget, used: 0 }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.budget - self.used
    }

    fn charge(&mut self, requested: usize) -> Result<(), WriteFailure> {
        let remaining = self.remaining();
        if requested > remaining {
            return Err(WriteFailure::BudgetExceeded {
                requested,
                remaining,
            });
        }
        self.used += requested;
        Ok(())
    }
}

impl SegmentAllocator for BoundedAllocator {
    fn copy_bytes(&mut self, data: &[u8]) -> Result<Bytes, WriteFailure> {
        self.charge(data.len())?;
        heap_copy(data)
    }

    fn reserve_segment(&mut self) -> Result<(), WriteFailure> {
        self.charge(SEGMENT_OVERHEAD)
    }
}
