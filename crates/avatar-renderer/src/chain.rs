//! Streaming output assembly.
//!
//! An encoder pushes its output through a [`ByteSink`] in arbitrary-sized
//! chunks. [`ChainBuilder`] copies each chunk into its own immutable
//! [`BufferSegment`] and links them into an [`OutputChain`] that a transport
//! can send segment by segment, without ever joining the image into one
//! contiguous buffer.
//!
//! ## Invariants
//!
//! - One segment per ingested chunk, in ingest order. Zero-length chunks
//!   still get a segment.
//! - Exactly one segment, the last, has `is_last() == true`.
//! - `total_length()` is the sum of all chunk lengths.
//!
//! A failed ingest leaves the builder unusable; callers drop it rather than
//! finishing it, so a partial chain is never observed.

use std::iter::FusedIterator;

use bytes::Bytes;

use crate::alloc::{HeapAllocator, SegmentAllocator, SEGMENT_OVERHEAD};
use crate::error::WriteFailure;

/// Receiver of encoded bytes.
pub trait ByteSink {
    /// Take one chunk of encoded output. The chunk is only borrowed for the
    /// duration of the call.
    fn ingest(&mut self, chunk: &[u8]) -> Result<(), WriteFailure>;
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn ingest(&mut self, chunk: &[u8]) -> Result<(), WriteFailure> {
        (**self).ingest(chunk)
    }
}

impl ByteSink for Vec<u8> {
    fn ingest(&mut self, chunk: &[u8]) -> Result<(), WriteFailure> {
        self.try_reserve(chunk.len())
            .map_err(|_| WriteFailure::Allocation {
                requested: chunk.len(),
            })?;
        self.extend_from_slice(chunk);
        Ok(())
    }
}

/// One immutable block of encoded output.
#[derive(Debug)]
pub struct BufferSegment {
    bytes: Bytes,
    last: bool,
    next: Option<Box<BufferSegment>>,
}

impl BufferSegment {
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether this is the final segment of its chain.
    pub fn is_last(&self) -> bool {
        self.last
    }

    pub fn next(&self) -> Option<&BufferSegment> {
        self.next.as_deref()
    }
}

/// Builds an [`OutputChain`] from incrementally ingested chunks.
#[derive(Debug)]
pub struct ChainBuilder<A: SegmentAllocator = HeapAllocator> {
    allocator: A,
    segments: Vec<BufferSegment>,
    total_length: u64,
}

impl ChainBuilder<HeapAllocator> {
    pub fn new() -> Self {
        Self::with_allocator(HeapAllocator)
    }
}

impl Default for ChainBuilder<HeapAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: SegmentAllocator> ChainBuilder<A> {
    pub fn with_allocator(allocator: A) -> Self {
        Self {
            allocator,
            // Most renders are a handful of PNG chunks
            segments: Vec::with_capacity(8),
            total_length: 0,
        }
    }

    /// Number of segments ingested so far.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Sum of all ingested chunk lengths.
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Link the ingested segments into a chain.
    pub fn finish(self) -> OutputChain {
        let len = self.segments.len();
        let mut head: Option<Box<BufferSegment>> = None;
        for mut segment in self.segments.into_iter().rev() {
            segment.next = head;
            head = Some(Box::new(segment));
        }
        OutputChain {
            head,
            total_length: self.total_length,
            len,
        }
    }
}

impl<A: SegmentAllocator> ByteSink for ChainBuilder<A> {
    fn ingest(&mut self, chunk: &[u8]) -> Result<(), WriteFailure> {
        // The encoder may reuse its buffer after we return
        let bytes = self.allocator.copy_bytes(chunk)?;

        self.allocator.reserve_segment()?;
        self.segments
            .try_reserve(1)
            .map_err(|_| WriteFailure::Allocation {
                requested: SEGMENT_OVERHEAD,
            })?;

        if let Some(tail) = self.segments.last_mut() {
            tail.last = false;
        }
        self.segments.push(BufferSegment {
            bytes,
            last: true,
            next: None,
        });
        self.total_length += chunk.len() as u64;
        Ok(())
    }
}

/// Ordered, singly-linked sequence of output segments.
///
/// The chain owns its head and, through `next`, every later segment.
#[derive(Debug, Default)]
pub struct OutputChain {
    head: Option<Box<BufferSegment>>,
    total_length: u64,
    len: usize,
}

impl OutputChain {
    pub fn head(&self) -> Option<&BufferSegment> {
        self.head.as_deref()
    }

    /// Sum of all segment lengths; the value for `Content-Length`.
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn iter(&self) -> Segments<'_> {
        Segments {
            next: self.head.as_deref(),
        }
    }

    /// Concatenate all segments. Meant for tests and small consumers; a
    /// transport should iterate instead.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_length as usize);
        for segment in self.iter() {
            out.extend_from_slice(segment.bytes());
        }
        out
    }
}

/// Drop a chain link by link instead of recursing through `Box` drops.
fn unlink(mut next: Option<Box<BufferSegment>>) {
    while let Some(mut segment) = next {
        next = segment.next.take();
    }
}

impl Drop for OutputChain {
    fn drop(&mut self) {
        unlink(self.head.take());
    }
}

impl<'a> IntoIterator for &'a OutputChain {
    type Item = &'a BufferSegment;
    type IntoIter = Segments<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for OutputChain {
    type Item = Bytes;
    type IntoIter = IntoSegments;

    fn into_iter(mut self) -> Self::IntoIter {
        IntoSegments {
            next: self.head.take(),
            remaining: self.len,
        }
    }
}

/// Borrowing iterator over a chain's segments.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    next: Option<&'a BufferSegment>,
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a BufferSegment;

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.next?;
        self.next = segment.next();
        Some(segment)
    }
}

impl FusedIterator for Segments<'_> {}

/// Owning iterator yielding each segment's bytes in chain order.
#[derive(Debug)]
pub struct IntoSegments {
    next: Option<Box<BufferSegment>>,
    remaining: usize,
}

impl Iterator for IntoSegments {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        let mut segment = self.next.take()?;
        self.next = segment.next.take();
        self.remaining -= 1;
        Some(segment.bytes)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for IntoSegments {}

impl FusedIterator for IntoSegments {}

impl Drop for IntoSegments {
    fn drop(&mut self) {
        unlink(self.next.take());
    }
}
