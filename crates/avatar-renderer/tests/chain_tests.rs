//! Tests for the output chain assembler.

use avatar_renderer::alloc::SEGMENT_OVERHEAD;
use avatar_renderer::{BoundedAllocator, ByteSink, ChainBuilder, WriteFailure};

fn chunk(i: usize) -> Vec<u8> {
    // Lengths cycle through 0..=7, including empty chunks
    (0..i % 8).map(|b| (i + b) as u8).collect()
}

#[test]
fn test_chain_invariants_for_many_chunks() {
    for n in [1usize, 2, 3, 17, 256] {
        let mut builder = ChainBuilder::new();
        let mut expected = Vec::new();
        for i in 0..n {
            let c = chunk(i);
            builder.ingest(&c).unwrap();
            expected.extend_from_slice(&c);
        }
        assert_eq!(builder.segment_count(), n);

        let chain = builder.finish();
        assert_eq!(chain.len(), n);
        assert_eq!(chain.total_length(), expected.len() as u64);
        assert_eq!(chain.to_vec(), expected);

        let last_positions: Vec<usize> = chain
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_last())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(last_positions, vec![n - 1], "n = {n}");

        for (i, segment) in chain.iter().enumerate() {
            assert_eq!(segment.len(), chunk(i).len());
        }
    }
}

#[test]
fn test_owned_iteration_matches_borrowed() {
    let mut builder = ChainBuilder::new();
    for i in 0..10 {
        builder.ingest(&chunk(i)).unwrap();
    }
    let chain = builder.finish();
    let borrowed: Vec<Vec<u8>> = chain.iter().map(|s| s.bytes().to_vec()).collect();

    let owned = chain.into_iter();
    assert_eq!(owned.len(), 10);
    let owned: Vec<Vec<u8>> = owned.map(|b| b.to_vec()).collect();
    assert_eq!(owned, borrowed);
}

#[test]
fn test_partially_consumed_iterator_drops_cleanly() {
    let mut builder = ChainBuilder::new();
    for i in 0..1000 {
        builder.ingest(&chunk(i)).unwrap();
    }
    let mut iter = builder.finish().into_iter();
    iter.next();
    iter.next();
    assert_eq!(iter.len(), 998);
    drop(iter);
}

#[test]
fn test_bounded_builder_charges_headers_and_payload() {
    let mut builder = ChainBuilder::with_allocator(BoundedAllocator::new(1024));
    builder.ingest(&[1; 10]).unwrap();
    builder.ingest(&[]).unwrap();
    assert_eq!(builder.allocator().used(), 2 * SEGMENT_OVERHEAD + 10);
}

#[test]
fn test_failed_ingest_reports_allocation_failure() {
    let mut builder = ChainBuilder::with_allocator(BoundedAllocator::new(4));
    let err = builder.ingest(&[0; 8]).unwrap_err();
    assert_eq!(
        err,
        WriteFailure::BudgetExceeded {
            requested: 8,
            remaining: 4
        }
    );
    assert_eq!(builder.segment_count(), 0);
}
