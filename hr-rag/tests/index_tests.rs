//! Property tests for vector index search ordering.

use hr_rag::document::Segment;
use hr_rag::error::RagError;
use hr_rag::index::VectorIndex;
use proptest::prelude::*;

const DIM: usize = 8;

fn segment(i: usize) -> Segment {
    Segment {
        id: format!("doc_{i}"),
        document_id: "doc".to_string(),
        index: i,
        start: i,
        end: i + 1,
        text: format!("segment {i}"),
    }
}

/// Generate a non-zero embedding of the given dimension.
fn arb_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim)
        .prop_filter("non-zero embedding", |v| v.iter().any(|x| x.abs() > 1e-4))
}

/// Embeddings drawn from a small pool so that exact score ties are common.
fn arb_embeddings_with_repeats() -> impl Strategy<Value = Vec<Vec<f32>>> {
    proptest::collection::vec(arb_embedding(DIM), 1..4).prop_flat_map(|pool| {
        let len = pool.len();
        proptest::collection::vec(0..len, 1..24)
            .prop_map(move |picks| picks.into_iter().map(|i| pool[i].clone()).collect::<Vec<Vec<f32>>>())
    })
}

mod prop_index_query {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn returns_exactly_k_in_descending_stable_order(
            embeddings in arb_embeddings_with_repeats(),
            query in arb_embedding(DIM),
            k_seed in 0usize..1000,
        ) {
            let mut index = VectorIndex::new();
            for (i, embedding) in embeddings.iter().enumerate() {
                index.insert(segment(i), embedding.clone()).unwrap();
            }

            let n = embeddings.len();
            let k = 1 + k_seed % n;
            let results = index.query(&query, k).unwrap();

            prop_assert_eq!(results.len(), k);
            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
                if window[0].score == window[1].score {
                    prop_assert!(window[0].segment.index < window[1].segment.index);
                }
            }
        }

        #[test]
        fn oversized_k_returns_every_entry(
            embeddings in proptest::collection::vec(arb_embedding(DIM), 1..10),
            query in arb_embedding(DIM),
        ) {
            let mut index = VectorIndex::new();
            for (i, embedding) in embeddings.iter().enumerate() {
                index.insert(segment(i), embedding.clone()).unwrap();
            }
            let results = index.query(&query, embeddings.len() + 5).unwrap();
            prop_assert_eq!(results.len(), embeddings.len());
        }

        #[test]
        fn mismatched_insert_is_rejected(
            first in arb_embedding(DIM),
            other in arb_embedding(DIM + 1),
        ) {
            let mut index = VectorIndex::new();
            index.insert(segment(0), first).unwrap();
            let err = index.insert(segment(1), other).unwrap_err();
            prop_assert!(
                matches!(err, RagError::DimensionMismatch { expected: DIM, actual } if actual == DIM + 1),
                "unexpected error: {err}"
            );
            prop_assert_eq!(index.len(), 1);
        }
    }
}

#[test]
fn empty_index_query_fails() {
    let index = VectorIndex::new();
    assert!(matches!(index.query(&[1.0; DIM], 3), Err(RagError::EmptyIndex)));
}

#[test]
fn nearest_segment_ranks_first() {
    let mut index = VectorIndex::new();
    index.insert(segment(0), vec![1.0, 0.0, 0.0]).unwrap();
    index.insert(segment(1), vec![0.0, 1.0, 0.0]).unwrap();
    index.insert(segment(2), vec![0.0, 0.0, 1.0]).unwrap();

    let results = index.query(&[0.1, 0.9, 0.2], 2).unwrap();
    assert_eq!(results[0].segment.id, "doc_1");
    assert_eq!(results[1].segment.id, "doc_2");
}
