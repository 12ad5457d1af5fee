use std::time::Duration;
use treecoll::{CollConfig, CollError, Rank, ReduceOp, TreeShape};

use super::helpers::{run_collective, run_collective_with_config};

#[tokio::test]
async fn test_reduce_sum_to_root_0() {
    run_collective(4, |client| async move {
        let rank = client.rank();
        let local = [rank.get() as i32 + 1; 3];
        let out = client.reduce(&local, ReduceOp::Sum, Rank::ROOT).await.unwrap();
        if rank == Rank::ROOT {
            assert_eq!(out, Some(vec![10; 3]));
        } else {
            assert_eq!(out, None, "rank {rank} should not hold the result");
        }
    })
    .await;
}

#[tokio::test]
async fn test_reduce_to_nonzero_root() {
    for shape in [TreeShape::BINOMIAL, TreeShape::BINARY_HEAP, TreeShape::Star] {
        for root in 0..6u32 {
            let config = CollConfig::default().with_tree(shape);
            run_collective_with_config(6, config, move |client| async move {
                let rank = client.rank();
                let local = [rank.get() as u64 * 2, 1];
                let out = client
                    .reduce(&local, ReduceOp::Max, Rank::new(root))
                    .await
                    .unwrap();
                if rank.get() == root {
                    assert_eq!(out, Some(vec![10, 1]), "{shape} root {root}");
                } else {
                    assert!(out.is_none());
                }
            })
            .await;
        }
    }
}

#[tokio::test]
async fn test_reduce_single_rank() {
    run_collective(1, |client| async move {
        let out = client
            .reduce(&[-7i8, 5], ReduceOp::Min, Rank::ROOT)
            .await
            .unwrap();
        assert_eq!(out, Some(vec![-7, 5]));
    })
    .await;
}

#[tokio::test]
async fn test_reduce_invalid_root_fails_everywhere() {
    run_collective(3, |client| async move {
        let err = client
            .reduce(&[1u32], ReduceOp::Sum, Rank::new(3))
            .await
            .unwrap_err();
        assert!(err.is_configuration(), "{err}");
    })
    .await;
}

#[tokio::test]
async fn test_reduce_length_mismatch_reaches_root() {
    // No collective timeout: a lost rejection would hang here.
    let run = run_collective(4, |client| async move {
        let rank = client.rank();
        let local = if rank == Rank::new(3) {
            vec![1u32; 2]
        } else {
            vec![1u32; 3]
        };
        let result = client.reduce(&local, ReduceOp::Sum, Rank::ROOT).await;
        if rank == Rank::ROOT {
            assert!(matches!(
                result,
                Err(CollError::BufferSizeMismatch {
                    expected: 12,
                    actual: 8
                })
            ));
        }

        // Every message of the failed reduce was consumed.
        let out = client
            .all_reduce(&[rank.get()], ReduceOp::Sum)
            .await
            .unwrap();
        assert_eq!(out, vec![6]);
    });
    tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("reduce with mismatched lengths did not complete");
}
