use std::time::Duration;
use treecoll::{CollConfig, CollError, ReduceOp, TreeShape};

use super::helpers::{
    assert_close_f32, assert_close_f64, run_collective, run_collective_with_config,
};

const SHAPES: [TreeShape; 7] = [
    TreeShape::KNomial { arity: 2 },
    TreeShape::KNomial { arity: 3 },
    TreeShape::KNomial { arity: 4 },
    TreeShape::Heap { arity: 1 },
    TreeShape::Heap { arity: 2 },
    TreeShape::Heap { arity: 3 },
    TreeShape::Star,
];

#[tokio::test]
async fn test_allreduce_4_nodes_i64_sum() {
    run_collective(4, |client| async move {
        let rank = client.rank().get() as i64;
        let local = [(rank + 1) * 10];
        let out = client.all_reduce(&local, ReduceOp::Sum).await.unwrap();
        assert_eq!(out, vec![100], "rank {rank} allreduce failed");
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_every_shape_and_size() {
    for shape in SHAPES {
        for world in 1..=9u32 {
            let config = CollConfig::default().with_tree(shape);
            run_collective_with_config(world, config, move |client| async move {
                let rank = client.rank().get() as i32;
                let local = [rank, -rank, 1, rank * rank];
                let out = client.all_reduce(&local, ReduceOp::Sum).await.unwrap();

                let n = world as i32;
                let sum: i32 = (0..n).sum();
                let squares: i32 = (0..n).map(|r| r * r).sum();
                assert_eq!(out, vec![sum, -sum, n, squares], "{shape} world {world} rank {rank}");
            })
            .await;
        }
    }
}

#[tokio::test]
async fn test_allreduce_min_max_prod() {
    run_collective(5, |client| async move {
        let rank = client.rank().get() as i64;
        let local = [rank + 1, 10 - rank];

        let max = client.all_reduce(&local, ReduceOp::Max).await.unwrap();
        assert_eq!(max, vec![5, 10]);

        let min = client.all_reduce(&local, ReduceOp::Min).await.unwrap();
        assert_eq!(min, vec![1, 6]);

        let prod = client.all_reduce(&local, ReduceOp::Prod).await.unwrap();
        assert_eq!(prod, vec![120, 10 * 9 * 8 * 7 * 6]);
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_f64_within_epsilon() {
    run_collective(6, |client| async move {
        let rank = client.rank().get() as f64;
        let local = [0.1 * (rank + 1.0), -0.5];
        let out = client.all_reduce(&local, ReduceOp::Sum).await.unwrap();
        assert_close_f64(&out, &[2.1, -3.0]);
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_f32_within_epsilon() {
    run_collective(3, |client| async move {
        let rank = client.rank().get() as f32;
        let mut data = vec![rank + 1.0; 4];
        client
            .all_reduce_in_place(&mut data, ReduceOp::Sum)
            .await
            .unwrap();
        assert_close_f32(&data, &[6.0; 4]);
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_single_rank_is_identity() {
    run_collective(1, |client| async move {
        let out = client
            .all_reduce(&[3u8, 1, 4], ReduceOp::Prod)
            .await
            .unwrap();
        assert_eq!(out, vec![3, 1, 4]);
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_zero_elements() {
    run_collective(4, |client| async move {
        let out = client
            .all_reduce::<u32>(&[], ReduceOp::Sum)
            .await
            .unwrap();
        assert!(out.is_empty());
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_back_to_back() {
    run_collective(7, |client| async move {
        let rank = client.rank().get() as u64;
        for round in 0..5u64 {
            let out = client
                .all_reduce(&[rank + round], ReduceOp::Sum)
                .await
                .unwrap();
            assert_eq!(out, vec![21 + 7 * round], "round {round}");
        }
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_length_mismatch_fails_every_rank() {
    for shape in SHAPES {
        let config = CollConfig::default().with_tree(shape);
        let run = run_collective_with_config(5, config, move |client| async move {
            let rank = client.rank().get();
            let local = if rank == 4 { vec![0i64; 2] } else { vec![0i64; 3] };
            let err = client
                .all_reduce(&local, ReduceOp::Sum)
                .await
                .unwrap_err();
            assert!(
                matches!(err, CollError::BufferSizeMismatch { .. }),
                "{shape} rank {rank}: {err}"
            );
        });
        tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .expect("allreduce with mismatched lengths did not complete");
    }
}
