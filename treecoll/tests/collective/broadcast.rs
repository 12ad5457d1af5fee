use treecoll::{CollConfig, CollError, Rank, TreeShape};

use super::helpers::{run_collective, run_collective_with_config};

#[tokio::test]
async fn test_broadcast_from_root_0() {
    run_collective(3, |client| async move {
        let rank = client.rank();
        let mut data: Vec<f32> = if rank == Rank::ROOT {
            vec![42.0, 43.0, 44.0, 45.0]
        } else {
            vec![0.0; 4]
        };

        client.broadcast(&mut data, Rank::ROOT).await.unwrap();

        assert_eq!(
            data,
            vec![42.0, 43.0, 44.0, 45.0],
            "rank {rank} broadcast failed"
        );
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_from_nonzero_root_every_shape() {
    let shapes = [
        TreeShape::KNomial { arity: 3 },
        TreeShape::Heap { arity: 1 },
        TreeShape::Heap { arity: 2 },
        TreeShape::Star,
    ];
    for shape in shapes {
        for world in 1..=9u32 {
            let root = world / 2;
            let config = CollConfig::default().with_tree(shape);
            run_collective_with_config(world, config, move |client| async move {
                let rank = client.rank();
                let mut data: Vec<i64> = if rank.get() == root {
                    vec![99, -100, 101]
                } else {
                    vec![0; 3]
                };
                client.broadcast(&mut data, Rank::new(root)).await.unwrap();
                assert_eq!(data, vec![99, -100, 101], "{shape} world {world} rank {rank}");
            })
            .await;
        }
    }
}

#[tokio::test]
async fn test_broadcast_twice_is_idempotent() {
    run_collective(5, |client| async move {
        let mut data = if client.rank() == Rank::new(4) {
            vec![7u32, 8, 9]
        } else {
            vec![client.rank().get(); 3]
        };
        client.broadcast(&mut data, Rank::new(4)).await.unwrap();
        let first = data.clone();
        client.broadcast(&mut data, Rank::new(4)).await.unwrap();
        assert_eq!(data, first);
        assert_eq!(data, vec![7, 8, 9]);
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_empty_buffer() {
    run_collective(4, |client| async move {
        let mut data: Vec<u8> = Vec::new();
        client.broadcast(&mut data, Rank::new(2)).await.unwrap();
        assert!(data.is_empty());
    })
    .await;
}

#[tokio::test]
async fn test_broadcast_length_mismatch_fails_only_that_rank() {
    run_collective(4, |client| async move {
        let rank = client.rank();
        let len = if rank == Rank::new(2) { 2 } else { 3 };
        let mut data: Vec<u32> = if rank == Rank::ROOT {
            vec![5, 6, 7]
        } else {
            vec![0; len]
        };
        let result = client.broadcast(&mut data, Rank::ROOT).await;
        if rank == Rank::new(2) {
            assert!(matches!(
                result,
                Err(CollError::BufferSizeMismatch {
                    expected: 8,
                    actual: 12
                })
            ));
        } else {
            result.unwrap();
            assert_eq!(data, vec![5, 6, 7], "rank {rank}");
        }
    })
    .await;
}
