use treecoll::{CollConfig, CollError, Rank, TreeShape};

use super::helpers::{run_collective, run_collective_with_config};

/// Rank `r` contributes `counts[r]` consecutive values starting after
/// everything lower ranks contributed, so the gather is `1..=total`.
fn contribution(counts: &[usize], rank: Rank) -> Vec<i32> {
    let start: usize = counts[..rank.index()].iter().sum();
    (start..start + counts[rank.index()])
        .map(|v| v as i32 + 1)
        .collect()
}

#[tokio::test]
async fn test_gather_variable_counts() {
    run_collective(3, |client| async move {
        let rank = client.rank();
        let local = contribution(&[2, 3, 1], rank);
        let out = client.gather(&local, Rank::ROOT).await.unwrap();
        if rank == Rank::ROOT {
            assert_eq!(out, Some(vec![1, 2, 3, 4, 5, 6]));
        } else {
            assert_eq!(out, None);
        }
    })
    .await;
}

#[tokio::test]
async fn test_gather_into_reports_displacements() {
    run_collective(3, |client| async move {
        let rank = client.rank();
        let local = contribution(&[2, 3, 1], rank);
        let mut recv = vec![0; 6];
        let layout = client
            .gather_into(&local, &mut recv, Rank::ROOT)
            .await
            .unwrap();
        assert_eq!(layout.counts(), &[2, 3, 1]);
        assert_eq!(layout.offsets(), &[0, 2, 5]);
        if rank == Rank::ROOT {
            assert_eq!(recv, vec![1, 2, 3, 4, 5, 6]);
        }
    })
    .await;
}

#[tokio::test]
async fn test_gather_into_inconsistent_counts_moves_nothing() {
    run_collective(3, |client| async move {
        let rank = client.rank();
        let local = contribution(&[2, 3, 1], rank);
        let mut recv = vec![-1; 5];
        let err = client
            .gather_into(&local, &mut recv, Rank::ROOT)
            .await
            .unwrap_err();
        assert!(matches!(err, CollError::InvalidCounts { .. }), "rank {rank}: {err}");
        assert_eq!(recv, vec![-1; 5], "rank {rank} buffer was written");

        // The group is still usable afterwards.
        let mut recv = vec![0; 6];
        client.gather_into(&local, &mut recv, Rank::ROOT).await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_gather_zero_counts_and_nonzero_root() {
    for shape in [TreeShape::BINOMIAL, TreeShape::Heap { arity: 1 }, TreeShape::Star] {
        run_collective_with_config(5, CollConfig::default().with_tree(shape), |client| async move {
            let counts = [0, 4, 0, 0, 2];
            let root = Rank::new(3);
            let local = contribution(&counts, client.rank());
            let out = client.gather(&local, root).await.unwrap();
            if client.rank() == root {
                assert_eq!(out, Some(vec![1, 2, 3, 4, 5, 6]));
            }
        })
        .await;
    }
}

#[tokio::test]
async fn test_gather_single_rank() {
    run_collective(1, |client| async move {
        let out = client.gather(&[4.5f64, 5.5], Rank::ROOT).await.unwrap();
        assert_eq!(out, Some(vec![4.5, 5.5]));
    })
    .await;
}

#[tokio::test]
async fn test_gather_invalid_root() {
    run_collective(2, |client| async move {
        let err = client.gather(&[1u8], Rank::new(5)).await.unwrap_err();
        assert!(matches!(err, CollError::InvalidRank { .. }));
    })
    .await;
}

#[tokio::test]
async fn test_scatter_variable_counts() {
    run_collective(4, |client| async move {
        let rank = client.rank();
        let root = Rank::new(1);
        let counts = [1, 0, 3, 2];
        let (full, send_counts): (Vec<u32>, &[usize]) = if rank == root {
            ((10..16).collect(), &counts[..])
        } else {
            (Vec::new(), &[][..])
        };
        let mine = client.scatter(&full, send_counts, root).await.unwrap();
        let expected: Vec<u32> = match rank.get() {
            0 => vec![10],
            1 => vec![],
            2 => vec![11, 12, 13],
            _ => vec![14, 15],
        };
        assert_eq!(mine, expected, "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_scatter_single_rank() {
    run_collective(1, |client| async move {
        let mine = client
            .scatter(&[7i32, 8, 9], &[3], Rank::ROOT)
            .await
            .unwrap();
        assert_eq!(mine, vec![7, 8, 9]);
    })
    .await;
}

#[tokio::test]
async fn test_scatter_bad_counts_fail_everywhere() {
    run_collective(3, |client| async move {
        let root = Rank::ROOT;
        let full = vec![1u64; 5];
        // Sums to 6 against a 5-element buffer.
        let err = client.scatter(&full, &[2, 2, 2], root).await.unwrap_err();
        assert!(matches!(err, CollError::InvalidCounts { .. }), "{err}");

        // Wrong number of counts.
        let err = client.scatter(&full, &[5], root).await.unwrap_err();
        assert!(matches!(err, CollError::InvalidCounts { .. }), "{err}");

        let mine = client.scatter(&full, &[1, 2, 2], root).await.unwrap();
        assert_eq!(mine.len(), [1, 2, 2][client.rank().index()]);
    })
    .await;
}

#[tokio::test]
async fn test_gather_then_scatter_round_trip() {
    run_collective(5, |client| async move {
        let rank = client.rank();
        let counts = [3usize, 1, 0, 2, 4];
        let local: Vec<i64> = (0..counts[rank.index()] as i64)
            .map(|i| rank.get() as i64 * 100 + i)
            .collect();
        let root = Rank::new(2);

        let gathered = client.gather(&local, root).await.unwrap();
        let full = gathered.unwrap_or_default();
        let back = client.scatter(&full, &counts, root).await.unwrap();
        assert_eq!(back, local, "rank {rank}");
    })
    .await;
}

#[tokio::test]
async fn test_all_gather_variable_counts() {
    run_collective(4, |client| async move {
        let counts = [1, 2, 0, 3];
        let local = contribution(&counts, client.rank());
        let out = client.all_gather(&local).await.unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
    })
    .await;
}
