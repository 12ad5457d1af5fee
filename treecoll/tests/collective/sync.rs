use treecoll::{CollError, Rank, ReduceOp, SyncCollectives};

#[test]
fn test_sync_allreduce_and_gather() {
    let clients = SyncCollectives::local_mesh(4).unwrap();
    std::thread::scope(|s| {
        for client in &clients {
            s.spawn(move || {
                let rank = client.rank();
                let out = client
                    .all_reduce(&[(rank.get() as i64 + 1) * 10], ReduceOp::Sum)
                    .unwrap();
                assert_eq!(out, vec![100]);

                let local = vec![rank.get(); rank.index()];
                let gathered = client.gather(&local, Rank::new(3)).unwrap();
                if rank == Rank::new(3) {
                    assert_eq!(gathered, Some(vec![1, 2, 2, 3, 3, 3]));
                }

                client.barrier().unwrap();
            });
        }
    });
}

#[test]
fn test_sync_broadcast_and_scatter() {
    let clients = SyncCollectives::local_mesh(3).unwrap();
    std::thread::scope(|s| {
        for client in &clients {
            s.spawn(move || {
                let mut buf = if client.rank() == Rank::ROOT {
                    vec![1.25f32, 2.5]
                } else {
                    vec![0.0; 2]
                };
                client.broadcast(&mut buf, Rank::ROOT).unwrap();
                assert_eq!(buf, vec![1.25, 2.5]);

                let mine = client.scatter(&[5u8, 6, 7], &[1, 1, 1], Rank::ROOT).unwrap();
                assert_eq!(mine, vec![5 + client.rank().get() as u8]);
            });
        }
    });
}

#[test]
fn test_sync_point_to_point() {
    let clients = SyncCollectives::local_mesh(2).unwrap();
    clients[0].send(&[9u32, 8], Rank::new(1), 3).unwrap();
    let mut buf = [0u32; 2];
    clients[1].recv(&mut buf, Rank::ROOT, 3).unwrap();
    assert_eq!(buf, [9, 8]);
}

#[test]
fn test_sync_empty_world() {
    assert!(matches!(
        SyncCollectives::local_mesh(0),
        Err(CollError::EmptyWorld)
    ));
}
