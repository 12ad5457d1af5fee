//! Variable-count gather and scatter with the blocking API.
//!
//! Rank `r` contributes `r + 1` values. Rank 0 gathers them, doubles every
//! element, and scatters the same layout back.
//!
//! ```bash
//! cargo run --example gatherv
//! ```

use tracing_subscriber::EnvFilter;
use treecoll::{Rank, SyncCollectives};

fn main() -> treecoll::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let clients = SyncCollectives::local_mesh(4)?;

    let results: Vec<treecoll::Result<(Rank, Vec<u32>)>> = std::thread::scope(|s| {
        let handles: Vec<_> = clients
            .iter()
            .map(|c| {
                s.spawn(move || -> treecoll::Result<(Rank, Vec<u32>)> {
                    let rank = c.rank();
                    let local: Vec<u32> = (0..=rank.get()).map(|i| rank.get() * 10 + i).collect();

                    let mut recv = vec![0u32; 10];
                    let layout = c.gather_into(&local, &mut recv, Rank::ROOT)?;
                    if rank == Rank::ROOT {
                        println!("gathered {recv:?} offsets {:?}", layout.offsets());
                        recv.iter_mut().for_each(|v| *v *= 2);
                    }

                    let mine = c.scatter(&recv, layout.counts(), Rank::ROOT)?;
                    Ok((rank, mine))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(treecoll::CollError::transport("rank thread panicked"))
                })
            })
            .collect()
    });

    for result in results {
        let (rank, mine) = result?;
        println!("rank {rank}: {mine:?}");
    }
    // rank 0: [0]
    // rank 1: [20, 22]
    // rank 2: [40, 42, 44]
    // rank 3: [60, 62, 64, 66]

    Ok(())
}
