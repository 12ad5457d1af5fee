//! Tree allreduce across 4 in-process ranks.
//!
//! Each rank starts with its own data. After all_reduce(Sum), every rank
//! holds the element-wise sum of all inputs.
//!
//! ```bash
//! RUST_LOG=treecoll=debug cargo run --example allreduce
//! ```

use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use treecoll::{CollConfig, Collectives, LocalComm, ReduceOp};

#[tokio::main]
async fn main() -> treecoll::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let world_size = 4u32;
    let config = CollConfig::from_env();
    println!("tree: {}", config.tree);

    let clients: Vec<Arc<Collectives<LocalComm>>> = LocalComm::mesh(world_size)?
        .into_iter()
        .map(|comm| Arc::new(Collectives::with_config(comm, config.clone())))
        .collect();

    let count = 8usize;

    // rank 0: [0.0, 0.0, ...], rank 1: [1.0, 1.0, ...], etc.
    let mut handles = Vec::new();
    for client in &clients {
        let c = Arc::clone(client);
        handles.push(tokio::spawn(async move {
            let rank = c.rank();
            let local = vec![rank.get() as f32; count];
            let data = c.all_reduce(&local, ReduceOp::Sum).await?;
            treecoll::Result::Ok((rank, data))
        }));
    }

    for h in handles {
        let (rank, data) = h
            .await
            .map_err(|e| treecoll::CollError::transport_with_source("rank task", e))??;
        println!("rank {rank}: {data:?}");
    }
    // Output (all ranks identical):
    // rank 0: [6.0, 6.0, 6.0, 6.0, 6.0, 6.0, 6.0, 6.0]
    // ...

    Ok(())
}
