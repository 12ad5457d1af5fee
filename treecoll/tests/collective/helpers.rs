use std::sync::Arc;
use treecoll::{CollConfig, Collectives, LocalComm};

/// Helper: run a collective operation across N in-process ranks concurrently.
/// Keeps all handles alive until every task completes.
pub async fn run_collective<F, Fut>(world_size: u32, f: F)
where
    F: Fn(Arc<Collectives<LocalComm>>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    run_collective_with_config(world_size, CollConfig::default(), f).await
}

pub async fn run_collective_with_config<F, Fut>(world_size: u32, config: CollConfig, f: F)
where
    F: Fn(Arc<Collectives<LocalComm>>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let clients: Vec<Arc<Collectives<LocalComm>>> = LocalComm::mesh(world_size)
        .unwrap()
        .into_iter()
        .map(|comm| Arc::new(Collectives::with_config(comm, config.clone())))
        .collect();

    let f = Arc::new(f);
    let mut handles = Vec::new();
    for c in &clients {
        let c = Arc::clone(c);
        let f = Arc::clone(&f);
        handles.push(tokio::spawn(async move { f(c).await }));
    }
    for h in handles {
        h.await.unwrap();
    }
}

pub fn assert_close_f64(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-9, "{a} != {e}");
    }
}

pub fn assert_close_f32(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-4, "{a} != {e}");
    }
}
