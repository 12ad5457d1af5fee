mod async_client;
mod collectives;
mod sync_client;

pub use async_client::Collectives;
pub use sync_client::SyncCollectives;
