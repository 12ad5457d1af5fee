mod local;
pub(crate) mod mailbox;
mod tcp;

pub use local::LocalComm;
pub use tcp::TcpComm;

use crate::error::Result;
use crate::types::{Rank, Tag};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Point-to-point contract every collective is built on.
///
/// Implementations must deliver payloads from one source on one tag in the
/// order they were sent. A send may complete as soon as the payload is
/// queued for the destination; a receive blocks until a payload from `src`
/// on `tag` is available.
pub trait Communicator: Send + Sync {
    /// This handle's rank, `0 <= rank < size`.
    fn rank(&self) -> Rank;

    /// Number of ranks in the group.
    fn size(&self) -> u32;

    /// Send raw bytes to `dest` on `tag`.
    fn send_bytes<'a>(&'a self, dest: Rank, tag: Tag, data: &'a [u8]) -> BoxFuture<'a, Result<()>>;

    /// Receive the next payload from `src` on `tag`.
    fn recv_bytes<'a>(&'a self, src: Rank, tag: Tag) -> BoxFuture<'a, Result<Vec<u8>>>;
}

impl<C: Communicator + ?Sized> Communicator for Arc<C> {
    fn rank(&self) -> Rank {
        (**self).rank()
    }

    fn size(&self) -> u32 {
        (**self).size()
    }

    fn send_bytes<'a>(&'a self, dest: Rank, tag: Tag, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        (**self).send_bytes(dest, tag, data)
    }

    fn recv_bytes<'a>(&'a self, src: Rank, tag: Tag) -> BoxFuture<'a, Result<Vec<u8>>> {
        (**self).recv_bytes(src, tag)
    }
}
