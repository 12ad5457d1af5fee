use crate::config::CollConfig;
use crate::error::{CollError, Result};
use crate::reduce::{Element, decode_into, encode};
use crate::transport::Communicator;
use crate::types::{COLLECTIVE_TAG_BIT, Rank, Tag};

/// The async entry point for tree collectives over a [`Communicator`].
///
/// Holds the communicator handle and the tuning config. Every rank of the
/// group builds its own `Collectives` and calls the same operations in the
/// same order.
///
/// # Example
///
/// ```no_run
/// use treecoll::{Collectives, LocalComm, ReduceOp};
///
/// # async fn example() -> treecoll::Result<()> {
/// let mut handles = Vec::new();
/// for comm in LocalComm::mesh(4)? {
///     handles.push(tokio::spawn(async move {
///         let coll = Collectives::new(comm);
///         let local = [coll.rank().get() as i64 * 10 + 10];
///         coll.all_reduce(&local, ReduceOp::Sum).await
///     }));
/// }
/// for handle in handles {
///     assert_eq!(handle.await.unwrap()?, vec![100]);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Collectives<C> {
    pub(super) comm: C,
    pub(super) config: CollConfig,
}

impl<C: Communicator> Collectives<C> {
    /// Wrap `comm` with the default config.
    pub fn new(comm: C) -> Self {
        Self::with_config(comm, CollConfig::default())
    }

    pub fn with_config(comm: C, config: CollConfig) -> Self {
        Self { comm, config }
    }

    /// This handle's rank (0-indexed).
    pub fn rank(&self) -> Rank {
        self.comm.rank()
    }

    /// Number of ranks in the group.
    pub fn size(&self) -> u32 {
        self.comm.size()
    }

    pub fn config(&self) -> &CollConfig {
        &self.config
    }

    /// The underlying point-to-point handle.
    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn into_inner(self) -> C {
        self.comm
    }

    /// Send a typed buffer to `dest` on a user tag.
    ///
    /// Tags with the top bit set are reserved for collective traffic.
    pub async fn send<T: Element>(&self, data: &[T], dest: Rank, tag: Tag) -> Result<()> {
        check_user_tag(tag)?;
        dest.check(self.size())?;
        self.comm.send_bytes(dest, tag, &encode(data)).await
    }

    /// Receive exactly `buf.len()` elements from `src` on a user tag.
    pub async fn recv<T: Element>(&self, buf: &mut [T], src: Rank, tag: Tag) -> Result<()> {
        check_user_tag(tag)?;
        src.check(self.size())?;
        let payload = self.comm.recv_bytes(src, tag).await?;
        decode_into(buf, &payload)
    }
}

fn check_user_tag(tag: Tag) -> Result<()> {
    if tag & COLLECTIVE_TAG_BIT != 0 {
        return Err(CollError::InvalidTag { tag });
    }
    Ok(())
}
