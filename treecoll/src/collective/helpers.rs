use crate::config::CollConfig;
use crate::error::{CollError, Result};
use crate::topology::{TreeNode, TreeShape, rooted_node};
use crate::transport::Communicator;
use crate::types::{COLLECTIVE_TAG_BIT, Rank, Tag};
use std::future::Future;

/// Tags for each collective phase. Per-`(source, tag)` FIFO delivery plus
/// identical call order on every rank is what lets these stay fixed across
/// calls.
pub(crate) const REDUCE_TAG: Tag = COLLECTIVE_TAG_BIT | 1;
pub(crate) const BROADCAST_TAG: Tag = COLLECTIVE_TAG_BIT | 2;
pub(crate) const GATHER_COUNT_TAG: Tag = COLLECTIVE_TAG_BIT | 3;
pub(crate) const GATHER_TABLE_TAG: Tag = COLLECTIVE_TAG_BIT | 4;
pub(crate) const GATHER_DATA_TAG: Tag = COLLECTIVE_TAG_BIT | 5;
pub(crate) const SCATTER_TABLE_TAG: Tag = COLLECTIVE_TAG_BIT | 6;
pub(crate) const SCATTER_DATA_TAG: Tag = COLLECTIVE_TAG_BIT | 7;

/// Leading byte of every reduce and broadcast frame.
const FRAME_OK: u8 = 0;
/// Followed by the `(expected, actual)` byte counts of the first mismatch.
const FRAME_REJECTED: u8 = 1;

/// Reduce and broadcast frame carrying element bytes.
pub(crate) fn ok_frame(body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(body.len() + 1);
    frame.push(FRAME_OK);
    frame.extend_from_slice(body);
    frame
}

/// Frame telling the rest of the tree that some rank saw a length mismatch.
pub(crate) fn rejected_frame(expected: usize, actual: usize) -> Vec<u8> {
    let mut frame = Vec::with_capacity(17);
    frame.push(FRAME_REJECTED);
    frame.extend_from_slice(&(expected as u64).to_le_bytes());
    frame.extend_from_slice(&(actual as u64).to_le_bytes());
    frame
}

/// Element bytes of an accepted frame holding exactly `expected` bytes.
///
/// A rejected frame, or a body of the wrong length, yields
/// `BufferSizeMismatch`.
pub(crate) fn open_frame(frame: &[u8], expected: usize) -> Result<&[u8]> {
    match frame.split_first() {
        Some((&FRAME_OK, body)) if body.len() == expected => Ok(body),
        Some((&FRAME_OK, body)) => Err(CollError::BufferSizeMismatch {
            expected,
            actual: body.len(),
        }),
        Some((&FRAME_REJECTED, counts)) if counts.len() == 16 => {
            let (e, a) = counts.split_at(8);
            let mut word = [0u8; 8];
            word.copy_from_slice(e);
            let expected = u64::from_le_bytes(word) as usize;
            word.copy_from_slice(a);
            let actual = u64::from_le_bytes(word) as usize;
            Err(CollError::BufferSizeMismatch { expected, actual })
        }
        _ => Err(CollError::transport(format!(
            "malformed collective frame of {} bytes",
            frame.len()
        ))),
    }
}

/// One collective invocation: the communicator, its config, and the
/// operation name used in errors and logs.
pub(crate) struct Call<'a, C: ?Sized> {
    pub comm: &'a C,
    pub config: &'a CollConfig,
    pub operation: &'static str,
}

impl<'a, C: Communicator + ?Sized> Call<'a, C> {
    pub(crate) fn new(comm: &'a C, config: &'a CollConfig, operation: &'static str) -> Self {
        Self {
            comm,
            config,
            operation,
        }
    }

    pub(crate) fn rank(&self) -> Rank {
        self.comm.rank()
    }

    pub(crate) fn size(&self) -> u32 {
        self.comm.size()
    }

    /// This rank's node in the configured tree re-rooted at `root`.
    /// Fails before any message moves when the root or shape is invalid.
    pub(crate) fn node(&self, root: Rank) -> Result<TreeNode> {
        self.node_in(self.config.tree, root)
    }

    pub(crate) fn node_in(&self, shape: TreeShape, root: Rank) -> Result<TreeNode> {
        rooted_node(self.rank(), self.size(), root, shape)
    }

    /// Send bytes to a peer, wrapping errors as `CollectiveFailed`.
    pub(crate) async fn send(&self, dest: Rank, tag: Tag, data: &[u8]) -> Result<()> {
        tracing::trace!(op = self.operation, src = %self.rank(), %dest, len = data.len(), "send");
        self.deadline(dest, "send", self.comm.send_bytes(dest, tag, data))
            .await
    }

    /// Receive bytes from a peer, wrapping errors as `CollectiveFailed`.
    pub(crate) async fn recv(&self, src: Rank, tag: Tag) -> Result<Vec<u8>> {
        let payload = self
            .deadline(src, "recv", self.comm.recv_bytes(src, tag))
            .await?;
        tracing::trace!(
            op = self.operation,
            %src,
            dest = %self.rank(),
            len = payload.len(),
            "recv"
        );
        Ok(payload)
    }

    /// Receive exactly `expected` bytes from a peer.
    pub(crate) async fn recv_exact(&self, src: Rank, tag: Tag, expected: usize) -> Result<Vec<u8>> {
        let payload = self.recv(src, tag).await?;
        if payload.len() != expected {
            return Err(CollError::BufferSizeMismatch {
                expected,
                actual: payload.len(),
            });
        }
        Ok(payload)
    }

    async fn deadline<T>(
        &self,
        peer: Rank,
        what: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let outcome = match self.config.collective_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(CollError::CollectiveFailed {
                        operation: self.operation,
                        rank: peer,
                        reason: format!("{what} timed out after {}ms", limit.as_millis()),
                    });
                }
            },
            None => fut.await,
        };
        outcome.map_err(|e| CollError::CollectiveFailed {
            operation: self.operation,
            rank: peer,
            reason: e.to_string(),
        })
    }
}
