use super::Communicator;
use super::mailbox::Mailbox;
use crate::error::{CollError, Result};
use crate::types::{Rank, Tag};
use futures::future::BoxFuture;
use std::sync::Arc;

/// In-process communicator: one handle per simulated rank, all sharing a
/// set of mailboxes.
///
/// Lets every collective run as N tokio tasks (or N threads) in a single
/// process. Dropping a handle disconnects it from its peers; payloads it
/// already sent stay readable.
///
/// ```
/// use treecoll::{Communicator, LocalComm};
///
/// let comms = LocalComm::mesh(4).unwrap();
/// assert_eq!(comms[2].rank().get(), 2);
/// assert_eq!(comms[2].size(), 4);
/// ```
pub struct LocalComm {
    rank: Rank,
    mailboxes: Arc<Vec<Mailbox>>,
}

impl LocalComm {
    /// Create `size` connected handles, indexed by rank.
    pub fn mesh(size: u32) -> Result<Vec<LocalComm>> {
        if size == 0 {
            return Err(CollError::EmptyWorld);
        }
        let mailboxes: Arc<Vec<Mailbox>> = Arc::new((0..size).map(|_| Mailbox::new()).collect());
        Ok((0..size)
            .map(|r| LocalComm {
                rank: Rank::new(r),
                mailboxes: Arc::clone(&mailboxes),
            })
            .collect())
    }

    fn mailbox(&self, rank: Rank) -> Result<&Mailbox> {
        self.mailboxes
            .get(rank.index())
            .ok_or(CollError::UnknownPeer { rank })
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> u32 {
        self.mailboxes.len() as u32
    }

    fn send_bytes<'a>(&'a self, dest: Rank, tag: Tag, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            tracing::trace!(src = %self.rank, %dest, tag, len = data.len(), "local send");
            self.mailbox(dest)?.deliver(self.rank, tag, data.to_vec())
        })
    }

    fn recv_bytes<'a>(&'a self, src: Rank, tag: Tag) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            src.check(self.size())?;
            let payload = self.mailbox(self.rank)?.recv(src, tag).await?;
            tracing::trace!(%src, dest = %self.rank, tag, len = payload.len(), "local recv");
            Ok(payload)
        })
    }
}

impl Drop for LocalComm {
    fn drop(&mut self) {
        for (r, mailbox) in self.mailboxes.iter().enumerate() {
            if r != self.rank.index() {
                mailbox.close_peer(self.rank);
            }
        }
    }
}
