use crate::error::{CollError, Result};
use crate::types::{Rank, Tag};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

type LaneReceiver = Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>;

/// One FIFO per `(source, tag)`.
struct Lane {
    /// `None` once the source disconnected; queued payloads stay readable.
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: LaneReceiver,
}

/// One lane per `(source, tag)` ever used. Lanes of a live source persist,
/// so callers cycling through unbounded user tags grow this map; a lane whose
/// source closed is dropped once a receiver has drained it.
#[derive(Default)]
struct Lanes {
    lanes: HashMap<(Rank, Tag), Lane>,
    closed: HashSet<Rank>,
}

/// Receive-side demultiplexer shared by every transport.
///
/// A lane is created by whichever side touches it first, so a payload that
/// arrives before its receiver is queued rather than dropped. Delivery is
/// unbounded: a send completes once the payload is queued at the receiver.
#[derive(Default)]
pub(crate) struct Mailbox {
    inner: std::sync::Mutex<Lanes>,
}

impl Mailbox {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lane<R>(&self, src: Rank, tag: Tag, f: impl FnOnce(&mut Lane) -> R) -> Result<R> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CollError::LockPoisoned("mailbox lanes"))?;
        if inner.closed.contains(&src) && !inner.lanes.contains_key(&(src, tag)) {
            // Nothing can arrive any more; hand out a closed lane without
            // recording it.
            let (_, rx) = mpsc::unbounded_channel();
            let mut lane = Lane {
                tx: None,
                rx: Arc::new(Mutex::new(rx)),
            };
            return Ok(f(&mut lane));
        }
        let lane = inner.lanes.entry((src, tag)).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            Lane {
                tx: Some(tx),
                rx: Arc::new(Mutex::new(rx)),
            }
        });
        Ok(f(lane))
    }

    /// Queue a payload from `src` on `tag`.
    pub(crate) fn deliver(&self, src: Rank, tag: Tag, payload: Vec<u8>) -> Result<()> {
        let tx = self.lane(src, tag, |lane| lane.tx.clone())?;
        match tx {
            Some(tx) => tx
                .send(payload)
                .map_err(|_| CollError::PeerDisconnected { rank: src }),
            None => Err(CollError::PeerDisconnected { rank: src }),
        }
    }

    /// Wait for the next payload from `src` on `tag`.
    pub(crate) async fn recv(&self, src: Rank, tag: Tag) -> Result<Vec<u8>> {
        let rx = self.lane(src, tag, |lane| Arc::clone(&lane.rx))?;
        let next = rx.lock().await.recv().await;
        match next {
            Some(payload) => Ok(payload),
            None => {
                self.forget(src, tag);
                Err(CollError::PeerDisconnected { rank: src })
            }
        }
    }

    /// Drop a drained lane whose source is gone.
    fn forget(&self, src: Rank, tag: Tag) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner
            .lanes
            .get(&(src, tag))
            .is_some_and(|lane| lane.tx.is_none())
        {
            inner.lanes.remove(&(src, tag));
        }
    }

    #[cfg(test)]
    fn lane_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.lanes.len()).unwrap_or(0)
    }

    /// Mark `src` gone: pending payloads drain, then receivers see
    /// `PeerDisconnected`.
    pub(crate) fn close_peer(&self, src: Rank) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.closed.insert(src);
        for ((from, _), lane) in inner.lanes.iter_mut() {
            if *from == src {
                lane.tx = None;
            }
        }
    }
}
