use super::Communicator;
use super::mailbox::Mailbox;
use crate::config::CollConfig;
use crate::error::{CollError, Result};
use crate::types::{Rank, Tag};
use futures::future::{BoxFuture, try_join_all};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

/// Delay between connection attempts to a peer that is not listening yet.
const CONNECT_RETRY: Duration = Duration::from_millis(50);

/// Full-mesh TCP communicator.
///
/// Every pair of ranks shares one TCP connection carrying
/// `[tag: u64 LE][len: u64 LE][payload]` frames. One background task per peer
/// reads frames and queues them by `(peer, tag)`, so receives on different
/// tags never block each other.
///
/// Mesh formation: rank `i` listens on `addrs[i]`, dials every lower rank and
/// accepts every higher one. A dialing rank announces itself by writing its
/// rank as `u32 LE` right after connecting.
pub struct TcpComm {
    rank: Rank,
    size: u32,
    writers: HashMap<Rank, Mutex<OwnedWriteHalf>>,
    mailbox: Arc<Mailbox>,
    recv_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl TcpComm {
    /// Bind `addrs[rank]` and connect to every other address in `addrs`.
    ///
    /// All ranks must call this with the same address list.
    pub async fn connect(rank: Rank, addrs: &[SocketAddr], config: &CollConfig) -> Result<Self> {
        let size = world_size(addrs)?;
        rank.check(size)?;
        let addr = addrs[rank.index()];
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CollError::transport_with_source(format!("tcp listen on {addr}"), e))?;
        Self::establish(rank, listener, addrs, config).await
    }

    /// Form the mesh using an already-bound listener for `rank`.
    pub async fn establish(
        rank: Rank,
        listener: TcpListener,
        addrs: &[SocketAddr],
        config: &CollConfig,
    ) -> Result<Self> {
        let size = world_size(addrs)?;
        rank.check(size)?;

        let dials = (0..rank.get()).map(|peer| {
            let peer = Rank::new(peer);
            dial(peer, addrs[peer.index()], rank, config.connect_timeout)
        });
        let expected = (size - 1 - rank.get()) as usize;
        let accepts = async {
            match tokio::time::timeout(
                config.connect_timeout,
                accept_peers(&listener, rank, size, expected),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(CollError::transport(format!(
                    "rank {rank} timed out waiting for {expected} higher ranks to connect"
                ))),
            }
        };
        let (dialed, accepted) = tokio::try_join!(try_join_all(dials), accepts)?;

        let mailbox = Arc::new(Mailbox::new());
        let mut writers = HashMap::new();
        let mut recv_handles = Vec::new();
        for (peer, stream) in dialed.into_iter().chain(accepted) {
            let (reader, writer) = stream.into_split();
            let mb = Arc::clone(&mailbox);
            let max_frame = config.max_frame_bytes;
            recv_handles.push(tokio::spawn(async move {
                recv_loop(peer, reader, &mb, max_frame).await;
                mb.close_peer(peer);
            }));
            writers.insert(peer, Mutex::new(writer));
        }

        tracing::debug!(%rank, size, "tcp mesh established");
        Ok(Self {
            rank,
            size,
            writers,
            mailbox,
            recv_handles,
        })
    }

    /// Form a loopback mesh of `size` ranks on ephemeral ports.
    pub async fn bootstrap_local(size: u32, config: &CollConfig) -> Result<Vec<TcpComm>> {
        if size == 0 {
            return Err(CollError::EmptyWorld);
        }
        let loopback: SocketAddr = SocketAddr::from(([127, 0, 0, 1], 0));
        let mut listeners = Vec::new();
        let mut addrs = Vec::new();
        for _ in 0..size {
            let listener = TcpListener::bind(loopback).await?;
            addrs.push(listener.local_addr()?);
            listeners.push(listener);
        }
        let addrs = &addrs;
        try_join_all(
            listeners
                .into_iter()
                .enumerate()
                .map(|(r, l)| Self::establish(Rank::new(r as u32), l, addrs, config)),
        )
        .await
    }

    /// Write one frame: `[tag: u64 LE][len: u64 LE][payload]`.
    async fn write_frame(&self, dest: Rank, tag: Tag, data: &[u8]) -> Result<()> {
        let writer = self
            .writers
            .get(&dest)
            .ok_or(CollError::UnknownPeer { rank: dest })?;
        let mut writer = writer.lock().await;
        writer
            .write_all(&tag.to_le_bytes())
            .await
            .map_err(|e| CollError::transport_with_source("tcp write tag", e))?;
        writer
            .write_all(&(data.len() as u64).to_le_bytes())
            .await
            .map_err(|e| CollError::transport_with_source("tcp write len", e))?;
        writer
            .write_all(data)
            .await
            .map_err(|e| CollError::transport_with_source("tcp write payload", e))?;
        writer
            .flush()
            .await
            .map_err(|e| CollError::transport_with_source("tcp flush", e))?;
        Ok(())
    }
}

impl Communicator for TcpComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn send_bytes<'a>(&'a self, dest: Rank, tag: Tag, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            dest.check(self.size)?;
            if dest == self.rank {
                return self.mailbox.deliver(self.rank, tag, data.to_vec());
            }
            self.write_frame(dest, tag, data).await
        })
    }

    fn recv_bytes<'a>(&'a self, src: Rank, tag: Tag) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            src.check(self.size)?;
            self.mailbox.recv(src, tag).await
        })
    }
}

impl Drop for TcpComm {
    fn drop(&mut self) {
        for handle in &self.recv_handles {
            handle.abort();
        }
    }
}

fn world_size(addrs: &[SocketAddr]) -> Result<u32> {
    match u32::try_from(addrs.len()) {
        Ok(0) => Err(CollError::EmptyWorld),
        Ok(n) => Ok(n),
        Err(_) => Err(CollError::transport(format!(
            "{} addresses exceed the rank space",
            addrs.len()
        ))),
    }
}

/// Connect to a lower rank, retrying until it listens or `timeout` elapses.
async fn dial(
    peer: Rank,
    addr: SocketAddr,
    me: Rank,
    timeout: Duration,
) -> Result<(Rank, TcpStream)> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut stream = loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => break stream,
            Err(e) if tokio::time::Instant::now() >= deadline => {
                return Err(CollError::transport_with_source(
                    format!("rank {me} could not reach rank {peer} at {addr}"),
                    e,
                ));
            }
            Err(e) => {
                tracing::trace!(%me, %peer, %addr, "connect retry: {e}");
                tokio::time::sleep(CONNECT_RETRY).await;
            }
        }
    };
    stream
        .set_nodelay(true)
        .map_err(|e| CollError::transport_with_source("tcp set_nodelay", e))?;
    stream
        .write_all(&me.get().to_le_bytes())
        .await
        .map_err(|e| CollError::transport_with_source("tcp handshake write", e))?;
    Ok((peer, stream))
}

/// Accept `expected` connections, each from a distinct rank above `me`.
async fn accept_peers(
    listener: &TcpListener,
    me: Rank,
    size: u32,
    expected: usize,
) -> Result<Vec<(Rank, TcpStream)>> {
    let mut peers: Vec<(Rank, TcpStream)> = Vec::with_capacity(expected);
    while peers.len() < expected {
        let (mut stream, addr) = listener
            .accept()
            .await
            .map_err(|e| CollError::transport_with_source("tcp accept", e))?;
        stream
            .set_nodelay(true)
            .map_err(|e| CollError::transport_with_source("tcp set_nodelay", e))?;
        let mut hello = [0u8; 4];
        stream
            .read_exact(&mut hello)
            .await
            .map_err(|e| CollError::transport_with_source("tcp handshake read", e))?;
        let peer = Rank::new(u32::from_le_bytes(hello));
        if peer <= me || peer.get() >= size || peers.iter().any(|(p, _)| *p == peer) {
            return Err(CollError::transport(format!(
                "rank {me} got unexpected handshake from {addr} claiming rank {peer}"
            )));
        }
        peers.push((peer, stream));
    }
    Ok(peers)
}

/// Background loop: read frames from `peer` and queue them by tag.
async fn recv_loop(peer: Rank, mut reader: OwnedReadHalf, mailbox: &Mailbox, max_frame: usize) {
    let mut tag_buf = [0u8; 8];
    let mut len_buf = [0u8; 8];
    loop {
        if let Err(e) = reader.read_exact(&mut tag_buf).await {
            tracing::debug!(%peer, "tcp recv loop ended: {e}");
            return;
        }
        if let Err(e) = reader.read_exact(&mut len_buf).await {
            tracing::warn!(%peer, "tcp recv loop ended reading len: {e}");
            return;
        }
        let tag = u64::from_le_bytes(tag_buf);
        let len = u64::from_le_bytes(len_buf);

        let len = match usize::try_from(len) {
            Ok(len) if len <= max_frame => len,
            _ => {
                tracing::warn!(%peer, len, max_frame, "tcp frame too large, closing connection");
                return;
            }
        };

        let mut payload = vec![0u8; len];
        if let Err(e) = reader.read_exact(&mut payload).await {
            tracing::warn!(%peer, "tcp recv loop ended reading payload: {e}");
            return;
        }
        if mailbox.deliver(peer, tag, payload).is_err() {
            return;
        }
    }
}
