use crate::collective::Displacements;
use crate::config::CollConfig;
use crate::error::{CollError, Result};
use crate::reduce::Element;
use crate::transport::{Communicator, LocalComm, TcpComm};
use crate::types::{Rank, ReduceOp, Tag};
use std::net::SocketAddr;

use super::Collectives;

/// Blocking wrapper around [`Collectives`].
///
/// Owns a tokio runtime and calls `block_on()` for each operation. Drive
/// each rank from its own thread.
pub struct SyncCollectives<C> {
    inner: Collectives<C>,
    rt: tokio::runtime::Runtime,
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(|e| CollError::transport_with_source("tokio runtime", e))
}

impl SyncCollectives<LocalComm> {
    /// An in-process group of `size` ranks, one blocking handle per rank.
    pub fn local_mesh(size: u32) -> Result<Vec<Self>> {
        Self::local_mesh_with_config(size, CollConfig::default())
    }

    pub fn local_mesh_with_config(size: u32, config: CollConfig) -> Result<Vec<Self>> {
        LocalComm::mesh(size)?
            .into_iter()
            .map(|comm| Self::from_async(Collectives::with_config(comm, config.clone())))
            .collect()
    }
}

impl SyncCollectives<TcpComm> {
    /// Join a TCP group. The runtime that owns the connection's receive
    /// loops is the one this handle blocks on.
    pub fn connect(rank: Rank, addrs: &[SocketAddr], config: CollConfig) -> Result<Self> {
        let rt = runtime()?;
        let comm = rt.block_on(TcpComm::connect(rank, addrs, &config))?;
        Ok(Self {
            inner: Collectives::with_config(comm, config),
            rt,
        })
    }
}

impl<C: Communicator> SyncCollectives<C> {
    /// Wrap an existing async handle with a new tokio runtime.
    pub fn from_async(inner: Collectives<C>) -> Result<Self> {
        Ok(Self {
            inner,
            rt: runtime()?,
        })
    }

    pub fn rank(&self) -> Rank {
        self.inner.rank()
    }

    pub fn size(&self) -> u32 {
        self.inner.size()
    }

    pub fn config(&self) -> &CollConfig {
        self.inner.config()
    }

    pub fn send<T: Element>(&self, data: &[T], dest: Rank, tag: Tag) -> Result<()> {
        self.rt.block_on(self.inner.send(data, dest, tag))
    }

    pub fn recv<T: Element>(&self, buf: &mut [T], src: Rank, tag: Tag) -> Result<()> {
        self.rt.block_on(self.inner.recv(buf, src, tag))
    }

    pub fn all_reduce<T: Element>(&self, local: &[T], op: ReduceOp) -> Result<Vec<T>> {
        self.rt.block_on(self.inner.all_reduce(local, op))
    }

    pub fn all_reduce_in_place<T: Element>(&self, buf: &mut [T], op: ReduceOp) -> Result<()> {
        self.rt.block_on(self.inner.all_reduce_in_place(buf, op))
    }

    pub fn reduce<T: Element>(
        &self,
        local: &[T],
        op: ReduceOp,
        root: Rank,
    ) -> Result<Option<Vec<T>>> {
        self.rt.block_on(self.inner.reduce(local, op, root))
    }

    pub fn broadcast<T: Element>(&self, buf: &mut [T], root: Rank) -> Result<()> {
        self.rt.block_on(self.inner.broadcast(buf, root))
    }

    pub fn gather<T: Element>(&self, local: &[T], root: Rank) -> Result<Option<Vec<T>>> {
        self.rt.block_on(self.inner.gather(local, root))
    }

    pub fn gather_into<T: Element>(
        &self,
        local: &[T],
        recv: &mut [T],
        root: Rank,
    ) -> Result<Displacements> {
        self.rt.block_on(self.inner.gather_into(local, recv, root))
    }

    pub fn scatter<T: Element>(&self, full: &[T], counts: &[usize], root: Rank) -> Result<Vec<T>> {
        self.rt.block_on(self.inner.scatter(full, counts, root))
    }

    pub fn all_gather<T: Element>(&self, local: &[T]) -> Result<Vec<T>> {
        self.rt.block_on(self.inner.all_gather(local))
    }

    pub fn barrier(&self) -> Result<()> {
        self.rt.block_on(self.inner.barrier())
    }
}
