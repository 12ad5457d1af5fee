use crate::collective::{self, Call, Displacements};
use crate::error::Result;
use crate::reduce::Element;
use crate::transport::Communicator;
use crate::types::{Rank, ReduceOp};

use super::Collectives;

impl<C: Communicator> Collectives<C> {
    fn call(&self, operation: &'static str) -> Call<'_, C> {
        Call::new(&self.comm, &self.config, operation)
    }

    /// AllReduce: every rank gets the element-wise `op` of all ranks' `local`.
    ///
    /// `local.len()` must match on every rank.
    pub async fn all_reduce<T: Element>(&self, local: &[T], op: ReduceOp) -> Result<Vec<T>> {
        let mut buf = local.to_vec();
        self.all_reduce_in_place(&mut buf, op).await?;
        Ok(buf)
    }

    /// AllReduce overwriting `buf` with the result.
    pub async fn all_reduce_in_place<T: Element>(&self, buf: &mut [T], op: ReduceOp) -> Result<()> {
        tracing::debug!(
            rank = %self.rank(),
            count = buf.len(),
            dtype = T::DTYPE.name(),
            %op,
            tree = %self.config.tree,
            "all_reduce"
        );
        collective::tree_allreduce(&self.call("all_reduce"), buf, op).await
    }

    /// Reduce to `root`. Returns `Some(result)` at the root, `None` elsewhere.
    pub async fn reduce<T: Element>(
        &self,
        local: &[T],
        op: ReduceOp,
        root: Rank,
    ) -> Result<Option<Vec<T>>> {
        tracing::debug!(
            rank = %self.rank(),
            %root,
            count = local.len(),
            dtype = T::DTYPE.name(),
            %op,
            "reduce"
        );
        let mut buf = local.to_vec();
        collective::tree_reduce(&self.call("reduce"), &mut buf, op, root).await?;
        Ok((self.rank() == root).then_some(buf))
    }

    /// Broadcast `buf` from `root` into `buf` on every rank.
    pub async fn broadcast<T: Element>(&self, buf: &mut [T], root: Rank) -> Result<()> {
        tracing::debug!(rank = %self.rank(), %root, count = buf.len(), "broadcast");
        let call = self.call("broadcast");
        collective::tree_broadcast(&call, buf, root, collective::BROADCAST_TAG).await
    }

    /// Variable-count gather. Returns the rank-ordered concatenation at
    /// `root` and `None` elsewhere.
    pub async fn gather<T: Element>(&self, local: &[T], root: Rank) -> Result<Option<Vec<T>>> {
        tracing::debug!(rank = %self.rank(), %root, count = local.len(), "gather");
        collective::gather(&self.call("gather"), local, root).await
    }

    /// Variable-count gather into `recv`, which is only read at `root`.
    ///
    /// Fails with `InvalidCounts` on every rank when the counts do not sum
    /// to `recv.len()`; `recv` is then left untouched.
    pub async fn gather_into<T: Element>(
        &self,
        local: &[T],
        recv: &mut [T],
        root: Rank,
    ) -> Result<Displacements> {
        tracing::debug!(rank = %self.rank(), %root, count = local.len(), "gather_into");
        collective::gather_into(&self.call("gather_into"), local, recv, root).await
    }

    /// Variable-count scatter. `full` and `counts` are only read at `root`.
    pub async fn scatter<T: Element>(
        &self,
        full: &[T],
        counts: &[usize],
        root: Rank,
    ) -> Result<Vec<T>> {
        tracing::debug!(rank = %self.rank(), %root, count = full.len(), "scatter");
        collective::scatter(&self.call("scatter"), full, counts, root).await
    }

    /// Variable-count allgather: every rank gets the rank-ordered
    /// concatenation of all ranks' `local`.
    pub async fn all_gather<T: Element>(&self, local: &[T]) -> Result<Vec<T>> {
        tracing::debug!(rank = %self.rank(), count = local.len(), "all_gather");
        collective::all_gather(&self.call("all_gather"), local).await
    }

    /// Block until every rank has entered the barrier.
    pub async fn barrier(&self) -> Result<()> {
        tracing::debug!(rank = %self.rank(), "barrier");
        collective::barrier(&self.call("barrier")).await
    }
}
