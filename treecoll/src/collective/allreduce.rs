use crate::collective::broadcast::broadcast_outcome;
use crate::collective::helpers::{BROADCAST_TAG, Call};
use crate::collective::reduce::tree_reduce;
use crate::error::{CollError, Result};
use crate::reduce::Element;
use crate::transport::Communicator;
use crate::types::{Rank, ReduceOp};

/// Tree allreduce: reduce to rank 0, then broadcast from rank 0 over the
/// same tree. Every rank ends with an identical `buf`.
///
/// Latency is two tree depths, `O(log_k N)` message hops each way. A length
/// mismatch anywhere reaches rank 0 during the reduce and is broadcast back,
/// so every rank fails with the same `BufferSizeMismatch`.
pub(crate) async fn tree_allreduce<C, T>(
    call: &Call<'_, C>,
    buf: &mut [T],
    op: ReduceOp,
) -> Result<()>
where
    C: Communicator + ?Sized,
    T: Element,
{
    let rejection = match tree_reduce(call, buf, op, Rank::ROOT).await {
        Ok(()) => None,
        Err(CollError::BufferSizeMismatch { expected, actual }) => Some((expected, actual)),
        Err(e) => return Err(e),
    };
    broadcast_outcome(call, buf, Rank::ROOT, BROADCAST_TAG, rejection).await
}

/// Returns once every rank has entered: an allreduce over zero elements.
pub(crate) async fn barrier<C>(call: &Call<'_, C>) -> Result<()>
where
    C: Communicator + ?Sized,
{
    let mut empty: [u8; 0] = [];
    tree_allreduce(call, &mut empty, ReduceOp::Max).await
}
