use crate::collective::broadcast::tree_broadcast;
use crate::collective::helpers::{
    BROADCAST_TAG, Call, GATHER_COUNT_TAG, GATHER_DATA_TAG, GATHER_TABLE_TAG,
};
use crate::collective::layout::Displacements;
use crate::error::{CollError, Result};
use crate::reduce::{Element, decode_into, encode};
use crate::transport::Communicator;
use crate::types::Rank;

/// Variable-count gather into a buffer the root allocates.
///
/// Returns `Some(concatenation in rank order)` at the root, `None` elsewhere.
pub(crate) async fn gather<C, T>(
    call: &Call<'_, C>,
    local: &[T],
    root: Rank,
) -> Result<Option<Vec<T>>>
where
    C: Communicator + ?Sized,
    T: Element,
{
    let layout = negotiate(call, local.len(), root, None).await?;
    if call.rank() == root {
        let mut out = vec![T::ZERO; layout.total()];
        transfer(call, local, &mut out, &layout, root).await?;
        Ok(Some(out))
    } else {
        transfer(call, local, &mut [], &layout, root).await?;
        Ok(None)
    }
}

/// Variable-count gather into a caller-provided buffer.
///
/// `recv` is significant only at the root, where the counts must sum to
/// exactly `recv.len()`. When they do not, every rank fails with
/// `InvalidCounts` and `recv` is left untouched. Returns the agreed layout on
/// every rank.
pub(crate) async fn gather_into<C, T>(
    call: &Call<'_, C>,
    local: &[T],
    recv: &mut [T],
    root: Rank,
) -> Result<Displacements>
where
    C: Communicator + ?Sized,
    T: Element,
{
    let expected = (call.rank() == root).then_some(recv.len());
    let layout = negotiate(call, local.len(), root, expected).await?;
    transfer(call, local, recv, &layout, root).await?;
    Ok(layout)
}

/// Gather to rank 0, then broadcast the concatenation to every rank.
pub(crate) async fn all_gather<C, T>(call: &Call<'_, C>, local: &[T]) -> Result<Vec<T>>
where
    C: Communicator + ?Sized,
    T: Element,
{
    let layout = negotiate(call, local.len(), Rank::ROOT, None).await?;
    let mut out = vec![T::ZERO; layout.total()];
    transfer(call, local, &mut out, &layout, Rank::ROOT).await?;
    tree_broadcast(call, &mut out, Rank::ROOT, BROADCAST_TAG).await?;
    Ok(out)
}

/// Counts flow to the root over the star; the root validates them and
/// broadcasts `[status, counts..]` so every rank agrees on the layout (or on
/// the rejection) before any data moves.
async fn negotiate<C>(
    call: &Call<'_, C>,
    local_len: usize,
    root: Rank,
    expected_total: Option<usize>,
) -> Result<Displacements>
where
    C: Communicator + ?Sized,
{
    call.node(root)?;
    let size = call.size();
    let rank = call.rank();

    let mut rejection = None;
    let mut table = if rank == root {
        let mut counts = vec![0usize; size as usize];
        counts[root.index()] = local_len;
        for peer in (0..size).map(Rank::new).filter(|&r| r != root) {
            let raw = call.recv_exact(peer, GATHER_COUNT_TAG, 8).await?;
            let mut word = [0u8; 8];
            word.copy_from_slice(&raw);
            counts[peer.index()] = usize::try_from(u64::from_le_bytes(word)).map_err(|_| {
                CollError::invalid_counts(
                    call.operation,
                    format!("rank {peer} count exceeds address space"),
                )
            })?;
        }
        match validate(call.operation, &counts, expected_total) {
            Ok(layout) => layout.to_table(),
            Err(e) => {
                tracing::warn!(op = call.operation, %root, "rejecting count table: {e}");
                rejection = Some(e);
                Displacements::rejected_table(size)
            }
        }
    } else {
        call.send(root, GATHER_COUNT_TAG, &(local_len as u64).to_le_bytes())
            .await?;
        vec![0u64; size as usize + 1]
    };

    tree_broadcast(call, &mut table, root, GATHER_TABLE_TAG).await?;
    if let Some(e) = rejection {
        return Err(e);
    }
    Displacements::from_table(&table, call.operation, root)
}

fn validate(
    operation: &'static str,
    counts: &[usize],
    expected_total: Option<usize>,
) -> Result<Displacements> {
    let layout = Displacements::from_counts(counts)?;
    match expected_total {
        Some(len) if len != layout.total() => Err(CollError::invalid_counts(
            operation,
            format!("counts sum to {} but the receive buffer holds {len}", layout.total()),
        )),
        _ => Ok(layout),
    }
}

/// Data phase over the star. Zero-count ranks exchange nothing.
async fn transfer<C, T>(
    call: &Call<'_, C>,
    local: &[T],
    dest: &mut [T],
    layout: &Displacements,
    root: Rank,
) -> Result<()>
where
    C: Communicator + ?Sized,
    T: Element,
{
    let rank = call.rank();
    let own = layout.range(rank);
    if own.len() != local.len() {
        return Err(CollError::BufferSizeMismatch {
            expected: own.len() * T::DTYPE.size_in_bytes(),
            actual: local.len() * T::DTYPE.size_in_bytes(),
        });
    }

    if rank != root {
        if !local.is_empty() {
            call.send(root, GATHER_DATA_TAG, &encode(local)).await?;
        }
        return Ok(());
    }

    dest[own].copy_from_slice(local);
    for peer in (0..call.size()).map(Rank::new).filter(|&r| r != root) {
        let range = layout.range(peer);
        if range.is_empty() {
            continue;
        }
        let expected = range.len() * T::DTYPE.size_in_bytes();
        let received = call.recv_exact(peer, GATHER_DATA_TAG, expected).await?;
        decode_into(&mut dest[range], &received)?;
    }
    Ok(())
}
