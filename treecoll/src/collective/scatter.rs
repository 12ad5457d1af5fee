use crate::collective::broadcast::tree_broadcast;
use crate::collective::helpers::{Call, SCATTER_DATA_TAG, SCATTER_TABLE_TAG};
use crate::collective::layout::Displacements;
use crate::error::{CollError, Result};
use crate::reduce::{Element, decode, encode};
use crate::transport::Communicator;
use crate::types::Rank;
use futures::future::try_join_all;

/// Variable-count scatter: rank `i` receives `full[offsets[i]..][..counts[i]]`.
///
/// `full` and `counts` are significant only at the root. The root checks
/// `counts.len() == size` and `sum(counts) == full.len()`, then broadcasts
/// `[status, counts..]`; on rejection every rank fails with `InvalidCounts`
/// and no data moves. Otherwise the root sends each slice directly.
pub(crate) async fn scatter<C, T>(
    call: &Call<'_, C>,
    full: &[T],
    counts: &[usize],
    root: Rank,
) -> Result<Vec<T>>
where
    C: Communicator + ?Sized,
    T: Element,
{
    call.node(root)?;
    let size = call.size();
    let rank = call.rank();

    let mut rejection = None;
    let mut table = if rank == root {
        match validate(call.operation, full.len(), counts, size) {
            Ok(layout) => layout.to_table(),
            Err(e) => {
                tracing::warn!(op = call.operation, %root, "rejecting count table: {e}");
                rejection = Some(e);
                Displacements::rejected_table(size)
            }
        }
    } else {
        vec![0u64; size as usize + 1]
    };

    tree_broadcast(call, &mut table, root, SCATTER_TABLE_TAG).await?;
    if let Some(e) = rejection {
        return Err(e);
    }
    let layout = Displacements::from_table(&table, call.operation, root)?;

    if rank == root {
        let chunks: Vec<(Rank, Vec<u8>)> = (0..size)
            .map(Rank::new)
            .filter(|&r| r != root && !layout.range(r).is_empty())
            .map(|r| (r, encode(&full[layout.range(r)])))
            .collect();
        try_join_all(
            chunks
                .iter()
                .map(|(r, chunk)| call.send(*r, SCATTER_DATA_TAG, chunk)),
        )
        .await?;
        return Ok(full[layout.range(root)].to_vec());
    }

    let own = layout.range(rank);
    if own.is_empty() {
        return Ok(Vec::new());
    }
    let expected = own.len() * T::DTYPE.size_in_bytes();
    let received = call.recv_exact(root, SCATTER_DATA_TAG, expected).await?;
    decode(&received)
}

fn validate(
    operation: &'static str,
    full_len: usize,
    counts: &[usize],
    size: u32,
) -> Result<Displacements> {
    if counts.len() != size as usize {
        return Err(CollError::invalid_counts(
            operation,
            format!("expected {size} counts, got {}", counts.len()),
        ));
    }
    let layout = Displacements::from_counts(counts)?;
    if layout.total() != full_len {
        return Err(CollError::invalid_counts(
            operation,
            format!("counts sum to {} but the send buffer holds {full_len}", layout.total()),
        ));
    }
    Ok(layout)
}
