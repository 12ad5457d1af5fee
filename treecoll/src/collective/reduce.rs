use crate::collective::helpers::{Call, REDUCE_TAG, ok_frame, open_frame, rejected_frame};
use crate::error::{CollError, Result};
use crate::reduce::{Element, combine_bytes_into, encode};
use crate::transport::Communicator;
use crate::types::{Rank, ReduceOp};

/// Tree reduce: combine every rank's `buf` into `buf` at `root`.
///
/// Each rank receives from its children in ascending order, folds each
/// payload into its running buffer, then forwards the partial result to its
/// parent. On return only the root's `buf` holds the full result; other
/// ranks hold their subtree's partial.
///
/// A rank that sees a child payload of the wrong length still drains its
/// remaining children, then forwards a rejection instead of data, so the
/// root fails with `BufferSizeMismatch` rather than waiting. `buf` is
/// unspecified after a failure.
pub(crate) async fn tree_reduce<C, T>(
    call: &Call<'_, C>,
    buf: &mut [T],
    op: ReduceOp,
    root: Rank,
) -> Result<()>
where
    C: Communicator + ?Sized,
    T: Element,
{
    let node = call.node(root)?;
    let total_bytes = buf.len() * T::DTYPE.size_in_bytes();

    let mut mismatch = None;
    for &child in &node.children {
        let frame = call.recv(child, REDUCE_TAG).await?;
        match open_frame(&frame, total_bytes) {
            Ok(body) if mismatch.is_none() => combine_bytes_into(buf, body, op)?,
            Ok(_) => {}
            Err(CollError::BufferSizeMismatch { expected, actual }) => {
                tracing::warn!(
                    op = call.operation,
                    %child,
                    expected,
                    actual,
                    "reduce length mismatch"
                );
                mismatch.get_or_insert((expected, actual));
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(parent) = node.parent {
        let frame = match mismatch {
            Some((expected, actual)) => rejected_frame(expected, actual),
            None => ok_frame(&encode(buf)),
        };
        call.send(parent, REDUCE_TAG, &frame).await?;
    }

    match mismatch {
        Some((expected, actual)) => Err(CollError::BufferSizeMismatch { expected, actual }),
        None => Ok(()),
    }
}
