use crate::collective::helpers::{Call, ok_frame, open_frame, rejected_frame};
use crate::error::{CollError, Result};
use crate::reduce::{Element, decode_into, encode};
use crate::transport::Communicator;
use crate::types::{Rank, Tag};
use futures::future::try_join_all;

/// Tree broadcast: copy `buf` from `root` into `buf` on every rank.
///
/// A non-root rank first receives from its parent, forwards the same frame
/// to its children concurrently, then overwrites `buf`. A rank whose
/// `buf.len()` differs from the root's fails with `BufferSizeMismatch`
/// after forwarding, so its subtree still completes.
pub(crate) async fn tree_broadcast<C, T>(
    call: &Call<'_, C>,
    buf: &mut [T],
    root: Rank,
    tag: Tag,
) -> Result<()>
where
    C: Communicator + ?Sized,
    T: Element,
{
    broadcast_outcome(call, buf, root, tag, None).await
}

/// Broadcast that can carry a failure from the root.
///
/// When `rejection` is set at the root, the root sends it in place of its
/// buffer and every rank returns the same `BufferSizeMismatch`. `rejection`
/// is ignored on non-root ranks.
pub(crate) async fn broadcast_outcome<C, T>(
    call: &Call<'_, C>,
    buf: &mut [T],
    root: Rank,
    tag: Tag,
    rejection: Option<(usize, usize)>,
) -> Result<()>
where
    C: Communicator + ?Sized,
    T: Element,
{
    let node = call.node(root)?;
    let total_bytes = buf.len() * T::DTYPE.size_in_bytes();

    let frame = match (node.parent, rejection) {
        (None, Some((expected, actual))) => rejected_frame(expected, actual),
        (None, None) => ok_frame(&encode(buf)),
        (Some(parent), _) => call.recv(parent, tag).await?,
    };

    if !node.children.is_empty() {
        let frame = &frame;
        try_join_all(
            node.children
                .iter()
                .map(|&child| call.send(child, tag, frame)),
        )
        .await?;
    }

    if node.parent.is_none() {
        return match rejection {
            Some((expected, actual)) => Err(CollError::BufferSizeMismatch { expected, actual }),
            None => Ok(()),
        };
    }
    let body = open_frame(&frame, total_bytes)?;
    decode_into(buf, body)
}
