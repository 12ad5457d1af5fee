use crate::types::{Rank, Tag};

pub type Result<T> = std::result::Result<T, CollError>;

#[derive(Debug, thiserror::Error)]
pub enum CollError {
    #[error("communicator has no ranks")]
    EmptyWorld,

    #[error("invalid rank {rank}: world size is {world_size}")]
    InvalidRank { rank: Rank, world_size: u32 },

    #[error("invalid arity {arity} for {shape} tree")]
    InvalidArity { arity: u32, shape: &'static str },

    #[error("tag {tag:#x} is reserved for collective traffic")]
    InvalidTag { tag: Tag },

    #[error("invalid count table for {operation}: {reason}")]
    InvalidCounts {
        operation: &'static str,
        reason: String,
    },

    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("peer {rank} disconnected unexpectedly")]
    PeerDisconnected { rank: Rank },

    #[error("rank {rank} is not reachable from this communicator")]
    UnknownPeer { rank: Rank },

    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{operation} failed at rank {rank}: {reason}")]
    CollectiveFailed {
        operation: &'static str,
        rank: Rank,
        reason: String,
    },

    #[error("internal lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl CollError {
    /// Create a `Transport` error with just a message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a `Transport` error with a message and a source error.
    pub fn transport_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn invalid_counts(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidCounts {
            operation,
            reason: reason.into(),
        }
    }

    /// True for errors raised at the call boundary, before any message moved.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::EmptyWorld
                | Self::InvalidRank { .. }
                | Self::InvalidArity { .. }
                | Self::InvalidTag { .. }
                | Self::InvalidCounts { .. }
        )
    }
}
