//! Runtime-configurable parameters for treecoll.
//!
//! All values have sensible defaults. Override via environment variables
//! (prefixed `TREECOLL_`) or by constructing a custom `CollConfig`.

use crate::topology::TreeShape;
use std::time::Duration;

/// Tuning parameters for collectives and the TCP transport.
#[derive(Debug, Clone, PartialEq)]
pub struct CollConfig {
    /// Tree used by reduce, broadcast and all-reduce, and for the count
    /// tables of gather and scatter. Their data always moves over the star.
    pub tree: TreeShape,

    /// Per send/recv deadline inside a collective. `None` blocks until the
    /// peer shows up.
    pub collective_timeout: Option<Duration>,

    /// How long `TcpComm::connect` keeps retrying a peer that is not yet
    /// listening.
    pub connect_timeout: Duration,

    /// Largest frame the TCP receive loop accepts before dropping the peer.
    pub max_frame_bytes: usize,
}

impl Default for CollConfig {
    fn default() -> Self {
        Self {
            tree: TreeShape::BINOMIAL,
            collective_timeout: None,
            connect_timeout: Duration::from_secs(10),
            max_frame_bytes: 1024 * 1024 * 1024, // 1 GiB
        }
    }
}

impl CollConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `TREECOLL_TREE_SHAPE` (`knomial`, `heap` or `star`)
    /// - `TREECOLL_TREE_ARITY`
    /// - `TREECOLL_COLLECTIVE_TIMEOUT_SECS`
    /// - `TREECOLL_CONNECT_TIMEOUT_SECS`
    /// - `TREECOLL_MAX_FRAME_BYTES`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        let arity = lookup("TREECOLL_TREE_ARITY").and_then(|v| v.parse::<u32>().ok());
        let shape = lookup("TREECOLL_TREE_SHAPE");
        match (shape, arity) {
            (Some(name), arity) => {
                if let Some(tree) = TreeShape::from_name(&name, arity.unwrap_or(2)) {
                    cfg.tree = tree;
                }
            }
            (None, Some(arity)) => cfg.tree = TreeShape::KNomial { arity },
            (None, None) => {}
        }
        if let Some(s) =
            lookup("TREECOLL_COLLECTIVE_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok())
        {
            cfg.collective_timeout = Some(Duration::from_secs(s));
        }
        if let Some(s) =
            lookup("TREECOLL_CONNECT_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok())
        {
            cfg.connect_timeout = Duration::from_secs(s);
        }
        if let Some(n) = lookup("TREECOLL_MAX_FRAME_BYTES").and_then(|v| v.parse::<usize>().ok()) {
            cfg.max_frame_bytes = n;
        }

        cfg
    }

    pub fn with_tree(mut self, tree: TreeShape) -> Self {
        self.tree = tree;
        self
    }

    pub fn with_collective_timeout(mut self, timeout: Duration) -> Self {
        self.collective_timeout = Some(timeout);
        self
    }
}
