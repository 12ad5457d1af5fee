//! Tree-based collectives (reduce, broadcast, all-reduce, variable-count
//! gather and scatter) built over tagged point-to-point messaging.

pub mod client;
pub mod collective;
pub mod config;
pub mod error;
pub mod reduce;
pub mod topology;
pub mod transport;
pub mod types;

pub use client::{Collectives, SyncCollectives};
pub use collective::Displacements;
pub use config::CollConfig;
pub use error::{CollError, Result};
pub use reduce::Element;
pub use topology::{TreeNode, TreeShape, children_of, parent_of, rooted_node, tree_node};
pub use transport::{Communicator, LocalComm, TcpComm};
pub use types::{COLLECTIVE_TAG_BIT, DataType, Rank, ReduceOp, Tag};
