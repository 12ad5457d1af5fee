//! Tree collectives built from point-to-point sends and receives.
//!
//! Every rank of the communicator must enter the same collectives in the
//! same order with compatible arguments. The functions here are the
//! byte-level engines; [`crate::Collectives`] is the public entry point.

mod allreduce;
mod broadcast;
mod gather;
mod helpers;
mod layout;
mod reduce;
mod scatter;

pub use layout::Displacements;

pub(crate) use allreduce::{barrier, tree_allreduce};
pub(crate) use broadcast::tree_broadcast;
pub(crate) use gather::{all_gather, gather, gather_into};
pub(crate) use helpers::{BROADCAST_TAG, Call};
pub(crate) use reduce::tree_reduce;
pub(crate) use scatter::scatter;
