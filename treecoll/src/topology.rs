//! Logical trees over ranks.
//!
//! Every function here is pure: all ranks derive the same tree from
//! `(rank, size, shape)` without exchanging it.

use crate::error::{CollError, Result};
use crate::types::Rank;

/// Shape of the logical tree used by a collective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeShape {
    /// Mixed-radix tree: a rank's parent clears its lowest non-zero base-`arity`
    /// digit. `arity = 2` is the binomial tree.
    ///
    /// `arity` is the radix, not the fan-out per level: a rank gets up to
    /// `arity - 1` children at each place value, so `arity` must be at least 2.
    KNomial { arity: u32 },
    /// Heap layout: children `arity*r + 1 ..= arity*r + arity`.
    /// `arity = 2` is the binary heap.
    Heap { arity: u32 },
    /// Rank 0 is the parent of every other rank.
    Star,
}

impl Default for TreeShape {
    fn default() -> Self {
        Self::BINOMIAL
    }
}

impl TreeShape {
    pub const BINOMIAL: TreeShape = TreeShape::KNomial { arity: 2 };
    pub const BINARY_HEAP: TreeShape = TreeShape::Heap { arity: 2 };

    pub const fn name(self) -> &'static str {
        match self {
            TreeShape::KNomial { .. } => "knomial",
            TreeShape::Heap { .. } => "heap",
            TreeShape::Star => "star",
        }
    }

    /// Build a shape from its name and arity. The arity is ignored for `star`.
    pub fn from_name(name: &str, arity: u32) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "knomial" | "k-nomial" | "binomial" => Some(TreeShape::KNomial { arity }),
            "heap" | "kary" | "k-ary" => Some(TreeShape::Heap { arity }),
            "star" | "flat" | "linear" => Some(TreeShape::Star),
            _ => None,
        }
    }

    /// Reject arities the shape cannot be built with.
    pub fn validate(self) -> Result<Self> {
        let ok = match self {
            TreeShape::KNomial { arity } => arity >= 2,
            TreeShape::Heap { arity } => arity >= 1,
            TreeShape::Star => true,
        };
        if ok {
            Ok(self)
        } else {
            Err(CollError::InvalidArity {
                arity: self.arity(),
                shape: self.name(),
            })
        }
    }

    fn arity(self) -> u32 {
        match self {
            TreeShape::KNomial { arity } | TreeShape::Heap { arity } => arity,
            TreeShape::Star => 0,
        }
    }
}

impl std::fmt::Display for TreeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeShape::Star => f.write_str("star"),
            other => write!(f, "{}(k={})", other.name(), other.arity()),
        }
    }
}

/// One rank's view of a tree: its parent and its children in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub rank: Rank,
    pub parent: Option<Rank>,
    pub children: Vec<Rank>,
}

impl TreeNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Parent of `rank` in a tree rooted at rank 0, or `None` for rank 0.
pub fn parent_of(rank: Rank, size: u32, shape: TreeShape) -> Result<Option<Rank>> {
    check(rank, size, shape)?;
    let r = u64::from(rank.get());
    let parent = match shape {
        TreeShape::KNomial { arity } => knomial_parent(r, u64::from(arity)),
        TreeShape::Heap { arity } => (r > 0).then(|| (r - 1) / u64::from(arity)),
        TreeShape::Star => (r > 0).then_some(0),
    };
    Ok(parent.map(to_rank))
}

/// Children of `rank` in a tree rooted at rank 0, ascending. Positions at or
/// beyond `size` are absent, never wrapped.
pub fn children_of(rank: Rank, size: u32, shape: TreeShape) -> Result<Vec<Rank>> {
    check(rank, size, shape)?;
    let r = u64::from(rank.get());
    let size = u64::from(size);
    let children = match shape {
        TreeShape::KNomial { arity } => knomial_children(r, size, u64::from(arity)),
        TreeShape::Heap { arity } => {
            let k = u64::from(arity);
            let first = k * r + 1;
            (first..first + k).take_while(|&c| c < size).collect()
        }
        TreeShape::Star if r == 0 => (1..size).collect(),
        TreeShape::Star => Vec::new(),
    };
    Ok(children.into_iter().map(to_rank).collect())
}

/// Parent and children of `rank` in a tree rooted at rank 0.
pub fn tree_node(rank: Rank, size: u32, shape: TreeShape) -> Result<TreeNode> {
    Ok(TreeNode {
        rank,
        parent: parent_of(rank, size, shape)?,
        children: children_of(rank, size, shape)?,
    })
}

/// Parent and children of `rank` in the same shape re-rooted at `root`.
///
/// Ranks are relabelled so `root` takes virtual position 0; the tree is built
/// on virtual ranks and mapped back.
pub fn rooted_node(rank: Rank, size: u32, root: Rank, shape: TreeShape) -> Result<TreeNode> {
    check(rank, size, shape)?;
    root.check(size)?;
    let n = u64::from(size);
    let shift = u64::from(root.get());
    let to_virtual = |r: Rank| to_rank((u64::from(r.get()) + n - shift) % n);
    let to_physical = |v: Rank| to_rank((u64::from(v.get()) + shift) % n);

    let node = tree_node(to_virtual(rank), size, shape)?;
    Ok(TreeNode {
        rank,
        parent: node.parent.map(to_physical),
        children: node.children.into_iter().map(to_physical).collect(),
    })
}

fn check(rank: Rank, size: u32, shape: TreeShape) -> Result<()> {
    if size == 0 {
        return Err(CollError::EmptyWorld);
    }
    shape.validate()?;
    rank.check(size)?;
    Ok(())
}

fn to_rank(r: u64) -> Rank {
    Rank::new(r as u32)
}

/// Place value of the lowest non-zero base-`k` digit of `r` (`r > 0`).
fn lowest_place(r: u64, k: u64) -> u64 {
    let mut place = 1;
    while (r / place) % k == 0 {
        place *= k;
    }
    place
}

fn knomial_parent(r: u64, k: u64) -> Option<u64> {
    if r == 0 {
        return None;
    }
    let place = lowest_place(r, k);
    Some(r - (r / place) % k * place)
}

fn knomial_children(r: u64, size: u64, k: u64) -> Vec<u64> {
    let limit = if r == 0 { u64::MAX } else { lowest_place(r, k) };
    let mut children = Vec::new();
    let mut place = 1u64;
    while place < limit && r + place < size {
        for digit in 1..k {
            let child = r + digit * place;
            if child >= size {
                break;
            }
            children.push(child);
        }
        match place.checked_mul(k) {
            Some(next) => place = next,
            None => break,
        }
    }
    children
}
