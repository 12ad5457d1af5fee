/// Message tag. Tags with [`COLLECTIVE_TAG_BIT`] set belong to collectives.
pub type Tag = u64;

/// High bit reserved for collective phases; user point-to-point tags must
/// keep it clear.
pub const COLLECTIVE_TAG_BIT: Tag = 1 << 63;

/// Rank of a participant in a communicator group (0-indexed).
///
/// Assigned by the runtime that creates the communicator and immutable for
/// its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Rank(u32);

impl Rank {
    /// Conventional root of tree collectives.
    pub const ROOT: Rank = Rank(0);

    pub const fn new(rank: u32) -> Self {
        Self(rank)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Rank as an index into per-rank tables.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check `self < world_size`.
    pub fn check(self, world_size: u32) -> crate::error::Result<Self> {
        if self.0 < world_size {
            Ok(self)
        } else {
            Err(crate::error::CollError::InvalidRank {
                rank: self,
                world_size,
            })
        }
    }
}

impl From<u32> for Rank {
    fn from(rank: u32) -> Self {
        Self(rank)
    }
}

impl From<Rank> for u32 {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Element types that can travel through collectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    F32 = 0,
    F64 = 1,
    I8 = 2,
    I32 = 3,
    I64 = 4,
    U8 = 5,
    U32 = 6,
    U64 = 7,
}

impl DataType {
    /// Size of one element in bytes.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DataType::F32 | DataType::I32 | DataType::U32 => 4,
            DataType::F64 | DataType::I64 | DataType::U64 => 8,
            DataType::I8 | DataType::U8 => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::I8 => "i8",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::U8 => "u8",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Associative, commutative combining operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Element-wise sum across ranks.
    Sum,
    /// Element-wise product across ranks.
    Prod,
    /// Element-wise minimum across ranks.
    Min,
    /// Element-wise maximum across ranks.
    Max,
}

impl std::fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceOp::Sum => f.write_str("sum"),
            ReduceOp::Prod => f.write_str("prod"),
            ReduceOp::Min => f.write_str("min"),
            ReduceOp::Max => f.write_str("max"),
        }
    }
}
