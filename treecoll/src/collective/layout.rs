use crate::error::{CollError, Result};
use crate::types::Rank;
use std::ops::Range;

/// Table status word: the root accepted the counts.
pub(crate) const TABLE_OK: u64 = 0;
/// Table status word: the root rejected the counts; no data will move.
pub(crate) const TABLE_REJECTED: u64 = 1;

/// Per-rank element counts and their exclusive prefix sums.
///
/// Rank `i` owns `offsets[i] .. offsets[i] + counts[i]` of the concatenated
/// buffer. Ranks with a zero count still occupy a (empty) slot, so every
/// later offset stays correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Displacements {
    counts: Vec<usize>,
    offsets: Vec<usize>,
    total: usize,
}

impl Displacements {
    /// Build the table. Fails if the total overflows `usize`.
    pub fn from_counts(counts: &[usize]) -> Result<Self> {
        let mut offsets = Vec::with_capacity(counts.len());
        let mut total = 0usize;
        for (rank, &count) in counts.iter().enumerate() {
            offsets.push(total);
            total = total.checked_add(count).ok_or_else(|| {
                CollError::invalid_counts(
                    "displacements",
                    format!("total overflows at rank {rank}"),
                )
            })?;
        }
        Ok(Self {
            counts: counts.to_vec(),
            offsets,
            total,
        })
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of ranks described.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Element range owned by `rank`.
    pub fn range(&self, rank: Rank) -> Range<usize> {
        let start = self.offsets[rank.index()];
        start..start + self.counts[rank.index()]
    }

    /// Wire form: `[status, count_0, .., count_{n-1}]`.
    pub(crate) fn to_table(&self) -> Vec<u64> {
        std::iter::once(TABLE_OK)
            .chain(self.counts.iter().map(|&c| c as u64))
            .collect()
    }

    /// A rejected table of the right length for `size` ranks.
    pub(crate) fn rejected_table(size: u32) -> Vec<u64> {
        let mut table = vec![0u64; size as usize + 1];
        table[0] = TABLE_REJECTED;
        table
    }

    /// Parse a table received from `root`.
    pub(crate) fn from_table(table: &[u64], operation: &'static str, root: Rank) -> Result<Self> {
        let Some((&status, counts)) = table.split_first() else {
            return Err(CollError::invalid_counts(operation, "empty count table"));
        };
        if status != TABLE_OK {
            return Err(CollError::invalid_counts(
                operation,
                format!("count table rejected by root {root}"),
            ));
        }
        let counts = counts
            .iter()
            .map(|&c| usize::try_from(c))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| CollError::invalid_counts(operation, "count exceeds address space"))?;
        Self::from_counts(&counts)
    }
}
