//! Section length inference for offset tables.
//!
//! VTX1 and MAT3 start with a table of chunk-relative offsets, one per
//! slot, with zero meaning "absent". No lengths are stored: a section runs
//! until the next section starts, and the last one runs to the chunk end.

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, DecodeResult};

/// A decoded offset table with inferred section lengths.
#[derive(Debug, Clone)]
pub struct OffsetTable {
    offsets: Vec<u32>,
    lengths: Vec<Option<u32>>,
}

impl OffsetTable {
    /// Read `slots` u32 offsets at the cursor and infer lengths against `end`.
    pub fn read(c: &mut ByteCursor<'_>, slots: usize, end: u32) -> DecodeResult<Self> {
        let offsets = c.read_n(slots, ByteCursor::read_u32)?;
        Self::new(offsets, end)
    }

    pub fn new(offsets: Vec<u32>, end: u32) -> DecodeResult<Self> {
        let lengths = section_lengths(&offsets, end)?;
        Ok(Self { offsets, lengths })
    }

    /// Chunk-relative offset of a slot, `None` if absent.
    #[must_use]
    pub fn offset(&self, slot: usize) -> Option<u32> {
        self.offsets.get(slot).copied().filter(|&o| o != 0)
    }

    /// Inferred byte length of a slot, `None` if absent.
    #[must_use]
    pub fn length(&self, slot: usize) -> Option<u32> {
        self.lengths.get(slot).copied().flatten()
    }

    /// Number of `element_size`-byte elements a slot holds.
    #[must_use]
    pub fn count(&self, slot: usize, element_size: u32) -> usize {
        self.length(slot).map_or(0, |len| (len / element_size) as usize)
    }

    /// Present slots in table order.
    pub fn present(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.offsets.len()).filter(|&slot| self.offsets[slot] != 0)
    }
}

/// Infer the length of every non-zero offset.
///
/// Offsets are ordered by position (ties broken by slot index) and each
/// section ends where the next one in that order starts. Slots sharing an
/// offset get length zero except the last of them.
pub fn section_lengths(offsets: &[u32], end: u32) -> DecodeResult<Vec<Option<u32>>> {
    let mut order: Vec<usize> = (0..offsets.len()).filter(|&i| offsets[i] != 0).collect();
    order.sort_by_key(|&i| (offsets[i], i));

    let mut lengths = vec![None; offsets.len()];
    for (rank, &slot) in order.iter().enumerate() {
        let start = offsets[slot];
        let next = order.get(rank + 1).map_or(end, |&n| offsets[n]);
        if next < start {
            return Err(DecodeError::structural(
                "offset table",
                format!("slot {slot} starts at {start:#x}, past the section end {next:#x}"),
            ));
        }
        lengths[slot] = Some(next - start);
    }
    Ok(lengths)
}
