//! DRW1: draw matrix table.
//!
//! Each entry says where a packet matrix slot gets its transform from:
//! directly from one joint, or from an EVP1 envelope.

use crate::chunk::Chunk;
use crate::cursor::ByteCursor;
use crate::error::DecodeResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMatrix {
    /// Rigid attachment to a single JNT1 joint.
    Rigid { joint: u16 },
    /// Skinned through an EVP1 envelope.
    Weighted { envelope: u16 },
}

impl DrawMatrix {
    #[must_use]
    pub fn is_weighted(self) -> bool {
        matches!(self, Self::Weighted { .. })
    }
}

pub fn parse_draw_matrices(c: &mut ByteCursor<'_>, chunk: &Chunk) -> DecodeResult<Vec<DrawMatrix>> {
    c.seek(chunk.at(0x08));
    let count = usize::from(c.read_u16()?);
    c.skip(2);
    let weighted_offset = c.read_u32()?;
    let data_offset = c.read_u32()?;

    c.seek(chunk.at(weighted_offset));
    let weighted = c.read_n(count, ByteCursor::read_u8)?;
    c.seek(chunk.at(data_offset));
    let data = c.read_n(count, ByteCursor::read_u16)?;

    let matrices: Vec<_> = weighted
        .into_iter()
        .zip(data)
        .map(|(flag, index)| {
            if flag == 0 {
                DrawMatrix::Rigid { joint: index }
            } else {
                DrawMatrix::Weighted { envelope: index }
            }
        })
        .collect();

    tracing::debug!(
        entries = matrices.len(),
        weighted = matrices.iter().filter(|m| m.is_weighted()).count(),
        "decoded draw matrices"
    );
    Ok(matrices)
}
