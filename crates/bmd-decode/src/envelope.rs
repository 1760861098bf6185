//! EVP1: skin envelopes.

use glam::Mat4;

use crate::chunk::Chunk;
use crate::cursor::ByteCursor;
use crate::error::DecodeResult;

/// Joint influences of one skinned vertex group.
///
/// The three vectors are co-indexed and have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub joint_indices: Vec<u16>,
    pub weights: Vec<f32>,
    /// Bind-pose inverse of each influencing joint (3x4, last row `0 0 0 1`).
    pub inverse_binds: Vec<Mat4>,
}

impl Envelope {
    /// The influence standing in for the whole envelope when weights are
    /// not blended: the highest weight, first one on ties.
    #[must_use]
    pub fn representative_joint(&self) -> Option<u16> {
        let mut best: Option<(u16, f32)> = None;
        for (&joint, &weight) in self.joint_indices.iter().zip(&self.weights) {
            if best.is_none_or(|(_, w)| weight > w) {
                best = Some((joint, weight));
            }
        }
        best.map(|(joint, _)| joint)
    }
}

/// Read a row-major 3x4 matrix.
pub(crate) fn read_matrix_3x4(c: &mut ByteCursor<'_>) -> DecodeResult<Mat4> {
    let mut rows = [[0.0f32; 4]; 4];
    for row in rows.iter_mut().take(3) {
        for v in row.iter_mut() {
            *v = c.read_f32()?;
        }
    }
    rows[3] = [0.0, 0.0, 0.0, 1.0];
    Ok(Mat4::from_cols_array_2d(&rows).transpose())
}

/// Decode the EVP1 chunk into envelopes.
pub fn parse_envelopes(c: &mut ByteCursor<'_>, chunk: &Chunk) -> DecodeResult<Vec<Envelope>> {
    c.seek(chunk.at(0x08));
    let count = usize::from(c.read_u16()?);
    c.skip(2);
    let counts_offset = c.read_u32()?;
    let indices_offset = c.read_u32()?;
    let weights_offset = c.read_u32()?;
    let matrices_offset = c.read_u32()?;

    if count == 0 {
        return Ok(Vec::new());
    }

    c.seek(chunk.at(counts_offset));
    let counts = c.read_n(count, ByteCursor::read_u8)?;

    // Indices, weights and matrices are packed back to back across all envelopes.
    let mut indices = c.at(chunk.at(indices_offset));
    let mut weights = c.at(chunk.at(weights_offset));
    let mut matrices = c.at(chunk.at(matrices_offset));

    let mut envelopes = Vec::with_capacity(count);
    for &n in &counts {
        let n = usize::from(n);
        envelopes.push(Envelope {
            joint_indices: indices.read_n(n, ByteCursor::read_u16)?,
            weights: weights.read_n(n, ByteCursor::read_f32)?,
            inverse_binds: matrices.read_n(n, read_matrix_3x4)?,
        });
    }

    tracing::debug!(envelopes = envelopes.len(), "decoded envelopes");
    Ok(envelopes)
}
