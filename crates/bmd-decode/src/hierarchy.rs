//! INF1: the scene hierarchy instruction list.
//!
//! The list is a depth-first program. A renderer walks it with a joint
//! stack: `Open`/`Close` push and pop a scope, `Joint` binds a transform,
//! `Material` switches material, `Batch` draws geometry. Nothing here
//! composes transforms.

use crate::chunk::Chunk;
use crate::cursor::ByteCursor;
use crate::error::{DecodeError, DecodeResult};

/// One hierarchy instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyNode {
    /// Enter a child scope.
    Open,
    /// Leave the current scope.
    Close,
    /// Bind the transform of a JNT1 joint.
    Joint(u16),
    /// Select a material, by index into MAT3's remap table.
    Material(u16),
    /// Draw an SHP1 batch.
    Batch(u16),
}

impl HierarchyNode {
    fn from_raw(kind: u16, index: u16) -> Option<Self> {
        Some(match kind {
            0x01 => Self::Open,
            0x02 => Self::Close,
            0x10 => Self::Joint(index),
            0x11 => Self::Material(index),
            0x12 => Self::Batch(index),
            _ => return None,
        })
    }
}

/// Decoded INF1 chunk.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    /// Loading flags (scaling rule and matrix mode bits).
    pub flags: u16,
    /// Total SHP1 packet count, as declared by the exporter.
    pub packet_count: u32,
    /// Total VTX1 position count, as declared by the exporter.
    pub vertex_count: u32,
    /// Instructions in traversal order, without the terminator.
    pub nodes: Vec<HierarchyNode>,
}

impl Hierarchy {
    pub fn parse(c: &mut ByteCursor<'_>, chunk: &Chunk) -> DecodeResult<Self> {
        c.seek(chunk.at(0x08));
        let flags = c.read_u16()?;
        c.skip(2);
        let packet_count = c.read_u32()?;
        let vertex_count = c.read_u32()?;
        let entries_offset = c.read_u32()?;

        c.seek(chunk.at(entries_offset));
        let mut nodes = Vec::new();
        loop {
            let kind = c.read_u16()?;
            let index = c.read_u16()?;
            if kind == 0 {
                break;
            }
            let node = HierarchyNode::from_raw(kind, index).ok_or_else(|| {
                DecodeError::structural(
                    "INF1",
                    format!("unknown node type {kind:#x} at entry {}", nodes.len()),
                )
            })?;
            nodes.push(node);
        }

        tracing::debug!(nodes = nodes.len(), vertex_count, "decoded hierarchy");
        Ok(Self {
            flags,
            packet_count,
            vertex_count,
            nodes,
        })
    }

    /// Deepest scope nesting reached by the list.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        let mut depth = 0usize;
        let mut max = 0;
        for node in &self.nodes {
            match node {
                HierarchyNode::Open => {
                    depth += 1;
                    max = max.max(depth);
                }
                HierarchyNode::Close => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        max
    }
}
