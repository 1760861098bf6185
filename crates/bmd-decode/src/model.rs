//! The decoded model and the driver that builds it.

use crate::chunk::{Chunk, ChunkKind, ChunkReader};
use crate::cursor::ByteCursor;
use crate::draw::{DrawMatrix, parse_draw_matrices};
use crate::envelope::{Envelope, parse_envelopes};
use crate::error::{DecodeError, DecodeResult, Warning};
use crate::hierarchy::{Hierarchy, HierarchyNode};
use crate::joint::{Joint, parse_joints};
use crate::material::{Material, MaterialTable, parse_materials};
use crate::options::DecodeOptions;
use crate::shape::{Batch, ShapeSources, parse_batches};
use crate::texture::{Texture, parse_textures};
use crate::vertex::VertexArrays;

/// A fully decoded model. Immutable once built.
#[derive(Debug, Clone)]
pub struct Model {
    hierarchy: Hierarchy,
    vertex_arrays: Option<VertexArrays>,
    envelopes: Vec<Envelope>,
    draw_matrices: Vec<DrawMatrix>,
    joints: Vec<Joint>,
    batches: Vec<Batch>,
    materials: MaterialTable,
    textures: Vec<Texture>,
    warnings: Vec<Warning>,
}

impl Model {
    #[must_use]
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// The VTX1 arrays, kept only with
    /// [`DecodeOptions::retain_vertex_arrays`].
    #[must_use]
    pub fn vertex_arrays(&self) -> Option<&VertexArrays> {
        self.vertex_arrays.as_ref()
    }

    #[must_use]
    pub fn envelopes(&self) -> &[Envelope] {
        &self.envelopes
    }

    #[must_use]
    pub fn draw_matrices(&self) -> &[DrawMatrix] {
        &self.draw_matrices
    }

    #[must_use]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[must_use]
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    #[must_use]
    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    /// The material selected by a hierarchy `Material` node.
    #[must_use]
    pub fn material(&self, reference: u16) -> Option<&Material> {
        self.materials.resolve(reference)
    }

    #[must_use]
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    /// Recoverable problems met while decoding, in file order.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Decode a model with default options.
pub fn decode(bytes: &[u8]) -> DecodeResult<Model> {
    decode_with(bytes, &DecodeOptions::default())
}

/// Decode a model.
///
/// # Errors
///
/// Any out-of-bounds read or structural inconsistency aborts the decode.
/// Errors raised inside a chunk carry its tag and offset.
pub fn decode_with(bytes: &[u8], options: &DecodeOptions) -> DecodeResult<Model> {
    let mut builder = ModelBuilder::new(options);
    ChunkReader::new(bytes)?.for_each_chunk(|c, chunk| builder.chunk(c, chunk))?;
    builder.finish()
}

/// Sections decoded so far.
struct ModelBuilder<'o> {
    options: &'o DecodeOptions,
    seen: Vec<ChunkKind>,
    hierarchy: Option<Hierarchy>,
    vertex_arrays: Option<VertexArrays>,
    envelopes: Option<Vec<Envelope>>,
    draw_matrices: Option<Vec<DrawMatrix>>,
    joints: Vec<Joint>,
    batches: Vec<Batch>,
    materials: MaterialTable,
    textures: Vec<Texture>,
    warnings: Vec<Warning>,
}

impl<'o> ModelBuilder<'o> {
    fn new(options: &'o DecodeOptions) -> Self {
        Self {
            options,
            seen: Vec::new(),
            hierarchy: None,
            vertex_arrays: None,
            envelopes: None,
            draw_matrices: None,
            joints: Vec::new(),
            batches: Vec::new(),
            materials: MaterialTable::default(),
            textures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn chunk(&mut self, c: &mut ByteCursor<'_>, chunk: &Chunk) -> DecodeResult<()> {
        if let ChunkKind::Unknown(tag) = chunk.kind {
            self.warn(Warning::UnknownChunkTag {
                tag,
                offset: chunk.offset,
            });
            return Ok(());
        }
        if self.seen.contains(&chunk.kind) {
            return Err(DecodeError::structural(
                "model",
                format!("second {} chunk", chunk.kind),
            ));
        }
        self.seen.push(chunk.kind);

        let before = self.warnings.len();
        match chunk.kind {
            ChunkKind::Inf1 => self.hierarchy = Some(Hierarchy::parse(c, chunk)?),
            ChunkKind::Vtx1 => self.vertex_arrays = Some(VertexArrays::parse(c, chunk)?),
            ChunkKind::Evp1 => self.envelopes = Some(parse_envelopes(c, chunk)?),
            ChunkKind::Drw1 => self.draw_matrices = Some(parse_draw_matrices(c, chunk)?),
            ChunkKind::Jnt1 => self.joints = parse_joints(c, chunk)?,
            ChunkKind::Shp1 => {
                let vertex_arrays = self.vertex_arrays.as_ref().ok_or_else(|| {
                    DecodeError::structural("SHP1", "geometry appears before its VTX1 chunk")
                })?;
                let sources = ShapeSources {
                    vertex_arrays,
                    draw_matrices: self.draw_matrices.as_deref(),
                    envelopes: self.envelopes.as_deref(),
                };
                self.batches = parse_batches(c, chunk, &sources)?;
            }
            ChunkKind::Mat3 => {
                self.materials = parse_materials(c, chunk, &mut self.warnings)?;
            }
            ChunkKind::Tex1 => {
                self.textures = parse_textures(c, chunk, self.options, &mut self.warnings)?;
            }
            ChunkKind::Unknown(_) => {}
        }
        for warning in &self.warnings[before..] {
            tracing::warn!(%warning, "decode warning");
        }
        Ok(())
    }

    fn warn(&mut self, warning: Warning) {
        tracing::warn!(%warning, "decode warning");
        self.warnings.push(warning);
    }

    fn finish(self) -> DecodeResult<Model> {
        let hierarchy = self
            .hierarchy
            .ok_or_else(|| DecodeError::structural("model", "missing INF1 chunk"))?;

        for node in &hierarchy.nodes {
            let resolves = match *node {
                HierarchyNode::Joint(i) => usize::from(i) < self.joints.len(),
                HierarchyNode::Batch(i) => usize::from(i) < self.batches.len(),
                HierarchyNode::Material(i) => self.materials.resolve(i).is_some(),
                HierarchyNode::Open | HierarchyNode::Close => true,
            };
            if !resolves {
                return Err(DecodeError::structural(
                    "INF1",
                    format!(
                        "{node:?} does not resolve ({} joints, {} batches, {} material references)",
                        self.joints.len(),
                        self.batches.len(),
                        self.materials.len()
                    ),
                ));
            }
        }

        let joint_count = self.joints.len();
        if let Some(joint) = self
            .batches
            .iter()
            .flat_map(|b| &b.packets)
            .flat_map(|p| &p.matrix_slots)
            .filter_map(|s| s.joint())
            .find(|&j| usize::from(j) >= joint_count)
        {
            return Err(DecodeError::structural(
                "SHP1",
                format!("matrix slot binds joint {joint} but only {joint_count} decoded"),
            ));
        }

        let vertex_arrays = if self.options.retain_vertex_arrays {
            self.vertex_arrays
        } else {
            None
        };

        tracing::debug!(
            joints = joint_count,
            batches = self.batches.len(),
            materials = self.materials.materials.len(),
            textures = self.textures.len(),
            warnings = self.warnings.len(),
            "decoded model"
        );
        Ok(Model {
            hierarchy,
            vertex_arrays,
            envelopes: self.envelopes.unwrap_or_default(),
            draw_matrices: self.draw_matrices.unwrap_or_default(),
            joints: self.joints,
            batches: self.batches,
            materials: self.materials,
            textures: self.textures,
            warnings: self.warnings,
        })
    }
}
