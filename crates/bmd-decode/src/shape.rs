//! SHP1: geometry batches.
//!
//! A batch is a list of packets, each with a small matrix palette and a GX
//! display list. The display lists index into the VTX1 arrays; decoding
//! flattens them into one interleaved `f32` buffer per batch, so consumers
//! never need the VTX1 table again.
//!
//! Decoding walks every display list twice. The first pass records where
//! each primitive's index data starts and sums the vertex count; the second
//! fills a buffer allocated once at its final size.

use glam::Vec3;

use crate::chunk::Chunk;
use crate::cursor::ByteCursor;
use crate::draw::DrawMatrix;
use crate::envelope::Envelope;
use crate::error::{DecodeError, DecodeResult};
use crate::vertex::{VertexAttribute, VertexArrays};

const BATCH_SIZE: usize = 0x28;

/// Palette marker meaning "keep whatever the slot held for the previous packet".
const KEEP_SLOT: u16 = 0xffff;

/// How a batch is oriented relative to its joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixType {
    /// A single rigid matrix.
    Single,
    /// Screen-aligned billboard.
    Billboard,
    /// Billboard rotating about the Y axis only.
    BillboardY,
    /// Per-vertex matrix palette.
    Multi,
    Unknown(u8),
}

impl MatrixType {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Single,
            1 => Self::Billboard,
            2 => Self::BillboardY,
            3 => Self::Multi,
            other => Self::Unknown(other),
        }
    }
}

/// How a vertex attribute is stored in the display list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// The value itself, one byte. Only matrix indices use this.
    Direct,
    /// 8-bit index into the VTX1 array.
    Index8,
    /// 16-bit index into the VTX1 array.
    Index16,
}

impl IndexType {
    fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            1 => Self::Direct,
            2 => Self::Index8,
            3 => Self::Index16,
            _ => return None,
        })
    }

    /// Bytes the attribute occupies per display-list vertex.
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            Self::Direct | Self::Index8 => 1,
            Self::Index16 => 2,
        }
    }

    fn read(self, c: &mut ByteCursor<'_>) -> DecodeResult<usize> {
        Ok(match self {
            Self::Direct | Self::Index8 => usize::from(c.read_u8()?),
            Self::Index16 => usize::from(c.read_u16()?),
        })
    }
}

/// One attribute of a batch's vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchAttribute {
    pub attribute: VertexAttribute,
    pub index_type: IndexType,
    /// Offset of the attribute within an interleaved vertex, in scalars.
    pub offset: usize,
    /// Scalars the attribute occupies.
    pub item_size: usize,
}

/// GX primitive kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Quads,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Lines,
    LineStrip,
    Points,
}

impl Topology {
    /// Decode a display-list opcode. The low three bits select the vertex
    /// format and are ignored.
    #[must_use]
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Some(match opcode & 0xf8 {
            0x80 => Self::Quads,
            0x90 => Self::Triangles,
            0x98 => Self::TriangleStrip,
            0xa0 => Self::TriangleFan,
            0xa8 => Self::Lines,
            0xb0 => Self::LineStrip,
            0xb8 => Self::Points,
            _ => return None,
        })
    }
}

/// A run of vertices in the batch's interleaved buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Primitive {
    pub topology: Topology,
    /// First vertex.
    pub start: usize,
    /// Number of vertices.
    pub count: usize,
}

/// What one entry of a packet's matrix palette binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixSlot {
    /// Unchanged from the previous packet.
    Keep,
    Rigid { joint: u16 },
    /// An envelope, drawn with its dominant joint only.
    Weighted { envelope: u16, joint: u16 },
}

impl MatrixSlot {
    /// Joint the slot is drawn with, if it changes.
    #[must_use]
    pub fn joint(self) -> Option<u16> {
        match self {
            Self::Keep => None,
            Self::Rigid { joint } | Self::Weighted { joint, .. } => Some(joint),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub matrix_slots: Vec<MatrixSlot>,
    pub primitives: Vec<Primitive>,
}

impl Packet {
    /// Joint per palette slot, `-1` where the previous binding is kept.
    #[must_use]
    pub fn matrix_table(&self) -> Vec<i32> {
        self.matrix_slots
            .iter()
            .map(|slot| slot.joint().map_or(-1, i32::from))
            .collect()
    }
}

/// A decoded SHP1 batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub matrix_type: MatrixType,
    pub attributes: Vec<BatchAttribute>,
    /// Scalars per interleaved vertex.
    pub stride: usize,
    pub vertices: Vec<f32>,
    pub vertex_count: usize,
    pub packets: Vec<Packet>,
    pub bounding_radius: f32,
    pub bbox_min: Vec3,
    pub bbox_max: Vec3,
}

impl Batch {
    /// The interleaved scalars of vertex `index`.
    #[must_use]
    pub fn vertex(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.stride)?;
        self.vertices.get(start..start + self.stride)
    }

    #[must_use]
    pub fn attribute(&self, attribute: VertexAttribute) -> Option<&BatchAttribute> {
        self.attributes.iter().find(|a| a.attribute == attribute)
    }

    /// Primitives of all packets, in draw order.
    pub fn primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.packets.iter().flat_map(|p| &p.primitives)
    }
}

/// Tables decoded from earlier chunks that SHP1 reads back into.
#[derive(Debug, Clone, Copy)]
pub struct ShapeSources<'a> {
    pub vertex_arrays: &'a VertexArrays,
    pub draw_matrices: Option<&'a [DrawMatrix]>,
    pub envelopes: Option<&'a [Envelope]>,
}

impl ShapeSources<'_> {
    fn resolve_slot(&self, raw: u16) -> DecodeResult<MatrixSlot> {
        if raw == KEEP_SLOT {
            return Ok(MatrixSlot::Keep);
        }
        let draw_matrices = self.draw_matrices.ok_or_else(|| {
            DecodeError::structural("SHP1", "matrix palette used but there is no DRW1 chunk")
        })?;
        let entry = draw_matrices.get(usize::from(raw)).ok_or_else(|| {
            DecodeError::structural(
                "SHP1",
                format!("matrix slot {raw} past {} DRW1 entries", draw_matrices.len()),
            )
        })?;
        match *entry {
            DrawMatrix::Rigid { joint } => Ok(MatrixSlot::Rigid { joint }),
            DrawMatrix::Weighted { envelope } => {
                let envelopes = self.envelopes.ok_or_else(|| {
                    DecodeError::structural("SHP1", "weighted matrix slot but there is no EVP1 chunk")
                })?;
                let joint = envelopes
                    .get(usize::from(envelope))
                    .and_then(Envelope::representative_joint)
                    .ok_or_else(|| {
                        DecodeError::structural(
                            "SHP1",
                            format!("envelope {envelope} is missing or has no influences"),
                        )
                    })?;
                Ok(MatrixSlot::Weighted { envelope, joint })
            }
        }
    }
}

/// Chunk-relative table offsets from the SHP1 header.
struct Layout {
    batches: u32,
    attributes: u32,
    matrix_table: u32,
    data: u32,
    matrix_data: u32,
    packet_locations: u32,
}

/// A primitive located by the first pass.
struct PendingPrimitive {
    topology: Topology,
    count: usize,
    data: usize,
}

pub fn parse_batches(
    c: &mut ByteCursor<'_>,
    chunk: &Chunk,
    sources: &ShapeSources<'_>,
) -> DecodeResult<Vec<Batch>> {
    c.seek(chunk.at(0x08));
    let count = usize::from(c.read_u16()?);
    c.skip(2);
    let batches = c.read_u32()?;
    let _remap = c.read_u32()?;
    let _names = c.read_u32()?;
    let layout = Layout {
        batches,
        attributes: c.read_u32()?,
        matrix_table: c.read_u32()?,
        data: c.read_u32()?,
        matrix_data: c.read_u32()?,
        packet_locations: c.read_u32()?,
    };

    let batches = (0..count)
        .map(|index| read_batch(c, chunk, &layout, index, sources))
        .collect::<DecodeResult<Vec<_>>>()?;

    tracing::debug!(
        batches = batches.len(),
        vertices = batches.iter().map(|b| b.vertex_count).sum::<usize>(),
        "decoded batches"
    );
    Ok(batches)
}

fn read_batch(
    c: &mut ByteCursor<'_>,
    chunk: &Chunk,
    layout: &Layout,
    index: usize,
    sources: &ShapeSources<'_>,
) -> DecodeResult<Batch> {
    c.seek(chunk.at(layout.batches) + index * BATCH_SIZE);
    let matrix_type = MatrixType::from_raw(c.read_u8()?);
    c.skip(1);
    let packet_count = usize::from(c.read_u16()?);
    let attributes_offset = u32::from(c.read_u16()?);
    let first_matrix_data = usize::from(c.read_u16()?);
    let first_packet_location = usize::from(c.read_u16()?);
    c.skip(2);
    let bounding_radius = c.read_f32()?;
    let bbox_min = c.read_vec3()?;
    let bbox_max = c.read_vec3()?;

    c.seek(chunk.at(layout.attributes) + attributes_offset as usize);
    let attributes = read_attributes(c, sources.vertex_arrays)?;
    let stride: usize = attributes.iter().map(|a| a.item_size).sum();
    let width: usize = attributes.iter().map(|a| a.index_type.width()).sum();

    let mut packets = Vec::with_capacity(packet_count.min(c.remaining()));
    let mut pending = Vec::new();
    let mut vertex_count = 0;
    for packet in 0..packet_count {
        c.seek(chunk.at(layout.matrix_data) + (first_matrix_data + packet) * 8);
        c.skip(2);
        let slot_count = usize::from(c.read_u16()?);
        let first_slot = c.read_u32()? as usize;
        c.seek(chunk.at(layout.matrix_table) + first_slot * 2);
        let matrix_slots = c.read_n(slot_count, |c| sources.resolve_slot(c.read_u16()?))?;

        c.seek(chunk.at(layout.packet_locations) + (first_packet_location + packet) * 8);
        let size = c.read_u32()? as usize;
        let offset = c.read_u32()?;
        let start = chunk.at(layout.data) + offset as usize;
        c.seek(start);
        let first = pending.len();
        scan_display_list(c, start + size, width, &mut pending)?;

        let mut primitives = Vec::with_capacity(pending.len() - first);
        for p in &pending[first..] {
            primitives.push(Primitive {
                topology: p.topology,
                start: vertex_count,
                count: p.count,
            });
            vertex_count += p.count;
        }
        packets.push(Packet {
            matrix_slots,
            primitives,
        });
    }

    if packets
        .iter()
        .flat_map(|p| &p.matrix_slots)
        .any(|s| matches!(s, MatrixSlot::Weighted { .. }))
    {
        tracing::warn!(batch = index, "skinned batch drawn with each envelope's dominant joint");
    }

    let mut vertices = vec![0.0; vertex_count * stride];
    let mut out = vertices.chunks_exact_mut(stride.max(1));
    for p in &pending {
        c.seek(p.data);
        for _ in 0..p.count {
            let Some(vertex) = out.next() else { break };
            for a in &attributes {
                let raw = a.index_type.read(c)?;
                let dst = &mut vertex[a.offset..a.offset + a.item_size];
                if a.attribute.is_matrix_index() {
                    dst[0] = (raw / 3) as f32;
                } else {
                    dst.copy_from_slice(item(sources.vertex_arrays, a.attribute, raw)?);
                }
            }
        }
    }

    tracing::trace!(
        batch = index,
        ?matrix_type,
        packets = packets.len(),
        vertex_count,
        stride,
        "batch"
    );
    Ok(Batch {
        matrix_type,
        attributes,
        stride,
        vertices,
        vertex_count,
        packets,
        bounding_radius,
        bbox_min,
        bbox_max,
    })
}

fn item(arrays: &VertexArrays, attribute: VertexAttribute, index: usize) -> DecodeResult<&[f32]> {
    // Presence was checked when the attribute list was read.
    let array = arrays.get(attribute).ok_or_else(|| {
        DecodeError::structural("SHP1", format!("no VTX1 array for {attribute:?}"))
    })?;
    array.item(index).ok_or_else(|| {
        DecodeError::structural(
            "SHP1",
            format!("{attribute:?} index {index} past {} items", array.len()),
        )
    })
}

fn read_attributes(
    c: &mut ByteCursor<'_>,
    arrays: &VertexArrays,
) -> DecodeResult<Vec<BatchAttribute>> {
    let mut attributes = Vec::new();
    let mut offset = 0;
    loop {
        let raw = c.read_u32()?;
        let raw_index = c.read_u32()?;
        if raw == VertexAttribute::NULL {
            break;
        }
        let attribute = VertexAttribute::from_raw(raw).ok_or_else(|| {
            DecodeError::structural("SHP1", format!("unknown vertex attribute {raw:#x}"))
        })?;
        let index_type = IndexType::from_raw(raw_index).ok_or_else(|| {
            DecodeError::structural(
                "SHP1",
                format!("{attribute:?} has unknown index type {raw_index}"),
            )
        })?;

        let item_size = if attribute.is_matrix_index() {
            if index_type != IndexType::Direct {
                return Err(DecodeError::structural(
                    "SHP1",
                    format!("{attribute:?} must be stored directly, found {index_type:?}"),
                ));
            }
            1
        } else {
            if index_type == IndexType::Direct {
                return Err(DecodeError::structural(
                    "SHP1",
                    format!("{attribute:?} stored directly is not supported"),
                ));
            }
            arrays
                .get(attribute)
                .ok_or_else(|| {
                    DecodeError::structural(
                        "SHP1",
                        format!("{attribute:?} is referenced but VTX1 has no such array"),
                    )
                })?
                .item_size
        };

        attributes.push(BatchAttribute {
            attribute,
            index_type,
            offset,
            item_size,
        });
        offset += item_size;
    }
    Ok(attributes)
}

/// First pass: record every primitive of one display list.
fn scan_display_list(
    c: &mut ByteCursor<'_>,
    end: usize,
    width: usize,
    pending: &mut Vec<PendingPrimitive>,
) -> DecodeResult<()> {
    while c.position() < end {
        let opcode = c.read_u8()?;
        if opcode == 0 {
            break;
        }
        let topology = Topology::from_opcode(opcode).ok_or_else(|| {
            DecodeError::structural(
                "SHP1",
                format!("unknown primitive opcode {opcode:#04x} at {:#x}", c.position() - 1),
            )
        })?;
        let count = usize::from(c.read_u16()?);
        let data = c.position();
        let next = data + count * width;
        if next > c.len() {
            return Err(DecodeError::OutOfBounds {
                offset: data,
                need: count * width,
                len: c.len(),
            });
        }
        if next > end {
            return Err(DecodeError::structural(
                "SHP1",
                format!("{topology:?} of {count} vertices runs past its packet"),
            ));
        }
        pending.push(PendingPrimitive {
            topology,
            count,
            data,
        });
        c.seek(next);
    }
    Ok(())
}
