//! VTX1: vertex attribute arrays.
//!
//! Every array is dequantised to `f32` up front. Batches later copy items
//! out of these arrays by index, so the table can be dropped once SHP1 has
//! been decoded.

use crate::chunk::Chunk;
use crate::cursor::ByteCursor;
use crate::error::{DecodeError, DecodeResult};
use crate::offsets::OffsetTable;

/// Number of array slots in the VTX1 offset table.
pub const ARRAY_SLOTS: usize = 13;

/// GX vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    /// Position/normal matrix palette slot.
    MatrixIndex,
    /// Texture matrix palette slot for texture coordinate `n`.
    TexMatrixIndex(u8),
    Position,
    Normal,
    Color(u8),
    TexCoord(u8),
}

impl VertexAttribute {
    /// Terminator of SHP1 attribute lists.
    pub const NULL: u32 = 0xff;

    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0x00 => Self::MatrixIndex,
            0x01..=0x08 => Self::TexMatrixIndex((raw - 0x01) as u8),
            0x09 => Self::Position,
            0x0a => Self::Normal,
            0x0b | 0x0c => Self::Color((raw - 0x0b) as u8),
            0x0d..=0x14 => Self::TexCoord((raw - 0x0d) as u8),
            _ => return None,
        })
    }

    /// Whether the attribute is a matrix palette slot rather than array data.
    #[must_use]
    pub fn is_matrix_index(self) -> bool {
        matches!(self, Self::MatrixIndex | Self::TexMatrixIndex(_))
    }

    /// Scalars per item for a VTX1 component count, `None` if the
    /// combination is not one this format uses.
    #[must_use]
    pub fn item_size(self, component_count: u32) -> Option<usize> {
        match (self, component_count) {
            (Self::Position, 0) => Some(2),
            (Self::Position, 1) | (Self::Normal, _) => Some(3),
            (Self::Color(_), 0) => Some(3),
            (Self::Color(_), 1) => Some(4),
            (Self::TexCoord(_), 0) => Some(1),
            (Self::TexCoord(_), 1) => Some(2),
            _ => None,
        }
    }
}

/// Storage type of a position/normal/texcoord component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    U8,
    S8,
    U16,
    /// Signed 16-bit fixed point, the common case.
    S16,
    F32,
}

impl ComponentType {
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::U8 | Self::S8 => 1,
            Self::U16 | Self::S16 => 2,
            Self::F32 => 4,
        }
    }
}

/// Storage type of a colour element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Rgb565,
    Rgb8,
    Rgbx8,
    Rgba4,
    Rgba6,
    Rgba8,
}

impl ColorType {
    #[must_use]
    pub fn size(self) -> usize {
        match self {
            Self::Rgb565 | Self::Rgba4 => 2,
            Self::Rgb8 | Self::Rgba6 => 3,
            Self::Rgbx8 | Self::Rgba8 => 4,
        }
    }

    fn read(self, c: &mut ByteCursor<'_>) -> DecodeResult<[f32; 4]> {
        let norm = |v: u32, max: u32| v as f32 / max as f32;
        Ok(match self {
            Self::Rgb565 => {
                let v = u32::from(c.read_u16()?);
                [norm(v >> 11, 31), norm((v >> 5) & 0x3f, 63), norm(v & 0x1f, 31), 1.0]
            }
            Self::Rgb8 | Self::Rgbx8 => {
                let rgb = c.read_bytes(3)?;
                if self == Self::Rgbx8 {
                    c.skip(1);
                }
                [
                    norm(rgb[0].into(), 255),
                    norm(rgb[1].into(), 255),
                    norm(rgb[2].into(), 255),
                    1.0,
                ]
            }
            Self::Rgba4 => {
                let v = u32::from(c.read_u16()?);
                [12, 8, 4, 0].map(|shift| norm((v >> shift) & 0xf, 15))
            }
            Self::Rgba6 => {
                let b = c.read_bytes(3)?;
                let v = (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2]);
                [18, 12, 6, 0].map(|shift| norm((v >> shift) & 0x3f, 63))
            }
            Self::Rgba8 => {
                let b = c.read_bytes(4)?;
                [0, 1, 2, 3].map(|i| norm(b[i].into(), 255))
            }
        })
    }
}

/// How the items of an array are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Component(ComponentType),
    Color(ColorType),
}

impl DataType {
    fn from_raw(attribute: VertexAttribute, raw: u32) -> Option<Self> {
        if let VertexAttribute::Color(_) = attribute {
            let color = match raw {
                0 => ColorType::Rgb565,
                1 => ColorType::Rgb8,
                2 => ColorType::Rgbx8,
                3 => ColorType::Rgba4,
                4 => ColorType::Rgba6,
                5 => ColorType::Rgba8,
                _ => return None,
            };
            return Some(Self::Color(color));
        }
        let component = match raw {
            0 => ComponentType::U8,
            1 => ComponentType::S8,
            2 => ComponentType::U16,
            3 => ComponentType::S16,
            4 => ComponentType::F32,
            _ => return None,
        };
        Some(Self::Component(component))
    }
}

/// Description of one VTX1 array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayFormat {
    pub attribute: VertexAttribute,
    pub component_count: u32,
    pub data_type: DataType,
    /// Fixed-point exponent: integer components are scaled by `2^-decimal_point`.
    pub decimal_point: u8,
    /// Chunk-relative offset of the array data.
    pub offset: u32,
}

impl ArrayFormat {
    #[must_use]
    pub fn scale(&self) -> f32 {
        0.5f32.powi(i32::from(self.decimal_point))
    }
}

/// A dequantised attribute array.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexArray {
    pub format: ArrayFormat,
    /// Scalars per logical item.
    pub item_size: usize,
    pub data: Vec<f32>,
}

impl VertexArray {
    /// Number of complete items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.item_size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The scalars of item `index`.
    #[must_use]
    pub fn item(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.item_size)?;
        self.data.get(start..start + self.item_size)
    }
}

/// Decode raw fixed-point components.
fn read_components(
    c: &mut ByteCursor<'_>,
    ty: ComponentType,
    count: usize,
    scale: f32,
) -> DecodeResult<Vec<f32>> {
    c.read_n(count, |c| {
        Ok(match ty {
            ComponentType::U8 => f32::from(c.read_u8()?) * scale,
            ComponentType::S8 => f32::from(c.read_i8()?) * scale,
            ComponentType::U16 => f32::from(c.read_u16()?) * scale,
            ComponentType::S16 => f32::from(c.read_i16()?) * scale,
            ComponentType::F32 => c.read_f32()?,
        })
    })
}

/// Decoded VTX1 chunk.
#[derive(Debug, Clone, Default)]
pub struct VertexArrays {
    arrays: Vec<VertexArray>,
}

impl VertexArrays {
    #[cfg(test)]
    pub(crate) fn from_arrays(arrays: Vec<VertexArray>) -> Self {
        Self { arrays }
    }

    pub fn parse(c: &mut ByteCursor<'_>, chunk: &Chunk) -> DecodeResult<Self> {
        c.seek(chunk.at(0x08));
        let formats_offset = c.read_u32()?;
        let table = OffsetTable::read(c, ARRAY_SLOTS, chunk.size)?;

        // Formats are listed in the order of the present slots.
        let mut formats = c.at(chunk.at(formats_offset));
        let mut arrays = Vec::new();
        for slot in table.present() {
            let raw_attribute = formats.read_u32()?;
            let component_count = formats.read_u32()?;
            let raw_type = formats.read_u32()?;
            let decimal_point = formats.read_u8()?;
            formats.skip(3);

            let attribute = VertexAttribute::from_raw(raw_attribute).ok_or_else(|| {
                DecodeError::structural("VTX1", format!("unknown attribute {raw_attribute:#x}"))
            })?;
            let item_size = attribute.item_size(component_count).ok_or_else(|| {
                DecodeError::structural(
                    "VTX1",
                    format!("{attribute:?} has unsupported component count {component_count}"),
                )
            })?;
            let data_type = DataType::from_raw(attribute, raw_type).ok_or_else(|| {
                DecodeError::structural(
                    "VTX1",
                    format!("{attribute:?} has unknown data type {raw_type}"),
                )
            })?;
            let offset = table.offset(slot).unwrap_or_default();
            let format = ArrayFormat {
                attribute,
                component_count,
                data_type,
                decimal_point,
                offset,
            };

            let length = table.length(slot).unwrap_or(0) as usize;
            c.seek(chunk.at(offset));
            let data = match data_type {
                DataType::Component(ty) => {
                    read_components(c, ty, length / ty.size(), format.scale())?
                }
                DataType::Color(ty) => {
                    let items = c.read_n(length / ty.size(), |c| ty.read(c))?;
                    items
                        .iter()
                        .flat_map(|rgba| rgba[..item_size].iter().copied())
                        .collect()
                }
            };

            tracing::trace!(?attribute, items = data.len() / item_size, "vertex array");
            arrays.push(VertexArray {
                format,
                item_size,
                data,
            });
        }

        tracing::debug!(arrays = arrays.len(), "decoded vertex arrays");
        Ok(Self { arrays })
    }

    /// The array holding `attribute`, if present.
    #[must_use]
    pub fn get(&self, attribute: VertexAttribute) -> Option<&VertexArray> {
        self.arrays.iter().find(|a| a.format.attribute == attribute)
    }

    /// All arrays in slot order.
    #[must_use]
    pub fn arrays(&self) -> &[VertexArray] {
        &self.arrays
    }
}
