//! MAT3: materials.
//!
//! The chunk stores every distinct piece of render state once, in pools,
//! and each material record is a bundle of indices into those pools. The
//! decoder reads the pools, then resolves each record into a [`Material`]
//! holding values rather than indices.
//!
//! Fixed-function enums (blend factors, compare functions, TEV inputs and
//! so on) are kept as their raw GX values for the renderer to map.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::chunk::Chunk;
use crate::cursor::ByteCursor;
use crate::error::{DecodeError, DecodeResult, Warning};
use crate::joint::angle_from_raw;
use crate::offsets::OffsetTable;
use crate::string_table::read_string_table;

/// Number of slots in the MAT3 offset table.
pub const POOL_SLOTS: usize = 30;

const MATERIAL_SIZE: usize = 0x14c;

/// Unset marker for 16-bit pool indices.
const UNSET: u16 = 0xffff;
/// Unset marker for 8-bit pool indices.
const UNSET_BYTE: u8 = 0xff;

mod slot {
    pub const MATERIALS: usize = 0;
    pub const REMAP: usize = 1;
    pub const NAMES: usize = 2;
    pub const CULL_MODES: usize = 4;
    pub const MATERIAL_COLORS: usize = 5;
    pub const CHANNEL_COUNTS: usize = 6;
    pub const COLOR_CHANNELS: usize = 7;
    pub const AMBIENT_COLORS: usize = 8;
    pub const TEXGEN_COUNTS: usize = 10;
    pub const TEXGENS: usize = 11;
    pub const TEX_MATRICES: usize = 13;
    pub const TEXTURE_REMAP: usize = 15;
    pub const TEV_ORDERS: usize = 16;
    pub const TEV_COLORS: usize = 17;
    pub const KONST_COLORS: usize = 18;
    pub const TEV_COUNTS: usize = 19;
    pub const TEV_STAGES: usize = 20;
    pub const SWAP_MODES: usize = 21;
    pub const SWAP_TABLES: usize = 22;
    pub const ALPHA_COMPARES: usize = 24;
    pub const BLEND_MODES: usize = 25;
    pub const Z_MODES: usize = 26;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
    All,
}

impl CullMode {
    fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => Self::None,
            1 => Self::Front,
            2 => Self::Back,
            3 => Self::All,
            _ => return None,
        })
    }
}

/// Lighting setup of one colour or alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorChannel {
    pub lighting: bool,
    pub material_source: u8,
    pub light_mask: u8,
    pub diffuse_function: u8,
    pub attenuation_function: u8,
    pub ambient_source: u8,
}

impl ColorChannel {
    fn read(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let channel = Self {
            lighting: c.read_u8()? != 0,
            material_source: c.read_u8()?,
            light_mask: c.read_u8()?,
            diffuse_function: c.read_u8()?,
            attenuation_function: c.read_u8()?,
            ambient_source: c.read_u8()?,
        };
        c.skip(2);
        Ok(channel)
    }
}

/// Texture coordinate generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexGen {
    pub kind: u8,
    pub source: u8,
    pub matrix: u8,
}

impl TexGen {
    fn read(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let texgen = Self {
            kind: c.read_u8()?,
            source: c.read_u8()?,
            matrix: c.read_u8()?,
        };
        c.skip(1);
        Ok(texgen)
    }
}

/// Texture coordinate transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexMatrix {
    pub projection: u8,
    pub kind: u8,
    pub center: Vec3,
    pub scale: Vec2,
    /// Radians.
    pub rotation: f32,
    pub translation: Vec2,
    pub effect_matrix: Mat4,
}

impl TexMatrix {
    fn read(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let projection = c.read_u8()?;
        let kind = c.read_u8()?;
        c.skip(2);
        let center = c.read_vec3()?;
        let scale = Vec2::new(c.read_f32()?, c.read_f32()?);
        let rotation = angle_from_raw(c.read_i16()?);
        c.skip(2);
        let translation = Vec2::new(c.read_f32()?, c.read_f32()?);
        let mut effect = [0.0f32; 16];
        for v in &mut effect {
            *v = c.read_f32()?;
        }
        Ok(Self {
            projection,
            kind,
            center,
            scale,
            rotation,
            translation,
            // Stored row-major.
            effect_matrix: Mat4::from_cols_array(&effect).transpose(),
        })
    }
}

/// Inputs a TEV stage samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TevOrder {
    pub tex_coord: u8,
    pub tex_map: u8,
    pub channel: u8,
}

impl TevOrder {
    fn read(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let order = Self {
            tex_coord: c.read_u8()?,
            tex_map: c.read_u8()?,
            channel: c.read_u8()?,
        };
        c.skip(1);
        Ok(order)
    }
}

/// Comparison performed by a compare-mode TEV combiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    R8Greater,
    R8Equal,
    Gr16Greater,
    Gr16Equal,
    Bgr24Greater,
    Bgr24Equal,
    /// Per-channel on colour combiners, alpha only on alpha combiners.
    Rgb8Greater,
    Rgb8Equal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOp {
    Add,
    Sub,
    Compare(CompareOp),
    /// A value outside the GX operation set, kept for diagnostics.
    Unsupported(u8),
}

impl CombineOp {
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Add,
            1 => Self::Sub,
            8 => Self::Compare(CompareOp::R8Greater),
            9 => Self::Compare(CompareOp::R8Equal),
            10 => Self::Compare(CompareOp::Gr16Greater),
            11 => Self::Compare(CompareOp::Gr16Equal),
            12 => Self::Compare(CompareOp::Bgr24Greater),
            13 => Self::Compare(CompareOp::Bgr24Equal),
            14 => Self::Compare(CompareOp::Rgb8Greater),
            15 => Self::Compare(CompareOp::Rgb8Equal),
            other => Self::Unsupported(other),
        }
    }
}

/// One half (colour or alpha) of a TEV stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TevCombiner {
    /// Inputs `a`, `b`, `c`, `d` of `d op ((1 - c) * a + c * b)`.
    pub inputs: [u8; 4],
    pub op: CombineOp,
    pub bias: u8,
    pub scale: u8,
    pub clamp: bool,
    pub output: u8,
}

impl TevCombiner {
    fn read(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let mut inputs = [0u8; 4];
        inputs.copy_from_slice(c.read_bytes(4)?);
        Ok(Self {
            inputs,
            op: CombineOp::from_raw(c.read_u8()?),
            bias: c.read_u8()?,
            scale: c.read_u8()?,
            clamp: c.read_u8()? != 0,
            output: c.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawTevStage {
    color: TevCombiner,
    alpha: TevCombiner,
}

impl RawTevStage {
    fn read(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        c.skip(1);
        let color = TevCombiner::read(c)?;
        let alpha = TevCombiner::read(c)?;
        c.skip(1);
        Ok(Self { color, alpha })
    }
}

/// Channel swizzle table selection of a TEV stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapMode {
    pub rasterized: u8,
    pub texture: u8,
}

impl SwapMode {
    fn read(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let mode = Self {
            rasterized: c.read_u8()?,
            texture: c.read_u8()?,
        };
        c.skip(2);
        Ok(mode)
    }
}

/// A fully resolved TEV stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TevStage {
    pub order: Option<TevOrder>,
    pub color: TevCombiner,
    pub alpha: TevCombiner,
    pub swap_mode: Option<SwapMode>,
    pub konst_color_selector: u8,
    pub konst_alpha_selector: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlphaCompare {
    pub compare0: u8,
    pub reference0: u8,
    pub op: u8,
    pub compare1: u8,
    pub reference1: u8,
}

impl AlphaCompare {
    fn read(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let compare = Self {
            compare0: c.read_u8()?,
            reference0: c.read_u8()?,
            op: c.read_u8()?,
            compare1: c.read_u8()?,
            reference1: c.read_u8()?,
        };
        c.skip(3);
        Ok(compare)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendMode {
    pub mode: u8,
    pub source_factor: u8,
    pub destination_factor: u8,
    pub logic_op: u8,
}

impl BlendMode {
    fn read(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        Ok(Self {
            mode: c.read_u8()?,
            source_factor: c.read_u8()?,
            destination_factor: c.read_u8()?,
            logic_op: c.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZMode {
    pub test: bool,
    pub function: u8,
    pub write: bool,
}

impl ZMode {
    fn read(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let mode = Self {
            test: c.read_u8()? != 0,
            function: c.read_u8()?,
            write: c.read_u8()? != 0,
        };
        c.skip(1);
        Ok(mode)
    }
}

fn read_color(c: &mut ByteCursor<'_>) -> DecodeResult<Vec4> {
    let b = c.read_bytes(4)?;
    Ok(Vec4::new(b[0].into(), b[1].into(), b[2].into(), b[3].into()) / 255.0)
}

/// Signed 10-bit TEV register colour, normalised so 255 is 1.0.
fn read_color_s10(c: &mut ByteCursor<'_>) -> DecodeResult<Vec4> {
    Ok(Vec4::new(
        c.read_i16()?.into(),
        c.read_i16()?.into(),
        c.read_i16()?.into(),
        c.read_i16()?.into(),
    ) / 255.0)
}

fn read_swap_table(c: &mut ByteCursor<'_>) -> DecodeResult<[u8; 4]> {
    let mut table = [0u8; 4];
    table.copy_from_slice(c.read_bytes(4)?);
    Ok(table)
}

/// A resolved material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub flag: u8,
    pub cull_mode: Option<CullMode>,
    pub channel_count: u8,
    pub texgen_count: u8,
    pub z_mode: Option<ZMode>,
    pub blend_mode: Option<BlendMode>,
    pub alpha_compare: Option<AlphaCompare>,
    pub material_colors: [Option<Vec4>; 2],
    pub ambient_colors: [Option<Vec4>; 2],
    pub konst_colors: [Option<Vec4>; 4],
    pub tev_colors: [Option<Vec4>; 4],
    /// Colour 0, alpha 0, colour 1, alpha 1.
    pub color_channels: [Option<ColorChannel>; 4],
    /// The first `texgen_count` generators.
    pub texgens: Vec<TexGen>,
    pub texture_matrices: [Option<TexMatrix>; 10],
    /// TEX1 texture index bound to each texture map slot.
    pub textures: [Option<u16>; 8],
    pub tev_stages: Vec<TevStage>,
    pub swap_tables: [Option<[u8; 4]>; 4],
}

impl Material {
    /// Whether any TEV stage uses an operation outside the supported set.
    #[must_use]
    pub fn has_unsupported_combiner(&self) -> bool {
        self.tev_stages.iter().any(|s| {
            matches!(s.color.op, CombineOp::Unsupported(_))
                || matches!(s.alpha.op, CombineOp::Unsupported(_))
        })
    }
}

/// Decoded MAT3 chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialTable {
    /// Physical materials, shared between references.
    pub materials: Vec<Material>,
    /// Maps a material reference (INF1, names) to its physical material.
    pub index_to_material: Vec<u16>,
    /// One name per material reference.
    pub names: Vec<String>,
}

impl MaterialTable {
    /// The material a hierarchy reference selects.
    #[must_use]
    pub fn resolve(&self, reference: u16) -> Option<&Material> {
        let index = *self.index_to_material.get(usize::from(reference))?;
        self.materials.get(usize::from(index))
    }

    /// Name of a material reference.
    #[must_use]
    pub fn name(&self, reference: u16) -> Option<&str> {
        self.names.get(usize::from(reference)).map(String::as_str)
    }

    /// Number of material references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index_to_material.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index_to_material.is_empty()
    }
}

/// Pool indices of one material record, before resolution.
struct RawMaterial {
    flag: u8,
    cull: u8,
    channel_count: u8,
    texgen_count: u8,
    tev_count: u8,
    z_mode: u8,
    material_colors: Vec<u16>,
    color_channels: Vec<u16>,
    ambient_colors: Vec<u16>,
    texgens: Vec<u16>,
    texture_matrices: Vec<u16>,
    texture_stages: Vec<u16>,
    konst_colors: Vec<u16>,
    konst_color_selectors: Vec<u8>,
    konst_alpha_selectors: Vec<u8>,
    tev_orders: Vec<u16>,
    tev_colors: Vec<u16>,
    tev_stages: Vec<u16>,
    swap_modes: Vec<u16>,
    swap_tables: Vec<u16>,
    alpha_compare: u16,
    blend: u16,
}

impl RawMaterial {
    fn read(c: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let indices = |c: &mut ByteCursor<'_>, n| c.read_n(n, ByteCursor::read_u16);
        let flag = c.read_u8()?;
        let cull = c.read_u8()?;
        let channel_count = c.read_u8()?;
        let texgen_count = c.read_u8()?;
        let tev_count = c.read_u8()?;
        let _z_compare_location = c.read_u8()?;
        let z_mode = c.read_u8()?;
        let _dither = c.read_u8()?;
        let material_colors = indices(c, 2)?;
        let color_channels = indices(c, 4)?;
        let ambient_colors = indices(c, 2)?;
        let _lights = indices(c, 8)?;
        let texgens = indices(c, 8)?;
        let _post_texgens = indices(c, 8)?;
        let texture_matrices = indices(c, 10)?;
        let _post_texture_matrices = indices(c, 20)?;
        let texture_stages = indices(c, 8)?;
        let konst_colors = indices(c, 4)?;
        let konst_color_selectors = c.read_bytes(16)?.to_vec();
        let konst_alpha_selectors = c.read_bytes(16)?.to_vec();
        let tev_orders = indices(c, 16)?;
        let tev_colors = indices(c, 4)?;
        let tev_stages = indices(c, 16)?;
        let swap_modes = indices(c, 16)?;
        let swap_tables = indices(c, 4)?;
        c.skip(24);
        let _fog = c.read_u16()?;
        let alpha_compare = c.read_u16()?;
        let blend = c.read_u16()?;
        let _nbt_scale = c.read_u16()?;
        Ok(Self {
            flag,
            cull,
            channel_count,
            texgen_count,
            tev_count,
            z_mode,
            material_colors,
            color_channels,
            ambient_colors,
            texgens,
            texture_matrices,
            texture_stages,
            konst_colors,
            konst_color_selectors,
            konst_alpha_selectors,
            tev_orders,
            tev_colors,
            tev_stages,
            swap_modes,
            swap_tables,
            alpha_compare,
            blend,
        })
    }
}

/// Shared state pools.
#[derive(Default)]
struct Pools {
    cull_modes: Vec<u32>,
    material_colors: Vec<Vec4>,
    channel_counts: Vec<u8>,
    color_channels: Vec<ColorChannel>,
    ambient_colors: Vec<Vec4>,
    texgen_counts: Vec<u8>,
    texgens: Vec<TexGen>,
    texture_matrices: Vec<TexMatrix>,
    texture_remap: Vec<u16>,
    tev_orders: Vec<TevOrder>,
    tev_colors: Vec<Vec4>,
    konst_colors: Vec<Vec4>,
    tev_counts: Vec<u8>,
    tev_stages: Vec<RawTevStage>,
    swap_modes: Vec<SwapMode>,
    swap_tables: Vec<[u8; 4]>,
    alpha_compares: Vec<AlphaCompare>,
    blend_modes: Vec<BlendMode>,
    z_modes: Vec<ZMode>,
}

impl Pools {
    fn read(c: &mut ByteCursor<'_>, chunk: &Chunk, table: &OffsetTable) -> DecodeResult<Self> {
        Ok(Self {
            cull_modes: pool(c, chunk, table, slot::CULL_MODES, 4, ByteCursor::read_u32)?,
            material_colors: pool(c, chunk, table, slot::MATERIAL_COLORS, 4, read_color)?,
            channel_counts: pool(c, chunk, table, slot::CHANNEL_COUNTS, 1, ByteCursor::read_u8)?,
            color_channels: pool(c, chunk, table, slot::COLOR_CHANNELS, 8, ColorChannel::read)?,
            ambient_colors: pool(c, chunk, table, slot::AMBIENT_COLORS, 4, read_color)?,
            texgen_counts: pool(c, chunk, table, slot::TEXGEN_COUNTS, 1, ByteCursor::read_u8)?,
            texgens: pool(c, chunk, table, slot::TEXGENS, 4, TexGen::read)?,
            texture_matrices: pool(c, chunk, table, slot::TEX_MATRICES, 100, TexMatrix::read)?,
            texture_remap: pool(c, chunk, table, slot::TEXTURE_REMAP, 2, ByteCursor::read_u16)?,
            tev_orders: pool(c, chunk, table, slot::TEV_ORDERS, 4, TevOrder::read)?,
            tev_colors: pool(c, chunk, table, slot::TEV_COLORS, 8, read_color_s10)?,
            konst_colors: pool(c, chunk, table, slot::KONST_COLORS, 4, read_color)?,
            tev_counts: pool(c, chunk, table, slot::TEV_COUNTS, 1, ByteCursor::read_u8)?,
            tev_stages: pool(c, chunk, table, slot::TEV_STAGES, 20, RawTevStage::read)?,
            swap_modes: pool(c, chunk, table, slot::SWAP_MODES, 4, SwapMode::read)?,
            swap_tables: pool(c, chunk, table, slot::SWAP_TABLES, 4, read_swap_table)?,
            alpha_compares: pool(c, chunk, table, slot::ALPHA_COMPARES, 8, AlphaCompare::read)?,
            blend_modes: pool(c, chunk, table, slot::BLEND_MODES, 4, BlendMode::read)?,
            z_modes: pool(c, chunk, table, slot::Z_MODES, 4, ZMode::read)?,
        })
    }
}

/// Read every element of one pool. Absent pools are empty.
fn pool<'a, T>(
    c: &mut ByteCursor<'a>,
    chunk: &Chunk,
    table: &OffsetTable,
    slot: usize,
    element_size: u32,
    read: impl FnMut(&mut ByteCursor<'a>) -> DecodeResult<T>,
) -> DecodeResult<Vec<T>> {
    let Some(offset) = table.offset(slot) else {
        return Ok(Vec::new());
    };
    c.seek(chunk.at(offset));
    c.read_n(table.count(slot, element_size), read)
}

/// Look up a pool entry. `UNSET` gives `None`; anything else must exist.
fn lookup<T: Clone>(pool: &[T], index: u16, what: &str) -> DecodeResult<Option<T>> {
    if index == UNSET {
        return Ok(None);
    }
    pool.get(usize::from(index)).cloned().map(Some).ok_or_else(|| {
        DecodeError::structural(
            "MAT3",
            format!("{what} index {index} past {} pool entries", pool.len()),
        )
    })
}

fn lookup_byte<T: Clone>(pool: &[T], index: u8, what: &str) -> DecodeResult<Option<T>> {
    if index == UNSET_BYTE {
        return Ok(None);
    }
    lookup(pool, index.into(), what)
}

fn lookup_each<T: Clone, const N: usize>(
    pool: &[T],
    indices: &[u16],
    what: &str,
) -> DecodeResult<[Option<T>; N]> {
    let mut out = std::array::from_fn(|_| None);
    for (slot, &index) in out.iter_mut().zip(indices) {
        *slot = lookup(pool, index, what)?;
    }
    Ok(out)
}

impl Pools {
    fn resolve(
        &self,
        raw: &RawMaterial,
        material: usize,
        warnings: &mut Vec<Warning>,
    ) -> DecodeResult<Material> {
        let cull_mode = match lookup_byte(&self.cull_modes, raw.cull, "cull mode")? {
            Some(value) => Some(CullMode::from_raw(value).ok_or_else(|| {
                DecodeError::structural("MAT3", format!("unknown cull mode {value}"))
            })?),
            None => None,
        };
        let channel_count = lookup_byte(&self.channel_counts, raw.channel_count, "channel count")?
            .unwrap_or(0);
        let texgen_count = lookup_byte(&self.texgen_counts, raw.texgen_count, "texgen count")?
            .unwrap_or(0);
        let tev_count =
            lookup_byte(&self.tev_counts, raw.tev_count, "TEV stage count")?.unwrap_or(0);

        let texgens = raw
            .texgens
            .iter()
            .take(usize::from(texgen_count))
            .filter_map(|&index| lookup(&self.texgens, index, "texgen").transpose())
            .collect::<DecodeResult<Vec<_>>>()?;

        let mut textures = [None; 8];
        for (texture, &stage) in textures.iter_mut().zip(&raw.texture_stages) {
            *texture = lookup(&self.texture_remap, stage, "texture")?;
        }

        let stage_count = usize::from(tev_count).min(raw.tev_stages.len());
        let mut tev_stages = Vec::with_capacity(stage_count);
        for stage in 0..stage_count {
            let Some(combiners) = lookup(&self.tev_stages, raw.tev_stages[stage], "TEV stage")?
            else {
                return Err(DecodeError::structural(
                    "MAT3",
                    format!("material {material} uses {tev_count} TEV stages but stage {stage} is unset"),
                ));
            };
            for op in [combiners.color.op, combiners.alpha.op] {
                if let CombineOp::Unsupported(op) = op {
                    warnings.push(Warning::UnsupportedCombineOp {
                        material,
                        stage,
                        op,
                    });
                }
            }
            tev_stages.push(TevStage {
                order: lookup(&self.tev_orders, raw.tev_orders[stage], "TEV order")?,
                color: combiners.color,
                alpha: combiners.alpha,
                swap_mode: lookup(&self.swap_modes, raw.swap_modes[stage], "swap mode")?,
                konst_color_selector: raw.konst_color_selectors[stage],
                konst_alpha_selector: raw.konst_alpha_selectors[stage],
            });
        }

        Ok(Material {
            flag: raw.flag,
            cull_mode,
            channel_count,
            texgen_count,
            z_mode: lookup_byte(&self.z_modes, raw.z_mode, "z mode")?,
            blend_mode: lookup(&self.blend_modes, raw.blend, "blend mode")?,
            alpha_compare: lookup(&self.alpha_compares, raw.alpha_compare, "alpha compare")?,
            material_colors: lookup_each(
                &self.material_colors,
                &raw.material_colors,
                "material colour",
            )?,
            ambient_colors: lookup_each(&self.ambient_colors, &raw.ambient_colors, "ambient colour")?,
            konst_colors: lookup_each(&self.konst_colors, &raw.konst_colors, "konst colour")?,
            tev_colors: lookup_each(&self.tev_colors, &raw.tev_colors, "TEV colour")?,
            color_channels: lookup_each(&self.color_channels, &raw.color_channels, "colour channel")?,
            texgens,
            texture_matrices: lookup_each(
                &self.texture_matrices,
                &raw.texture_matrices,
                "texture matrix",
            )?,
            textures,
            tev_stages,
            swap_tables: lookup_each(&self.swap_tables, &raw.swap_tables, "swap table")?,
        })
    }
}

/// Decode the MAT3 chunk. Unsupported combine operations are reported
/// through `warnings`.
pub fn parse_materials(
    c: &mut ByteCursor<'_>,
    chunk: &Chunk,
    warnings: &mut Vec<Warning>,
) -> DecodeResult<MaterialTable> {
    c.seek(chunk.at(0x08));
    let count = usize::from(c.read_u16()?);
    c.skip(2);
    let table = OffsetTable::read(c, POOL_SLOTS, chunk.size)?;

    let index_to_material = match table.offset(slot::REMAP) {
        Some(offset) => {
            c.seek(chunk.at(offset));
            c.read_n(count, ByteCursor::read_u16)?
        }
        None => Vec::new(),
    };
    if index_to_material.len() != count {
        return Err(DecodeError::structural(
            "MAT3",
            format!("{count} materials but no remap table"),
        ));
    }

    let names = match table.offset(slot::NAMES) {
        Some(offset) => {
            c.seek(chunk.at(offset));
            read_string_table(c)?
        }
        None => Vec::new(),
    };

    let pools = Pools::read(c, chunk, &table)?;

    let material_count = index_to_material
        .iter()
        .max()
        .map_or(0, |&max| usize::from(max) + 1);
    let records = table.offset(slot::MATERIALS).map(|o| chunk.at(o));
    let mut materials = Vec::with_capacity(material_count);
    for index in 0..material_count {
        let Some(records) = records else {
            return Err(DecodeError::structural("MAT3", "remap table but no material records"));
        };
        c.seek(records + index * MATERIAL_SIZE);
        let raw = RawMaterial::read(c)?;
        materials.push(pools.resolve(&raw, index, warnings)?);
    }

    tracing::debug!(
        references = index_to_material.len(),
        materials = materials.len(),
        "decoded materials"
    );
    Ok(MaterialTable {
        materials,
        index_to_material,
        names,
    })
}
