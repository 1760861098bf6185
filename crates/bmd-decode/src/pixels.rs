//! Pixel decoders for GX texture formats.
//!
//! Every function here is pure: encoded bytes and dimensions in, linear
//! row-major pixels out. Tiled formats store fixed-size blocks in raster
//! order, each block holding its texels in raster order; images whose size
//! is not a multiple of the block size are padded to whole blocks.
//!
//! Inputs shorter than [`encoded_size`] leave the missing blocks zeroed.

use crate::texture::{Palette, PaletteFormat, TextureFormat};

/// Layout of decoded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit luminance.
    L8,
    /// 8-bit luminance, 8-bit alpha.
    La8,
    Rgba8,
    /// Linear DXT1 (BC1) blocks, 8 bytes per 4x4 pixels.
    Dxt1,
}

/// Block dimensions and byte size of a tiled format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileShape {
    pub width: usize,
    pub height: usize,
    pub bytes: usize,
}

impl TileShape {
    #[must_use]
    pub fn of(format: TextureFormat) -> Option<Self> {
        let (width, height, bytes) = match format {
            TextureFormat::I4 | TextureFormat::Ci4 | TextureFormat::Cmpr => (8, 8, 32),
            TextureFormat::I8 | TextureFormat::Ia4 | TextureFormat::Ci8 => (8, 4, 32),
            TextureFormat::Ia8
            | TextureFormat::Rgb565
            | TextureFormat::Rgb5a3
            | TextureFormat::Ci14 => (4, 4, 32),
            TextureFormat::Rgba8 => (4, 4, 64),
            TextureFormat::Unknown(_) => return None,
        };
        Some(Self {
            width,
            height,
            bytes,
        })
    }
}

/// Bytes one image level occupies in TEX1.
#[must_use]
pub fn encoded_size(format: TextureFormat, width: usize, height: usize) -> Option<usize> {
    let tile = TileShape::of(format)?;
    Some(width.div_ceil(tile.width) * height.div_ceil(tile.height) * tile.bytes)
}

/// Expand a 3-bit channel to 8 bits.
#[must_use]
pub fn expand3(v: u8) -> u8 {
    (v << 5) | (v << 2) | (v >> 1)
}

/// Expand a 4-bit channel to 8 bits.
#[must_use]
pub fn expand4(v: u8) -> u8 {
    v * 0x11
}

/// Expand a 5-bit channel to 8 bits.
#[must_use]
pub fn expand5(v: u8) -> u8 {
    (v << 3) | (v >> 2)
}

/// Expand a 6-bit channel to 8 bits.
#[must_use]
pub fn expand6(v: u8) -> u8 {
    (v << 2) | (v >> 4)
}

#[must_use]
pub fn rgb565(v: u16) -> [u8; 4] {
    [
        expand5((v >> 11) as u8 & 0x1f),
        expand6((v >> 5) as u8 & 0x3f),
        expand5(v as u8 & 0x1f),
        0xff,
    ]
}

/// Opaque RGB555 when the top bit is set, otherwise ARGB3444.
#[must_use]
pub fn rgb5a3(v: u16) -> [u8; 4] {
    if v & 0x8000 != 0 {
        [
            expand5((v >> 10) as u8 & 0x1f),
            expand5((v >> 5) as u8 & 0x1f),
            expand5(v as u8 & 0x1f),
            0xff,
        ]
    } else {
        [
            expand4((v >> 8) as u8 & 0xf),
            expand4((v >> 4) as u8 & 0xf),
            expand4(v as u8 & 0xf),
            expand3((v >> 12) as u8 & 0x7),
        ]
    }
}

/// Alpha in the high byte, intensity in the low byte. Returns `[l, a]`.
#[must_use]
pub fn ia8(v: u16) -> [u8; 2] {
    [v as u8, (v >> 8) as u8]
}

fn be16(block: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([block[at], block[at + 1]])
}

fn nibble(block: &[u8], i: usize) -> u8 {
    let b = block[i / 2];
    if i % 2 == 0 { b >> 4 } else { b & 0xf }
}

/// Walk the blocks of a tiled image, writing `texel(block, i)` for texel
/// `i` of each block to its linear position.
fn untile<const N: usize>(
    data: &[u8],
    width: usize,
    height: usize,
    tile: TileShape,
    texel: impl Fn(&[u8], usize) -> [u8; N],
) -> Vec<u8> {
    let mut out = vec![0u8; width * height * N];
    if width == 0 || height == 0 {
        return out;
    }
    let tiles_x = width.div_ceil(tile.width);
    let tiles = tiles_x * height.div_ceil(tile.height);
    for (t, block) in data.chunks_exact(tile.bytes).take(tiles).enumerate() {
        let x0 = (t % tiles_x) * tile.width;
        let y0 = (t / tiles_x) * tile.height;
        for i in 0..tile.width * tile.height {
            let x = x0 + i % tile.width;
            let y = y0 + i / tile.width;
            if x < width && y < height {
                let at = (y * width + x) * N;
                out[at..at + N].copy_from_slice(&texel(block, i));
            }
        }
    }
    out
}

fn shape(format: TextureFormat) -> TileShape {
    // Only called with known formats.
    TileShape::of(format).unwrap_or(TileShape {
        width: 1,
        height: 1,
        bytes: 1,
    })
}

#[must_use]
pub fn decode_i4(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    untile(data, width, height, shape(TextureFormat::I4), |b, i| [expand4(nibble(b, i))])
}

#[must_use]
pub fn decode_i8(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    untile(data, width, height, shape(TextureFormat::I8), |b, i| [b[i]])
}

/// IA4 to `[l, a]`: alpha in the high nibble.
#[must_use]
pub fn decode_ia4(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    untile(data, width, height, shape(TextureFormat::Ia4), |b, i| {
        [expand4(b[i] & 0xf), expand4(b[i] >> 4)]
    })
}

#[must_use]
pub fn decode_ia8(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    untile(data, width, height, shape(TextureFormat::Ia8), |b, i| ia8(be16(b, i * 2)))
}

#[must_use]
pub fn decode_rgb565(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    untile(data, width, height, shape(TextureFormat::Rgb565), |b, i| rgb565(be16(b, i * 2)))
}

#[must_use]
pub fn decode_rgb5a3(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    untile(data, width, height, shape(TextureFormat::Rgb5a3), |b, i| rgb5a3(be16(b, i * 2)))
}

/// RGBA8 blocks hold 16 AR pairs followed by 16 GB pairs.
#[must_use]
pub fn decode_rgba8(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    untile(data, width, height, shape(TextureFormat::Rgba8), |b, i| {
        [b[i * 2 + 1], b[32 + i * 2], b[32 + i * 2 + 1], b[i * 2]]
    })
}

impl Palette {
    /// Output layout of textures indexing this palette.
    #[must_use]
    pub fn pixel_format(&self) -> PixelFormat {
        match self.format {
            PaletteFormat::Ia8 => PixelFormat::La8,
            PaletteFormat::Rgb565 | PaletteFormat::Rgb5a3 => PixelFormat::Rgba8,
        }
    }

    /// Entry `index` as RGBA. Indices past the palette are transparent black.
    #[must_use]
    pub fn rgba(&self, index: usize) -> [u8; 4] {
        let Some(&v) = self.entries.get(index) else {
            return [0; 4];
        };
        match self.format {
            PaletteFormat::Ia8 => {
                let [l, a] = ia8(v);
                [l, l, l, a]
            }
            PaletteFormat::Rgb565 => rgb565(v),
            PaletteFormat::Rgb5a3 => rgb5a3(v),
        }
    }
}

/// Decode a colour-indexed image through `palette`, producing
/// [`Palette::pixel_format`] pixels.
#[must_use]
pub fn decode_indexed(
    format: TextureFormat,
    data: &[u8],
    width: usize,
    height: usize,
    palette: &Palette,
) -> Vec<u8> {
    let index = move |b: &[u8], i: usize| -> usize {
        match format {
            TextureFormat::Ci4 => nibble(b, i).into(),
            TextureFormat::Ci8 => b[i].into(),
            _ => usize::from(be16(b, i * 2) & 0x3fff),
        }
    };
    let tile = shape(format);
    match palette.pixel_format() {
        PixelFormat::La8 => untile(data, width, height, tile, |b, i| {
            let [l, _, _, a] = palette.rgba(index(b, i));
            [l, a]
        }),
        _ => untile(data, width, height, tile, |b, i| palette.rgba(index(b, i))),
    }
}

/// Decode one CMPR (DXT1) sub-block into 16 RGBA texels in raster order.
///
/// Endpoints are big-endian RGB565. Selector bytes hold one row each with
/// the leftmost texel in the top two bits.
#[must_use]
pub fn decode_cmpr_block(block: &[u8; 8]) -> [[u8; 4]; 16] {
    let raw0 = be16(block, 0);
    let raw1 = be16(block, 2);
    let c0 = rgb565(raw0);
    let c1 = rgb565(raw1);
    let mix = |f: fn(u16, u16) -> u16| -> [u8; 4] {
        let mut out = [0xff; 4];
        for ch in 0..3 {
            out[ch] = f(c0[ch].into(), c1[ch].into()) as u8;
        }
        out
    };
    let colors = if raw0 > raw1 {
        [
            c0,
            c1,
            mix(|a, b| (2 * a + b + 1) / 3),
            mix(|a, b| (a + 2 * b + 1) / 3),
        ]
    } else {
        // Punch-through: the fourth colour is transparent.
        [c0, c1, mix(|a, b| (a + b) / 2), [0, 0, 0, 0]]
    };

    let mut texels = [[0u8; 4]; 16];
    for (i, texel) in texels.iter_mut().enumerate() {
        let row = block[4 + i / 4];
        let selector = (row >> (6 - 2 * (i % 4))) & 3;
        *texel = colors[usize::from(selector)];
    }
    texels
}

/// The 8-byte sub-block holding 4x4 block (`bx`, `by`) of a CMPR image.
fn cmpr_block(data: &[u8], tiles_x: usize, bx: usize, by: usize) -> Option<&[u8; 8]> {
    let tile = (by / 2) * tiles_x + bx / 2;
    let at = tile * 32 + ((by % 2) * 2 + bx % 2) * 8;
    data.get(at..at + 8)?.try_into().ok()
}

/// Decompress CMPR to RGBA8.
#[must_use]
pub fn decode_cmpr(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = vec![0u8; width * height * 4];
    let tiles_x = width.div_ceil(8);
    for by in 0..height.div_ceil(4) {
        for bx in 0..width.div_ceil(4) {
            let Some(block) = cmpr_block(data, tiles_x, bx, by) else {
                continue;
            };
            for (i, texel) in decode_cmpr_block(block).iter().enumerate() {
                let x = bx * 4 + i % 4;
                let y = by * 4 + i / 4;
                if x < width && y < height {
                    let at = (y * width + x) * 4;
                    out[at..at + 4].copy_from_slice(texel);
                }
            }
        }
    }
    out
}

/// Mirror the four 2-bit fields of a selector row.
fn reverse_selectors(row: u8) -> u8 {
    (row >> 6) | ((row >> 2) & 0x0c) | ((row << 2) & 0x30) | (row << 6)
}

/// Reorder CMPR into linear DXT1: blocks in raster order, little-endian
/// endpoints, leftmost texel in the low selector bits.
#[must_use]
pub fn cmpr_to_dxt1(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let blocks_x = width.div_ceil(4);
    let blocks_y = height.div_ceil(4);
    let tiles_x = width.div_ceil(8);
    let mut out = vec![0u8; blocks_x * blocks_y * 8];
    for (n, dst) in out.chunks_exact_mut(8).enumerate() {
        let Some(src) = cmpr_block(data, tiles_x, n % blocks_x, n / blocks_x) else {
            continue;
        };
        dst[0] = src[1];
        dst[1] = src[0];
        dst[2] = src[3];
        dst[3] = src[2];
        for row in 0..4 {
            dst[4 + row] = reverse_selectors(src[4 + row]);
        }
    }
    out
}
