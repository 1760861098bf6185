//! TEX1: textures.

use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbaImage};

use crate::chunk::Chunk;
use crate::cursor::ByteCursor;
use crate::error::{DecodeError, DecodeResult, Warning};
use crate::options::{CmprOutput, DecodeOptions, MipLevels};
use crate::pixels::{self, PixelFormat};
use crate::string_table::read_string_table;

const HEADER_SIZE: usize = 0x20;

/// GX texture format code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    I4,
    I8,
    Ia4,
    Ia8,
    Rgb565,
    Rgb5a3,
    Rgba8,
    Ci4,
    Ci8,
    Ci14,
    Cmpr,
    Unknown(u8),
}

impl TextureFormat {
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x0 => Self::I4,
            0x1 => Self::I8,
            0x2 => Self::Ia4,
            0x3 => Self::Ia8,
            0x4 => Self::Rgb565,
            0x5 => Self::Rgb5a3,
            0x6 => Self::Rgba8,
            0x8 => Self::Ci4,
            0x9 => Self::Ci8,
            0xa => Self::Ci14,
            0xe => Self::Cmpr,
            other => Self::Unknown(other),
        }
    }

    /// Whether texels are palette indices.
    #[must_use]
    pub fn is_indexed(self) -> bool {
        matches!(self, Self::Ci4 | Self::Ci8 | Self::Ci14)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Clamp,
    Repeat,
    Mirror,
    Unknown(u8),
}

impl WrapMode {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Clamp,
            1 => Self::Repeat,
            2 => Self::Mirror,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
    NearestMipNearest,
    LinearMipNearest,
    NearestMipLinear,
    LinearMipLinear,
    Unknown(u8),
}

impl Filter {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Nearest,
            1 => Self::Linear,
            2 => Self::NearestMipNearest,
            3 => Self::LinearMipNearest,
            4 => Self::NearestMipLinear,
            5 => Self::LinearMipLinear,
            other => Self::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteFormat {
    Ia8,
    Rgb565,
    Rgb5a3,
}

impl PaletteFormat {
    fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Ia8,
            1 => Self::Rgb565,
            2 => Self::Rgb5a3,
            _ => return None,
        })
    }
}

/// Colour table of an indexed texture, entries still packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub format: PaletteFormat,
    pub entries: Vec<u16>,
}

/// One decoded image of a mip chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureData {
    /// Levels from the base image down, all in `format`.
    Decoded {
        format: PixelFormat,
        levels: Vec<MipLevel>,
    },
    /// The pixels could not be decoded; the header fields are still valid.
    Unsupported { reason: String },
}

/// A decoded TEX1 texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    pub format: TextureFormat,
    pub width: u16,
    pub height: u16,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub min_lod: f32,
    pub max_lod: f32,
    pub lod_bias: f32,
    /// Images stored, including the base level.
    pub mip_count: u8,
    pub palette: Option<Palette>,
    pub data: TextureData,
}

impl Texture {
    /// The base level as an `image` buffer. `None` when the pixels were not
    /// decoded or are block-compressed.
    #[must_use]
    pub fn to_image(&self) -> Option<DynamicImage> {
        self.level_image(0)
    }

    #[must_use]
    pub fn level_image(&self, level: usize) -> Option<DynamicImage> {
        let TextureData::Decoded { format, levels } = &self.data else {
            return None;
        };
        let MipLevel {
            width,
            height,
            pixels,
        } = levels.get(level)?;
        let (width, height, pixels) = (*width, *height, pixels.clone());
        Some(match format {
            PixelFormat::L8 => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, pixels)?),
            PixelFormat::La8 => {
                DynamicImage::ImageLumaA8(GrayAlphaImage::from_raw(width, height, pixels)?)
            }
            PixelFormat::Rgba8 => {
                DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, pixels)?)
            }
            PixelFormat::Dxt1 => return None,
        })
    }

    /// Decoded levels, empty when unsupported.
    #[must_use]
    pub fn levels(&self) -> &[MipLevel] {
        match &self.data {
            TextureData::Decoded { levels, .. } => levels,
            TextureData::Unsupported { .. } => &[],
        }
    }
}

/// Header fields needed to decode the pixels.
struct PixelSource {
    format: TextureFormat,
    width: usize,
    height: usize,
    levels: usize,
    data: usize,
}

/// Decode every stored level of one texture. `Err` carries the reason the
/// pixels are unsupported.
fn decode_pixels(
    c: &ByteCursor<'_>,
    source: &PixelSource,
    palette: Option<&Palette>,
    cmpr_output: CmprOutput,
) -> DecodeResult<Result<TextureData, String>> {
    let format = source.format;
    if let TextureFormat::Unknown(code) = format {
        return Ok(Err(format!("unknown format code {code:#x}")));
    }
    let palette = match (format.is_indexed(), palette) {
        (true, None) => return Ok(Err("indexed texture without a usable palette".into())),
        (_, palette) => palette,
    };

    let pixel_format = match (format, palette) {
        (TextureFormat::I4 | TextureFormat::I8, _) => PixelFormat::L8,
        (TextureFormat::Ia4 | TextureFormat::Ia8, _) => PixelFormat::La8,
        (TextureFormat::Cmpr, _) if cmpr_output == CmprOutput::Dxt1 => PixelFormat::Dxt1,
        (_, Some(palette)) if format.is_indexed() => palette.pixel_format(),
        _ => PixelFormat::Rgba8,
    };

    let mut levels = Vec::with_capacity(source.levels);
    let mut at = source.data;
    for level in 0..source.levels {
        let width = (source.width >> level).max(1);
        let height = (source.height >> level).max(1);
        let size = pixels::encoded_size(format, width, height).unwrap_or(0);
        let data = c.at(at).read_bytes(size)?;
        at += size;

        let pixels = match (format, palette) {
            (TextureFormat::I4, _) => pixels::decode_i4(data, width, height),
            (TextureFormat::I8, _) => pixels::decode_i8(data, width, height),
            (TextureFormat::Ia4, _) => pixels::decode_ia4(data, width, height),
            (TextureFormat::Ia8, _) => pixels::decode_ia8(data, width, height),
            (TextureFormat::Rgb565, _) => pixels::decode_rgb565(data, width, height),
            (TextureFormat::Rgb5a3, _) => pixels::decode_rgb5a3(data, width, height),
            (TextureFormat::Rgba8, _) => pixels::decode_rgba8(data, width, height),
            (TextureFormat::Cmpr, _) if pixel_format == PixelFormat::Dxt1 => {
                pixels::cmpr_to_dxt1(data, width, height)
            }
            (TextureFormat::Cmpr, _) => pixels::decode_cmpr(data, width, height),
            (_, Some(palette)) => pixels::decode_indexed(format, data, width, height, palette),
            (_, None) => return Ok(Err("indexed texture without a usable palette".into())),
        };
        levels.push(MipLevel {
            width: width as u32,
            height: height as u32,
            pixels,
        });
    }

    Ok(Ok(TextureData::Decoded {
        format: pixel_format,
        levels,
    }))
}

/// Decode the TEX1 chunk. Textures whose pixels cannot be decoded are kept
/// with [`TextureData::Unsupported`] and reported through `warnings`.
pub fn parse_textures(
    c: &mut ByteCursor<'_>,
    chunk: &Chunk,
    options: &DecodeOptions,
    warnings: &mut Vec<Warning>,
) -> DecodeResult<Vec<Texture>> {
    c.seek(chunk.at(0x08));
    let count = usize::from(c.read_u16()?);
    c.skip(2);
    let headers_offset = c.read_u32()?;
    let names_offset = c.read_u32()?;

    let names = if names_offset == 0 {
        vec![String::new(); count]
    } else {
        c.seek(chunk.at(names_offset));
        read_string_table(c)?
    };
    if names.len() != count {
        return Err(DecodeError::structural(
            "TEX1",
            format!("{count} textures but {} names", names.len()),
        ));
    }

    let mut textures = Vec::with_capacity(count);
    for (index, name) in names.into_iter().enumerate() {
        let header = chunk.at(headers_offset) + index * HEADER_SIZE;
        c.seek(header);
        let format = TextureFormat::from_raw(c.read_u8()?);
        let _alpha = c.read_u8()?;
        let width = c.read_u16()?;
        let height = c.read_u16()?;
        let wrap_s = WrapMode::from_raw(c.read_u8()?);
        let wrap_t = WrapMode::from_raw(c.read_u8()?);
        let _palette_enabled = c.read_u8()?;
        let raw_palette_format = c.read_u8()?;
        let palette_entries = usize::from(c.read_u16()?);
        let palette_offset = c.read_u32()? as usize;
        let _mipmap_enabled = c.read_u8()?;
        let _edge_lod = c.read_u8()?;
        let _bias_clamp = c.read_u8()?;
        let _max_anisotropy = c.read_u8()?;
        let min_filter = Filter::from_raw(c.read_u8()?);
        let mag_filter = Filter::from_raw(c.read_u8()?);
        let min_lod = f32::from(c.read_i8()?) / 8.0;
        let max_lod = f32::from(c.read_i8()?) / 8.0;
        let mip_count = c.read_u8()?;
        c.skip(1);
        let lod_bias = f32::from(c.read_i16()?) / 100.0;
        let data_offset = c.read_u32()? as usize;

        let palette = match PaletteFormat::from_raw(raw_palette_format) {
            Some(format) if palette_entries > 0 => Some(Palette {
                format,
                entries: c
                    .at(header + palette_offset)
                    .read_n(palette_entries, ByteCursor::read_u16)?,
            }),
            _ => None,
        };

        let levels = match options.mip_levels {
            MipLevels::BaseOnly => 1,
            MipLevels::All => usize::from(mip_count.max(1)),
        };
        let source = PixelSource {
            format,
            width: width.into(),
            height: height.into(),
            levels,
            data: header + data_offset,
        };
        let data = match decode_pixels(c, &source, palette.as_ref(), options.cmpr_output)? {
            Ok(data) => data,
            Err(reason) => {
                warnings.push(Warning::UnsupportedPixelFormat {
                    texture: index,
                    format,
                    reason: reason.clone(),
                });
                TextureData::Unsupported { reason }
            }
        };

        tracing::trace!(index, %name, ?format, width, height, mip_count, "texture");
        textures.push(Texture {
            name,
            format,
            width,
            height,
            wrap_s,
            wrap_t,
            min_filter,
            mag_filter,
            min_lod,
            max_lod,
            lod_bias,
            mip_count,
            palette,
            data,
        });
    }

    tracing::debug!(textures = textures.len(), "decoded textures");
    Ok(textures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkKind;
    use crate::cursor::Writer;

    struct TestTexture<'a> {
        name: &'a str,
        format: u8,
        width: u16,
        height: u16,
        palette: Option<(u8, &'a [u16])>,
        mip_count: u8,
        data: &'a [u8],
    }

    fn tex1(textures: &[TestTexture<'_>]) -> (Vec<u8>, Chunk) {
        let mut w = Writer::new();
        w.bytes(b"TEX1").u32(0).u16(textures.len() as u16).u16(0xffff);
        w.u32(0x20).u32(0).pad_to(0x20);
        let headers = w.position();
        w.pad_to(headers + textures.len() * HEADER_SIZE);

        let mut patches = Vec::new();
        for (i, t) in textures.iter().enumerate() {
            let header = headers + i * HEADER_SIZE;
            let palette = w.position();
            if let Some((_, entries)) = t.palette {
                for &e in entries {
                    w.u16(e);
                }
            }
            let data = w.position().next_multiple_of(0x20);
            w.pad_to(data);
            w.bytes(t.data);
            patches.push((header, palette - header, data - header));
        }

        let names = w.position();
        w.u16(textures.len() as u16).u16(0xffff);
        let mut offset = 4 + 4 * textures.len();
        for t in textures {
            w.u16(0).u16(offset as u16);
            offset += t.name.len() + 1;
        }
        for t in textures {
            w.bytes(t.name.as_bytes()).u8(0);
        }
        let size = w.position() as u32;
        w.patch_u32(4, size);
        w.patch_u32(0x10, names as u32);

        let mut bytes = w.into_bytes();
        for ((header, palette, data), t) in patches.into_iter().zip(textures) {
            let mut h = Writer::new();
            let (palette_format, entries) = t.palette.map_or((0, 0), |(f, e)| (f, e.len()));
            h.u8(t.format).u8(0).u16(t.width).u16(t.height).u8(1).u8(2);
            h.u8(u8::from(t.palette.is_some())).u8(palette_format).u16(entries as u16);
            h.u32(palette as u32);
            h.u8(1).u8(0).u8(0).u8(0).u8(5).u8(1);
            h.u8(0).u8(8).u8(t.mip_count).u8(0).i16(-50).u32(data as u32);
            bytes[header..header + HEADER_SIZE].copy_from_slice(&h.into_bytes());
        }
        let chunk = Chunk {
            kind: ChunkKind::Tex1,
            offset: 0,
            size,
        };
        (bytes, chunk)
    }

    fn parse(bytes: &[u8], chunk: &Chunk, options: &DecodeOptions) -> (Vec<Texture>, Vec<Warning>) {
        let mut warnings = Vec::new();
        let textures =
            parse_textures(&mut ByteCursor::new(bytes), chunk, options, &mut warnings).unwrap();
        (textures, warnings)
    }

    #[test]
    fn header_fields_and_rgb565_pixels() {
        let mut data = vec![0u8; 32];
        data[0] = 0xf8;
        let (bytes, chunk) = tex1(&[TestTexture {
            name: "red",
            format: 4,
            width: 4,
            height: 4,
            palette: None,
            mip_count: 1,
            data: &data,
        }]);
        let (textures, warnings) = parse(&bytes, &chunk, &DecodeOptions::default());
        assert!(warnings.is_empty());
        let t = &textures[0];
        assert_eq!(t.name, "red");
        assert_eq!(t.format, TextureFormat::Rgb565);
        assert_eq!((t.width, t.height), (4, 4));
        assert_eq!(t.wrap_s, WrapMode::Repeat);
        assert_eq!(t.wrap_t, WrapMode::Mirror);
        assert_eq!(t.min_filter, Filter::LinearMipLinear);
        assert_eq!(t.mag_filter, Filter::Linear);
        assert_eq!(t.max_lod, 1.0);
        assert_eq!(t.lod_bias, -0.5);
        assert!(t.palette.is_none());

        let image = t.to_image().unwrap().into_rgba8();
        assert_eq!(image.get_pixel(0, 0).0, [0xff, 0, 0, 0xff]);
        assert_eq!(image.get_pixel(1, 0).0, [0, 0, 0, 0xff]);
    }

    #[test]
    fn mip_chain_follows_base_level() {
        // 8x8 I8 base (two blocks), 4x4 level (one block), 2x2 level (one block).
        let mut data = vec![1u8; 64];
        data.extend(vec![2u8; 32]);
        data.extend(vec![3u8; 32]);
        let texture = TestTexture {
            name: "mips",
            format: 1,
            width: 8,
            height: 8,
            palette: None,
            mip_count: 3,
            data: &data,
        };
        let (bytes, chunk) = tex1(&[texture]);

        let (base, _) = parse(&bytes, &chunk, &DecodeOptions::default());
        assert_eq!(base[0].levels().len(), 1);

        let options = DecodeOptions {
            mip_levels: MipLevels::All,
            ..DecodeOptions::default()
        };
        let (all, _) = parse(&bytes, &chunk, &options);
        let levels = all[0].levels();
        assert_eq!(levels.len(), 3);
        assert_eq!((levels[1].width, levels[1].height), (4, 4));
        assert!(levels[1].pixels.iter().all(|&p| p == 2));
        assert_eq!(levels[2].pixels, vec![3; 4]);
        assert_eq!(all[0].level_image(2).unwrap().width(), 2);
    }

    #[test]
    fn indexed_texture_reads_palette() {
        let mut data = vec![0u8; 32];
        data[0] = 1;
        let (bytes, chunk) = tex1(&[TestTexture {
            name: "ci8",
            format: 9,
            width: 2,
            height: 1,
            palette: Some((0, &[0xff00, 0x8040])),
            mip_count: 1,
            data: &data,
        }]);
        let (textures, warnings) = parse(&bytes, &chunk, &DecodeOptions::default());
        assert!(warnings.is_empty());
        let t = &textures[0];
        assert_eq!(t.palette.as_ref().unwrap().entries, vec![0xff00, 0x8040]);
        assert_eq!(
            t.data,
            TextureData::Decoded {
                format: PixelFormat::La8,
                levels: vec![MipLevel {
                    width: 2,
                    height: 1,
                    pixels: vec![0x40, 0x80, 0x00, 0xff],
                }],
            }
        );
    }

    #[test]
    fn unsupported_textures_warn_and_continue() {
        let data = [0u8; 32];
        let (bytes, chunk) = tex1(&[
            TestTexture {
                name: "odd",
                format: 7,
                width: 4,
                height: 4,
                palette: None,
                mip_count: 1,
                data: &data,
            },
            TestTexture {
                name: "nopal",
                format: 8,
                width: 8,
                height: 8,
                palette: None,
                mip_count: 1,
                data: &data,
            },
            TestTexture {
                name: "ok",
                format: 0,
                width: 8,
                height: 8,
                palette: None,
                mip_count: 1,
                data: &data,
            },
        ]);
        let (textures, warnings) = parse(&bytes, &chunk, &DecodeOptions::default());
        assert_eq!(textures.len(), 3);
        assert!(matches!(textures[0].data, TextureData::Unsupported { .. }));
        assert!(textures[0].to_image().is_none());
        assert!(matches!(textures[1].data, TextureData::Unsupported { .. }));
        assert!(matches!(textures[2].data, TextureData::Decoded { .. }));
        assert_eq!(warnings.len(), 2);
        assert!(matches!(
            warnings[0],
            Warning::UnsupportedPixelFormat {
                texture: 0,
                format: TextureFormat::Unknown(7),
                ..
            }
        ));
        assert!(matches!(
            warnings[1],
            Warning::UnsupportedPixelFormat {
                texture: 1,
                format: TextureFormat::Ci4,
                ..
            }
        ));
    }

    #[test]
    fn cmpr_can_stay_compressed() {
        let mut data = Vec::new();
        for _ in 0..4 {
            data.extend_from_slice(&[0xf8, 0x00, 0x00, 0x1f, 0, 0, 0, 0]);
        }
        let (bytes, chunk) = tex1(&[TestTexture {
            name: "cmpr",
            format: 14,
            width: 8,
            height: 8,
            palette: None,
            mip_count: 1,
            data: &data,
        }]);
        let options = DecodeOptions {
            cmpr_output: CmprOutput::Dxt1,
            ..DecodeOptions::default()
        };
        let (textures, _) = parse(&bytes, &chunk, &options);
        let TextureData::Decoded { format, levels } = &textures[0].data else {
            panic!("expected decoded data");
        };
        assert_eq!(*format, PixelFormat::Dxt1);
        assert_eq!(levels[0].pixels.len(), 32);
        assert_eq!(&levels[0].pixels[..4], &[0x00, 0xf8, 0x1f, 0x00]);
        assert!(textures[0].to_image().is_none());

        let (textures, _) = parse(&bytes, &chunk, &DecodeOptions::default());
        let image = textures[0].to_image().unwrap().into_rgba8();
        assert_eq!(image.get_pixel(5, 6).0, [0xff, 0, 0, 0xff]);
    }

    #[test]
    fn truncated_pixel_data_is_out_of_bounds() {
        let (bytes, chunk) = tex1(&[TestTexture {
            name: "short",
            format: 6,
            width: 8,
            height: 8,
            palette: None,
            mip_count: 1,
            data: &[0u8; 64],
        }]);
        let err = parse_textures(
            &mut ByteCursor::new(&bytes),
            &chunk,
            &DecodeOptions::default(),
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::OutOfBounds { .. }));
    }
}
