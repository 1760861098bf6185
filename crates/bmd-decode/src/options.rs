//! Decoder configuration.

/// What CMPR textures decode to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CmprOutput {
    /// Decompress to RGBA8 pixels.
    #[default]
    Rgba8,
    /// Keep the blocks compressed, reordered into linear little-endian DXT1
    /// (BC1) for upload to GPUs with S3TC support.
    Dxt1,
}

/// Which levels of a texture's mip chain are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MipLevels {
    #[default]
    BaseOnly,
    All,
}

/// Options for [`decode_with`](crate::decode_with).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub cmpr_output: CmprOutput,
    pub mip_levels: MipLevels,
    /// Keep the VTX1 arrays on the model after batches have been built.
    pub retain_vertex_arrays: bool,
}
