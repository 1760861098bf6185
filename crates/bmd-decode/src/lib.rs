//! Decode J3D binary models (`.bmd`) from GameCube and Wii titles.
//!
//! This crate turns the bytes of a BMD file into an immutable [`Model`]:
//! scene hierarchy, skeleton, skinning envelopes, interleaved geometry
//! batches, the material pool and decoded textures. Nothing is rendered and
//! no GPU state is touched; callers upload what they need.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **Borrowed input**: Decoding reads from a `&[u8]` and never copies the file
//! - **Fail loudly**: Out-of-bounds reads and broken cross-references abort the
//!   decode; only unknown chunks and unsupported pixel or combiner modes
//!   become [`Warning`]s
//!
//! # Key functions
//!
//! - [`decode`]: Decode a model with default options
//! - [`decode_with`]: Decode a model with [`DecodeOptions`]
//! - [`Texture::to_image`]: Convert a decoded texture to an `image` buffer
//! - [`pixels`]: Standalone decoders for every GX texture format

mod cursor;
mod error;
mod model;
mod offsets;
mod options;
mod string_table;

pub mod chunk;
pub mod draw;
pub mod envelope;
pub mod hierarchy;
pub mod joint;
pub mod material;
pub mod pixels;
pub mod shape;
pub mod texture;
pub mod vertex;

pub use chunk::{Chunk, ChunkKind};
pub use draw::DrawMatrix;
pub use envelope::Envelope;
pub use error::{DecodeError, DecodeResult, Tag, Warning};
pub use hierarchy::{Hierarchy, HierarchyNode};
pub use joint::Joint;
pub use material::{Material, MaterialTable};
pub use model::{Model, decode, decode_with};
pub use options::{CmprOutput, DecodeOptions, MipLevels};
pub use shape::{Batch, MatrixSlot, Packet, Primitive, Topology};
pub use texture::{Texture, TextureData, TextureFormat};
pub use vertex::{VertexArrays, VertexAttribute};
