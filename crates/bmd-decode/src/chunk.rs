//! Chunk iteration over the container.
//!
//! The file is a 0x20-byte header followed by chunks laid out as
//! `[tag: 4][size: u32][body]`, where `size` counts the 8-byte prefix.
//! Decoders read through a cursor over the whole file and may seek
//! anywhere; the reader always resumes at `offset + size`.

use std::fmt;

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, DecodeResult, Tag};

/// Size of the opaque file header preceding the first chunk.
pub const HEADER_SIZE: usize = 0x20;

/// Size of the tag + size prefix of every chunk.
pub const CHUNK_PREFIX_SIZE: usize = 8;

/// The chunk kinds this decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    Inf1,
    Vtx1,
    Evp1,
    Drw1,
    Jnt1,
    Shp1,
    Mat3,
    Tex1,
    Unknown(Tag),
}

impl ChunkKind {
    #[must_use]
    pub fn from_tag(tag: [u8; 4]) -> Self {
        match &tag {
            b"INF1" => Self::Inf1,
            b"VTX1" => Self::Vtx1,
            b"EVP1" => Self::Evp1,
            b"DRW1" => Self::Drw1,
            b"JNT1" => Self::Jnt1,
            b"SHP1" => Self::Shp1,
            b"MAT3" => Self::Mat3,
            b"TEX1" => Self::Tex1,
            _ => Self::Unknown(Tag(tag)),
        }
    }

    #[must_use]
    pub fn tag(self) -> Tag {
        Tag(match self {
            Self::Inf1 => *b"INF1",
            Self::Vtx1 => *b"VTX1",
            Self::Evp1 => *b"EVP1",
            Self::Drw1 => *b"DRW1",
            Self::Jnt1 => *b"JNT1",
            Self::Shp1 => *b"SHP1",
            Self::Mat3 => *b"MAT3",
            Self::Tex1 => *b"TEX1",
            Self::Unknown(tag) => return tag,
        })
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tag().fmt(f)
    }
}

/// One chunk of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub kind: ChunkKind,
    /// Absolute offset of the tag.
    pub offset: usize,
    /// Chunk size including the 8-byte prefix.
    pub size: u32,
}

impl Chunk {
    /// Absolute offset of a chunk-relative position.
    #[must_use]
    pub fn at(&self, relative: u32) -> usize {
        self.offset + relative as usize
    }

    /// Absolute offset one past the last byte of the chunk.
    #[must_use]
    pub fn end(&self) -> usize {
        self.offset + self.size as usize
    }
}

/// Walks the chunk sequence of a model file.
pub struct ChunkReader<'a> {
    cursor: ByteCursor<'a>,
}

impl<'a> ChunkReader<'a> {
    /// Skip the file header. A buffer shorter than the header is out of bounds.
    pub fn new(data: &'a [u8]) -> DecodeResult<Self> {
        let mut cursor = ByteCursor::new(data);
        cursor.at(0).read_bytes(HEADER_SIZE)?;
        let magic = cursor.read_fixed_string(8)?;
        let file_size = cursor.read_u32()?;
        let section_count = cursor.read_u32()?;
        cursor.seek(HEADER_SIZE);
        tracing::debug!(%magic, file_size, section_count, "read model header");
        Ok(Self { cursor })
    }

    /// Read the next chunk prefix, leaving the cursor just past it.
    pub fn next_chunk(&mut self) -> DecodeResult<Option<Chunk>> {
        if self.cursor.is_empty() {
            return Ok(None);
        }
        let offset = self.cursor.position();
        let tag = self.cursor.read_tag()?;
        let size = self.cursor.read_u32()?;
        let kind = ChunkKind::from_tag(tag);
        if (size as usize) < CHUNK_PREFIX_SIZE {
            return Err(DecodeError::structural(
                "chunk header",
                format!("{kind} chunk at offset {offset:#x} declares size {size}"),
            ));
        }
        if offset + size as usize > self.cursor.len() {
            return Err(DecodeError::OutOfBounds {
                offset,
                need: size as usize,
                len: self.cursor.len(),
            });
        }
        Ok(Some(Chunk { kind, offset, size }))
    }

    /// Run `decode` on every chunk in order.
    ///
    /// After each call the cursor is reset to the end of that chunk, however
    /// much the decoder consumed. Errors raised by `decode` are wrapped with
    /// the chunk's tag and offset.
    pub fn for_each_chunk(
        mut self,
        mut decode: impl FnMut(&mut ByteCursor<'a>, &Chunk) -> DecodeResult<()>,
    ) -> DecodeResult<()> {
        while let Some(chunk) = self.next_chunk()? {
            tracing::debug!(tag = %chunk.kind, offset = chunk.offset, size = chunk.size, "chunk");
            decode(&mut self.cursor, &chunk).map_err(|source| DecodeError::Chunk {
                tag: chunk.kind.tag(),
                offset: chunk.offset,
                source: Box::new(source),
            })?;
            self.cursor.seek(chunk.end());
        }
        Ok(())
    }
}
