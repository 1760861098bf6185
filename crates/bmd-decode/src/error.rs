//! Decode errors and recoverable warnings.

use std::fmt;

use thiserror::Error;

use crate::texture::TextureFormat;

/// A 4-byte ASCII chunk tag such as `VTX1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

/// Fatal decode failure. No partial model is returned alongside one of these.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("read of {need} bytes at offset {offset:#x} runs past end of buffer ({len:#x} bytes)")]
    OutOfBounds {
        offset: usize,
        need: usize,
        len: usize,
    },

    #[error("{context}: {message}")]
    StructuralMismatch {
        context: &'static str,
        message: String,
    },

    #[error("in {tag} chunk at offset {offset:#x}: {source}")]
    Chunk {
        tag: Tag,
        offset: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub(crate) fn structural(context: &'static str, message: impl Into<String>) -> Self {
        Self::StructuralMismatch {
            context,
            message: message.into(),
        }
    }

    /// The innermost error, with chunk context stripped.
    #[must_use]
    pub fn root(&self) -> &DecodeError {
        match self {
            Self::Chunk { source, .. } => source.root(),
            other => other,
        }
    }

    /// Tag of the chunk being decoded when the error was raised, if any.
    #[must_use]
    pub fn chunk_tag(&self) -> Option<Tag> {
        match self {
            Self::Chunk { tag, .. } => Some(*tag),
            _ => None,
        }
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Recoverable problem. Decoding continues and the affected item is
/// produced as an explicit unsupported marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A chunk with a tag this decoder does not know was skipped.
    UnknownChunkTag { tag: Tag, offset: usize },
    /// A texture could not be decoded into pixels.
    UnsupportedPixelFormat {
        texture: usize,
        format: TextureFormat,
        reason: String,
    },
    /// A TEV stage uses a combine operation outside the supported set.
    UnsupportedCombineOp {
        material: usize,
        stage: usize,
        op: u8,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownChunkTag { tag, offset } => {
                write!(f, "skipped unknown chunk {tag} at offset {offset:#x}")
            }
            Self::UnsupportedPixelFormat {
                texture,
                format,
                reason,
            } => write!(f, "texture {texture} ({format:?}) not decoded: {reason}"),
            Self::UnsupportedCombineOp { material, stage, op } => write!(
                f,
                "material {material} TEV stage {stage} uses unsupported combine op {op:#x}"
            ),
        }
    }
}
