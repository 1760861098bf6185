//! Name tables shared by JNT1, MAT3 and TEX1.
//!
//! Layout: `u16 count`, `u16 pad`, then `count` entries of `u16 hash` +
//! `i16 offset`, where each offset is relative to the table start and
//! points at a NUL-terminated name.

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, DecodeResult};

/// Read the name table starting at the cursor position.
pub fn read_string_table(c: &mut ByteCursor<'_>) -> DecodeResult<Vec<String>> {
    let table = c.position();
    let count = usize::from(c.read_u16()?);
    c.skip(2);
    let offsets = c.read_n(count, |c| {
        let _hash = c.read_u16()?;
        c.read_i16()
    })?;
    offsets
        .into_iter()
        .map(|offset| {
            let pos = table.checked_add_signed(isize::from(offset)).ok_or_else(|| {
                DecodeError::structural(
                    "string table",
                    format!("name offset {offset} points before the buffer start"),
                )
            })?;
            c.at(pos).read_cstring()
        })
        .collect()
}
