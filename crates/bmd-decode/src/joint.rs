//! JNT1: skeleton joints.

use std::f32::consts::PI;

use glam::{Mat4, Vec3};

use crate::chunk::Chunk;
use crate::cursor::ByteCursor;
use crate::error::{DecodeError, DecodeResult};
use crate::string_table::read_string_table;

/// Size of one joint record.
const JOINT_SIZE: usize = 0x40;

/// Convert a 16-bit signed fraction of a half turn to radians.
#[must_use]
pub fn angle_from_raw(raw: i16) -> f32 {
    f32::from(raw) / 32768.0 * PI
}

/// A skeleton joint in its rest pose.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    /// Stored scale. Not part of `local_matrix`.
    pub scale: Vec3,
    /// Euler angles in radians, applied X then Y then Z.
    pub rotation: Vec3,
    pub translation: Vec3,
    /// `T * Rx * Ry * Rz`, relative to the parent joint.
    pub local_matrix: Mat4,
    pub bounding_radius: f32,
    pub bbox_min: Vec3,
    pub bbox_max: Vec3,
}

impl Joint {
    fn read(c: &mut ByteCursor<'_>, name: String) -> DecodeResult<Self> {
        c.skip(4);
        let scale = c.read_vec3()?;
        let rotation = Vec3::new(
            angle_from_raw(c.read_i16()?),
            angle_from_raw(c.read_i16()?),
            angle_from_raw(c.read_i16()?),
        );
        c.skip(2);
        let translation = c.read_vec3()?;
        let bounding_radius = c.read_f32()?;
        let bbox_min = c.read_vec3()?;
        let bbox_max = c.read_vec3()?;

        let local_matrix = Mat4::from_translation(translation)
            * Mat4::from_rotation_x(rotation.x)
            * Mat4::from_rotation_y(rotation.y)
            * Mat4::from_rotation_z(rotation.z);

        Ok(Self {
            name,
            scale,
            rotation,
            translation,
            local_matrix,
            bounding_radius,
            bbox_min,
            bbox_max,
        })
    }
}

pub fn parse_joints(c: &mut ByteCursor<'_>, chunk: &Chunk) -> DecodeResult<Vec<Joint>> {
    c.seek(chunk.at(0x08));
    let count = usize::from(c.read_u16()?);
    c.skip(2);
    let entries_offset = c.read_u32()?;
    let _remap_offset = c.read_u32()?;
    let names_offset = c.read_u32()?;

    c.seek(chunk.at(names_offset));
    let names = read_string_table(c)?;
    if names.len() != count {
        return Err(DecodeError::structural(
            "JNT1",
            format!("{count} joints but {} names", names.len()),
        ));
    }

    let entries = chunk.at(entries_offset);
    let joints = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            c.seek(entries + i * JOINT_SIZE);
            Joint::read(c, name)
        })
        .collect::<DecodeResult<Vec<_>>>()?;

    tracing::debug!(joints = joints.len(), "decoded joints");
    Ok(joints)
}
