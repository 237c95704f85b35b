//! Bones, entities and bare point arrays.

use crate::io::{ByteReader, ByteWriter, FixedStr, Record, Vec3};
use crate::read::ReadError;

/// Three axis vectors followed by a position, as stored for meshes, bones
/// and entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub axes: [Vec3; 3],
    pub position: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        axes: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        position: [0.0; 3],
    };
}

impl Record for Transform {
    const ENCODED_LEN: usize = 0x30;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            axes: [r.vec3()?, r.vec3()?, r.vec3()?],
            position: r.vec3()?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        self.axes.iter().for_each(|a| w.vec3(*a));
        w.vec3(self.position);
    }
}

/// A skeleton joint. Its index in [`crate::Model::bones`] is the id the
/// skin table refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bone {
    pub transform: Transform,
}

impl Record for Bone {
    const ENCODED_LEN: usize = 0x30;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError> {
        Ok(Self { transform: Transform::read(r)? })
    }

    fn write(&self, w: &mut ByteWriter) {
        self.transform.write(w);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    pub transform: Transform,
    pub name: FixedStr<256>,
}

impl Record for Entity {
    const ENCODED_LEN: usize = 0x130;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            transform: Transform::read(r)?,
            name: r.fixed_str()?,
        })
    }

    fn write(&self, w: &mut ByteWriter) {
        self.transform.write(w);
        w.fixed_str(&self.name);
    }
}

/// Opaque model-space point, used for the unknown-point and collision
/// arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub position: Vec3,
}

impl Record for Point {
    const ENCODED_LEN: usize = 0x0C;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError> {
        Ok(Self { position: r.vec3()? })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.vec3(self.position);
    }
}

/// Version 6 trailer record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelCleave {
    pub value: Vec3,
}

impl Record for ModelCleave {
    const ENCODED_LEN: usize = 0x0C;

    fn read(r: &mut ByteReader<'_>) -> Result<Self, ReadError> {
        Ok(Self { value: r.vec3()? })
    }

    fn write(&self, w: &mut ByteWriter) {
        w.vec3(self.value);
    }
}
