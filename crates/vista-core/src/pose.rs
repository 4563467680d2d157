//! Pose primitives
//!
//! The viewer core never does placement math; it only carries poses between
//! the rendering surface and the session relay. Wire layout is consecutive
//! little-endian f32: position (3) then orientation (4).

use bytes::{Buf, BufMut};

use crate::{VistaError, VistaResult};

/// Position in world space (meters)
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }
}

/// Orientation quaternion
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    #[inline]
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Quat { x, y, z, w }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Quat::IDENTITY
    }
}

/// Position + orientation of one shared object
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

/// Encoded size of a pose on the wire (7 x f32)
pub const POSE_WIRE_SIZE: usize = 28;

impl Pose {
    #[inline]
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Pose {
            position,
            orientation,
        }
    }

    /// Append the wire encoding to `buf`
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_f32_le(self.position.x);
        buf.put_f32_le(self.position.y);
        buf.put_f32_le(self.position.z);
        buf.put_f32_le(self.orientation.x);
        buf.put_f32_le(self.orientation.y);
        buf.put_f32_le(self.orientation.z);
        buf.put_f32_le(self.orientation.w);
    }

    /// Decode a pose from the front of `buf`
    pub fn decode(buf: &mut impl Buf) -> VistaResult<Self> {
        if buf.remaining() < POSE_WIRE_SIZE {
            return Err(VistaError::BufferTooShort {
                expected: POSE_WIRE_SIZE,
                actual: buf.remaining(),
            });
        }

        let position = Vec3::new(buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le());
        let orientation = Quat::new(
            buf.get_f32_le(),
            buf.get_f32_le(),
            buf.get_f32_le(),
            buf.get_f32_le(),
        );

        Ok(Pose {
            position,
            orientation,
        })
    }
}
