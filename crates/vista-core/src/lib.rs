//! VISTA Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout the VISTA viewer core:
//! - Identifiers (PeerId)
//! - Pose primitives (Vec3, Quat, Pose)
//! - Protocol constants (camera geometry, gallery layout, sentinels)
//! - Error types

pub mod error;
pub mod id;
pub mod limits;
pub mod pose;

pub use error::*;
pub use id::*;
pub use limits::*;
pub use pose::*;
