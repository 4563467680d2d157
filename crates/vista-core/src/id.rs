//! Identity types for the VISTA viewer core
//!
//! Peers are identified by a session-scoped 64-bit identity handed out by the
//! session relay; it carries no meaning outside the current session.

use std::fmt;

/// Peer identity within a sharing session
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PeerId(pub u64);

impl PeerId {
    pub const ZERO: PeerId = PeerId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        PeerId(id)
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        PeerId(u64::from_le_bytes(bytes))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peer({:016x})", self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
