//! Session relay abstraction
//!
//! The relay fans broadcast payloads out to every other joined peer and
//! tracks session membership. The coordinator depends only on this trait;
//! the host wires in whatever sharing service it actually has.

use vista_core::PeerId;

/// Delivery guarantee requested for a broadcast
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reliability {
    /// Exactly once, in send order. Status and control changes.
    ReliableOrdered,
    /// May be dropped, never reordered against newer causally-related
    /// state. Continuously re-sent pose updates.
    UnreliableSequenced,
}

/// Membership change reported by the relay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipEvent {
    /// The local peer finished joining the session
    LocalJoined,
    /// Another peer joined
    PeerJoined(PeerId),
    /// Another peer left
    PeerLeft(PeerId),
}

/// The session service a coordinator is injected with.
///
/// Membership and incoming broadcasts are polled once per presentation tick
/// rather than delivered through callbacks.
pub trait SessionRelay {
    /// Session-scoped identity of the local peer
    fn local_peer(&self) -> PeerId;

    /// True once the local peer is a session member
    fn is_joined(&self) -> bool;

    /// True when the local peer is the only session member
    fn is_only_member(&self) -> bool;

    /// True when the relay has designated the local peer session master
    fn is_designated_master(&self) -> bool;

    /// Fan a payload out to every other joined peer
    fn broadcast(&mut self, payload: &[u8], reliability: Reliability);

    /// Next pending membership change, if any
    fn poll_membership(&mut self) -> Option<MembershipEvent>;

    /// Next pending broadcast payload from another peer, if any
    fn poll_incoming(&mut self) -> Option<Vec<u8>>;
}

/// Authority is derived from the relay on every decision, never cached:
/// the sole member is authoritative, as is the designated master.
pub fn is_authoritative<R: SessionRelay + ?Sized>(relay: &R) -> bool {
    relay.is_joined() && (relay.is_only_member() || relay.is_designated_master())
}
