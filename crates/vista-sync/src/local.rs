//! In-memory session relay
//!
//! A `LocalSession` is a process-local hub: every `join()` hands back a
//! `LocalRelay` implementing [`SessionRelay`], wired to the same hub. The
//! first member to join is designated master; when the master leaves, the
//! longest-joined survivor is designated in its place. Useful for running
//! several coordinators against each other without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use vista_core::PeerId;

use crate::{MembershipEvent, Reliability, SessionRelay};

#[derive(Default)]
struct HubState {
    next_peer: u64,
    /// Members in join order
    members: Vec<PeerId>,
    master: Option<PeerId>,
    incoming: HashMap<PeerId, VecDeque<Vec<u8>>>,
    membership: HashMap<PeerId, VecDeque<MembershipEvent>>,
    /// When set, unreliable broadcasts are silently dropped
    lossy: bool,
}

impl HubState {
    fn join(&mut self) -> PeerId {
        self.next_peer += 1;
        let peer = PeerId::new(self.next_peer);

        for other in &self.members {
            if let Some(queue) = self.membership.get_mut(other) {
                queue.push_back(MembershipEvent::PeerJoined(peer));
            }
        }

        self.members.push(peer);
        self.master.get_or_insert(peer);
        self.incoming.insert(peer, VecDeque::new());

        let mut queue = VecDeque::new();
        queue.push_back(MembershipEvent::LocalJoined);
        self.membership.insert(peer, queue);

        peer
    }

    fn leave(&mut self, peer: PeerId) {
        self.members.retain(|&m| m != peer);
        self.incoming.remove(&peer);
        self.membership.remove(&peer);

        if self.master == Some(peer) {
            self.master = self.members.first().copied();
        }

        for other in &self.members {
            if let Some(queue) = self.membership.get_mut(other) {
                queue.push_back(MembershipEvent::PeerLeft(peer));
            }
        }
    }

    fn broadcast(&mut self, from: PeerId, payload: &[u8], reliability: Reliability) {
        if self.lossy && reliability == Reliability::UnreliableSequenced {
            return;
        }
        for other in &self.members {
            if *other == from {
                continue;
            }
            if let Some(queue) = self.incoming.get_mut(other) {
                queue.push_back(payload.to_vec());
            }
        }
    }
}

/// Process-local relay hub
#[derive(Clone, Default)]
pub struct LocalSession {
    state: Arc<Mutex<HubState>>,
}

impl LocalSession {
    pub fn new() -> Self {
        LocalSession::default()
    }

    /// Join the session, producing a relay handle for one peer
    pub fn join(&self) -> LocalRelay {
        let peer = self.state.lock().join();
        LocalRelay {
            hub: Arc::clone(&self.state),
            peer,
            joined: true,
        }
    }

    /// Toggle dropping of unreliable broadcasts
    pub fn set_lossy(&self, lossy: bool) {
        self.state.lock().lossy = lossy;
    }

    pub fn member_count(&self) -> usize {
        self.state.lock().members.len()
    }
}

/// One peer's handle to a [`LocalSession`]
pub struct LocalRelay {
    hub: Arc<Mutex<HubState>>,
    peer: PeerId,
    joined: bool,
}

impl LocalRelay {
    /// Leave the session. Idempotent; mastership is re-designated if this
    /// peer held it.
    pub fn leave(&mut self) {
        if !self.joined {
            return;
        }
        self.joined = false;
        self.hub.lock().leave(self.peer);
    }
}

impl Drop for LocalRelay {
    fn drop(&mut self) {
        self.leave();
    }
}

impl SessionRelay for LocalRelay {
    fn local_peer(&self) -> PeerId {
        self.peer
    }

    fn is_joined(&self) -> bool {
        self.joined
    }

    fn is_only_member(&self) -> bool {
        self.joined && self.hub.lock().members.len() == 1
    }

    fn is_designated_master(&self) -> bool {
        self.joined && self.hub.lock().master == Some(self.peer)
    }

    fn broadcast(&mut self, payload: &[u8], reliability: Reliability) {
        if !self.joined {
            return;
        }
        self.hub.lock().broadcast(self.peer, payload, reliability);
    }

    fn poll_membership(&mut self) -> Option<MembershipEvent> {
        if !self.joined {
            return None;
        }
        self.hub.lock().membership.get_mut(&self.peer)?.pop_front()
    }

    fn poll_incoming(&mut self) -> Option<Vec<u8>> {
        if !self.joined {
            return None;
        }
        self.hub.lock().incoming.get_mut(&self.peer)?.pop_front()
    }
}
