//! Presence synchronization coordinator
//!
//! One coordinator per viewer instance. The authority (sole member or
//! relay-designated master) originates state changes; every other peer only
//! applies what the authority broadcasts. Applying produces `SyncEffect`s
//! for the host presentation layer instead of touching it directly, and all
//! of them land on idempotent view operations, so replays are harmless.

use std::collections::HashMap;

use vista_core::{PeerId, Pose, EXPANDED_HIDDEN, EXPANDED_NONE, ITEMS_PER_PAGE};
use vista_view::GalleryStatus;

use crate::{is_authoritative, MembershipEvent, MessageTag, SessionRelay, ShareMessage};

/// Synchronization lifecycle of a shared object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    /// Not yet attached to any session service
    Unsynchronized,
    /// Waiting for the relay to report the local join
    AwaitingMembership,
    /// Joined; dispatch table populated, broadcasts flowing
    Synchronized,
}

/// What the host presentation layer must do in response to applied state
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SyncEffect {
    /// Re-query the server item count (received total disagreed with ours)
    RefreshTotal,
    /// Load this gallery page
    LoadPage(u32),
    /// Expand this gallery slot
    ZoomIn(usize),
    /// Collapse the expanded slot
    ZoomOut,
    HideGallery,
    ShowGallery,
    /// Open the camera stream
    StartStream,
    /// Close the camera stream
    StopStream,
    MoveGallery(Pose),
    MoveViewer(Pose),
    MoveHead { peer: PeerId, pose: Pose },
}

/// The coordinator's mirror of what this instance currently displays.
///
/// Kept current by the `publish_*`/`note_*` calls on the authority and by
/// applied broadcasts on everyone else; it is what a join resync re-sends.
#[derive(Clone, Copy, Debug)]
pub struct SharedViewState {
    pub gallery_pose: Pose,
    pub viewer_pose: Pose,
    pub total_pages: i32,
    pub current_page: i32,
    /// Last known expanded code (>= 0 slot, -1 none, -2 hidden)
    pub expanded: i32,
    pub stream_active: bool,
}

impl Default for SharedViewState {
    fn default() -> Self {
        SharedViewState {
            gallery_pose: Pose::default(),
            viewer_pose: Pose::default(),
            total_pages: 1,
            current_page: 1,
            expanded: EXPANDED_NONE,
            stream_active: false,
        }
    }
}

impl SharedViewState {
    fn status(&self) -> GalleryStatus {
        GalleryStatus {
            total_pages: self.total_pages,
            current_page: self.current_page,
            expanded: self.expanded,
        }
    }
}

type Handler<R> = fn(&mut SyncCoordinator<R>, PeerId, &ShareMessage, &mut Vec<SyncEffect>);

/// Per-instance synchronization coordinator over an injected relay
pub struct SyncCoordinator<R: SessionRelay> {
    relay: R,
    phase: SyncPhase,
    /// Message dispatch table, populated once at session join
    dispatch: HashMap<MessageTag, Handler<R>>,
    local: SharedViewState,
    /// Outgoing head-pose sequence
    head_seq: u32,
    /// Newest applied head-pose sequence per peer; older arrivals dropped
    last_head_seq: HashMap<PeerId, u32>,
    slot_count: usize,
}

impl<R: SessionRelay> SyncCoordinator<R> {
    /// Attach to a relay. An already-joined relay synchronizes immediately;
    /// otherwise the coordinator waits for the join to be reported.
    pub fn new(relay: R) -> Self {
        let mut coordinator = SyncCoordinator {
            relay,
            phase: SyncPhase::Unsynchronized,
            dispatch: HashMap::new(),
            local: SharedViewState::default(),
            head_seq: 0,
            last_head_seq: HashMap::new(),
            slot_count: ITEMS_PER_PAGE as usize,
        };

        if coordinator.relay.is_joined() {
            coordinator.register_handlers();
            coordinator.phase = SyncPhase::Synchronized;
        } else {
            coordinator.phase = SyncPhase::AwaitingMembership;
        }

        coordinator
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn relay_mut(&mut self) -> &mut R {
        &mut self.relay
    }

    pub fn local_state(&self) -> &SharedViewState {
        &self.local
    }

    /// Derived on every call, never cached: membership may have changed
    /// since the last tick.
    pub fn is_authoritative(&self) -> bool {
        is_authoritative(&self.relay)
    }

    /// Advance one presentation tick: drain membership changes, then apply
    /// every pending broadcast. Returns the effects for the host to run.
    pub fn tick(&mut self) -> Vec<SyncEffect> {
        let mut effects = Vec::new();

        while let Some(event) = self.relay.poll_membership() {
            self.handle_membership(event);
        }
        while let Some(payload) = self.relay.poll_incoming() {
            self.apply_payload(&payload, &mut effects);
        }

        effects
    }

    // ---- origination (authority only, except the local head pose) ----

    /// Record what this instance displays without broadcasting.
    ///
    /// Non-authorities call this after running effects so a later promotion
    /// to authority resyncs from accurate state.
    pub fn note_status(&mut self, status: GalleryStatus) {
        self.local.total_pages = status.total_pages;
        self.local.current_page = status.current_page;
        self.local.expanded = status.expanded;
    }

    /// Broadcast the gallery status triple; mirror is updated either way,
    /// the send happens only when this peer is authoritative.
    pub fn publish_status(&mut self, status: GalleryStatus) -> bool {
        self.note_status(status);
        self.send_as_authority(&ShareMessage::GalleryStatus {
            total_pages: status.total_pages,
            current_page: status.current_page,
            expanded: status.expanded,
        })
    }

    pub fn publish_gallery_pose(&mut self, pose: Pose) -> bool {
        self.local.gallery_pose = pose;
        self.send_as_authority(&ShareMessage::GalleryPose { pose })
    }

    pub fn publish_viewer_pose(&mut self, pose: Pose) -> bool {
        self.local.viewer_pose = pose;
        self.send_as_authority(&ShareMessage::ViewerPose { pose })
    }

    pub fn publish_stream_active(&mut self, active: bool) -> bool {
        self.local.stream_active = active;
        self.send_as_authority(&ShareMessage::StreamActive { active })
    }

    /// Everyone sends their own head pose; it is per-peer presence, not
    /// shared authoritative state.
    pub fn publish_head_pose(&mut self, pose: Pose) -> bool {
        if self.phase != SyncPhase::Synchronized {
            return false;
        }
        self.head_seq = self.head_seq.wrapping_add(1);
        self.send(&ShareMessage::HeadPose {
            seq: self.head_seq,
            pose,
        });
        true
    }

    fn send_as_authority(&mut self, message: &ShareMessage) -> bool {
        if self.phase != SyncPhase::Synchronized || !self.is_authoritative() {
            return false;
        }
        self.send(message);
        true
    }

    fn send(&mut self, message: &ShareMessage) {
        let payload = message.encode(self.relay.local_peer());
        self.relay.broadcast(&payload, message.reliability());
    }

    // ---- membership ----

    fn handle_membership(&mut self, event: MembershipEvent) {
        match event {
            MembershipEvent::LocalJoined => {
                self.register_handlers();
                self.phase = SyncPhase::Synchronized;
            }
            MembershipEvent::PeerJoined(peer) => {
                if peer == self.relay.local_peer() {
                    return;
                }
                // The designated-master check (not the sole-member one)
                // decides who resyncs: join order of membership reports is
                // not deterministic, mastership is.
                if self.relay.is_designated_master() {
                    tracing::debug!(%peer, "peer joined; resending full state");
                    self.resync_full_state();
                } else {
                    // Listen-only side; table was built at join, keep it so.
                    self.register_handlers();
                }
            }
            MembershipEvent::PeerLeft(peer) => {
                self.last_head_seq.remove(&peer);
            }
        }
    }

    /// A late joiner converges from this alone; there is no separate
    /// "request state" message.
    fn resync_full_state(&mut self) {
        let state = self.local;
        self.send(&ShareMessage::GalleryPose {
            pose: state.gallery_pose,
        });
        self.send(&ShareMessage::GalleryStatus {
            total_pages: state.status().total_pages,
            current_page: state.status().current_page,
            expanded: state.status().expanded,
        });
        self.send(&ShareMessage::ViewerPose {
            pose: state.viewer_pose,
        });
        self.send(&ShareMessage::StreamActive {
            active: state.stream_active,
        });
    }

    fn register_handlers(&mut self) {
        for tag in MessageTag::ALL {
            let handler: Handler<R> = match tag {
                MessageTag::HeadPose => Self::on_head_pose,
                MessageTag::GalleryPose => Self::on_gallery_pose,
                MessageTag::GalleryStatus => Self::on_gallery_status,
                MessageTag::ViewerPose => Self::on_viewer_pose,
                MessageTag::StreamActive => Self::on_stream_active,
            };
            self.dispatch.entry(tag).or_insert(handler);
        }
    }

    // ---- application ----

    fn apply_payload(&mut self, payload: &[u8], effects: &mut Vec<SyncEffect>) {
        let (sender, message) = match ShareMessage::decode(payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable broadcast");
                return;
            }
        };

        if sender == self.relay.local_peer() {
            return;
        }
        // The authority displays its own shared state and never follows
        // others. Head poses are exempt: they are per-peer presence, every
        // member renders every other member's.
        if message.tag() != MessageTag::HeadPose && self.is_authoritative() {
            tracing::trace!(%sender, "authority ignoring broadcast");
            return;
        }

        let Some(handler) = self.dispatch.get(&message.tag()).copied() else {
            tracing::trace!(tag = ?message.tag(), "no handler registered; dropped");
            return;
        };
        handler(self, sender, &message, effects);
    }

    fn on_head_pose(
        &mut self,
        sender: PeerId,
        message: &ShareMessage,
        effects: &mut Vec<SyncEffect>,
    ) {
        let ShareMessage::HeadPose { seq, pose } = *message else {
            return;
        };

        // Unreliable class: drops are fine, applying against a newer known
        // value is not. Wrapping-distance compare so the sender's u32
        // counter survives wraparound.
        if let Some(&last) = self.last_head_seq.get(&sender) {
            if seq == last || seq.wrapping_sub(last) > u32::MAX / 2 {
                return;
            }
        }
        self.last_head_seq.insert(sender, seq);
        effects.push(SyncEffect::MoveHead { peer: sender, pose });
    }

    fn on_gallery_pose(
        &mut self,
        _sender: PeerId,
        message: &ShareMessage,
        effects: &mut Vec<SyncEffect>,
    ) {
        let ShareMessage::GalleryPose { pose } = *message else {
            return;
        };
        self.local.gallery_pose = pose;
        effects.push(SyncEffect::MoveGallery(pose));
    }

    fn on_viewer_pose(
        &mut self,
        _sender: PeerId,
        message: &ShareMessage,
        effects: &mut Vec<SyncEffect>,
    ) {
        let ShareMessage::ViewerPose { pose } = *message else {
            return;
        };
        self.local.viewer_pose = pose;
        effects.push(SyncEffect::MoveViewer(pose));
    }

    fn on_gallery_status(
        &mut self,
        _sender: PeerId,
        message: &ShareMessage,
        effects: &mut Vec<SyncEffect>,
    ) {
        let ShareMessage::GalleryStatus {
            total_pages,
            current_page,
            expanded,
        } = *message
        else {
            return;
        };

        // Total disagreement triggers a local re-query, not a blind copy:
        // the server owns the real count. The mirror is updated by the
        // host's note/publish call once the query lands, which is what
        // heals a missed count update.
        if total_pages != self.local.total_pages {
            effects.push(SyncEffect::RefreshTotal);
        }

        if current_page > 0 && current_page != self.local.current_page {
            effects.push(SyncEffect::LoadPage(current_page as u32));
            self.local.current_page = current_page;
        }

        if expanded >= 0 {
            if (expanded as usize) < self.slot_count {
                effects.push(SyncEffect::ZoomIn(expanded as usize));
                self.local.expanded = expanded;
            } else {
                // Rejected values stay out of the mirror too; a join
                // resync re-sends whatever the mirror holds.
                tracing::warn!(expanded, "expanded index out of range; ignored");
            }
        } else if expanded == EXPANDED_NONE {
            effects.push(SyncEffect::ZoomOut);
            self.local.expanded = expanded;
        }

        if expanded == EXPANDED_HIDDEN {
            effects.push(SyncEffect::HideGallery);
            self.local.expanded = expanded;
        } else {
            effects.push(SyncEffect::ShowGallery);
        }
    }

    fn on_stream_active(
        &mut self,
        _sender: PeerId,
        message: &ShareMessage,
        effects: &mut Vec<SyncEffect>,
    ) {
        let ShareMessage::StreamActive { active } = *message else {
            return;
        };

        if active == self.local.stream_active {
            return;
        }
        self.local.stream_active = active;
        effects.push(if active {
            SyncEffect::StartStream
        } else {
            SyncEffect::StopStream
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalSession, Reliability};
    use std::collections::VecDeque;
    use vista_core::{Quat, Vec3};
    use vista_view::GalleryView;

    /// Scripted relay for driving the coordinator by hand.
    struct ScriptedRelay {
        peer: PeerId,
        joined: bool,
        only_member: bool,
        master: bool,
        membership: VecDeque<MembershipEvent>,
        incoming: VecDeque<Vec<u8>>,
        sent: Vec<(Vec<u8>, Reliability)>,
    }

    impl ScriptedRelay {
        fn new(peer: u64) -> Self {
            ScriptedRelay {
                peer: PeerId::new(peer),
                joined: true,
                only_member: false,
                master: false,
                membership: VecDeque::new(),
                incoming: VecDeque::new(),
                sent: Vec::new(),
            }
        }

        fn push(&mut self, sender: PeerId, message: ShareMessage) {
            self.incoming.push_back(message.encode(sender));
        }
    }

    impl SessionRelay for ScriptedRelay {
        fn local_peer(&self) -> PeerId {
            self.peer
        }
        fn is_joined(&self) -> bool {
            self.joined
        }
        fn is_only_member(&self) -> bool {
            self.only_member
        }
        fn is_designated_master(&self) -> bool {
            self.master
        }
        fn broadcast(&mut self, payload: &[u8], reliability: Reliability) {
            self.sent.push((payload.to_vec(), reliability));
        }
        fn poll_membership(&mut self) -> Option<MembershipEvent> {
            self.membership.pop_front()
        }
        fn poll_incoming(&mut self) -> Option<Vec<u8>> {
            self.incoming.pop_front()
        }
    }

    fn remote() -> PeerId {
        PeerId::new(0x9999)
    }

    fn status(total: i32, page: i32, expanded: i32) -> ShareMessage {
        ShareMessage::GalleryStatus {
            total_pages: total,
            current_page: page,
            expanded,
        }
    }

    #[test]
    fn test_unjoined_relay_waits_for_membership() {
        let mut relay = ScriptedRelay::new(1);
        relay.joined = false;
        // A broadcast arriving before the local join: no handler yet.
        relay.push(remote(), status(9, 2, -1));

        let mut coord = SyncCoordinator::new(relay);
        assert_eq!(coord.phase(), SyncPhase::AwaitingMembership);
        assert!(coord.tick().is_empty());

        // Join lands; the dispatch table is populated once, and the same
        // message now applies.
        coord.relay_mut().joined = true;
        coord.relay_mut().membership.push_back(MembershipEvent::LocalJoined);
        coord.relay_mut().push(remote(), status(9, 2, -1));

        let effects = coord.tick();
        assert_eq!(coord.phase(), SyncPhase::Synchronized);
        assert!(effects.contains(&SyncEffect::RefreshTotal));
        assert!(effects.contains(&SyncEffect::LoadPage(2)));
    }

    #[test]
    fn test_equal_page_does_not_reload() {
        let mut coord = SyncCoordinator::new(ScriptedRelay::new(1));
        coord.note_status(GalleryStatus {
            total_pages: 9,
            current_page: 3,
            expanded: -1,
        });

        coord.relay_mut().push(remote(), status(9, 3, -1));
        let effects = coord.tick();
        assert!(!effects.iter().any(|e| matches!(e, SyncEffect::LoadPage(_))));
        assert!(!effects.contains(&SyncEffect::RefreshTotal));

        coord.relay_mut().push(remote(), status(9, 4, -1));
        let effects = coord.tick();
        assert!(effects.contains(&SyncEffect::LoadPage(4)));
    }

    #[test]
    fn test_out_of_range_expanded_ignored() {
        let mut coord = SyncCoordinator::new(ScriptedRelay::new(1));
        coord.relay_mut().push(remote(), status(1, 1, 17));

        let effects = coord.tick();
        assert!(!effects.iter().any(|e| matches!(e, SyncEffect::ZoomIn(_))));
        // The rejected value must not linger in the mirror where a later
        // resync would pick it up.
        assert_eq!(coord.local_state().expanded, EXPANDED_NONE);
    }

    #[test]
    fn test_hidden_sentinel_applies_idempotently() {
        let mut coord = SyncCoordinator::new(ScriptedRelay::new(1));
        let mut view = GalleryView::new();

        for _ in 0..2 {
            coord.relay_mut().push(remote(), status(1, 1, -2));
            for effect in coord.tick() {
                match effect {
                    SyncEffect::HideGallery => {
                        view.show(false);
                    }
                    SyncEffect::ShowGallery => {
                        view.show(true);
                    }
                    _ => {}
                }
            }
        }

        // Twice hidden is exactly once hidden.
        assert!(!view.is_visible());
        assert_eq!(view.status().expanded, -2);
    }

    #[test]
    fn test_stream_flag_transitions_only_on_change() {
        let mut coord = SyncCoordinator::new(ScriptedRelay::new(1));

        coord
            .relay_mut()
            .push(remote(), ShareMessage::StreamActive { active: true });
        assert_eq!(coord.tick(), vec![SyncEffect::StartStream]);

        coord
            .relay_mut()
            .push(remote(), ShareMessage::StreamActive { active: true });
        assert!(coord.tick().is_empty());

        coord
            .relay_mut()
            .push(remote(), ShareMessage::StreamActive { active: false });
        assert_eq!(coord.tick(), vec![SyncEffect::StopStream]);
    }

    #[test]
    fn test_master_applies_remote_head_poses() {
        let mut relay = ScriptedRelay::new(1);
        relay.master = true;
        let mut coord = SyncCoordinator::new(relay);
        assert!(coord.is_authoritative());

        // Shared state from another peer is ignored by the authority.
        coord.relay_mut().push(remote(), status(5, 2, -1));
        assert!(coord.tick().is_empty());

        // Presence is not: every member renders every other member's head.
        let pose = Pose::new(Vec3::new(0.1, 1.7, 0.3), Quat::IDENTITY);
        coord
            .relay_mut()
            .push(remote(), ShareMessage::HeadPose { seq: 1, pose });
        assert_eq!(
            coord.tick(),
            vec![SyncEffect::MoveHead {
                peer: remote(),
                pose
            }]
        );
    }

    #[test]
    fn test_head_seq_survives_wraparound() {
        let mut coord = SyncCoordinator::new(ScriptedRelay::new(1));
        let pose = Pose::default();

        for seq in [u32::MAX, 2, u32::MAX] {
            coord
                .relay_mut()
                .push(remote(), ShareMessage::HeadPose { seq, pose });
        }

        // MAX applies, 2 applies (wrapped forward), the replayed MAX is
        // stale again.
        let moves = coord
            .tick()
            .iter()
            .filter(|e| matches!(e, SyncEffect::MoveHead { .. }))
            .count();
        assert_eq!(moves, 2);
    }

    #[test]
    fn test_stale_head_pose_dropped() {
        let mut coord = SyncCoordinator::new(ScriptedRelay::new(1));
        let newer = Pose::new(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY);
        let older = Pose::new(Vec3::new(9.0, 9.0, 9.0), Quat::IDENTITY);

        coord
            .relay_mut()
            .push(remote(), ShareMessage::HeadPose { seq: 5, pose: newer });
        // Delivered late, out of order: must not win.
        coord
            .relay_mut()
            .push(remote(), ShareMessage::HeadPose { seq: 4, pose: older });

        let effects = coord.tick();
        assert_eq!(
            effects,
            vec![SyncEffect::MoveHead {
                peer: remote(),
                pose: newer
            }]
        );
    }

    #[test]
    fn test_non_authority_cannot_originate() {
        let mut relay = ScriptedRelay::new(1);
        relay.only_member = false;
        relay.master = false;
        let mut coord = SyncCoordinator::new(relay);

        assert!(!coord.publish_status(GalleryStatus {
            total_pages: 2,
            current_page: 1,
            expanded: -1,
        }));
        assert!(!coord.publish_stream_active(true));
        assert!(coord.relay().sent.is_empty());

        // Head pose is per-peer presence, always allowed.
        assert!(coord.publish_head_pose(Pose::default()));
        assert_eq!(coord.relay().sent.len(), 1);
        assert_eq!(coord.relay().sent[0].1, Reliability::UnreliableSequenced);
    }

    #[test]
    fn test_sole_member_is_authoritative() {
        let mut relay = ScriptedRelay::new(1);
        relay.only_member = true;
        let coord = SyncCoordinator::new(relay);
        assert!(coord.is_authoritative());
    }

    // ---- multi-peer scenarios over the in-memory relay ----

    #[test]
    fn test_join_resync_converges_late_joiner() {
        let session = LocalSession::new();

        // First peer: sole member, so authoritative; sets up real state.
        let mut alpha = SyncCoordinator::new(session.join());
        assert!(alpha.is_authoritative());
        assert!(alpha.publish_status(GalleryStatus {
            total_pages: 9,
            current_page: 4,
            expanded: 2,
        }));
        assert!(alpha.publish_stream_active(true));
        assert!(alpha.publish_gallery_pose(Pose::new(
            Vec3::new(0.0, 1.2, 2.0),
            Quat::IDENTITY
        )));

        // Second peer joins late.
        let mut beta = SyncCoordinator::new(session.join());
        assert!(!beta.is_authoritative());

        // Alpha observes the join; as designated master it stays
        // authoritative and re-sends its full state unprompted.
        assert!(alpha.is_authoritative());
        alpha.tick();

        let effects = beta.tick();
        assert!(effects.contains(&SyncEffect::RefreshTotal));
        assert!(effects.contains(&SyncEffect::LoadPage(4)));
        assert!(effects.contains(&SyncEffect::ZoomIn(2)));
        assert!(effects.contains(&SyncEffect::StartStream));
        assert!(effects
            .iter()
            .any(|e| matches!(e, SyncEffect::MoveGallery(_))));
        assert_eq!(beta.local_state().current_page, 4);
    }

    #[test]
    fn test_survivor_becomes_authoritative() {
        let session = LocalSession::new();
        let mut alpha = SyncCoordinator::new(session.join());
        let mut beta = SyncCoordinator::new(session.join());
        alpha.tick();
        beta.tick();
        assert!(!beta.is_authoritative());

        alpha.relay_mut().leave();
        beta.tick();

        // Sole remaining member: authority is re-derived, not cached.
        assert!(beta.is_authoritative());
        assert!(beta.publish_stream_active(true));
    }

    #[test]
    fn test_dropped_pose_updates_are_harmless() {
        let session = LocalSession::new();
        let mut alpha = SyncCoordinator::new(session.join());
        let mut beta = SyncCoordinator::new(session.join());
        alpha.tick();
        beta.tick();

        // The relay drops the unreliable class entirely for a while.
        session.set_lossy(true);
        alpha.publish_head_pose(Pose::default());
        alpha.publish_head_pose(Pose::default());
        assert!(beta.tick().is_empty());

        // Service restored: the next continuous re-send converges beta.
        session.set_lossy(false);
        let pose = Pose::new(Vec3::new(0.5, 1.5, -0.5), Quat::IDENTITY);
        alpha.publish_head_pose(pose);
        let effects = beta.tick();
        assert_eq!(
            effects,
            vec![SyncEffect::MoveHead {
                peer: alpha.relay().local_peer(),
                pose
            }]
        );
    }
}
