//! Zoom animation state machine
//!
//! One machine per gallery slot. Transitions are explicit tagged states
//! advanced once per presentation tick; re-requesting the current state is a
//! no-op, which is what makes replicated zoom commands idempotent.

use vista_core::Vec3;

/// Ticks to complete a zoom transition
pub const ZOOM_FRAMES: u32 = 40;

/// Pose and uniform scale of a slot, in gallery-local space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub scale: f32,
}

impl Transform {
    pub fn new(position: Vec3, scale: f32) -> Self {
        Transform { position, scale }
    }

    fn lerp(from: Transform, to: Transform, t: f32) -> Transform {
        Transform {
            position: Vec3::new(
                from.position.x + (to.position.x - from.position.x) * t,
                from.position.y + (to.position.y - from.position.y) * t,
                from.position.z + (to.position.z - from.position.z) * t,
            ),
            scale: from.scale + (to.scale - from.scale) * t,
        }
    }
}

/// Animation phase of one slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomPhase {
    /// At rest in its grid position
    Default,
    /// Animating toward the scaled transform
    ZoomingIn { frame: u32 },
    /// Fully zoomed
    Scaled,
    /// Animating back to rest
    ZoomingOut { frame: u32 },
}

/// Result of advancing the machine one tick
#[derive(Debug)]
pub enum ZoomProgress {
    /// Nothing animating
    Idle,
    /// Mid-transition; apply this transform
    Transitioning(Transform),
    /// Transition finished this tick; apply this final transform
    Complete(Transform),
}

/// Per-slot zoom machine.
///
/// `request_zoom_in` is valid only from `Default` and `request_zoom_out`
/// only from `Scaled`; anything else is rejected, never queued.
pub struct ZoomState {
    phase: ZoomPhase,
    rest: Transform,
    scaled: Transform,
    on_complete: Option<Box<dyn FnOnce() + Send>>,
}

impl ZoomState {
    /// A machine at rest at `rest`
    pub fn new(rest: Transform) -> Self {
        ZoomState {
            phase: ZoomPhase::Default,
            rest,
            scaled: rest,
            on_complete: None,
        }
    }

    pub fn phase(&self) -> ZoomPhase {
        self.phase
    }

    pub fn is_scaled(&self) -> bool {
        self.phase == ZoomPhase::Scaled
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(
            self.phase,
            ZoomPhase::ZoomingIn { .. } | ZoomPhase::ZoomingOut { .. }
        )
    }

    /// Register a one-shot continuation fired when the current transition
    /// completes. Replaces any previously registered one.
    pub fn notify_complete(&mut self, f: impl FnOnce() + Send + 'static) {
        self.on_complete = Some(Box::new(f));
    }

    /// Begin zooming toward the gallery center at `factor` scale
    pub fn request_zoom_in(&mut self, factor: f32) -> bool {
        if self.phase != ZoomPhase::Default {
            return false;
        }
        // Target is the gallery center; z scale stays whatever rest had.
        self.scaled = Transform::new(Vec3::default(), factor);
        self.phase = ZoomPhase::ZoomingIn { frame: 0 };
        true
    }

    /// Begin zooming back to the rest transform
    pub fn request_zoom_out(&mut self) -> bool {
        if self.phase != ZoomPhase::Scaled {
            return false;
        }
        self.phase = ZoomPhase::ZoomingOut { frame: 0 };
        true
    }

    /// Advance one presentation tick
    pub fn advance(&mut self) -> ZoomProgress {
        match self.phase {
            ZoomPhase::Default | ZoomPhase::Scaled => ZoomProgress::Idle,
            ZoomPhase::ZoomingIn { frame } => {
                let frame = frame + 1;
                if frame >= ZOOM_FRAMES {
                    self.phase = ZoomPhase::Scaled;
                    self.fire_complete();
                    ZoomProgress::Complete(self.scaled)
                } else {
                    self.phase = ZoomPhase::ZoomingIn { frame };
                    let t = frame as f32 / ZOOM_FRAMES as f32;
                    ZoomProgress::Transitioning(Transform::lerp(self.rest, self.scaled, t))
                }
            }
            ZoomPhase::ZoomingOut { frame } => {
                let frame = frame + 1;
                if frame >= ZOOM_FRAMES {
                    self.phase = ZoomPhase::Default;
                    self.fire_complete();
                    ZoomProgress::Complete(self.rest)
                } else {
                    self.phase = ZoomPhase::ZoomingOut { frame };
                    let t = frame as f32 / ZOOM_FRAMES as f32;
                    ZoomProgress::Transitioning(Transform::lerp(self.scaled, self.rest, t))
                }
            }
        }
    }

    fn fire_complete(&mut self) {
        if let Some(f) = self.on_complete.take() {
            f();
        }
    }
}
