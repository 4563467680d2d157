//! Gallery composite
//!
//! Wires the pager and the per-slot zoom machines into the single shared
//! object the coordinator replicates. The host's renderer applies the slot
//! transforms; the input layer calls the public operations; the status
//! triple is what goes over the relay.

use vista_core::{Vec3, EXPANDED_HIDDEN, EXPANDED_NONE, ITEMS_PER_PAGE};

use crate::{Pager, Transform, ZoomProgress, ZoomState};

/// Default zoom-in scale factor
pub const ZOOM_FACTOR: f32 = 2.5;

/// Half-spacing of the 2x2 slot grid
const SLOT_OFFSET: f32 = 0.6;

/// One slot transform produced by a tick
#[derive(Clone, Copy, Debug)]
pub struct SlotUpdate {
    pub slot: usize,
    pub transform: Transform,
    /// True on the tick a transition finishes
    pub completed: bool,
}

/// Replicable state of the gallery: total pages, current page, and the
/// expanded slot or a sentinel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GalleryStatus {
    pub total_pages: i32,
    pub current_page: i32,
    pub expanded: i32,
}

/// The shared image wall: four slots, paged, at most one slot expanded.
pub struct GalleryView {
    pager: Pager,
    slots: Vec<ZoomState>,
    expanded: Option<usize>,
    /// An animation is running; blocks new zoom requests until it completes
    scaling: bool,
    visible: bool,
}

impl Default for GalleryView {
    fn default() -> Self {
        Self::new()
    }
}

impl GalleryView {
    pub fn new() -> Self {
        let rests = [
            Vec3::new(-SLOT_OFFSET, SLOT_OFFSET, 0.0),
            Vec3::new(SLOT_OFFSET, SLOT_OFFSET, 0.0),
            Vec3::new(-SLOT_OFFSET, -SLOT_OFFSET, 0.0),
            Vec3::new(SLOT_OFFSET, -SLOT_OFFSET, 0.0),
        ];
        GalleryView {
            pager: Pager::default(),
            slots: rests
                .into_iter()
                .map(|p| ZoomState::new(Transform::new(p, 1.0)))
                .collect(),
            expanded: None,
            scaling: false,
            visible: true,
        }
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn expanded_slot(&self) -> Option<usize> {
        self.expanded
    }

    /// Apply a fresh item count from the server
    pub fn set_total_items(&mut self, total: u32) {
        self.pager.set_total(total);
    }

    /// Show or hide the whole gallery; a repeat of the current visibility is
    /// a no-op and reports no change.
    pub fn show(&mut self, visible: bool) -> bool {
        if self.visible == visible {
            return false;
        }
        self.visible = visible;
        true
    }

    /// Jump to `page`; the server indices to fetch for its slots, or `None`
    /// when out of bounds or while a slot is expanded.
    pub fn load_page(&mut self, page: u32) -> Option<Vec<u32>> {
        if self.expanded.is_some() {
            return None;
        }
        if !self.pager.go_to(page) {
            return None;
        }
        Some(self.pager.page_indices())
    }

    /// Advance one page, with the same guards as `load_page`
    pub fn next_page(&mut self) -> Option<Vec<u32>> {
        if self.expanded.is_some() {
            return None;
        }
        self.pager.next()?;
        Some(self.pager.page_indices())
    }

    /// Back one page, with the same guards as `load_page`
    pub fn prev_page(&mut self) -> Option<Vec<u32>> {
        if self.expanded.is_some() {
            return None;
        }
        self.pager.prev()?;
        Some(self.pager.page_indices())
    }

    /// Expand one slot. Rejected while another slot is expanded, an
    /// animation is running, or the index is out of range.
    pub fn zoom_in(&mut self, slot: usize) -> bool {
        if self.scaling || self.expanded.is_some() || slot >= self.slots.len() {
            return false;
        }
        if !self.slots[slot].request_zoom_in(ZOOM_FACTOR) {
            return false;
        }
        self.expanded = Some(slot);
        self.scaling = true;
        true
    }

    /// Collapse the expanded slot, if any
    pub fn zoom_out(&mut self) -> bool {
        if self.scaling {
            return false;
        }
        let Some(slot) = self.expanded else {
            return false;
        };
        if !self.slots[slot].request_zoom_out() {
            return false;
        }
        self.scaling = true;
        true
    }

    /// Advance every slot one presentation tick.
    ///
    /// Returns the transforms to apply this tick; completion clears the
    /// animation guard, and a finished zoom-out releases the expanded slot.
    pub fn tick(&mut self) -> Vec<SlotUpdate> {
        let mut updates = Vec::new();

        for (slot, zoom) in self.slots.iter_mut().enumerate() {
            match zoom.advance() {
                ZoomProgress::Idle => {}
                ZoomProgress::Transitioning(transform) => updates.push(SlotUpdate {
                    slot,
                    transform,
                    completed: false,
                }),
                ZoomProgress::Complete(transform) => {
                    updates.push(SlotUpdate {
                        slot,
                        transform,
                        completed: true,
                    });
                    self.scaling = false;
                    if !zoom.is_scaled() {
                        // Zoom-out finished: the wall is whole again.
                        self.expanded = None;
                    }
                }
            }
        }

        updates
    }

    /// The triple the coordinator broadcasts
    pub fn status(&self) -> GalleryStatus {
        GalleryStatus {
            total_pages: self.pager.max_page() as i32,
            current_page: self.pager.current_page() as i32,
            expanded: self.expanded_code(),
        }
    }

    fn expanded_code(&self) -> i32 {
        if !self.visible {
            return EXPANDED_HIDDEN;
        }
        match self.expanded {
            Some(slot) => slot as i32,
            None => EXPANDED_NONE,
        }
    }

    /// Number of slots on the wall
    pub fn slot_count(&self) -> usize {
        ITEMS_PER_PAGE as usize
    }
}
