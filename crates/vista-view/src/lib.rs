//! VISTA View - Replicated presentation state
//!
//! The state every peer must agree on: which gallery page is up, which slot
//! is zoomed (or whether the gallery is hidden), and how the zoom animation
//! advances. The host's renderer consumes the transforms; the sync
//! coordinator replicates the status triple.

pub mod gallery;
pub mod pager;
pub mod zoom;

pub use gallery::*;
pub use pager::*;
pub use zoom::*;
