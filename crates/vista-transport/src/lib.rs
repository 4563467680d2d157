//! VISTA Transport - Outbound socket client
//!
//! One `Connection` owns one TCP socket to the capture server. Every I/O
//! surface collapses to a success flag or a byte count; faults tear the
//! connection down instead of propagating, so a frame-rate-driven caller can
//! poll without ever handling a raised error.

pub mod client;

pub use client::*;
