//! VISTA Sync - Multi-peer presence synchronization
//!
//! Keeps several independently-running viewer instances showing the same
//! thing. One dynamically-elected authority originates state changes and
//! broadcasts them through a session relay; everyone else only applies what
//! arrives. This crate provides:
//! - the injected `SessionRelay` abstraction (never a global)
//! - the broadcast message codec
//! - the `SyncCoordinator` state machine with join reconciliation
//! - an in-memory `LocalSession` relay for multi-peer tests

pub mod coordinator;
pub mod local;
pub mod message;
pub mod relay;

pub use coordinator::*;
pub use local::*;
pub use message::*;
pub use relay::*;
