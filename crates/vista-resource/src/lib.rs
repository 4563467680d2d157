//! VISTA Resource - Application protocol over the transport client
//!
//! Two consumers sit on top of this crate: the gallery (count query + item
//! fetch, one short-lived connection per request) and the live viewer (a
//! single long-lived stream connection delivering fixed-size camera frames).

pub mod protocol;
pub mod stream;

pub use protocol::*;
pub use stream::*;
