//! Request/response protocol for the image server
//!
//! ASCII commands, little-endian binary fields. Every request runs one
//! connect -> send -> read -> close cycle; connections are never pooled.
//! A failed exchange never surfaces an error - the caller keeps whatever it
//! already had (stale count, placeholder image).

use vista_core::{VistaError, VistaResult};
use vista_transport::Connection;

/// Command: query the total number of items on the server
pub const CMD_TOTAL: &[u8] = b"GET XRAY TOTALNUM\n";

/// Command prefix: fetch one item by index
pub const CMD_ITEM: &[u8] = b"GET XRAY\n";

/// Command: switch this connection into frame streaming mode
pub const CMD_STREAM: &[u8] = b"STREAM\n";

/// Success status tag of a framed response
pub const STATUS_OK: &[u8; 3] = b"OK\n";

/// Count response: tag + i32 + trailing newline
const TOTAL_RESPONSE_LEN: usize = 3 + 4 + 1;

/// Item response header: tag + i32 payload length
const ITEM_HEADER_LEN: usize = 3 + 4;

/// Where the image server lives
#[derive(Clone, Debug)]
pub struct ResourceConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        ResourceConfig {
            host: "192.168.1.2".to_string(),
            port: 27015,
        }
    }
}

/// Client for the image server's request/response commands
#[derive(Clone, Debug, Default)]
pub struct ResourceClient {
    config: ResourceConfig,
}

impl ResourceClient {
    pub fn new(config: ResourceConfig) -> Self {
        ResourceClient { config }
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Query the total item count.
    ///
    /// On any failure (connect, short read, wrong tag) the previously known
    /// count is returned unchanged; a stale bound beats a crashed pager.
    pub async fn fetch_total(&self, last_known: u32) -> u32 {
        let mut conn = Connection::new();
        let total = self.fetch_total_inner(&mut conn, last_known).await;
        conn.close();
        total
    }

    async fn fetch_total_inner(&self, conn: &mut Connection, last_known: u32) -> u32 {
        if !conn.connect(&self.config.host, self.config.port).await {
            return last_known;
        }
        if !conn.send(CMD_TOTAL).await {
            return last_known;
        }

        let mut buf = [0u8; TOTAL_RESPONSE_LEN];
        let rlen = conn.receive(&mut buf).await;
        if rlen != TOTAL_RESPONSE_LEN {
            tracing::warn!(rlen, "count query: short response");
            return last_known;
        }

        match parse_ok_value(&buf) {
            Ok(total) if total >= 0 => total as u32,
            Ok(total) => {
                tracing::warn!(total, "count query: negative count");
                last_known
            }
            Err(e) => {
                tracing::warn!(error = %e, "count query: bad response");
                last_known
            }
        }
    }

    /// Fetch one item (an encoded image) by its 1-based server index.
    ///
    /// `None` on failure at any stage; the payload is surfaced only after
    /// every declared byte has arrived. No retry.
    pub async fn fetch_item(&self, index: u32) -> Option<Vec<u8>> {
        let mut conn = Connection::new();
        let item = self.fetch_item_inner(&mut conn, index).await;
        conn.close();
        item
    }

    async fn fetch_item_inner(&self, conn: &mut Connection, index: u32) -> Option<Vec<u8>> {
        if !conn.connect(&self.config.host, self.config.port).await {
            return None;
        }
        if !conn.send(&item_request(index)).await {
            return None;
        }

        let mut header = [0u8; ITEM_HEADER_LEN];
        let rlen = conn.receive(&mut header).await;
        if rlen != ITEM_HEADER_LEN {
            tracing::warn!(index, rlen, "item fetch: short header");
            return None;
        }

        let declared = match parse_ok_value(&header) {
            Ok(len) if len >= 0 => len as usize,
            Ok(len) => {
                tracing::warn!(index, len, "item fetch: negative length");
                return None;
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "item fetch: bad header");
                return None;
            }
        };

        let mut payload = vec![0u8; declared];
        let rlen = conn.receive(&mut payload).await;
        if rlen != declared {
            tracing::warn!(index, declared, rlen, "item fetch: truncated payload");
            return None;
        }

        Some(payload)
    }

    /// Open the frame stream: connect, send `STREAM\n`, hand the live
    /// connection over. The server replies with raw frames only, so there is
    /// no response to parse here.
    pub async fn open_stream(&self) -> Option<Connection> {
        let mut conn = Connection::new();
        if !conn.connect(&self.config.host, self.config.port).await {
            return None;
        }
        if !conn.send(CMD_STREAM).await {
            conn.close();
            return None;
        }
        Some(conn)
    }
}

/// Build the wire bytes of an item-fetch request
pub fn item_request(index: u32) -> Vec<u8> {
    let mut cmd = Vec::with_capacity(CMD_ITEM.len() + 4 + 1);
    cmd.extend_from_slice(CMD_ITEM);
    cmd.extend_from_slice(&(index as i32).to_le_bytes());
    cmd.push(b'\n');
    cmd
}

/// Parse a `OK\n` + i32 framed value; anything else is a protocol error.
fn parse_ok_value(buf: &[u8]) -> VistaResult<i32> {
    if buf.len() < ITEM_HEADER_LEN {
        return Err(VistaError::BufferTooShort {
            expected: ITEM_HEADER_LEN,
            actual: buf.len(),
        });
    }

    let tag: [u8; 3] = [buf[0], buf[1], buf[2]];
    if &tag != STATUS_OK {
        return Err(VistaError::BadStatusTag(tag));
    }

    let value = i32::from_le_bytes([buf[3], buf[4], buf[5], buf[6]]);
    Ok(value)
}
