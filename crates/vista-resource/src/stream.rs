//! Frame streaming loop
//!
//! After `STREAM\n` the server pushes fixed-size raw frames with no per-frame
//! header. The loop decouples arrival from presentation: a completed read is
//! staged and flagged, and the consumer swaps the staged buffer in on its own
//! tick. A short read discards that one attempt; only an explicit close ends
//! the stream.

use vista_core::FRAME_LEN;
use vista_transport::Connection;

/// Streaming parameters
#[derive(Clone, Copy, Debug)]
pub struct StreamConfig {
    /// Exact byte length of one frame
    pub frame_len: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            frame_len: FRAME_LEN,
        }
    }
}

/// Outcome of one frame poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamPoll {
    /// A full frame arrived and was staged
    Staged,
    /// Short read; the attempt was discarded, the stream stays up
    Discarded,
    /// A read is already in flight; this poll was rejected
    Busy,
    /// The underlying connection is gone
    Disconnected,
}

/// Consumer-paced reader of the camera frame stream.
///
/// At most one read is outstanding at a time: the in-flight token rejects an
/// overlapping poll instead of silently racing on the socket's read buffer.
pub struct FrameStream {
    conn: Connection,
    frame_len: usize,
    staged: Option<Vec<u8>>,
    fresh: bool,
    in_flight: bool,
}

impl FrameStream {
    /// Wrap a connection that has already completed stream start
    pub fn new(conn: Connection, config: StreamConfig) -> Self {
        FrameStream {
            conn,
            frame_len: config.frame_len,
            staged: None,
            fresh: false,
            in_flight: false,
        }
    }

    /// True while the stream connection is up
    pub fn is_active(&self) -> bool {
        self.conn.is_connected()
    }

    /// Issue one frame read.
    ///
    /// Exactly `frame_len` bytes stage a frame and raise the fresh flag; any
    /// other count is discarded without tearing the connection down.
    pub async fn poll_frame(&mut self) -> StreamPoll {
        if !self.conn.is_connected() {
            return StreamPoll::Disconnected;
        }
        if self.in_flight {
            return StreamPoll::Busy;
        }

        self.in_flight = true;
        let mut buf = vec![0u8; self.frame_len];
        let rlen = self.conn.receive(&mut buf).await;
        self.in_flight = false;

        if rlen == self.frame_len {
            self.staged = Some(buf);
            self.fresh = true;
            StreamPoll::Staged
        } else {
            tracing::trace!(rlen, expected = self.frame_len, "frame discarded");
            StreamPoll::Discarded
        }
    }

    /// True when a staged frame has not been consumed yet
    pub fn frame_ready(&self) -> bool {
        self.fresh
    }

    /// Swap out the staged frame and clear the fresh flag.
    ///
    /// Called by the consumer on its own schedule; returns `None` when no new
    /// frame arrived since the last take.
    pub fn take_frame(&mut self) -> Option<Vec<u8>> {
        if !self.fresh {
            return None;
        }
        self.fresh = false;
        self.staged.take()
    }

    /// End the stream and release the connection
    pub fn close(&mut self) {
        self.conn.close();
        self.staged = None;
        self.fresh = false;
        self.in_flight = false;
    }
}
