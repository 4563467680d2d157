//! Broadcast message codec
//!
//! Every relay payload is `[tag u8][sender u64 LE][fields]`, fields
//! little-endian. Booleans travel as f32 1.0/0.0 for compatibility with the
//! original sharing service's float-only writer.

use bytes::{Buf, BufMut};

use vista_core::{PeerId, Pose, VistaError, VistaResult, POSE_WIRE_SIZE};

use crate::Reliability;

/// Wire tag of a broadcast message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageTag {
    /// Head pose of a peer (continuous, droppable)
    HeadPose = 0x01,
    /// Placement of the shared gallery wall
    GalleryPose = 0x02,
    /// Gallery paging/expansion status triple
    GalleryStatus = 0x03,
    /// Placement of the live-stream viewer
    ViewerPose = 0x04,
    /// Live camera stream on/off
    StreamActive = 0x05,
}

impl MessageTag {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(MessageTag::HeadPose),
            0x02 => Some(MessageTag::GalleryPose),
            0x03 => Some(MessageTag::GalleryStatus),
            0x04 => Some(MessageTag::ViewerPose),
            0x05 => Some(MessageTag::StreamActive),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Every tag the dispatch table registers at session join
    pub const ALL: [MessageTag; 5] = [
        MessageTag::HeadPose,
        MessageTag::GalleryPose,
        MessageTag::GalleryStatus,
        MessageTag::ViewerPose,
        MessageTag::StreamActive,
    ];
}

/// One broadcast message
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShareMessage {
    /// Where the sender's head is. `seq` makes last-wins explicit: a
    /// receiver drops anything older than what it already applied.
    HeadPose { seq: u32, pose: Pose },
    GalleryPose { pose: Pose },
    GalleryStatus {
        total_pages: i32,
        current_page: i32,
        /// >= 0 expanded slot, -1 none expanded, -2 gallery hidden
        expanded: i32,
    },
    ViewerPose { pose: Pose },
    StreamActive { active: bool },
}

impl ShareMessage {
    pub fn tag(&self) -> MessageTag {
        match self {
            ShareMessage::HeadPose { .. } => MessageTag::HeadPose,
            ShareMessage::GalleryPose { .. } => MessageTag::GalleryPose,
            ShareMessage::GalleryStatus { .. } => MessageTag::GalleryStatus,
            ShareMessage::ViewerPose { .. } => MessageTag::ViewerPose,
            ShareMessage::StreamActive { .. } => MessageTag::StreamActive,
        }
    }

    /// Head poses are superseded by the next one; everything else must not
    /// be lost or reordered.
    pub fn reliability(&self) -> Reliability {
        match self {
            ShareMessage::HeadPose { .. } => Reliability::UnreliableSequenced,
            _ => Reliability::ReliableOrdered,
        }
    }

    /// Encode with the sender's identity stamped after the tag
    pub fn encode(&self, sender: PeerId) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + 8 + POSE_WIRE_SIZE + 4);
        buf.put_u8(self.tag().to_byte());
        buf.put_u64_le(sender.0);

        match self {
            ShareMessage::HeadPose { seq, pose } => {
                buf.put_u32_le(*seq);
                pose.encode(&mut buf);
            }
            ShareMessage::GalleryPose { pose } | ShareMessage::ViewerPose { pose } => {
                pose.encode(&mut buf);
            }
            ShareMessage::GalleryStatus {
                total_pages,
                current_page,
                expanded,
            } => {
                buf.put_i32_le(*total_pages);
                buf.put_i32_le(*current_page);
                buf.put_i32_le(*expanded);
            }
            ShareMessage::StreamActive { active } => {
                buf.put_f32_le(if *active { 1.0 } else { 0.0 });
            }
        }

        buf
    }

    /// Decode a relay payload into sender identity and message
    pub fn decode(payload: &[u8]) -> VistaResult<(PeerId, ShareMessage)> {
        let mut buf = payload;

        if buf.remaining() < 9 {
            return Err(VistaError::BufferTooShort {
                expected: 9,
                actual: buf.remaining(),
            });
        }

        let tag_byte = buf.get_u8();
        let tag =
            MessageTag::from_byte(tag_byte).ok_or(VistaError::UnknownMessageTag(tag_byte))?;
        let sender = PeerId::new(buf.get_u64_le());

        let message = match tag {
            MessageTag::HeadPose => {
                if buf.remaining() < 4 + POSE_WIRE_SIZE {
                    return Err(VistaError::BufferTooShort {
                        expected: 4 + POSE_WIRE_SIZE,
                        actual: buf.remaining(),
                    });
                }
                let seq = buf.get_u32_le();
                let pose = Pose::decode(&mut buf)?;
                ShareMessage::HeadPose { seq, pose }
            }
            MessageTag::GalleryPose => ShareMessage::GalleryPose {
                pose: Pose::decode(&mut buf)?,
            },
            MessageTag::ViewerPose => ShareMessage::ViewerPose {
                pose: Pose::decode(&mut buf)?,
            },
            MessageTag::GalleryStatus => {
                if buf.remaining() < 12 {
                    return Err(VistaError::BufferTooShort {
                        expected: 12,
                        actual: buf.remaining(),
                    });
                }
                ShareMessage::GalleryStatus {
                    total_pages: buf.get_i32_le(),
                    current_page: buf.get_i32_le(),
                    expanded: buf.get_i32_le(),
                }
            }
            MessageTag::StreamActive => {
                if buf.remaining() < 4 {
                    return Err(VistaError::BufferTooShort {
                        expected: 4,
                        actual: buf.remaining(),
                    });
                }
                ShareMessage::StreamActive {
                    active: buf.get_f32_le() == 1.0,
                }
            }
        };

        Ok((sender, message))
    }
}
