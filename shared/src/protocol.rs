//! Host-to-client mod messages.
//!
//! Layout is fixed: one tag byte followed by the message body. The restore
//! message body is two little-endian `f32`s, nine bytes in total.

use crate::Vec2;

pub const RESTORE_SAVED_POSITION: u8 = 1;
const RESTORE_LEN: usize = 9;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty mod message")]
    Empty,

    #[error("unknown mod message type {0}")]
    UnknownType(u8),

    #[error("mod message truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModMessage {
    /// Sent once to a single connecting client; never broadcast.
    RestoreSavedPosition { x: f32, y: f32 },
}

impl ModMessage {
    pub fn restore(position: Vec2) -> Self {
        ModMessage::RestoreSavedPosition {
            x: position.x,
            y: position.y,
        }
    }

    pub fn message_type(&self) -> u8 {
        match self {
            ModMessage::RestoreSavedPosition { .. } => RESTORE_SAVED_POSITION,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            ModMessage::RestoreSavedPosition { x, y } => {
                let mut bytes = Vec::with_capacity(RESTORE_LEN);
                bytes.push(self.message_type());
                bytes.extend_from_slice(&x.to_le_bytes());
                bytes.extend_from_slice(&y.to_le_bytes());
                bytes
            }
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (&tag, body) = bytes.split_first().ok_or(ProtocolError::Empty)?;
        match tag {
            RESTORE_SAVED_POSITION => {
                if bytes.len() < RESTORE_LEN {
                    return Err(ProtocolError::Truncated {
                        expected: RESTORE_LEN,
                        actual: bytes.len(),
                    });
                }
                let x = f32::from_le_bytes([body[0], body[1], body[2], body[3]]);
                let y = f32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                Ok(ModMessage::RestoreSavedPosition { x, y })
            }
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}
