//! Packet framing for commands and feedback
//!
//! `0x55 0xAA | code | len | body | checksum | 0x0A`, checksum is the
//! inverted byte sum of header and body.

use super::{ActionCode, Feedback, ProtocolError, Result};

const START_BYTES: [u8; 2] = [0x55, 0xAA];
const END_BYTE: u8 = 0x0A;

const HEADER_SIZE: usize = 4;
const FOOTER_SIZE: usize = 2;
const BODY_SIZE: usize = 7;

pub const COMMAND_FRAME_LEN: usize = HEADER_SIZE + BODY_SIZE + FOOTER_SIZE;
pub const FEEDBACK_FRAME_LEN: usize = COMMAND_FRAME_LEN;

/// Complete command frame as received, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCommand {
    bytes: [u8; COMMAND_FRAME_LEN],
}

impl RawCommand {
    pub const fn new(bytes: [u8; COMMAND_FRAME_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    pub task_id: u8,
    pub action: ActionCode,
    pub period: u16,
    pub payload: i32,
    pub checksum: u8,
}

pub fn checksum(data: &[u8]) -> u8 {
    let mut sum: u8 = 0;
    for &byte in data {
        sum = sum.wrapping_add(byte);
    }
    !sum
}

fn frame(code: u8, task_id: u8, period: u16, value: i32) -> [u8; COMMAND_FRAME_LEN] {
    let mut buffer = [0u8; COMMAND_FRAME_LEN];
    buffer[0] = START_BYTES[0];
    buffer[1] = START_BYTES[1];
    buffer[2] = code;
    buffer[3] = BODY_SIZE as u8;

    buffer[4] = task_id;
    buffer[5..7].copy_from_slice(&period.to_be_bytes());
    buffer[7..11].copy_from_slice(&value.to_be_bytes());

    buffer[HEADER_SIZE + BODY_SIZE] = checksum(&buffer[..HEADER_SIZE + BODY_SIZE]);
    buffer[HEADER_SIZE + BODY_SIZE + 1] = END_BYTE;
    buffer
}

/// Validate framing and checksum, returning `(code, task_id, period, value, checksum)`.
fn unframe(data: &[u8]) -> Result<(u8, u8, u16, i32, u8)> {
    if data.len() != COMMAND_FRAME_LEN {
        return Err(ProtocolError::InvalidPacket);
    }
    if data[..2] != START_BYTES || data[3] as usize != BODY_SIZE {
        return Err(ProtocolError::InvalidPacket);
    }
    if data[HEADER_SIZE + BODY_SIZE + 1] != END_BYTE {
        return Err(ProtocolError::InvalidPacket);
    }

    let received = data[HEADER_SIZE + BODY_SIZE];
    if received != checksum(&data[..HEADER_SIZE + BODY_SIZE]) {
        return Err(ProtocolError::InvalidChecksum);
    }

    let period = u16::from_be_bytes([data[5], data[6]]);
    let value = i32::from_be_bytes([data[7], data[8], data[9], data[10]]);
    Ok((data[2], data[4], period, value, received))
}

pub fn encode_command(action: ActionCode, task_id: u8, period: u16, payload: i32) -> RawCommand {
    RawCommand::new(frame(action as u8, task_id, period, payload))
}

pub fn decode_command(raw: &RawCommand) -> Result<CommandFrame> {
    let (code, task_id, period, payload, checksum) = unframe(raw.as_bytes())?;
    let action = ActionCode::from_u8(code).ok_or(ProtocolError::InvalidCommand)?;
    Ok(CommandFrame {
        task_id,
        action,
        period,
        payload,
        checksum,
    })
}

pub fn encode_feedback(feedback: &Feedback) -> [u8; FEEDBACK_FRAME_LEN] {
    frame(
        feedback.action_code,
        feedback.task_id,
        feedback.period,
        feedback.value,
    )
}

pub fn decode_feedback(data: &[u8]) -> Result<Feedback> {
    let (action_code, task_id, period, value, _) = unframe(data)?;
    Ok(Feedback {
        task_id,
        action_code,
        period,
        value,
    })
}
