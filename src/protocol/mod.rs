//! Command and feedback protocol

pub mod packet;
pub mod transport;

pub use packet::{
    decode_command, decode_feedback, encode_command, encode_feedback, CommandFrame, RawCommand,
    COMMAND_FRAME_LEN, FEEDBACK_FRAME_LEN,
};
pub use transport::Transport;

use crate::diagnostics::FaultCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    InvalidPacket,
    InvalidChecksum,
    InvalidCommand,
    Transport,
}

pub type Result<T> = core::result::Result<T, ProtocolError>;

impl FaultCode for ProtocolError {
    fn code(&self) -> u8 {
        match self {
            ProtocolError::InvalidPacket => 51,
            ProtocolError::InvalidChecksum => 52,
            ProtocolError::InvalidCommand => 53,
            ProtocolError::Transport => 54,
        }
    }
}

/// Scheduler operation requested by a command frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionCode {
    Add = 0x01,
    Delete = 0x02,
    Status = 0x03,
    AddHigh = 0x04,
    AddLow = 0x05,
}

impl ActionCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(ActionCode::Add),
            0x02 => Some(ActionCode::Delete),
            0x03 => Some(ActionCode::Status),
            0x04 => Some(ActionCode::AddHigh),
            0x05 => Some(ActionCode::AddLow),
            _ => None,
        }
    }
}

/// Feedback code of a report sent after a task body ran.
pub const TASK_REPORT: u8 = 0x10;

/// Feedback code of a fault report; the value carries the fault code.
pub const FAULT_REPORT: u8 = 0xEE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub task_id: u8,
    pub action_code: u8,
    pub period: u16,
    pub value: i32,
}

impl Feedback {
    pub fn fault(task_id: u8, period: u16, code: u8) -> Self {
        Self {
            task_id,
            action_code: FAULT_REPORT,
            period,
            value: code as i32,
        }
    }
}

/// Link to the ground segment as seen by the dispatcher.
pub trait CommandChannel {
    /// Next complete command frame, if one arrived.
    fn poll_command(&mut self) -> Option<RawCommand>;

    fn send_feedback(&mut self, feedback: &Feedback) -> Result<()>;
}
