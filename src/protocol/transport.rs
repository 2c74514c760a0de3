//! Transport layer over a byte-oriented serial port

use embedded_hal::serial;

use super::packet::{encode_feedback, RawCommand, COMMAND_FRAME_LEN};
use super::{CommandChannel, Feedback, ProtocolError, Result};

const SYNC: [u8; 2] = [0x55, 0xAA];

/// Reassembles command frames from the receive side and writes feedback
/// frames on the transmit side.
pub struct Transport<S> {
    serial: S,
    rx_buffer: [u8; COMMAND_FRAME_LEN],
    rx_index: usize,
    rx_errors: u16,
}

impl<S> Transport<S>
where
    S: serial::Read<u8> + serial::Write<u8>,
{
    pub fn new(serial: S) -> Self {
        Self {
            serial,
            rx_buffer: [0; COMMAND_FRAME_LEN],
            rx_index: 0,
            rx_errors: 0,
        }
    }

    /// Receive errors seen since start-up (overrun, framing, parity).
    pub fn rx_errors(&self) -> u16 {
        self.rx_errors
    }

    fn receive(&mut self, byte: u8) -> Option<RawCommand> {
        match self.rx_index {
            0 if byte != SYNC[0] => return None,
            1 if byte != SYNC[1] => {
                // a repeated 0x55 may still start a frame
                self.rx_index = usize::from(byte == SYNC[0]);
                return None;
            }
            _ => {}
        }

        self.rx_buffer[self.rx_index] = byte;
        self.rx_index += 1;

        if self.rx_index == COMMAND_FRAME_LEN {
            self.rx_index = 0;
            return Some(RawCommand::new(self.rx_buffer));
        }
        None
    }
}

impl<S> CommandChannel for Transport<S>
where
    S: serial::Read<u8> + serial::Write<u8>,
{
    fn poll_command(&mut self) -> Option<RawCommand> {
        loop {
            match self.serial.read() {
                Ok(byte) => {
                    if let Some(raw) = self.receive(byte) {
                        return Some(raw);
                    }
                }
                Err(nb::Error::WouldBlock) => return None,
                Err(nb::Error::Other(_)) => {
                    self.rx_errors = self.rx_errors.wrapping_add(1);
                    self.rx_index = 0;
                    return None;
                }
            }
        }
    }

    fn send_feedback(&mut self, feedback: &Feedback) -> Result<()> {
        for byte in encode_feedback(feedback) {
            nb::block!(self.serial.write(byte)).map_err(|_| ProtocolError::Transport)?;
        }
        nb::block!(self.serial.flush()).map_err(|_| ProtocolError::Transport)
    }
}
