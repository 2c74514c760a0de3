#![allow(dead_code)]

use std::collections::VecDeque;

use mirrorbox_firmware::config::DEFAULT_INTERVAL_SIZE_NM;
use mirrorbox_firmware::positioning::{Axis, Direction, DriverError, Picomotor};
use mirrorbox_firmware::protocol::{CommandChannel, Feedback, RawCommand, Result};

/// Tick size giving 7.5 ticks per encoder interval.
pub const TICK_NM: f64 = DEFAULT_INTERVAL_SIZE_NM as f64 / 7.5;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// Ticks are accepted but the carriage does not move.
    Stall,
    /// Direction line wired backwards.
    Reversed,
}

/// Three ideal linear picomotor axes with a quadrature encoder whose
/// boundaries sit every `DEFAULT_INTERVAL_SIZE_NM`.
pub struct LinearStage {
    pub position_nm: [f64; 3],
    pub tick_nm: f64,
    pub fault: Fault,
    pub ticks: usize,
}

impl LinearStage {
    pub fn new(start_nm: f64) -> Self {
        Self {
            position_nm: [start_nm; 3],
            tick_nm: TICK_NM,
            fault: Fault::None,
            ticks: 0,
        }
    }

    pub fn with_fault(start_nm: f64, fault: Fault) -> Self {
        Self {
            fault,
            ..Self::new(start_nm)
        }
    }

    pub fn position(&self, axis: Axis) -> f64 {
        self.position_nm[axis.index()]
    }
}

impl Picomotor for LinearStage {
    fn read_encoder_state(&mut self, axis: Axis) -> std::result::Result<u8, DriverError> {
        let interval = (self.position(axis) / DEFAULT_INTERVAL_SIZE_NM as f64).floor() as i64;
        Ok(interval.rem_euclid(4) as u8)
    }

    fn actuate_tick(&mut self, axis: Axis, direction: Direction) -> std::result::Result<(), DriverError> {
        self.ticks += 1;
        let sign = match self.fault {
            Fault::None => direction.sign() as f64,
            Fault::Stall => 0.0,
            Fault::Reversed => -direction.sign() as f64,
        };
        self.position_nm[axis.index()] += sign * self.tick_nm;
        Ok(())
    }

    fn delay_ms(&mut self, _ms: u16) {}
}

/// In-memory ground link.
#[derive(Default)]
pub struct Link {
    pub inbox: VecDeque<RawCommand>,
    pub sent: Vec<Feedback>,
}

impl CommandChannel for Link {
    fn poll_command(&mut self) -> Option<RawCommand> {
        self.inbox.pop_front()
    }

    fn send_feedback(&mut self, feedback: &Feedback) -> Result<()> {
        self.sent.push(*feedback);
        Ok(())
    }
}
