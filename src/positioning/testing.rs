//! Scripted picomotor used by the unit tests

use super::{Axis, Direction, DriverError, Picomotor};

/// Replays a fixed sequence of encoder codes, one per read, and records
/// every tick issued.
pub(crate) struct ScriptedMotor {
    codes: Vec<u8>,
    pub reads: usize,
    pub ticks: Vec<(Axis, Direction)>,
    pub settle_ms: u32,
}

impl ScriptedMotor {
    pub fn new(codes: &[u8]) -> Self {
        Self {
            codes: codes.to_vec(),
            reads: 0,
            ticks: Vec::new(),
            settle_ms: 0,
        }
    }

    pub fn net_ticks(&self) -> i32 {
        self.ticks.iter().map(|(_, d)| d.sign()).sum()
    }
}

impl Picomotor for ScriptedMotor {
    fn read_encoder_state(&mut self, _axis: Axis) -> Result<u8, DriverError> {
        let code = self.codes.get(self.reads).copied().ok_or(DriverError::Encoder)?;
        self.reads += 1;
        Ok(code)
    }

    fn actuate_tick(&mut self, axis: Axis, direction: Direction) -> Result<(), DriverError> {
        self.ticks.push((axis, direction));
        Ok(())
    }

    fn delay_ms(&mut self, ms: u16) {
        self.settle_ms += ms as u32;
    }
}
