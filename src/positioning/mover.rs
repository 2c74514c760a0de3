//! Interval mover: tick a picomotor until the encoder reports each
//! boundary crossing.

use super::{decode, Axis, Direction, Picomotor, PicomotorError};
use crate::config::TICK_SETTLE_MS;
use crate::diagnostics::FunctionCode;
use crate::registers::Registers;

/// Signed motion actually performed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Moved {
    pub intervals: i32,
    pub ticks: i32,
}

/// A failed interval move. Motion already performed is not undone and is
/// reported in `progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveAborted {
    pub error: PicomotorError,
    pub progress: Moved,
}

impl From<MoveAborted> for PicomotorError {
    fn from(aborted: MoveAborted) -> Self {
        aborted.error
    }
}

fn abort(error: impl Into<PicomotorError>, progress: Moved) -> MoveAborted {
    MoveAborted {
        error: error.into(),
        progress,
    }
}

/// Cross `count` encoder intervals, negative counts move down.
///
/// Each crossing may take at most `max_ticks_per_interval` ticks; the tick
/// that would exceed the bound is not issued. Every crossing the encoder
/// confirms, including one against `direction`, moves the axis location
/// estimate, so it stays valid after a failed move.
pub fn move_intervals<M: Picomotor + ?Sized>(
    registers: &mut Registers,
    motors: &mut M,
    axis: Axis,
    count: i32,
) -> Result<Moved, MoveAborted> {
    registers.enter(FunctionCode::MoveIntervals);

    let mut progress = Moved::default();
    let direction = match Direction::of(count) {
        Some(direction) => direction,
        None => return Ok(progress),
    };
    let max_ticks = registers.axis(axis).max_ticks_per_interval;

    let mut current = motors
        .read_encoder_state(axis)
        .map_err(|e| abort(e, progress))?;

    for _ in 0..count.unsigned_abs() {
        let previous = current;
        let mut ticks = 0u32;

        loop {
            if ticks >= max_ticks {
                return Err(abort(PicomotorError::MaxTicksExceeded, progress));
            }

            motors
                .actuate_tick(axis, direction)
                .map_err(|e| abort(e, progress))?;
            motors.delay_ms(TICK_SETTLE_MS);
            ticks += 1;
            progress.ticks += direction.sign();

            current = motors
                .read_encoder_state(axis)
                .map_err(|e| abort(e, progress))?;

            let step = decode(current, previous).map_err(|e| abort(e, progress))?;
            let crossed = match Direction::of(step.sign()) {
                Some(crossed) => crossed,
                None => continue,
            };
            registers.axis_mut(axis).cross_boundary(crossed);
            if crossed != direction {
                return Err(abort(PicomotorError::WrongDirection, progress));
            }
            break;
        }

        progress.intervals += direction.sign();
    }

    Ok(progress)
}
