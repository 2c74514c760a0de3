//! Tick size calibration

use libm::{fmaxf, sqrtf};

use super::{move_intervals, Axis, Direction, Picomotor, PicomotorError};
use crate::diagnostics::FunctionCode;
use crate::registers::Registers;

/// Displacement of a single actuation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickStatistics {
    pub mean_tick_nm: f32,
    pub std_tick_nm: f32,
}

/// Estimate the tick size of `axis` from `intervals` single-interval moves.
///
/// The mean settles after a handful of intervals, the deviation needs a
/// large count. The result is stored in the axis calibration. Any move
/// failure aborts the run without touching the stored statistics.
pub fn calibrate<M: Picomotor + ?Sized>(
    registers: &mut Registers,
    motors: &mut M,
    axis: Axis,
    intervals: i16,
) -> Result<TickStatistics, PicomotorError> {
    registers.enter(FunctionCode::Calibrate);

    let direction = Direction::of(intervals as i32).ok_or(PicomotorError::ZeroIntervals)?;

    let mut sum_ticks: i64 = 0;
    let mut sum_ticks_squared: i64 = 0;

    for _ in 0..intervals.unsigned_abs() {
        let moved = move_intervals(registers, motors, axis, direction.sign())?;
        let ticks = moved.ticks as i64;
        sum_ticks += ticks;
        sum_ticks_squared += ticks * ticks;
    }

    let count = intervals as f32;
    let sum = sum_ticks as f32;
    let interval_size = registers.axis(axis).interval_size_nm as f32;

    let ticks_per_interval = sum / count;
    let mean_tick_nm = interval_size / ticks_per_interval;
    let spread = sum_ticks_squared as f32 / sum_ticks.unsigned_abs() as f32 - ticks_per_interval;
    let std_tick_nm = sqrtf(fmaxf(spread, 0.0)) * mean_tick_nm;

    let cal = registers.axis_mut(axis);
    cal.mean_tick_nm = mean_tick_nm;
    cal.std_tick_nm = std_tick_nm;

    Ok(TickStatistics {
        mean_tick_nm,
        std_tick_nm,
    })
}
