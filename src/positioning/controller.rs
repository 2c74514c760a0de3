//! Position controller: decomposition, coarse crossings, fine ticks

use super::{decompose, move_intervals, Axis, BoundaryTable, Direction, Picomotor, PicomotorError};
use crate::config::TICK_SETTLE_MS;
use crate::diagnostics::FunctionCode;
use crate::registers::Registers;

/// Drive `axis` from `current_nm` to `desired_nm`.
///
/// The fine stage always enters the target interval through one boundary
/// (upward for a positive fine count, downward for a negative one) and then
/// issues the remaining ticks open loop. On success the axis location
/// estimate becomes `desired_nm`. On failure the motion already performed
/// stays in place and the estimate reflects the boundary crossings made.
pub fn set_location<M: Picomotor + ?Sized>(
    registers: &mut Registers,
    motors: &mut M,
    table: &BoundaryTable<'_>,
    axis: Axis,
    current_nm: i32,
    desired_nm: i32,
) -> Result<(), PicomotorError> {
    registers.enter(FunctionCode::SetLocation);

    registers.enter(FunctionCode::Decompose);
    let plan = decompose(registers.axis(axis), table, current_nm, desired_nm)?;
    registers.axis_mut(axis).location_nm = current_nm;

    move_intervals(registers, motors, axis, plan.coarse_intervals)?;

    let direction = Direction::of(plan.fine_ticks).ok_or(PicomotorError::LocateCritical)?;

    // Move into the target interval
    move_intervals(registers, motors, axis, direction.sign())?;

    let remaining = plan.fine_ticks.unsigned_abs() - 1;
    for _ in 0..remaining {
        motors.actuate_tick(axis, direction)?;
        motors.delay_ms(TICK_SETTLE_MS);
    }

    registers.axis_mut(axis).location_nm = desired_nm;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positioning::testing::ScriptedMotor;

    #[test]
    fn left_approach_crosses_then_adds_fine_ticks() {
        // 0 -> 2 * 212 + 60: one coarse interval and one entry crossing of
        // two ticks each, then two fine ticks
        let mut registers = Registers::new();
        let mut motor = ScriptedMotor::new(&[0, 0, 1, 1, 1, 2]);
        set_location(&mut registers, &mut motor, &BoundaryTable::DEFAULT, Axis::P0, 0, 484)
            .unwrap();

        assert_eq!(motor.ticks.len(), 2 + 2 + 2);
        assert_eq!(motor.net_ticks(), 6);
        assert_eq!(registers.axis(Axis::P0).location_nm, 484);
    }

    #[test]
    fn right_approach_enters_from_above() {
        // 0 -> 150: coarse +1 to reach interval 1, then one crossing down and
        // one fine tick down
        let mut registers = Registers::new();
        let mut motor = ScriptedMotor::new(&[0, 1, 1, 1, 0]);
        set_location(&mut registers, &mut motor, &BoundaryTable::DEFAULT, Axis::P1, 0, 150)
            .unwrap();

        let directions: Vec<_> = motor.ticks.iter().map(|(_, d)| *d).collect();
        assert_eq!(
            directions,
            [Direction::Up, Direction::Down, Direction::Down, Direction::Down]
        );
        assert_eq!(registers.axis(Axis::P1).location_nm, 150);
    }

    #[test]
    fn failure_before_any_crossing_keeps_estimate() {
        let mut registers = Registers::new();
        registers.axis_mut(Axis::P2).location_nm = 10;
        registers.axis_mut(Axis::P2).max_ticks_per_interval = 2;
        let mut motor = ScriptedMotor::new(&[0, 0, 0]);

        let err = set_location(&mut registers, &mut motor, &BoundaryTable::DEFAULT, Axis::P2, 10, 900)
            .unwrap_err();
        assert_eq!(err, PicomotorError::MaxTicksExceeded);
        assert_eq!(registers.axis(Axis::P2).location_nm, 10);
        assert_eq!(registers.trace() & 0xFF, FunctionCode::MoveIntervals as u32);
    }

    #[test]
    fn failure_after_crossings_keeps_their_progress() {
        // 0 -> 900: three coarse crossings planned, the motor stalls after one
        let mut registers = Registers::new();
        registers.axis_mut(Axis::P0).max_ticks_per_interval = 3;
        let mut motor = ScriptedMotor::new(&[0, 1, 1, 1, 1]);

        let err = set_location(&mut registers, &mut motor, &BoundaryTable::DEFAULT, Axis::P0, 0, 900)
            .unwrap_err();
        assert_eq!(err, PicomotorError::MaxTicksExceeded);
        assert_eq!(registers.axis(Axis::P0).location_nm, 212);
    }

    #[test]
    fn decomposition_errors_stop_before_motion() {
        let table = BoundaryTable::new(&[50], &[150]).unwrap();
        let mut registers = Registers::new();
        let mut motor = ScriptedMotor::new(&[]);
        let err = set_location(&mut registers, &mut motor, &table, Axis::P0, 0, 10).unwrap_err();
        assert_eq!(err, PicomotorError::FineStepsTooSmall);
        assert!(motor.ticks.is_empty());
    }
}
