//! Application layer: task bodies for the mirror box
//!
//! Owns the register store, the picomotors and the event log, and runs the
//! positioning operations the scheduler dispatches.

use crate::config::LOG_CAPACITY;
use crate::diagnostics::{last_function, FaultCode};
use crate::logger::Logger;
use crate::os::TickDivider;
use crate::positioning::{
    calibrate, move_intervals, set_location, BoundaryTable, Picomotor, PicomotorError,
};
use crate::registers::Registers;
use crate::rtos::{TaskAction, TaskHandler, TaskReport};

pub struct Application<'a, M> {
    registers: Registers,
    motors: M,
    table: BoundaryTable<'static>,
    logger: Logger<LOG_CAPACITY>,
    clock: &'a TickDivider,
}

impl<'a, M: Picomotor> Application<'a, M> {
    pub fn new(registers: Registers, motors: M, clock: &'a TickDivider) -> Self {
        Self::with_table(registers, motors, BoundaryTable::DEFAULT, clock)
    }

    pub fn with_table(
        registers: Registers,
        motors: M,
        table: BoundaryTable<'static>,
        clock: &'a TickDivider,
    ) -> Self {
        Self {
            registers,
            motors,
            table,
            logger: Logger::new(),
            clock,
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn motors(&self) -> &M {
        &self.motors
    }

    pub fn logger(&mut self) -> &mut Logger<LOG_CAPACITY> {
        &mut self.logger
    }

    fn run(&mut self, action: TaskAction, payload: i32) -> Result<TaskReport, PicomotorError> {
        let now = self.clock.uptime();

        match action {
            TaskAction::Heartbeat => {
                self.logger.log_debug(now, action.code(), now as i32);
                Ok(TaskReport::repeat(now as i32))
            }
            TaskAction::SetLocation(axis) => {
                let current = self.registers.axis(axis).location_nm;
                set_location(
                    &mut self.registers,
                    &mut self.motors,
                    &self.table,
                    axis,
                    current,
                    payload,
                )?;
                self.logger.log_motion(now, action.code(), payload);
                Ok(TaskReport::done(payload))
            }
            TaskAction::Calibrate(axis) => {
                let intervals = payload.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
                let stats = calibrate(&mut self.registers, &mut self.motors, axis, intervals)?;
                let mean_pm = (stats.mean_tick_nm * 1000.0) as i32;
                let std_pm = (stats.std_tick_nm * 1000.0) as i32;
                self.logger.log_motion(now, action.code(), mean_pm);
                self.logger.log_motion(now, action.code(), std_pm);
                Ok(TaskReport::done(mean_pm))
            }
            TaskAction::MoveIntervals(axis) => {
                let moved = move_intervals(&mut self.registers, &mut self.motors, axis, payload)?;
                self.logger.log_motion(now, action.code(), moved.ticks);
                Ok(TaskReport::done(moved.ticks))
            }
            TaskAction::ReportLocation(axis) => {
                Ok(TaskReport::repeat(self.registers.axis(axis).location_nm))
            }
        }
    }
}

impl<M: Picomotor> TaskHandler for Application<'_, M> {
    type Error = PicomotorError;

    fn execute(&mut self, task_id: u8, action: TaskAction, payload: i32) -> Result<TaskReport, PicomotorError> {
        let result = self.run(action, payload);
        if let Err(err) = &result {
            let now = self.clock.uptime();
            self.registers.record_fault(err);
            self.logger.log_fault(now, err.code(), task_id as i32);

            let trace = self.registers.trace();
            if let Some(function) = last_function(trace) {
                self.logger.log_debug(now, function as u8, trace as i32);
            }
        }
        result
    }

    fn command_applied(&mut self, action_code: u8, task_id: u8, value: i32) {
        let now = self.clock.uptime();
        self.logger.log_system(now, action_code, value);
        self.logger.log_debug(now, task_id, value);
    }
}
