//! Register store: calibration, location estimates and status shared by
//! every positioning call.
//!
//! Passed by `&mut` into each operation; nothing keeps a reference to it
//! across calls.

use crate::config::{AXIS_COUNT, DEFAULT_INTERVAL_SIZE_NM, DEFAULT_MAX_TICKS};
use crate::diagnostics::{push_trace, FaultCode, FunctionCode};
use crate::positioning::{Axis, Direction};

/// Per-axis calibration and position estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCalibration {
    /// Distance between two encoder boundaries
    pub interval_size_nm: u32,
    /// Safety bound on ticks spent crossing one interval
    pub max_ticks_per_interval: u32,
    pub mean_tick_nm: f32,
    pub std_tick_nm: f32,
    /// Location estimate, 0 is an interval boundary. Set on arrival at a
    /// commanded location and moved on every confirmed boundary crossing.
    pub location_nm: i32,
}

impl AxisCalibration {
    pub const fn new(interval_size_nm: u32, max_ticks_per_interval: u32) -> Self {
        Self {
            interval_size_nm,
            max_ticks_per_interval,
            mean_tick_nm: 0.0,
            std_tick_nm: 0.0,
            location_nm: 0,
        }
    }

    /// Carry the location estimate across the boundary next to it.
    ///
    /// Upward the estimate lands on the crossed boundary, downward one
    /// nanometre below it, so the estimate always sits in the interval the
    /// encoder reports.
    pub fn cross_boundary(&mut self, direction: Direction) {
        let size = self.interval_size_nm as i64;
        if size == 0 {
            return;
        }
        let interval = (self.location_nm as i64).div_euclid(size);
        let estimate = match direction {
            Direction::Up => (interval + 1) * size,
            Direction::Down => interval * size - 1,
        };
        self.location_nm = estimate.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    }
}

impl Default for AxisCalibration {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_SIZE_NM, DEFAULT_MAX_TICKS)
    }
}

pub struct Registers {
    axes: [AxisCalibration; AXIS_COUNT],
    trace: u32,
    last_fault: u8,
    fault_count: u16,
}

impl Registers {
    pub const fn new() -> Self {
        Self {
            axes: [AxisCalibration::new(DEFAULT_INTERVAL_SIZE_NM, DEFAULT_MAX_TICKS); AXIS_COUNT],
            trace: 0,
            last_fault: 0,
            fault_count: 0,
        }
    }

    #[inline]
    pub fn axis(&self, axis: Axis) -> &AxisCalibration {
        &self.axes[axis.index()]
    }

    #[inline]
    pub fn axis_mut(&mut self, axis: Axis) -> &mut AxisCalibration {
        &mut self.axes[axis.index()]
    }

    /// Record entry into a positioning operation.
    #[inline]
    pub fn enter(&mut self, function: FunctionCode) {
        self.trace = push_trace(self.trace, function);
    }

    pub fn trace(&self) -> u32 {
        self.trace
    }

    pub fn record_fault<F: FaultCode>(&mut self, fault: &F) {
        self.last_fault = fault.code();
        self.fault_count = self.fault_count.saturating_add(1);
    }

    /// Code of the most recent fault, 0 if none.
    pub fn last_fault(&self) -> u8 {
        self.last_fault
    }

    pub fn fault_count(&self) -> u16 {
        self.fault_count
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
