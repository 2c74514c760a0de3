//! Configuration constants for the mirror box firmware

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 8_000_000;

/// UART baud rate, both ports
pub const UART_BAUD: u32 = 9600;

/// Timer0 prescaler used by the scheduler tick source
pub const TIMER0_PRESCALER: u32 = 8;

/// Scheduler quantum in milliseconds
pub const TICK_QUANTUM_MS: u32 = 100;

/// Timer0 overflows per scheduler quantum (8-bit counter)
pub const TICK_QUANTUM_OVERFLOWS: u16 =
    (CPU_FREQ_HZ / TIMER0_PRESCALER / 256 * TICK_QUANTUM_MS / 1000) as u16;

/// Number of task control blocks in the scheduler table
pub const MAX_TASKS: usize = 10;

/// Independently driven picomotors
pub const AXIS_COUNT: usize = 3;

/// Distance between two encoder boundaries after power-up, in nm
pub const DEFAULT_INTERVAL_SIZE_NM: u32 = 212;

/// Tick bound for a single interval crossing
pub const DEFAULT_MAX_TICKS: u32 = 100;

/// Mechanical settle time after every actuation tick
pub const TICK_SETTLE_MS: u16 = 2;

/// Width of the step pulse sent to a picomotor driver
pub const STEP_PULSE_MS: u16 = 1;

/// Lower bounds of the remainder bands approached from the left, in nm
pub const POS_APPROACH_NM: [u16; 5] = [0, 29, 57, 85, 113];

/// Lower bounds of the remainder bands approached from the right, in nm
pub const NEG_APPROACH_NM: [u16; 2] = [139, 170];

/// Entries kept by the in-RAM event log
pub const LOG_CAPACITY: usize = 32;

/// Task id of the heartbeat registered at boot
pub const HEARTBEAT_TASK_ID: u8 = 1;

/// Heartbeat period in scheduler quanta
pub const HEARTBEAT_PERIOD: u16 = 10;
