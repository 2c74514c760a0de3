//! Fault codes and the function trace reported to the ground segment

/// One-byte code reported in feedback frames and the register store.
pub trait FaultCode {
    fn code(&self) -> u8;
}

/// Identifies the positioning operation currently executing.
///
/// The register store keeps the last four of these in its trace word, most
/// recent in the low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    EstimationInit = 201,
    Decompose = 203,
    MoveIntervals = 204,
    Calibrate = 206,
    SetLocation = 207,
}

/// Shift a function code into a trace word.
#[inline]
pub fn push_trace(trace: u32, function: FunctionCode) -> u32 {
    (trace << 8) | function as u32
}

/// Most recent function recorded in a trace word, if any.
pub fn last_function(trace: u32) -> Option<FunctionCode> {
    match (trace & 0xFF) as u8 {
        201 => Some(FunctionCode::EstimationInit),
        203 => Some(FunctionCode::Decompose),
        204 => Some(FunctionCode::MoveIntervals),
        206 => Some(FunctionCode::Calibrate),
        207 => Some(FunctionCode::SetLocation),
        _ => None,
    }
}
