//! Quadrature state decoding

/// Raw encoder code. Channel levels follow the Gray cycle
/// `00 -> 01 -> 11 -> 10`, the discriminant is the position in that cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EncoderState {
    S00 = 0,
    S01 = 1,
    S11 = 2,
    S10 = 3,
}

impl EncoderState {
    pub fn from_levels(a: bool, b: bool) -> Self {
        match (a, b) {
            (false, false) => EncoderState::S00,
            (false, true) => EncoderState::S01,
            (true, true) => EncoderState::S11,
            (true, false) => EncoderState::S10,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(EncoderState::S00),
            1 => Some(EncoderState::S01),
            2 => Some(EncoderState::S11),
            3 => Some(EncoderState::S10),
            _ => None,
        }
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Movement between two consecutive encoder readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Down,
    Same,
    Up,
}

impl Step {
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Step::Down => -1,
            Step::Same => 0,
            Step::Up => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    CurrentOutOfBounds,
    PreviousOutOfBounds,
    /// Readings are opposite corners of the cycle: an edge was missed.
    InvalidTransition,
    /// No classification matched. Fatal to the caller.
    Critical,
}

/// Classify the transition from `previous` to `current`.
pub fn decode(current: u8, previous: u8) -> Result<Step, DecodeError> {
    if EncoderState::from_code(current).is_none() {
        return Err(DecodeError::CurrentOutOfBounds);
    }
    if EncoderState::from_code(previous).is_none() {
        return Err(DecodeError::PreviousOutOfBounds);
    }

    match current as i8 - previous as i8 {
        2 | -2 => Err(DecodeError::InvalidTransition),
        0 => Ok(Step::Same),
        1 | -3 => Ok(Step::Up),
        -1 | 3 => Ok(Step::Down),
        _ => Err(DecodeError::Critical),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_cycle_steps_up() {
        assert_eq!(decode(1, 0), Ok(Step::Up));
        assert_eq!(decode(2, 1), Ok(Step::Up));
        assert_eq!(decode(3, 2), Ok(Step::Up));
        assert_eq!(decode(0, 3), Ok(Step::Up));
    }

    #[test]
    fn decode_is_antisymmetric() {
        for a in 0..4u8 {
            for b in 0..4u8 {
                match (decode(a, b), decode(b, a)) {
                    (Ok(x), Ok(y)) => assert_eq!(x.sign(), -y.sign(), "{a} vs {b}"),
                    (Err(e), Err(f)) => {
                        assert_eq!(e, DecodeError::InvalidTransition);
                        assert_eq!(f, DecodeError::InvalidTransition);
                    }
                    other => panic!("asymmetric result for {a}/{b}: {other:?}"),
                }
            }
        }
        for a in 0..4u8 {
            assert_eq!(decode(a, a), Ok(Step::Same));
        }
    }

    #[test]
    fn diagonal_jump_is_never_a_direction() {
        for (a, b) in [(0, 2), (2, 0), (1, 3), (3, 1)] {
            assert_eq!(decode(a, b), Err(DecodeError::InvalidTransition));
        }
    }

    #[test]
    fn out_of_range_codes() {
        assert_eq!(decode(4, 0), Err(DecodeError::CurrentOutOfBounds));
        assert_eq!(decode(0, 0xFF), Err(DecodeError::PreviousOutOfBounds));
        assert_eq!(decode(9, 9), Err(DecodeError::CurrentOutOfBounds));
    }

    #[test]
    fn gray_levels_map_onto_cycle() {
        let cycle = [(false, false), (false, true), (true, true), (true, false)];
        for (i, (a, b)) in cycle.iter().enumerate() {
            let next = cycle[(i + 1) % 4];
            let cur = EncoderState::from_levels(next.0, next.1).code();
            let prev = EncoderState::from_levels(*a, *b).code();
            assert_eq!(decode(cur, prev), Ok(Step::Up));
        }
    }
}
