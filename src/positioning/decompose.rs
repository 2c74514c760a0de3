//! Coarse/fine decomposition of a target location

use super::PicomotorError;
use crate::config::{NEG_APPROACH_NM, POS_APPROACH_NM};
use crate::registers::AxisCalibration;

/// Calibrated remainder bands.
///
/// Each entry is the lower bound of a remainder band inside an interval. The
/// tables differ because the quadrature response is asymmetric between
/// forward and backward approach.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryTable<'a> {
    pos: &'a [u16],
    neg: &'a [u16],
}

impl BoundaryTable<'static> {
    pub const DEFAULT: BoundaryTable<'static> = BoundaryTable {
        pos: &POS_APPROACH_NM,
        neg: &NEG_APPROACH_NM,
    };
}

impl<'a> BoundaryTable<'a> {
    /// Both tables must be non-empty and strictly increasing.
    pub fn new(pos: &'a [u16], neg: &'a [u16]) -> Result<Self, PicomotorError> {
        if !strictly_increasing(pos) || !strictly_increasing(neg) {
            return Err(PicomotorError::InvalidBoundaryTable);
        }
        Ok(Self { pos, neg })
    }
}

fn strictly_increasing(table: &[u16]) -> bool {
    !table.is_empty() && table.windows(2).all(|w| w[0] < w[1])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decomposition {
    /// Whole intervals to cross before the fine stage.
    pub coarse_intervals: i32,
    /// Positive: approach from the left, negative: from the right. Never zero.
    pub fine_ticks: i32,
}

/// Split the move from `current_nm` to `desired_nm` into interval crossings
/// and a fine tick count.
///
/// A coarse count of zero is returned as is: the fine stage always crosses
/// one boundary itself, which is enough to fix the approach direction.
pub fn decompose(
    axis: &AxisCalibration,
    table: &BoundaryTable<'_>,
    current_nm: i32,
    desired_nm: i32,
) -> Result<Decomposition, PicomotorError> {
    if axis.interval_size_nm == 0 || axis.interval_size_nm > i32::MAX as u32 {
        return Err(PicomotorError::InvalidIntervalSize);
    }
    let size = axis.interval_size_nm as i64;

    let desired_interval = (desired_nm as i64).div_euclid(size);
    let remainder = (desired_nm as i64).rem_euclid(size);
    let current_interval = (current_nm as i64).div_euclid(size);

    let (coarse, fine_ticks) = if remainder < table.neg[0] as i64 {
        // Approach the target interval from the left
        let size_p = table.pos.len() as i32;
        let fine = table
            .pos
            .iter()
            .rposition(|&bound| remainder >= bound as i64)
            .map(|index| index as i32 + 1)
            .ok_or(PicomotorError::FineStepsTooSmall)?;
        if fine <= 0 {
            return Err(PicomotorError::FineStepsTooSmall);
        }
        if fine > size_p {
            return Err(PicomotorError::FineStepsTooLarge);
        }
        (desired_interval - current_interval - 1, fine)
    } else {
        // Approach from the right
        let size_n = table.neg.len() as i32;
        let fine = table
            .neg
            .iter()
            .rposition(|&bound| remainder >= bound as i64)
            .map(|index| index as i32 - size_n)
            .ok_or(PicomotorError::FineStepsTooLarge)?;
        if fine < -size_n {
            return Err(PicomotorError::FineStepsTooSmall);
        }
        if fine >= 0 {
            return Err(PicomotorError::FineStepsTooLarge);
        }
        (desired_interval - current_interval + 1, fine)
    };

    let coarse_intervals =
        i32::try_from(coarse).map_err(|_| PicomotorError::CoarseOutOfRange)?;

    Ok(Decomposition {
        coarse_intervals,
        fine_ticks,
    })
}
