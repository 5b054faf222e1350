// Score value type: one dart's segment, multiplier and points.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Segment value for the bullseye.
pub const BULL: u8 = 25;
/// Segment value for a dart that missed the scoring area.
pub const MISS: u8 = 0;

/// Reasons a dart description is rejected before it touches any game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("segment {0} is not on the board (expected 0-20 or 25)")]
    SegmentOutOfRange(u8),
    #[error("multiplier {0} is not valid (expected 1, 2 or 3)")]
    MultiplierOutOfRange(u8),
    #[error("the bull cannot be trebled")]
    BullTriple,
    #[error("a miss must have multiplier 1, got {0}")]
    MissWithMultiplier(u8),
    #[error("dart number {0} is outside a visit (expected 1-3)")]
    DartNumberOutOfRange(u8),
    #[error("points {given} do not match segment {segment} x {multiplier}")]
    PointsMismatch {
        segment: u8,
        multiplier: u8,
        given: u16,
    },
}

/// A single dart result. Construct through [`Score::new`] so the board
/// invariants always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ScoreRepr", into = "ScoreRepr")]
pub struct Score {
    segment: u8,
    multiplier: u8,
}

/// Wire form of a score. `points` is emitted for readers and checked on input
/// when present.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ScoreRepr {
    segment: u8,
    multiplier: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    points: Option<u16>,
}

impl Score {
    pub fn new(segment: u8, multiplier: u8) -> Result<Self, ScoreError> {
        if !(1..=3).contains(&multiplier) {
            return Err(ScoreError::MultiplierOutOfRange(multiplier));
        }
        match segment {
            MISS if multiplier != 1 => Err(ScoreError::MissWithMultiplier(multiplier)),
            BULL if multiplier == 3 => Err(ScoreError::BullTriple),
            0..=20 | BULL => Ok(Self {
                segment,
                multiplier,
            }),
            _ => Err(ScoreError::SegmentOutOfRange(segment)),
        }
    }

    pub const fn miss() -> Self {
        Self {
            segment: MISS,
            multiplier: 1,
        }
    }

    pub fn single(segment: u8) -> Result<Self, ScoreError> {
        Self::new(segment, 1)
    }

    pub fn double(segment: u8) -> Result<Self, ScoreError> {
        Self::new(segment, 2)
    }

    pub fn triple(segment: u8) -> Result<Self, ScoreError> {
        Self::new(segment, 3)
    }

    pub fn segment(&self) -> u8 {
        self.segment
    }

    pub fn multiplier(&self) -> u8 {
        self.multiplier
    }

    /// Points scored by this dart; zero for a miss.
    pub fn points(&self) -> u16 {
        self.segment as u16 * self.multiplier as u16
    }

    pub fn is_miss(&self) -> bool {
        self.segment == MISS
    }

    pub fn is_bull(&self) -> bool {
        self.segment == BULL
    }

    pub fn is_double(&self) -> bool {
        !self.is_miss() && self.multiplier == 2
    }

    pub fn is_triple(&self) -> bool {
        self.multiplier == 3
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.segment, self.multiplier) {
            (MISS, _) => write!(f, "Miss"),
            (BULL, 2) => write!(f, "Bull"),
            (BULL, _) => write!(f, "25"),
            (s, 1) => write!(f, "S{s}"),
            (s, 2) => write!(f, "D{s}"),
            (s, _) => write!(f, "T{s}"),
        }
    }
}

impl TryFrom<ScoreRepr> for Score {
    type Error = ScoreError;

    fn try_from(repr: ScoreRepr) -> Result<Self, Self::Error> {
        let score = Score::new(repr.segment, repr.multiplier)?;
        match repr.points {
            Some(given) if given != score.points() => Err(ScoreError::PointsMismatch {
                segment: repr.segment,
                multiplier: repr.multiplier,
                given,
            }),
            _ => Ok(score),
        }
    }
}

impl From<Score> for ScoreRepr {
    fn from(score: Score) -> Self {
        ScoreRepr {
            segment: score.segment,
            multiplier: score.multiplier,
            points: Some(score.points()),
        }
    }
}

/// Validate a dart position within a visit.
pub fn validate_dart_number(dart_number: u8) -> Result<u8, ScoreError> {
    if (1..=3).contains(&dart_number) {
        Ok(dart_number)
    } else {
        Err(ScoreError::DartNumberOutOfRange(dart_number))
    }
}
