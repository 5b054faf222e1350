// Dartboard geometry: target <-> board coordinates, in millimetres.
//
// Origin at the centre of the bull, x to the right, y up. Angles are
// measured counter-clockwise from the positive x axis, so the 20 sits at 90°.

use serde::{Deserialize, Serialize};

use super::score::{Score, BULL, MISS};

pub const DOUBLE_BULL_RADIUS: f64 = 6.35;
pub const OUTER_BULL_RADIUS: f64 = 15.9;
pub const TRIPLE_INNER_RADIUS: f64 = 99.0;
pub const TRIPLE_OUTER_RADIUS: f64 = 107.0;
pub const DOUBLE_INNER_RADIUS: f64 = 162.0;
pub const DOUBLE_OUTER_RADIUS: f64 = 170.0;

pub const WEDGE_DEGREES: f64 = 18.0;

/// Board numbers clockwise from the top.
pub const SEGMENT_ORDER: [u8; 20] = [
    20, 1, 18, 4, 13, 6, 10, 15, 2, 17, 3, 19, 7, 16, 8, 11, 14, 9, 12, 5,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn radius(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Position of a number in the clockwise board order.
pub fn segment_index(segment: u8) -> Option<usize> {
    SEGMENT_ORDER.iter().position(|&s| s == segment)
}

/// The two numbers either side of `segment` on the board.
pub fn neighbours(segment: u8) -> Option<(u8, u8)> {
    let i = segment_index(segment)?;
    let left = SEGMENT_ORDER[(i + SEGMENT_ORDER.len() - 1) % SEGMENT_ORDER.len()];
    let right = SEGMENT_ORDER[(i + 1) % SEGMENT_ORDER.len()];
    Some((left, right))
}

/// Radius of the middle of the ring a multiplier scores in. Singles aim at
/// the wide inner single area between the bull and the treble ring.
fn ring_midpoint(multiplier: u8) -> f64 {
    match multiplier {
        3 => (TRIPLE_INNER_RADIUS + TRIPLE_OUTER_RADIUS) / 2.0,
        2 => (DOUBLE_INNER_RADIUS + DOUBLE_OUTER_RADIUS) / 2.0,
        _ => (OUTER_BULL_RADIUS + TRIPLE_INNER_RADIUS) / 2.0,
    }
}

/// Aim point for a target. Double bull is the origin; the single bull aims at
/// the middle of the outer bull ring straight above it.
pub fn target_to_point(target: Score) -> Point {
    if target.is_miss() {
        // Off the board, above the 20.
        return Point::new(0.0, DOUBLE_OUTER_RADIUS + 30.0);
    }
    if target.is_bull() {
        return match target.multiplier() {
            2 => Point::new(0.0, 0.0),
            _ => Point::new(0.0, (DOUBLE_BULL_RADIUS + OUTER_BULL_RADIUS) / 2.0),
        };
    }

    let index = segment_index(target.segment()).unwrap_or(0);
    let angle = (90.0 - index as f64 * WEDGE_DEGREES).to_radians();
    let radius = ring_midpoint(target.multiplier());
    Point::new(radius * angle.cos(), radius * angle.sin())
}

/// Score for a landing point. Rings are checked from the centre outwards.
pub fn point_to_score(point: Point) -> Score {
    let radius = point.radius();

    if radius > DOUBLE_OUTER_RADIUS {
        return Score::miss();
    }
    if radius <= DOUBLE_BULL_RADIUS {
        return bull(2);
    }
    if radius <= OUTER_BULL_RADIUS {
        return bull(1);
    }

    let multiplier = if (TRIPLE_INNER_RADIUS..=TRIPLE_OUTER_RADIUS).contains(&radius) {
        3
    } else if radius >= DOUBLE_INNER_RADIUS {
        2
    } else {
        1
    };

    let degrees = point.y.atan2(point.x).to_degrees().rem_euclid(360.0);
    // Clockwise distance from the top, shifted half a wedge so each wedge
    // centre maps to the middle of its bucket.
    let from_top = (90.0 - degrees).rem_euclid(360.0);
    let index = ((from_top + WEDGE_DEGREES / 2.0) / WEDGE_DEGREES).floor() as usize % 20;

    Score::new(SEGMENT_ORDER[index], multiplier).unwrap_or_else(|_| Score::miss())
}

fn bull(multiplier: u8) -> Score {
    Score::new(BULL, multiplier).unwrap_or_else(|_| Score::miss())
}

/// Every scoring target on the board (segment 1-20 in all rings, both bulls).
pub fn all_targets() -> Vec<Score> {
    let mut targets = Vec::with_capacity(62);
    for segment in 1..=20 {
        for multiplier in 1..=3 {
            if let Ok(score) = Score::new(segment, multiplier) {
                targets.push(score);
            }
        }
    }
    targets.extend([bull(1), bull(2)]);
    debug_assert!(targets.iter().all(|t| t.segment() != MISS));
    targets
}
