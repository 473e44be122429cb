use serde::{Deserialize, Serialize};

use crate::geometry::{
    BoundingBox, EPSILON, Point, angle, angle_difference, distance, path_length,
};
use crate::models::CanonicalStroke;

/// How far a user stroke may stray from the reference and still count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceProfile {
    /// Maximum key-point offset, as a fraction of the glyph frame's larger side.
    pub distance: f64,
    /// Maximum difference in overall stroke direction, in degrees.
    pub angle_degrees: f64,
}

impl Default for ToleranceProfile {
    fn default() -> Self {
        Self {
            distance: 0.25,
            angle_degrees: 45.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    /// Nothing was drawn.
    Degenerate,
    CornerCount { user: usize, canonical: usize },
    Direction { degrees: f64 },
    Position { key_point: usize, offset: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    pub confidence: f64,
    pub mismatch: Option<Mismatch>,
}

impl MatchResult {
    fn rejected(mismatch: Mismatch) -> Self {
        Self {
            matched: false,
            confidence: 0.0,
            mismatch: Some(mismatch),
        }
    }
}

/// Compare simplified user key points against a reference stroke.
///
/// Both are expressed in the glyph's coordinate space and scaled by `frame`
/// before comparison. The size and offset of the glyph as a whole cancel out,
/// but where a stroke sits inside the glyph still counts: the two bars of 二
/// differ only by position. Endpoints are pinned to each other; interior
/// reference corners are paired with the nearest user point at or after the
/// previous pairing, so the user path is never read backwards.
pub fn match_stroke(
    user: &[Point],
    canonical: &CanonicalStroke,
    frame: &BoundingBox,
    tolerance: &ToleranceProfile,
) -> MatchResult {
    let extent = frame.extent();
    if user.len() < 2 || path_length(user) < EPSILON || extent < EPSILON {
        return MatchResult::rejected(Mismatch::Degenerate);
    }

    let user_corners = user.len() - 2;
    if user_corners.abs_diff(canonical.corner_count()) > 1 {
        return MatchResult::rejected(Mismatch::CornerCount {
            user: user_corners,
            canonical: canonical.corner_count(),
        });
    }

    let user = normalize(user, frame);
    let reference = normalize(&canonical.points, frame);

    let user_direction = angle(&user[0], &user[user.len() - 1]);
    // Uniform scaling keeps angles, so the raw endpoints give the same direction.
    let reference_direction = angle(&canonical.start(), &canonical.end());
    let turn = angle_difference(user_direction, reference_direction);
    if turn > tolerance.angle_degrees {
        return MatchResult::rejected(Mismatch::Direction { degrees: turn });
    }

    let last_user = user.len() - 1;
    let last_reference = reference.len() - 1;
    let mut cursor = 0;
    let mut total_offset = 0.0;

    for (k, target) in reference.iter().enumerate() {
        let (index, offset) = if k == 0 {
            (0, distance(&user[0], target))
        } else if k == last_reference {
            (last_user, distance(&user[last_user], target))
        } else {
            nearest_from(&user, cursor, target)
        };

        if offset > tolerance.distance {
            return MatchResult::rejected(Mismatch::Position { key_point: k, offset });
        }
        cursor = index;
        total_offset += offset;
    }

    let normalized_error = total_offset / (reference.len() as f64 * tolerance.distance);
    MatchResult {
        matched: true,
        confidence: (1.0 - normalized_error).clamp(0.0, 1.0),
        mismatch: None,
    }
}

fn normalize(points: &[Point], frame: &BoundingBox) -> Vec<Point> {
    let extent = frame.extent();
    points
        .iter()
        .map(|p| Point::new((p.x - frame.x) / extent, (p.y - frame.y) / extent))
        .collect()
}

fn nearest_from(points: &[Point], start: usize, target: &Point) -> (usize, f64) {
    points
        .iter()
        .enumerate()
        .skip(start)
        .map(|(i, p)| (i, distance(p, target)))
        .fold((start, f64::INFINITY), |best, candidate| {
            if candidate.1 < best.1 { candidate } else { best }
        })
}
