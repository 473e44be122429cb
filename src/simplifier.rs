//! Corner detection for freehand strokes.
//!
//! A captured path is resampled at uniform arc-length spacing, then every
//! sample is scored by how straight the path runs through a small window
//! around it. Samples where the window chord is much shorter than the
//! window path are corner candidates; neighbouring candidates collapse into
//! the single sharpest one. Endpoints are always kept.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::{EPSILON, Point, angle, angle_difference, distance, path_length};

/// Number of samples the resampled path is spread across.
pub const SAMPLE_BUDGET: usize = 48;

/// Samples on each side of the point being scored.
pub const WINDOW: usize = 3;

/// Chord/path ratio below which the path is considered to bend.
pub const STRAIGHTNESS_THRESHOLD: f64 = 0.9;

/// One pointer sample with the time it arrived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub point: Point,
    pub at: DateTime<Utc>,
}

/// Raw pointer path of one press-to-release gesture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedStroke {
    samples: Vec<Sample>,
}

impl CapturedStroke {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: &[Point], at: DateTime<Utc>) -> Self {
        Self {
            samples: points.iter().map(|&point| Sample { point, at }).collect(),
        }
    }

    pub fn push(&mut self, point: Point, at: DateTime<Utc>) {
        self.samples.push(Sample { point, at });
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn points(&self) -> Vec<Point> {
        self.samples.iter().map(|s| s.point).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time between the first and last sample.
    pub fn duration(&self) -> Duration {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.at - first.at,
            _ => Duration::zero(),
        }
    }
}

pub fn simplify(stroke: &CapturedStroke) -> Vec<Point> {
    simplify_points(&stroke.points())
}

/// Reduce a raw path to its endpoints and corners, in path order.
///
/// Fewer than three raw points yield the two endpoints. A path whose points
/// all coincide yields its first point twice.
pub fn simplify_points(raw: &[Point]) -> Vec<Point> {
    let (first, last) = match (raw.first(), raw.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Vec::new(),
    };

    let total = path_length(raw);
    if total < EPSILON {
        return vec![first, first];
    }
    if raw.len() < 3 {
        return vec![first, last];
    }

    let spacing = total / (SAMPLE_BUDGET - 1) as f64;
    let samples = resample(raw, spacing);

    let mut key_points = vec![first];
    key_points.extend(find_corners(&samples, spacing).into_iter().map(|i| samples[i]));
    key_points.push(last);
    key_points
}

fn resample(raw: &[Point], spacing: f64) -> Vec<Point> {
    let mut resampled = vec![raw[0]];
    let mut carried = 0.0;
    let mut previous = raw[0];
    let mut i = 1;

    while i < raw.len() {
        let current = raw[i];
        let step = distance(&previous, &current);
        if step > EPSILON && carried + step >= spacing {
            let sample = previous.lerp(&current, (spacing - carried) / step);
            resampled.push(sample);
            previous = sample;
            carried = 0.0;
        } else {
            carried += step;
            previous = current;
            i += 1;
        }
    }

    if let Some(end) = raw.last() {
        let tail = resampled.last().map(|p| distance(p, end)).unwrap_or(0.0);
        if tail > spacing / 2.0 {
            resampled.push(*end);
        } else if let Some(slot) = resampled.last_mut() {
            *slot = *end;
        }
    }
    resampled
}

fn find_corners(samples: &[Point], spacing: f64) -> Vec<usize> {
    if samples.len() < 2 * WINDOW + 1 {
        return Vec::new();
    }

    let candidates: Vec<usize> = (WINDOW..samples.len() - WINDOW)
        .filter(|&i| straightness(samples, i) < STRAIGHTNESS_THRESHOLD)
        .collect();

    let min_separation = spacing * WINDOW as f64;
    let mut corners: Vec<usize> = Vec::new();
    let mut group_tail: Option<usize> = None;

    for i in candidates {
        let joins_group = group_tail
            .map(|tail| distance(&samples[tail], &samples[i]) < min_separation)
            .unwrap_or(false);

        if joins_group {
            if let Some(best) = corners.last_mut() {
                if turning_angle(samples, i) > turning_angle(samples, *best) {
                    *best = i;
                }
            }
        } else {
            corners.push(i);
        }
        group_tail = Some(i);
    }
    corners
}

fn straightness(samples: &[Point], i: usize) -> f64 {
    let window = &samples[i - WINDOW..=i + WINDOW];
    let travelled = path_length(window);
    if travelled < EPSILON {
        return 1.0;
    }
    distance(&window[0], &window[window.len() - 1]) / travelled
}

fn turning_angle(samples: &[Point], i: usize) -> f64 {
    let incoming = angle(&samples[i - WINDOW], &samples[i]);
    let outgoing = angle(&samples[i], &samples[i + WINDOW]);
    angle_difference(incoming, outgoing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(from: Point, to: Point, steps: usize) -> Vec<Point> {
        (0..=steps)
            .map(|i| from.lerp(&to, i as f64 / steps as f64))
            .collect()
    }

    #[test]
    fn test_two_point_path_has_no_corners() {
        let points = vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        let simplified = simplify_points(&points);
        assert_eq!(simplified, points);
    }

    #[test]
    fn test_densely_sampled_straight_line() {
        let points = line(Point::new(0.0, 0.0), Point::new(80.0, 60.0), 200);
        let simplified = simplify_points(&points);
        assert_eq!(simplified.len(), 2);
        assert_eq!(simplified[0], Point::new(0.0, 0.0));
        assert_eq!(simplified[1], Point::new(80.0, 60.0));
    }

    #[test]
    fn test_l_shape_yields_single_corner() {
        for steps in [1, 7, 25, 120] {
            let mut points = line(Point::new(0.0, 0.0), Point::new(100.0, 0.0), steps);
            points.extend(line(Point::new(100.0, 0.0), Point::new(100.0, 100.0), steps).into_iter().skip(1));

            let simplified = simplify_points(&points);
            assert_eq!(simplified.len(), 3, "density {} produced {:?}", steps, simplified);
            assert!(distance(&simplified[1], &Point::new(100.0, 0.0)) < 10.0);
        }
    }

    #[test]
    fn test_z_shape_yields_two_corners() {
        let mut points = line(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 30);
        points.extend(line(Point::new(100.0, 0.0), Point::new(0.0, 100.0), 30).into_iter().skip(1));
        points.extend(line(Point::new(0.0, 100.0), Point::new(100.0, 100.0), 30).into_iter().skip(1));

        let simplified = simplify_points(&points);
        assert_eq!(simplified.len(), 4, "{:?}", simplified);
    }

    #[test]
    fn test_degenerate_path_repeats_single_point() {
        let p = Point::new(5.0, 5.0);
        let simplified = simplify_points(&[p, p, p, p]);
        assert_eq!(simplified, vec![p, p]);

        assert_eq!(simplify_points(&[p]), vec![p, p]);
        assert!(simplify_points(&[]).is_empty());
    }

    #[test]
    fn test_captured_stroke_duration() {
        let start = Utc::now();
        let mut stroke = CapturedStroke::new();
        assert_eq!(stroke.duration(), Duration::zero());

        stroke.push(Point::new(0.0, 0.0), start);
        stroke.push(Point::new(1.0, 0.0), start + Duration::milliseconds(40));
        stroke.push(Point::new(2.0, 0.0), start + Duration::milliseconds(90));

        assert_eq!(stroke.len(), 3);
        assert_eq!(stroke.duration(), Duration::milliseconds(90));
        assert_eq!(simplify(&stroke).len(), 2);
    }
}
