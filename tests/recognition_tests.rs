use chrono::{Duration, Utc};
use glyph_trainer::{
    CapturedStroke, Glyph, Mismatch, Point, RecognitionConfig, RecognitionSession, ToleranceProfile,
    geometry::bounding_box, match_stroke, models::CanonicalStroke, simplify, simplify_points,
};

fn glyph_ding() -> Glyph {
    // 丁: horizontal bar, then a vertical with a hook to the left
    Glyph::new(
        "丁",
        vec![
            ("ding-1".to_string(), vec![Point::new(0.0, 10.0), Point::new(100.0, 10.0)]),
            (
                "ding-2".to_string(),
                vec![Point::new(50.0, 10.0), Point::new(50.0, 100.0), Point::new(30.0, 85.0)],
            ),
        ],
    )
    .unwrap()
}

/// Evenly sampled pen input along a polyline.
fn pen(path: &[(f64, f64)], per_segment: usize) -> Vec<Point> {
    let mut points = Vec::new();
    for pair in path.windows(2) {
        let from = Point::new(pair[0].0, pair[0].1);
        let to = Point::new(pair[1].0, pair[1].1);
        for step in 0..per_segment {
            points.push(from.lerp(&to, step as f64 / per_segment as f64));
        }
    }
    if let Some(&(x, y)) = path.last() {
        points.push(Point::new(x, y));
    }
    points
}

#[test]
fn test_two_stroke_glyph_end_to_end() {
    let mut session = RecognitionSession::new(glyph_ding(), RecognitionConfig::default());

    let first = session.submit_points(&pen(&[(1.0, 12.0), (98.0, 9.0)], 30)).unwrap();
    assert!(first.accepted);
    assert!(!session.is_complete());
    assert_eq!(session.current_index(), 1);

    // A plain horizontal line where the hooked vertical belongs
    let wrong = session.submit_points(&pen(&[(0.0, 60.0), (100.0, 60.0)], 30)).unwrap();
    assert!(!wrong.accepted);
    assert_eq!(wrong.stroke_index, 1);
    assert_eq!(session.current_index(), 1);

    let right = session
        .submit_points(&pen(&[(51.0, 11.0), (49.0, 98.0), (31.0, 86.0)], 30))
        .unwrap();
    assert!(right.accepted);
    assert_eq!(right.stroke_id.as_deref(), Some("ding-2"));
    assert!(session.is_complete());
    assert_eq!(session.stroke_outcomes(), vec![true, false]);

    println!("✅ 丁 recognized with confidences {:?}", session.confidences());
}

#[test]
fn test_captured_stroke_submission() {
    let start = Utc::now();
    let mut stroke = CapturedStroke::new();
    for (i, point) in pen(&[(0.0, 10.0), (100.0, 10.0)], 20).into_iter().enumerate() {
        stroke.push(point, start + Duration::milliseconds(i as i64 * 16));
    }
    assert_eq!(stroke.duration(), Duration::milliseconds(20 * 16));
    assert_eq!(simplify(&stroke).len(), 2);

    let mut session = RecognitionSession::new(glyph_ding(), RecognitionConfig::default());
    assert!(session.submit_stroke(&stroke).unwrap().accepted);
}

#[test]
fn test_straight_path_has_no_spurious_corners() {
    let simplified = simplify_points(&[Point::new(3.0, 4.0), Point::new(250.0, 90.0)]);
    assert_eq!(simplified, vec![Point::new(3.0, 4.0), Point::new(250.0, 90.0)]);

    let jittered: Vec<Point> = pen(&[(0.0, 0.0), (200.0, 0.0)], 100)
        .into_iter()
        .enumerate()
        .map(|(i, p)| Point::new(p.x, if i % 2 == 0 { 0.3 } else { -0.3 }))
        .collect();
    assert_eq!(simplify_points(&jittered).len(), 2);
}

#[test]
fn test_l_shape_yields_one_corner_at_any_density() {
    for per_segment in [2, 5, 16, 40, 200] {
        let simplified = simplify_points(&pen(&[(0.0, 0.0), (0.0, 100.0), (100.0, 100.0)], per_segment));
        assert_eq!(simplified.len(), 3, "density {}", per_segment);

        let corner = simplified[1];
        assert!(corner.x.abs() < 10.0 && (corner.y - 100.0).abs() < 10.0, "corner {:?}", corner);
    }
}

#[test]
fn test_rotated_stroke_is_rejected_despite_matching_corners() {
    let reference = vec![Point::new(0.0, 0.0), Point::new(0.0, 100.0), Point::new(100.0, 100.0)];
    let canonical = CanonicalStroke {
        id: "l-1".to_string(),
        position: 0,
        points: reference.clone(),
    };
    let frame = bounding_box(&reference, 0.0).unwrap();

    // Same shape rotated 180 degrees about the frame center
    let rotated: Vec<Point> = reference.iter().map(|p| Point::new(100.0 - p.x, 100.0 - p.y)).collect();
    let user = simplify_points(&pen(
        &rotated.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>(),
        30,
    ));
    assert_eq!(user.len(), 3);

    let result = match_stroke(&user, &canonical, &frame, &ToleranceProfile::default());
    assert!(!result.matched);
    assert!(matches!(result.mismatch, Some(Mismatch::Direction { .. })));
}

#[test]
fn test_loose_tolerance_accepts_sloppier_strokes() {
    let sloppy = pen(&[(20.0, 35.0), (85.0, 0.0)], 30);

    let strict = RecognitionConfig::default();
    let mut session = RecognitionSession::new(glyph_ding(), strict);
    assert!(!session.submit_points(&sloppy).unwrap().accepted);

    let loose = RecognitionConfig {
        tolerance: ToleranceProfile {
            distance: 0.5,
            angle_degrees: 60.0,
        },
        ..RecognitionConfig::default()
    };
    let mut session = RecognitionSession::new(glyph_ding(), loose);
    assert!(session.submit_points(&sloppy).unwrap().accepted);
}
