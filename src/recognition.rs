use std::time::Instant;

use crate::config::RecognitionConfig;
use crate::errors::{EngineError, ErrorContext, Result};
use crate::geometry::Point;
use crate::matcher::{Mismatch, match_stroke};
use crate::models::Glyph;
use crate::simplifier::{CapturedStroke, simplify_points};

// Import logging macros
use crate::{log_performance, log_recognition};

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeResult {
    pub accepted: bool,
    /// Index of the stroke the attempt was judged against.
    pub stroke_index: usize,
    pub confidence: f64,
    /// Failed attempts on this stroke so far.
    pub attempts: u32,
    /// Whether the reference stroke should now be shown to the user.
    pub reveal: bool,
    /// Reference stroke id on acceptance.
    pub stroke_id: Option<String>,
    /// Simplified key points of the user's input.
    pub user_shape: Vec<Point>,
    pub mismatch: Option<Mismatch>,
}

/// Stroke-by-stroke recognition of one glyph.
///
/// Strokes are judged strictly in order. A session is single-use: once
/// complete, further submissions fail with `SessionComplete`. Dropping a
/// session mid-glyph leaves no state behind.
#[derive(Debug, Clone)]
pub struct RecognitionSession {
    glyph: Glyph,
    config: RecognitionConfig,
    current: usize,
    failed_attempts: Vec<u32>,
    confidences: Vec<f64>,
}

impl RecognitionSession {
    pub fn new(glyph: Glyph, config: RecognitionConfig) -> Self {
        let stroke_count = glyph.stroke_count();
        Self {
            glyph,
            config,
            current: 0,
            failed_attempts: vec![0; stroke_count],
            confidences: Vec::with_capacity(stroke_count),
        }
    }

    pub fn glyph(&self) -> &Glyph {
        &self.glyph
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn stroke_count(&self) -> usize {
        self.glyph.stroke_count()
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.glyph.stroke_count()
    }

    /// Failed attempts recorded against stroke `index`.
    pub fn attempts(&self, index: usize) -> u32 {
        self.failed_attempts.get(index).copied().unwrap_or(0)
    }

    /// Failed attempts on the stroke currently awaited.
    pub fn current_attempts(&self) -> u32 {
        self.attempts(self.current)
    }

    /// Confidence of each accepted stroke, in order.
    pub fn confidences(&self) -> &[f64] {
        &self.confidences
    }

    /// Per completed stroke: passed when accepted without a failed attempt.
    pub fn stroke_outcomes(&self) -> Vec<bool> {
        self.failed_attempts[..self.current.min(self.failed_attempts.len())]
            .iter()
            .map(|failed| *failed == 0)
            .collect()
    }

    pub fn submit_stroke(&mut self, stroke: &CapturedStroke) -> Result<StrokeResult> {
        self.submit_points(&stroke.points())
    }

    /// Simplify `raw` and judge it against the stroke currently awaited.
    /// Acceptance advances to the next stroke; rejection keeps the index and
    /// counts a failed attempt.
    pub fn submit_points(&mut self, raw: &[Point]) -> Result<StrokeResult> {
        if self.is_complete() {
            return Err(EngineError::SessionComplete(self.glyph.stroke_count()).log_with_context(
                ErrorContext::new("submit_stroke", "recognition_session").with_id(self.glyph.base()),
            ));
        }

        let started = Instant::now();
        let index = self.current;
        let canonical = &self.glyph.strokes()[index];
        let user_shape = simplify_points(raw);
        let result = match_stroke(&user_shape, canonical, &self.glyph.frame(), &self.config.tolerance);

        log_performance!(
            "submit_stroke",
            duration_us = started.elapsed().as_micros() as u64,
            points = raw.len()
        );

        if result.matched {
            let stroke_id = canonical.id.clone();
            self.confidences.push(result.confidence);
            self.current += 1;
            log_recognition!(accepted, base = self.glyph.base(), stroke = index, confidence = result.confidence);
            if self.is_complete() {
                log_recognition!(complete, base = self.glyph.base(), strokes = self.glyph.stroke_count());
            }
            Ok(StrokeResult {
                accepted: true,
                stroke_index: index,
                confidence: result.confidence,
                attempts: self.failed_attempts[index],
                reveal: false,
                stroke_id: Some(stroke_id),
                user_shape,
                mismatch: None,
            })
        } else {
            self.failed_attempts[index] += 1;
            let attempts = self.failed_attempts[index];
            log_recognition!(
                rejected,
                base = self.glyph.base(),
                stroke = index,
                attempts = attempts,
                reason = result.mismatch
            );
            Ok(StrokeResult {
                accepted: false,
                stroke_index: index,
                confidence: result.confidence,
                attempts,
                reveal: attempts >= self.config.reveal_after,
                stroke_id: None,
                user_shape,
                mismatch: result.mismatch,
            })
        }
    }
}
