use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, warn};

use glyph_trainer::{
    ActiveFilters, CapturedStroke, Config, ContentBatch, MemoryStore, Part, Point, RecognitionSession,
    ReviewRecord, ScheduleCollection, StudySession, Style, content_store, log_system_event, logging,
};

/// Number of items the demo walks through before exiting.
const DEMO_ROUNDS: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    config.validate()?;

    let _guard = logging::init(&config.logging)?;
    log_system_event!(startup, component = "driver", "glyph trainer starting");

    let store = MemoryStore::new();
    let batch = load_content(&config.content.path).await?;
    content_store::put_batch(&store, batch).await?;

    let mut collection = ScheduleCollection::new(config.schedule);
    let glyphs = content_store::load_all(&store, &mut collection).await?;
    let schedule = Arc::new(Mutex::new(collection));

    let now = Utc::now();
    {
        let mut schedule = schedule.lock().await;
        let filters = ActiveFilters::all();
        info!(
            items = schedule.len(),
            glyphs = glyphs.len(),
            active = schedule.active_count(&filters),
            due = schedule.due_count(now, &filters),
            new = schedule.new_count(&filters),
            "Schedule ready"
        );
        schedule.log_schedule(now, 10);
    }

    let mut session = StudySession::new(ActiveFilters::new([Part::Writing], [Style::Simplified, Style::Traditional]));
    let mut clock = now;
    for round in 0..DEMO_ROUNDS {
        let mut schedule = schedule.lock().await;
        let Some(item) = schedule.get_next(clock, 0, &session).cloned() else {
            info!(round, "Nothing left to study");
            break;
        };
        session.mark_presented(&item);

        let Some(glyph) = glyphs.get(item.base()) else {
            warn!(item_id = %item.key(), "No reference strokes for item, skipping");
            continue;
        };

        let mut review = ReviewRecord::begin(item.key().clone(), clock);
        let mut recognition = RecognitionSession::new(glyph.clone(), config.recognition);
        for stroke in glyph.strokes() {
            clock += Duration::milliseconds(800);
            review.note_input(clock);
            let traced = trace_stroke(&stroke.points, clock);
            let result = recognition.submit_stroke(&traced)?;
            info!(
                item_id = %item.key(),
                stroke = result.stroke_index,
                accepted = result.accepted,
                confidence = result.confidence,
                "Stroke judged"
            );
            if !result.accepted {
                break;
            }
        }

        if recognition.is_complete() {
            review.record_recognition(&recognition)?;
        } else {
            review.record_unit(false);
        }

        let completed = review.complete(clock, &config.review)?;
        let recorded = match schedule.record_outcome(&completed) {
            Ok(updated) => {
                info!(
                    item_id = %updated.key(),
                    success = completed.succeeded(),
                    interval_secs = updated.interval(),
                    "Review finished"
                );
                true
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(item_id = %item.key(), error = %e, "Review outcome not recorded");
                false
            }
        };
        // Release the schedule before awaiting the store.
        drop(schedule);

        if recorded {
            content_store::save_review(&store, &completed).await?;
        }
    }

    content_store::save_schedule(&store, &*schedule.lock().await).await?;
    log_system_event!(shutdown, component = "driver", "glyph trainer stopped");
    Ok(())
}

/// Read the content snapshot at `path`, falling back to a small built-in set.
async fn load_content(path: &str) -> Result<ContentBatch> {
    match fs::read_to_string(path).await {
        Ok(raw) => serde_json::from_str(&raw).with_context(|| format!("Invalid content file {}", path)),
        Err(e) => {
            warn!(path, error = %e, "Content file unavailable, using built-in sample");
            sample_content()
        }
    }
}

fn sample_content() -> Result<ContentBatch> {
    let batch = serde_json::from_value(serde_json::json!({
        "items": [
            { "id": "demo-zh-十-0-rune-simp", "vocabIds": ["v-shi"] },
            { "id": "demo-zh-二-0-rune-simp", "vocabIds": ["v-er"] },
            { "id": "demo-zh-人-0-rune-simp", "vocabIds": ["v-ren"] },
            { "id": "demo-zh-人-0-tone-simp", "vocabIds": ["v-ren"] }
        ],
        "strokes": [
            { "id": "shi-1", "base": "十", "order": 0, "points": [{"x": 0.0, "y": 50.0}, {"x": 100.0, "y": 50.0}] },
            { "id": "shi-2", "base": "十", "order": 1, "points": [{"x": 50.0, "y": 0.0}, {"x": 50.0, "y": 100.0}] },
            { "id": "er-1", "base": "二", "order": 0, "points": [{"x": 20.0, "y": 30.0}, {"x": 80.0, "y": 30.0}] },
            { "id": "er-2", "base": "二", "order": 1, "points": [{"x": 0.0, "y": 80.0}, {"x": 100.0, "y": 80.0}] },
            { "id": "ren-1", "base": "人", "order": 0, "points": [{"x": 50.0, "y": 0.0}, {"x": 10.0, "y": 100.0}] },
            { "id": "ren-2", "base": "人", "order": 1, "points": [{"x": 50.0, "y": 30.0}, {"x": 90.0, "y": 100.0}] }
        ]
    }))?;
    Ok(batch)
}

/// Replay a reference stroke as densely sampled pen input.
fn trace_stroke(reference: &[Point], start: chrono::DateTime<Utc>) -> CapturedStroke {
    let mut stroke = CapturedStroke::new();
    let mut at = start;
    for pair in reference.windows(2) {
        for step in 0..10 {
            stroke.push(pair[0].lerp(&pair[1], step as f64 / 10.0), at);
            at += Duration::milliseconds(16);
        }
    }
    if let Some(last) = reference.last() {
        stroke.push(*last, at);
    }
    stroke
}
