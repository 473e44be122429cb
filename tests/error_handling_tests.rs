use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use glyph_trainer::{
    ContentStore, EngineError, Glyph, GlyphLibrary, ItemKey, MemoryStore, Point, RecognitionConfig,
    RecognitionSession, RecordKind, ReviewPolicy, ReviewRecord, ScheduleCollection, ScheduleItem,
    SchedulePolicy, StrokeRecord, content_store,
};
use serde_json::{Value, json};

struct UnavailableStore;

#[async_trait]
impl ContentStore for UnavailableStore {
    async fn get_all(&self, kind: RecordKind) -> anyhow::Result<Vec<Value>> {
        Err(anyhow::anyhow!("backend offline while reading {}", kind))
    }

    async fn put(&self, kind: RecordKind, _records: Vec<Value>) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("backend offline while writing {}", kind))
    }
}

#[tokio::test]
async fn test_store_errors_reach_the_caller_unchanged() {
    let mut schedule = ScheduleCollection::default();
    match schedule.load_all(&UnavailableStore).await {
        Err(EngineError::Store(e)) => assert_eq!(e.to_string(), "backend offline while reading items"),
        other => panic!("unexpected result: {:?}", other),
    }

    let glyphs = content_store::load_glyphs(&UnavailableStore).await;
    assert!(matches!(glyphs, Err(EngineError::Store(_))));
}

#[tokio::test]
async fn test_invalid_stroke_records_are_rejected() {
    let store = MemoryStore::new();
    store
        .put(
            RecordKind::Strokes,
            vec![json!({ "id": "dot", "base": "丶", "order": 0, "points": [{"x": 5.0, "y": 5.0}] })],
        )
        .await
        .unwrap();

    assert!(matches!(
        content_store::load_glyphs(&store).await,
        Err(EngineError::Validation(_))
    ));
}

#[test]
fn test_glyph_library_orders_strokes() {
    let library = GlyphLibrary::from_records(vec![
        StrokeRecord {
            id: "b".to_string(),
            base: "八".to_string(),
            order: 1,
            points: vec![Point::new(60.0, 0.0), Point::new(90.0, 100.0)],
        },
        StrokeRecord {
            id: "a".to_string(),
            base: "八".to_string(),
            order: 0,
            points: vec![Point::new(40.0, 0.0), Point::new(10.0, 100.0)],
        },
    ])
    .unwrap();

    let glyph = library.get("八").unwrap();
    let ids: Vec<&str> = glyph.strokes().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(library.get("九").is_none());
}

#[test]
fn test_recognition_past_completion_fails_loudly() {
    let glyph = Glyph::new(
        "一",
        vec![("yi".to_string(), vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)])],
    )
    .unwrap();
    let mut session = RecognitionSession::new(glyph, RecognitionConfig::default());
    let stroke: Vec<Point> = (0..=10).map(|i| Point::new(i as f64 * 10.0, 0.0)).collect();

    assert!(session.submit_points(&stroke).unwrap().accepted);
    assert!(matches!(
        session.submit_points(&stroke),
        Err(EngineError::SessionComplete(1))
    ));
}

#[test]
fn test_incomplete_recognition_cannot_be_recorded() {
    let glyph = Glyph::new(
        "二",
        vec![
            ("er-1".to_string(), vec![Point::new(20.0, 30.0), Point::new(80.0, 30.0)]),
            ("er-2".to_string(), vec![Point::new(0.0, 80.0), Point::new(100.0, 80.0)]),
        ],
    )
    .unwrap();
    let session = RecognitionSession::new(glyph, RecognitionConfig::default());
    let mut review = ReviewRecord::begin("dan-zh-二-0-rune-simp".parse().unwrap(), Utc::now());

    let result = review.record_recognition(&session);
    assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    assert!(review.outcomes().is_empty());
}

#[test]
fn test_out_of_order_outcome_is_an_invariant_violation() {
    let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let key: ItemKey = "dan-zh-三-0-rune-simp".parse().unwrap();
    let mut item = ScheduleItem::new(key.clone(), vec!["v".to_string()]);
    item.record_outcome(true, at, &SchedulePolicy::default()).unwrap();

    let before = item.clone();
    let result = item.record_outcome(false, at - Duration::seconds(1), &SchedulePolicy::default());
    assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
    assert_eq!(item, before);

    let mut schedule = ScheduleCollection::new(SchedulePolicy::default());
    schedule.insert_items(vec![item]);
    let mut late = ReviewRecord::begin(key, at - Duration::seconds(10));
    late.record_unit(true);
    let late = late
        .complete(at - Duration::seconds(5), &ReviewPolicy::default())
        .unwrap();
    assert!(matches!(
        schedule.record_outcome(&late),
        Err(EngineError::InvariantViolation(_))
    ));
}

#[test]
fn test_malformed_item_ids_are_validation_errors() {
    for id in ["alice", "alice-fr-猫-0-rune", "alice-zh-猫-zero-rune", "alice-zh-猫-0-write-simp"] {
        assert!(
            matches!(id.parse::<ItemKey>(), Err(EngineError::Validation(_))),
            "{} should be rejected",
            id
        );
    }
}
