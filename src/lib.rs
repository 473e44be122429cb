pub mod config;
pub mod content_store;
pub mod errors;
pub mod geometry;
pub mod logging;
pub mod matcher;
pub mod models;
pub mod recognition;
pub mod review;
pub mod schedule;
pub mod schedule_item;
pub mod simplifier;
pub mod study_session;

pub use config::{Config, RecognitionConfig, ReviewPolicy, SchedulePolicy};
pub use content_store::{ContentBatch, ContentStore, MemoryStore, RecordKind};
pub use errors::*;
pub use geometry::{BoundingBox, Point};
pub use matcher::{MatchResult, Mismatch, ToleranceProfile, match_stroke};
pub use models::*;
pub use recognition::{RecognitionSession, StrokeResult};
pub use review::{CompletedReview, ReviewRecord};
pub use schedule::ScheduleCollection;
pub use schedule_item::{ScheduleItem, Transition};
pub use simplifier::{CapturedStroke, simplify, simplify_points};
pub use study_session::{ActiveFilters, StudySession};
