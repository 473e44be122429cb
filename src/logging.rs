// Macros file - tracing macros are imported within the macro definitions

//! Standardized logging macros for consistent field names across recognition,
//! scheduling and content-store code, plus subscriber setup for the binary.

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

// ============================================================================
// Recognition Logging Macros
// ============================================================================

/// Log stroke recognition outcomes
#[macro_export]
macro_rules! log_recognition {
    (accepted, base = $base:expr, stroke = $stroke:expr, confidence = $confidence:expr) => {
        tracing::debug!(
            component = "recognition",
            base = %$base,
            stroke_index = $stroke,
            confidence = $confidence,
            "Stroke accepted"
        );
    };
    (rejected, base = $base:expr, stroke = $stroke:expr, attempts = $attempts:expr, reason = $reason:expr) => {
        tracing::debug!(
            component = "recognition",
            base = %$base,
            stroke_index = $stroke,
            attempts = $attempts,
            reason = ?$reason,
            "Stroke rejected"
        );
    };
    (complete, base = $base:expr, strokes = $strokes:expr) => {
        tracing::info!(
            component = "recognition",
            base = %$base,
            stroke_count = $strokes,
            "Glyph complete"
        );
    };
}

// ============================================================================
// Scheduling Logging Macros
// ============================================================================

/// Log scheduler decisions and state transitions
#[macro_export]
macro_rules! log_schedule {
    (selected, item = $item:expr, readiness = $readiness:expr, skipped = $skipped:expr) => {
        tracing::debug!(
            component = "schedule",
            item_id = %$item,
            readiness = $readiness,
            skipped = $skipped,
            "Next item selected"
        );
    };
    (exhausted, candidates = $candidates:expr) => {
        tracing::info!(
            component = "schedule",
            candidates = $candidates,
            "No eligible item available"
        );
    };
    (transition, item = $item:expr, success = $success:expr, interval = $interval:expr) => {
        tracing::info!(
            component = "schedule",
            item_id = %$item,
            success = $success,
            interval_secs = $interval,
            "Review outcome recorded"
        );
    };
    (deactivated, item = $item:expr, $msg:expr) => {
        tracing::debug!(
            component = "schedule",
            item_id = %$item,
            "Item deactivated: {}", $msg
        );
    };
    (loaded, count = $count:expr) => {
        tracing::info!(
            component = "schedule",
            item_count = $count,
            "Schedule loaded"
        );
    };
    (readiness, item = $item:expr, readiness = $readiness:expr) => {
        tracing::debug!(
            component = "schedule",
            item_id = %$item,
            readiness = $readiness,
            "Schedule entry"
        );
    };
}

// ============================================================================
// Content Store Logging Macros
// ============================================================================

/// Log content store operations and results
#[macro_export]
macro_rules! log_store_operation {
    (debug, $operation:expr, kind = $kind:expr, count = $count:expr) => {
        tracing::debug!(
            component = "content_store",
            operation = $operation,
            kind = %$kind,
            record_count = $count,
            "Content store operation completed"
        );
    };
    (error, $operation:expr, kind = $kind:expr, error = $error:expr) => {
        tracing::error!(
            component = "content_store",
            operation = $operation,
            kind = %$kind,
            error = %$error,
            "Content store operation failed"
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Performance Logging Macros
// ============================================================================

/// Log performance metrics with consistent structure
#[macro_export]
macro_rules! log_performance {
    ($operation:expr, duration_us = $duration:expr, points = $points:expr) => {
        tracing::trace!(
            event_type = "performance",
            operation = $operation,
            duration_us = $duration,
            point_count = $points,
            "Performance metrics"
        );
    };
    ($operation:expr, duration_us = $duration:expr) => {
        tracing::trace!(
            event_type = "performance",
            operation = $operation,
            duration_us = $duration,
            "Performance metrics"
        );
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

/// Install console and rolling-file subscribers according to `config`.
///
/// The returned guard must be held for the life of the process so buffered
/// file output is flushed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_new(&config.level)
        .unwrap_or_else(|_| EnvFilter::new("info,glyph_trainer=debug"));

    let console_layer = config.console_enabled.then(|| {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(true)
    });

    let (file_layer, guard) = if config.file_enabled {
        std::fs::create_dir_all(&config.log_directory)?;
        let file_appender = tracing_appender::rolling::daily(&config.log_directory, "glyph-trainer.log");
        let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
        let layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(non_blocking_file);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
