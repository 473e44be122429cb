use tracing::{error, info, warn};

/// Errors surfaced by the scheduling and recognition core.
///
/// Rejected strokes and an empty study queue are ordinary outcomes and never
/// show up here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Recognition session already complete after {0} strokes")]
    SessionComplete(usize),

    #[error("Content store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Error context for structured logging
#[derive(Debug)]
pub struct ErrorContext {
    pub operation: String,
    pub resource_id: Option<String>,
    pub resource_type: String,
}

impl ErrorContext {
    pub fn new(operation: &str, resource_type: &str) -> Self {
        Self {
            operation: operation.to_string(),
            resource_id: None,
            resource_type: resource_type.to_string(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }
}

impl EngineError {
    /// Emit one structured event for this error and hand it back for propagation.
    pub fn log_with_context(self, context: ErrorContext) -> Self {
        match &self {
            EngineError::NotFound(_) => {
                info!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Resource not found"
                );
            }
            EngineError::Validation(_) => {
                warn!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Validation error"
                );
            }
            EngineError::InvariantViolation(_) | EngineError::SessionComplete(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Invariant violation"
                );
            }
            EngineError::Store(_) | EngineError::Serialization(_) => {
                error!(
                    operation = %context.operation,
                    resource_type = %context.resource_type,
                    resource_id = ?context.resource_id,
                    error = %self,
                    "Content store error"
                );
            }
        }
        self
    }

    /// Whether the error signals a programming fault rather than bad input or I/O.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::InvariantViolation(_) | EngineError::SessionComplete(_)
        )
    }
}
