use serde::Serialize;

use crate::error::TransarcError;

/// Uniform result of every entry point (sync, restore, rollback, legacy import...).
///
/// Per-file problems show up as `error_count` and `details`; only
/// call-aborting failures turn `success` off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub success: bool,
    pub success_count: usize,
    pub error_count: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl OperationOutcome {
    #[must_use]
    pub fn ok(success_count: usize, message: impl Into<String>) -> Self {
        Self {
            success: true,
            success_count,
            message: message.into(),
            ..Default::default()
        }
    }

    /// A call-aborting failure.
    #[must_use]
    pub fn failure(err: &TransarcError) -> Self {
        Self {
            success: false,
            error_count: 1,
            message: err.to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_errors(mut self, error_count: usize, details: Vec<String>) -> Self {
        self.error_count = error_count;
        self.details = details;
        self
    }
}
