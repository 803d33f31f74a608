//! Error types for the planner.

use thiserror::Error;

/// Errors that can occur in planner operations.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed record '{record}': {reason}")]
    MalformedRecord { record: String, reason: String },

    #[error("Class '{0}' already exists")]
    DuplicateClass(String),

    #[error("Invalid class name '{0}'")]
    InvalidClassName(String),

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlannerError {
    pub(crate) fn malformed(record: &str, reason: impl Into<String>) -> Self {
        PlannerError::MalformedRecord {
            record: record.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the not-found family (missing class or missing event).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PlannerError::ClassNotFound(_) | PlannerError::EventNotFound(_)
        )
    }

    /// Message suitable for showing to an end user.
    ///
    /// Validation and not-found errors are shown as-is. Storage failures
    /// collapse into a generic persistence message; the underlying cause is
    /// still available through `Display` for logs.
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::Io(_) | PlannerError::MalformedRecord { .. } => {
                "Could not save or load your planner data".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for planner operations.
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_io_details() {
        let err = PlannerError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "/home/me/planner/planner.txt: permission denied",
        ));
        assert_eq!(err.user_message(), "Could not save or load your planner data");
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_user_message_passes_validation_through() {
        let err = PlannerError::DuplicateClass("Math101".into());
        assert_eq!(err.user_message(), "Class 'Math101' already exists");
        assert!(!err.is_not_found());
        assert!(PlannerError::EventNotFound("Midterm".into()).is_not_found());
    }
}
