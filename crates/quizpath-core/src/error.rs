//! Quiz error taxonomy.
//!
//! Every collaborator failure is mapped onto one of these variants so the
//! session can decide how to react (stay put, or step back to a selection
//! screen) without string matching.

use thiserror::Error;

use crate::model::QuestionId;

/// Errors surfaced by the catalog, supplier, submitter and session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// A subject, topic or question identifier is unknown to the service.
    #[error("not found: {0}")]
    NotFound(String),

    /// The submission was malformed and never reached the service.
    #[error("invalid submission: {0}")]
    Validation(String),

    /// Transport or server failure.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The content service delivered a question that was in the exclusion set.
    #[error("content service returned already answered question {question_id}")]
    ContractViolation { question_id: QuestionId },

    /// The learner identity was rejected.
    #[error("not authorized: {0}")]
    Unauthorized(String),
}

impl QuizError {
    /// Returns `true` if the same trigger may simply be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            QuizError::ServiceUnavailable(_) | QuizError::ContractViolation { .. }
        )
    }

    /// Returns `true` if the user should be sent back to the previous selection step.
    pub fn returns_to_selection(&self) -> bool {
        matches!(self, QuizError::NotFound(_))
    }
}
