//! Collaborator traits consumed by the quiz engine.
//!
//! These async traits are implemented by `quizpath-client` (HTTP and local
//! question bank) and by the scripted services in [`crate::mock`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::QuizError;
use crate::model::{
    AttemptResult, Delivery, ExclusionSet, Label, ProgressDelta, QuestionId, Subject, SubjectId,
    Topic, TopicId,
};

// ---------------------------------------------------------------------------
// Content service
// ---------------------------------------------------------------------------

/// Read side: catalog and question delivery.
#[async_trait]
pub trait ContentService: Send + Sync {
    /// All subjects, in catalog order.
    async fn list_subjects(&self) -> Result<Vec<Subject>, QuizError>;

    /// Topics of one subject, in catalog order.
    async fn list_topics(&self, subject: &SubjectId) -> Result<Vec<Topic>, QuizError>;

    /// A question of `topic` whose id is not in `excluded`, or `Exhausted`.
    ///
    /// Which of the remaining questions is returned is the service's choice.
    async fn next_question(
        &self,
        topic: &TopicId,
        excluded: &ExclusionSet,
    ) -> Result<Delivery, QuizError>;
}

// ---------------------------------------------------------------------------
// Answer service
// ---------------------------------------------------------------------------

/// Write side: records an attempt and grades it.
///
/// Submissions have externally visible side effects and are never retried
/// by the engine.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn submit_answer(&self, request: &SubmitRequest) -> Result<AttemptResult, QuizError>;
}

/// A packaged answer submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub topic_id: TopicId,
    pub question_id: QuestionId,
    pub answer: Label,
}

// ---------------------------------------------------------------------------
// Progress observer
// ---------------------------------------------------------------------------

/// Notified whenever a submission changed the learner's progress, so that
/// externally owned summaries can be refreshed.
pub trait ProgressObserver: Send + Sync {
    fn progress_changed(&self, topic: &TopicId, delta: &ProgressDelta);
}

/// No-op progress observer.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn progress_changed(&self, _: &TopicId, _: &ProgressDelta) {}
}
