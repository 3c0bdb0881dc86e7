//! Answer submitter: packages a choice, grades it, signals progress.

use std::sync::Arc;

use tracing::instrument;

use crate::error::QuizError;
use crate::model::{AttemptResult, Label, QuestionId, TopicId};
use crate::traits::{AnswerService, NoopObserver, ProgressObserver, SubmitRequest};

/// Sends one answer to the answer service.
///
/// Never retries: a submission records an attempt on the server side.
#[derive(Clone)]
pub struct AnswerSubmitter {
    answers: Arc<dyn AnswerService>,
    observer: Arc<dyn ProgressObserver>,
}

impl AnswerSubmitter {
    pub fn new(answers: Arc<dyn AnswerService>) -> Self {
        Self {
            answers,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[instrument(skip(self), fields(topic = %topic, question = %question, answer = %chosen))]
    pub async fn submit(
        &self,
        topic: &TopicId,
        question: &QuestionId,
        chosen: &Label,
    ) -> Result<AttemptResult, QuizError> {
        if chosen.is_empty() {
            return Err(QuizError::Validation("no answer chosen".into()));
        }

        let request = SubmitRequest {
            topic_id: topic.clone(),
            question_id: question.clone(),
            answer: chosen.clone(),
        };
        let result = self.answers.submit_answer(&request).await?;
        tracing::debug!(correct = result.is_correct, "answer graded");

        self.observer.progress_changed(topic, &result.progress);
        Ok(result)
    }
}
