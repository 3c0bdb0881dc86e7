//! Question supplier: next unseen question of a topic.

use std::sync::Arc;

use tracing::instrument;

use crate::error::QuizError;
use crate::model::{Delivery, ExclusionSet, TopicId};
use crate::traits::ContentService;

/// Requests the next question and checks the service honoured the exclusion set.
///
/// Selection among the remaining questions is left to the content service;
/// the supplier does no shuffling or ordering of its own.
#[derive(Clone)]
pub struct QuestionSupplier {
    content: Arc<dyn ContentService>,
}

impl QuestionSupplier {
    pub fn new(content: Arc<dyn ContentService>) -> Self {
        Self { content }
    }

    #[instrument(skip(self, excluded), fields(topic = %topic, excluded = excluded.len()))]
    pub async fn next_question(
        &self,
        topic: &TopicId,
        excluded: &ExclusionSet,
    ) -> Result<Delivery, QuizError> {
        let delivery = self.content.next_question(topic, excluded).await?;
        if let Delivery::Delivered(question) = &delivery {
            if excluded.contains(&question.id) {
                tracing::warn!(question = %question.id, "content service repeated an excluded question");
                return Err(QuizError::ContractViolation {
                    question_id: question.id.clone(),
                });
            }
            tracing::debug!(question = %question.id, "question delivered");
        } else {
            tracing::debug!("topic exhausted");
        }
        Ok(delivery)
    }
}
