//! Catalog accessor: read-through access to subjects and topics.

use std::sync::Arc;

use tracing::instrument;

use crate::error::QuizError;
use crate::model::{Subject, SubjectId, Topic};
use crate::traits::ContentService;

/// Fetches subjects and topics. Holds no state of its own.
#[derive(Clone)]
pub struct CatalogAccessor {
    content: Arc<dyn ContentService>,
}

impl CatalogAccessor {
    pub fn new(content: Arc<dyn ContentService>) -> Self {
        Self { content }
    }

    /// List all subjects. Failures are returned to the caller as-is; no retry.
    #[instrument(skip(self))]
    pub async fn list_subjects(&self) -> Result<Vec<Subject>, QuizError> {
        self.content.list_subjects().await
    }

    /// List the topics of `subject`.
    #[instrument(skip(self), fields(subject = %subject))]
    pub async fn list_topics(&self, subject: &SubjectId) -> Result<Vec<Topic>, QuizError> {
        let topics = self.content.list_topics(subject).await?;
        tracing::debug!(count = topics.len(), "fetched topics");
        Ok(topics)
    }
}
