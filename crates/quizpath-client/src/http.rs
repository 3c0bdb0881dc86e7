//! Quiz REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quizpath_core::model::{
    AttemptResult, Delivery, ExclusionSet, Label, ProgressDelta, Question, QuizOption, Subject,
    SubjectId, Topic, TopicId,
};
use quizpath_core::traits::{AnswerService, ContentService, SubmitRequest};
use quizpath_core::QuizError;

use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the quiz content and progress endpoints.
pub struct HttpQuizClient {
    base_url: Url,
    token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpQuizClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };
        let base_url = Url::parse(base).map_err(|e| ClientError::InvalidUrl(format!("{base}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::NetworkError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            token: token.filter(|t| !t.is_empty()),
            timeout_secs,
            client,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = self.authorize(builder).send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout(self.timeout_secs)
            } else {
                ClientError::NetworkError(e.to_string())
            }
        })?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        let response = self.send(self.client.get(url)).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn fetch_subjects(&self) -> Result<Vec<Subject>, ClientError> {
        let body: SubjectsEnvelope = self.get_json(self.url(&["quiz", "subjects"])).await?;
        Ok(body
            .subjects
            .into_iter()
            .map(|s| Subject {
                id: SubjectId::new(s.slug),
                name: s.subject_name,
                topic_count: s.topic_count,
            })
            .collect())
    }

    #[instrument(skip(self), fields(subject = %subject))]
    pub async fn fetch_topics(&self, subject: &SubjectId) -> Result<Vec<Topic>, ClientError> {
        let body: SubjectEnvelope = self
            .get_json(self.url(&["quiz", "subjects", subject.as_str()]))
            .await?;
        Ok(body
            .subject
            .topics
            .into_iter()
            .map(|t| Topic {
                id: TopicId::new(String::from(t.topic_id)),
                title: t.title,
                subject_id: subject.clone(),
                question_count: t.question_count,
            })
            .collect())
    }

    #[instrument(skip(self, excluded), fields(topic = %topic, excluded = excluded.len()))]
    pub async fn fetch_question(
        &self,
        topic: &TopicId,
        excluded: &ExclusionSet,
    ) -> Result<Delivery, ClientError> {
        let mut url = self.url(&["quiz", "topics", topic.as_str(), "question"]);
        if !excluded.is_empty() {
            let answered = excluded
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(",");
            url.query_pairs_mut().append_pair("answered", &answered);
        }

        let body: QuestionEnvelope = self.get_json(url).await?;
        if body.completed {
            tracing::info!(
                server_message = body.message.as_deref().unwrap_or_default(),
                "topic completed"
            );
            return Ok(Delivery::Exhausted);
        }
        let question = body
            .question
            .ok_or_else(|| ClientError::Decode("response has neither question nor completed".into()))?;
        Ok(Delivery::Delivered(question.into_question(topic)))
    }

    #[instrument(skip(self, request), fields(topic = %request.topic_id, question = %request.question_id))]
    pub async fn post_answer(&self, request: &SubmitRequest) -> Result<AttemptResult, ClientError> {
        let body = SubmitBody {
            topic_id: request.topic_id.as_str(),
            question_id: request.question_id.as_str(),
            user_answer: request.answer.as_str(),
        };
        let response = self
            .send(
                self.client
                    .post(self.url(&["progress", "submit-answer"]))
                    .json(&body),
            )
            .await?;
        let envelope: SubmitEnvelope = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        let attempt = match envelope {
            SubmitEnvelope::Wrapped { data } => data,
            SubmitEnvelope::Bare(attempt) => attempt,
        };
        Ok(AttemptResult {
            is_correct: attempt.is_correct,
            correct_answer: Label::new(attempt.correct_answer),
            progress: ProgressDelta(serde_json::Value::Object(attempt.rest)),
        })
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or(text);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ClientError::Rejected {
            status: status.as_u16(),
            message,
        },
        _ => ClientError::ApiError {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl ContentService for HttpQuizClient {
    async fn list_subjects(&self) -> Result<Vec<Subject>, QuizError> {
        Ok(self.fetch_subjects().await?)
    }

    async fn list_topics(&self, subject: &SubjectId) -> Result<Vec<Topic>, QuizError> {
        Ok(self.fetch_topics(subject).await?)
    }

    async fn next_question(
        &self,
        topic: &TopicId,
        excluded: &ExclusionSet,
    ) -> Result<Delivery, QuizError> {
        Ok(self.fetch_question(topic, excluded).await?)
    }
}

#[async_trait]
impl AnswerService for HttpQuizClient {
    async fn submit_answer(&self, request: &SubmitRequest) -> Result<AttemptResult, QuizError> {
        Ok(self.post_answer(request).await?)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Identifiers arrive as strings or numbers depending on the backend.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
struct SubjectsEnvelope {
    subjects: Vec<WireSubject>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSubject {
    slug: String,
    subject_name: String,
    #[serde(default)]
    topic_count: u32,
}

#[derive(Deserialize)]
struct SubjectEnvelope {
    subject: WireSubjectDetail,
}

#[derive(Deserialize)]
struct WireSubjectDetail {
    #[serde(default)]
    topics: Vec<WireTopic>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTopic {
    topic_id: WireId,
    title: String,
    #[serde(default)]
    question_count: u32,
}

#[derive(Deserialize)]
struct QuestionEnvelope {
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    question: Option<WireQuestion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQuestion {
    id: WireId,
    #[serde(default)]
    topic_id: Option<WireId>,
    #[serde(default)]
    topic_title: Option<String>,
    #[serde(default)]
    subject_name: Option<String>,
    question: String,
    options: Vec<WireOption>,
}

impl WireQuestion {
    fn into_question(self, requested: &TopicId) -> Question {
        Question {
            id: String::from(self.id).into(),
            topic_id: self
                .topic_id
                .map(|t| TopicId::new(String::from(t)))
                .unwrap_or_else(|| requested.clone()),
            prompt: self.question,
            options: self.options.into_iter().map(WireOption::into_option).collect(),
            topic_title: self.topic_title,
            subject_name: self.subject_name,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireOption {
    Pair(String, String),
    Labelled { label: String, text: String },
    /// "A) Paris": the first character is the label.
    Text(String),
}

impl WireOption {
    fn into_option(self) -> QuizOption {
        match self {
            WireOption::Pair(label, text) | WireOption::Labelled { label, text } => QuizOption {
                label: Label::new(label),
                text,
            },
            WireOption::Text(raw) => {
                let mut chars = raw.chars();
                let label = chars.next().map(String::from).unwrap_or_default();
                let text = chars
                    .as_str()
                    .trim_start_matches([')', '.', ':'])
                    .trim()
                    .to_string();
                QuizOption {
                    label: Label::new(label),
                    text: if text.is_empty() { raw } else { text },
                }
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    topic_id: &'a str,
    question_id: &'a str,
    user_answer: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubmitEnvelope {
    Wrapped { data: WireAttempt },
    Bare(WireAttempt),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAttempt {
    is_correct: bool,
    correct_answer: String,
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}
