//! Scripted services for testing the engine without a real backend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::QuizError;
use crate::model::{
    AttemptResult, Delivery, ExclusionSet, Label, ProgressDelta, Question, QuestionId, QuizOption,
    Subject, SubjectId, Topic, TopicId,
};
use crate::traits::{AnswerService, ContentService, SubmitRequest};

/// Build a four-option question whose options are labelled A to D.
pub fn sample_question(id: &str, topic: &str) -> Question {
    Question {
        id: id.into(),
        topic_id: topic.into(),
        prompt: format!("Prompt for {id}"),
        options: ["A", "B", "C", "D"]
            .iter()
            .map(|label| QuizOption {
                label: Label::from(*label),
                text: format!("Option {label} of {id}"),
            })
            .collect(),
        topic_title: None,
        subject_name: None,
    }
}

/// An in-memory content service.
///
/// Delivers the first question (in insertion order) that is not excluded.
/// Failures and forced deliveries can be queued to exercise error paths.
#[derive(Default)]
pub struct MockContent {
    subjects: Vec<Subject>,
    topics: HashMap<SubjectId, Vec<Topic>>,
    questions: HashMap<TopicId, Vec<Question>>,
    delay: Option<Duration>,
    failures: Mutex<VecDeque<QuizError>>,
    forced: Mutex<VecDeque<Question>>,
    question_calls: AtomicU32,
    exclusions_seen: Mutex<Vec<ExclusionSet>>,
}

impl MockContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// One subject `s1` holding one topic `topic` with `count` questions `q1..qN`.
    pub fn single_topic(topic: &str, count: usize) -> Self {
        let questions = (1..=count)
            .map(|n| sample_question(&format!("q{n}"), topic))
            .collect();
        Self::new()
            .with_subject(
                Subject {
                    id: "s1".into(),
                    name: "Subject 1".into(),
                    topic_count: 1,
                },
                vec![Topic {
                    id: topic.into(),
                    title: format!("Topic {topic}"),
                    subject_id: "s1".into(),
                    question_count: count as u32,
                }],
            )
            .with_questions(topic, questions)
    }

    pub fn with_subject(mut self, subject: Subject, topics: Vec<Topic>) -> Self {
        self.topics.insert(subject.id.clone(), topics);
        self.subjects.push(subject);
        self
    }

    pub fn with_questions(mut self, topic: &str, questions: Vec<Question>) -> Self {
        self.questions.insert(topic.into(), questions);
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make the next call, whichever it is, fail with `error`.
    pub fn fail_next(&self, error: QuizError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Make the next `next_question` call deliver `question` regardless of exclusions.
    pub fn force_next(&self, question: Question) {
        self.forced.lock().unwrap().push_back(question);
    }

    /// Number of `next_question` calls made.
    pub fn question_calls(&self) -> u32 {
        self.question_calls.load(Ordering::Relaxed)
    }

    /// Exclusion sets received by `next_question`, in call order.
    pub fn exclusions_seen(&self) -> Vec<ExclusionSet> {
        self.exclusions_seen.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn take_failure(&self) -> Result<(), QuizError> {
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ContentService for MockContent {
    async fn list_subjects(&self) -> Result<Vec<Subject>, QuizError> {
        self.pause().await;
        self.take_failure()?;
        Ok(self.subjects.clone())
    }

    async fn list_topics(&self, subject: &SubjectId) -> Result<Vec<Topic>, QuizError> {
        self.pause().await;
        self.take_failure()?;
        self.topics
            .get(subject)
            .cloned()
            .ok_or_else(|| QuizError::NotFound(format!("subject {subject}")))
    }

    async fn next_question(
        &self,
        topic: &TopicId,
        excluded: &ExclusionSet,
    ) -> Result<Delivery, QuizError> {
        self.question_calls.fetch_add(1, Ordering::Relaxed);
        self.exclusions_seen.lock().unwrap().push(excluded.clone());
        self.pause().await;
        self.take_failure()?;

        if let Some(question) = self.forced.lock().unwrap().pop_front() {
            return Ok(Delivery::Delivered(question));
        }

        let questions = self
            .questions
            .get(topic)
            .ok_or_else(|| QuizError::NotFound(format!("topic {topic}")))?;

        Ok(questions
            .iter()
            .find(|q| !excluded.contains(&q.id))
            .cloned()
            .map(Delivery::Delivered)
            .unwrap_or(Delivery::Exhausted))
    }
}

/// An in-memory answer service grading against an answer key.
///
/// Questions missing from the key are graded against `default_answer`.
pub struct MockAnswers {
    key: HashMap<QuestionId, Label>,
    default_answer: Label,
    delay: Option<Duration>,
    failures: Mutex<VecDeque<QuizError>>,
    call_count: AtomicU32,
    last_request: Mutex<Option<SubmitRequest>>,
}

impl MockAnswers {
    /// Every question's correct answer is `label`.
    pub fn always(label: &str) -> Self {
        Self {
            key: HashMap::new(),
            default_answer: label.into(),
            delay: None,
            failures: Mutex::new(VecDeque::new()),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_key(mut self, question: &str, label: &str) -> Self {
        self.key.insert(question.into(), label.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make the next submission fail with `error`.
    pub fn fail_next(&self, error: QuizError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Number of submissions received.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<SubmitRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerService for MockAnswers {
    async fn submit_answer(&self, request: &SubmitRequest) -> Result<AttemptResult, QuizError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let correct = self
            .key
            .get(&request.question_id)
            .unwrap_or(&self.default_answer)
            .clone();
        Ok(AttemptResult {
            is_correct: correct == request.answer,
            progress: ProgressDelta(serde_json::json!({ "questionId": request.question_id })),
            correct_answer: correct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_first_unexcluded_question() {
        let content = MockContent::single_topic("t1", 2);
        let excluded: ExclusionSet = [QuestionId::new("q1")].into_iter().collect();

        let delivery = content.next_question(&"t1".into(), &excluded).await.unwrap();
        assert!(matches!(delivery, Delivery::Delivered(q) if q.id.as_str() == "q2"));
        assert_eq!(content.question_calls(), 1);
    }

    #[tokio::test]
    async fn unknown_topic_is_not_found() {
        let content = MockContent::single_topic("t1", 1);
        let err = content
            .next_question(&"nope".into(), &ExclusionSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::NotFound(_)));
    }

    #[tokio::test]
    async fn grades_against_key() {
        let answers = MockAnswers::always("A").with_key("q2", "C");
        let request = SubmitRequest {
            topic_id: "t1".into(),
            question_id: "q2".into(),
            answer: "A".into(),
        };
        let result = answers.submit_answer(&request).await.unwrap();
        assert!(!result.is_correct);
        assert_eq!(result.correct_answer, Label::new("C"));
        assert_eq!(answers.call_count(), 1);
        assert_eq!(answers.last_request(), Some(request));
    }
}
