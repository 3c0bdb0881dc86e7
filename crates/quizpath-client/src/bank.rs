//! Offline question bank loaded from a TOML file.
//!
//! ```toml
//! [[subjects]]
//! id = "geo"
//! name = "Geography"
//!
//! [[subjects.topics]]
//! id = "capitals"
//! title = "Capitals"
//!
//! [[subjects.topics.questions]]
//! id = "fr"
//! prompt = "Capital of France?"
//! answer = "B"
//! options = [["A", "Lyon"], ["B", "Paris"], ["C", "Nice"]]
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use quizpath_core::model::{
    AttemptResult, Delivery, ExclusionSet, Label, ProgressDelta, Question, QuizOption, Subject,
    SubjectId, Tally, Topic, TopicId,
};
use quizpath_core::traits::{AnswerService, ContentService, SubmitRequest};
use quizpath_core::QuizError;

#[derive(Debug, Deserialize)]
struct BankFile {
    #[serde(default)]
    subjects: Vec<BankSubject>,
}

#[derive(Debug, Deserialize)]
struct BankSubject {
    id: String,
    name: String,
    #[serde(default)]
    topics: Vec<BankTopic>,
}

#[derive(Debug, Deserialize)]
struct BankTopic {
    id: String,
    title: String,
    #[serde(default)]
    questions: Vec<BankQuestion>,
}

#[derive(Debug, Deserialize)]
struct BankQuestion {
    id: String,
    prompt: String,
    answer: String,
    options: Vec<(String, String)>,
}

struct TopicEntry {
    topic: Topic,
    questions: Vec<Question>,
    key: HashMap<String, Label>,
}

/// A [`ContentService`] and [`AnswerService`] backed by an in-memory bank.
///
/// Questions are delivered in file order. Grading uses the bank's answer
/// key, and a per-topic tally is reported as the progress delta.
pub struct LocalBank {
    subjects: Vec<Subject>,
    topics: Vec<TopicEntry>,
    tallies: Mutex<HashMap<TopicId, Tally>>,
}

impl LocalBank {
    /// Load and validate a bank file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read question bank: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid question bank: {}", path.display()))
    }

    /// Parse and validate bank TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: BankFile = toml::from_str(content).context("failed to parse TOML")?;

        let mut subject_ids = HashSet::new();
        let mut topic_ids = HashSet::new();
        let mut subjects = Vec::with_capacity(file.subjects.len());
        let mut topics = Vec::new();

        for subject in file.subjects {
            if !subject_ids.insert(subject.id.clone()) {
                anyhow::bail!("duplicate subject id '{}'", subject.id);
            }
            let subject_id = SubjectId::new(&subject.id);
            subjects.push(Subject {
                id: subject_id.clone(),
                name: subject.name.clone(),
                topic_count: subject.topics.len() as u32,
            });

            for topic in subject.topics {
                if !topic_ids.insert(topic.id.clone()) {
                    anyhow::bail!("duplicate topic id '{}'", topic.id);
                }
                topics.push(build_topic(&subject_id, &subject.name, topic)?);
            }
        }

        Ok(Self {
            subjects,
            topics,
            tallies: Mutex::new(HashMap::new()),
        })
    }

    fn topic(&self, id: &TopicId) -> Option<&TopicEntry> {
        self.topics.iter().find(|entry| &entry.topic.id == id)
    }
}

fn build_topic(subject_id: &SubjectId, subject_name: &str, raw: BankTopic) -> Result<TopicEntry> {
    let topic_id = TopicId::new(&raw.id);
    let mut key = HashMap::new();
    let mut questions = Vec::with_capacity(raw.questions.len());

    for q in raw.questions {
        if key.contains_key(&q.id) {
            anyhow::bail!("duplicate question id '{}' in topic '{}'", q.id, raw.id);
        }
        let mut labels = HashSet::new();
        if let Some((label, _)) = q.options.iter().find(|(label, _)| !labels.insert(label)) {
            anyhow::bail!("question '{}' has duplicate option label '{}'", q.id, label);
        }
        if !q.options.iter().any(|(label, _)| label == &q.answer) {
            anyhow::bail!(
                "question '{}' has answer '{}' which is not one of its options",
                q.id,
                q.answer
            );
        }
        key.insert(q.id.clone(), Label::new(q.answer));
        questions.push(Question {
            id: q.id.into(),
            topic_id: topic_id.clone(),
            prompt: q.prompt,
            options: q
                .options
                .into_iter()
                .map(|(label, text)| QuizOption {
                    label: label.into(),
                    text,
                })
                .collect(),
            topic_title: Some(raw.title.clone()),
            subject_name: Some(subject_name.to_string()),
        });
    }

    Ok(TopicEntry {
        topic: Topic {
            id: topic_id,
            title: raw.title,
            subject_id: subject_id.clone(),
            question_count: questions.len() as u32,
        },
        questions,
        key,
    })
}

#[async_trait]
impl ContentService for LocalBank {
    async fn list_subjects(&self) -> Result<Vec<Subject>, QuizError> {
        Ok(self.subjects.clone())
    }

    async fn list_topics(&self, subject: &SubjectId) -> Result<Vec<Topic>, QuizError> {
        if !self.subjects.iter().any(|s| &s.id == subject) {
            return Err(QuizError::NotFound(format!("subject {subject}")));
        }
        Ok(self
            .topics
            .iter()
            .filter(|entry| &entry.topic.subject_id == subject)
            .map(|entry| entry.topic.clone())
            .collect())
    }

    async fn next_question(
        &self,
        topic: &TopicId,
        excluded: &ExclusionSet,
    ) -> Result<Delivery, QuizError> {
        let entry = self
            .topic(topic)
            .ok_or_else(|| QuizError::NotFound(format!("topic {topic}")))?;
        Ok(entry
            .questions
            .iter()
            .find(|q| !excluded.contains(&q.id))
            .cloned()
            .map_or(Delivery::Exhausted, Delivery::Delivered))
    }
}

#[async_trait]
impl AnswerService for LocalBank {
    async fn submit_answer(&self, request: &SubmitRequest) -> Result<AttemptResult, QuizError> {
        let entry = self
            .topic(&request.topic_id)
            .ok_or_else(|| QuizError::NotFound(format!("topic {}", request.topic_id)))?;
        let correct_answer = entry
            .key
            .get(request.question_id.as_str())
            .cloned()
            .ok_or_else(|| QuizError::NotFound(format!("question {}", request.question_id)))?;
        let question = entry
            .questions
            .iter()
            .find(|q| q.id == request.question_id)
            .ok_or_else(|| QuizError::NotFound(format!("question {}", request.question_id)))?;
        if question.option(&request.answer).is_none() {
            return Err(QuizError::Validation(format!(
                "'{}' is not an option of question {}",
                request.answer, request.question_id
            )));
        }

        let is_correct = request.answer == correct_answer;
        let tally = {
            let mut tallies = self
                .tallies
                .lock()
                .map_err(|_| QuizError::ServiceUnavailable("bank state poisoned".into()))?;
            let tally = tallies.entry(request.topic_id.clone()).or_default();
            tally.record(is_correct);
            *tally
        };

        Ok(AttemptResult {
            is_correct,
            correct_answer,
            progress: ProgressDelta(serde_json::json!({
                "answered": tally.answered,
                "correct": tally.correct,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = r#"
[[subjects]]
id = "geo"
name = "Geography"

[[subjects.topics]]
id = "capitals"
title = "Capitals"

[[subjects.topics.questions]]
id = "fr"
prompt = "Capital of France?"
answer = "B"
options = [["A", "Lyon"], ["B", "Paris"], ["C", "Nice"]]

[[subjects.topics.questions]]
id = "de"
prompt = "Capital of Germany?"
answer = "A"
options = [["A", "Berlin"], ["B", "Bonn"]]

[[subjects.topics]]
id = "rivers"
title = "Rivers"

[[subjects]]
id = "math"
name = "Mathematics"
"#;

    fn bank() -> LocalBank {
        LocalBank::from_toml_str(BANK).unwrap()
    }

    fn submit(topic: &str, question: &str, answer: &str) -> SubmitRequest {
        SubmitRequest {
            topic_id: topic.into(),
            question_id: question.into(),
            answer: answer.into(),
        }
    }

    #[tokio::test]
    async fn lists_catalog_in_file_order() {
        let bank = bank();
        let subjects = bank.list_subjects().await.unwrap();
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].name, "Geography");
        assert_eq!(subjects[0].topic_count, 2);
        assert_eq!(subjects[1].topic_count, 0);

        let topics = bank.list_topics(&"geo".into()).await.unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[0].question_count, 2);
        assert_eq!(topics[1].question_count, 0);

        assert!(bank.list_topics(&"math".into()).await.unwrap().is_empty());
        assert!(matches!(
            bank.list_topics(&"history".into()).await,
            Err(QuizError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delivers_unseen_questions_then_exhausts() {
        let bank = bank();
        let topic = TopicId::new("capitals");
        let mut seen = ExclusionSet::new();

        let Delivery::Delivered(first) = bank.next_question(&topic, &seen).await.unwrap() else {
            panic!("expected a question");
        };
        assert_eq!(first.id.as_str(), "fr");
        assert_eq!(first.subject_name.as_deref(), Some("Geography"));
        seen.insert(first.id);

        let Delivery::Delivered(second) = bank.next_question(&topic, &seen).await.unwrap() else {
            panic!("expected a question");
        };
        assert_eq!(second.id.as_str(), "de");
        seen.insert(second.id);

        assert_eq!(
            bank.next_question(&topic, &seen).await.unwrap(),
            Delivery::Exhausted
        );
        assert_eq!(
            bank.next_question(&"rivers".into(), &ExclusionSet::new())
                .await
                .unwrap(),
            Delivery::Exhausted
        );
    }

    #[tokio::test]
    async fn grades_against_key_and_tallies_per_topic() {
        let bank = bank();

        let wrong = bank.submit_answer(&submit("capitals", "fr", "A")).await.unwrap();
        assert!(!wrong.is_correct);
        assert_eq!(wrong.correct_answer.as_str(), "B");

        let right = bank.submit_answer(&submit("capitals", "de", "A")).await.unwrap();
        assert!(right.is_correct);
        assert_eq!(
            right.progress.0,
            serde_json::json!({ "answered": 2, "correct": 1 })
        );
    }

    #[tokio::test]
    async fn rejects_unknown_question_and_foreign_label() {
        let bank = bank();
        assert!(matches!(
            bank.submit_answer(&submit("capitals", "xx", "A")).await,
            Err(QuizError::NotFound(_))
        ));
        assert!(matches!(
            bank.submit_answer(&submit("capitals", "de", "Z")).await,
            Err(QuizError::Validation(_))
        ));
    }

    #[test]
    fn rejects_answer_outside_options() {
        let err = LocalBank::from_toml_str(
            r#"
[[subjects]]
id = "s"
name = "S"
[[subjects.topics]]
id = "t"
title = "T"
[[subjects.topics.questions]]
id = "q"
prompt = "?"
answer = "D"
options = [["A", "x"], ["B", "y"]]
"#,
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("not one of its options"));
    }

    #[test]
    fn rejects_duplicate_option_labels() {
        let err = LocalBank::from_toml_str(
            r#"
[[subjects]]
id = "s"
name = "S"
[[subjects.topics]]
id = "t"
title = "T"
[[subjects.topics.questions]]
id = "q"
prompt = "?"
answer = "A"
options = [["A", "x"], ["B", "y"], ["A", "z"]]
"#,
        )
        .err()
        .unwrap();
        assert!(err
            .to_string()
            .contains("question 'q' has duplicate option label 'A'"));
    }

    #[test]
    fn rejects_duplicate_topic_ids() {
        let err = LocalBank::from_toml_str(
            r#"
[[subjects]]
id = "a"
name = "A"
[[subjects.topics]]
id = "t"
title = "T"
[[subjects]]
id = "b"
name = "B"
[[subjects.topics]]
id = "t"
title = "T again"
"#,
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("duplicate topic id 't'"));
    }

    #[test]
    fn load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.toml");
        std::fs::write(&path, "subjects = 3").unwrap();
        let err = LocalBank::load(&path).err().unwrap();
        assert!(format!("{err:#}").contains("bank.toml"));

        std::fs::write(&path, BANK).unwrap();
        assert!(LocalBank::load(&path).is_ok());
    }
}
