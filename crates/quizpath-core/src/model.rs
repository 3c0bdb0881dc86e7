//! Core data model types for quizpath.
//!
//! Reference data (subjects, topics) and delivered questions are immutable
//! once fetched. The only mutable aggregate is the session, which lives in
//! [`crate::session`].

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Subject identifier (the catalog slug).
    SubjectId
);
string_id!(
    /// Topic identifier.
    TopicId
);
string_id!(
    /// Question identifier.
    QuestionId
);
string_id!(
    /// Option label, e.g. "A".
    Label
);

impl Label {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// A subject in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub topic_count: u32,
}

/// A topic under a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub title: String,
    pub subject_id: SubjectId,
    pub question_count: u32,
}

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub label: Label,
    pub text: String,
}

/// A question as delivered by the content service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub topic_id: TopicId,
    pub prompt: String,
    /// Options in display order.
    pub options: Vec<QuizOption>,
    #[serde(default)]
    pub topic_title: Option<String>,
    #[serde(default)]
    pub subject_name: Option<String>,
}

impl Question {
    /// Look up an option by its label.
    pub fn option(&self, label: &Label) -> Option<&QuizOption> {
        self.options.iter().find(|o| &o.label == label)
    }
}

/// Opaque progress/mastery payload returned by the answer service.
///
/// The engine never interprets it; it is carried for display only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressDelta(pub serde_json::Value);

/// Outcome of submitting an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub is_correct: bool,
    pub correct_answer: Label,
    #[serde(default)]
    pub progress: ProgressDelta,
}

/// Result of asking for the next question of a topic.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// An unseen question.
    Delivered(Question),
    /// Every question of the topic has been excluded.
    Exhausted,
}

/// Question identifiers already presented in the current topic session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet(BTreeSet<QuestionId>);

impl ExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an identifier. Returns `false` if it was already present.
    pub fn insert(&mut self, id: QuestionId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: &QuestionId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionId> {
        self.0.iter()
    }
}

impl FromIterator<QuestionId> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = QuestionId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One answered question in the current topic session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub question_id: QuestionId,
    pub chosen: Label,
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
}

/// Running score for the current topic session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub answered: u32,
    pub correct: u32,
}

impl Tally {
    pub fn record(&mut self, is_correct: bool) {
        self.answered += 1;
        if is_correct {
            self.correct += 1;
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} correct", self.correct, self.answered)
    }
}
