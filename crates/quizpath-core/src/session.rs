//! The quiz session state machine.
//!
//! [`Session::apply`] turns a user trigger into at most one outstanding
//! [`Request`]; [`Session::settle`] folds the matching [`Response`] back in.
//! The session never performs I/O itself, which keeps every transition
//! synchronous and testable. [`crate::engine::QuizEngine`] wires it to the
//! collaborators.
//!
//! Every request carries a [`Ticket`]. Navigation bumps the session
//! generation, so a response that arrives for an abandoned request no longer
//! matches and is dropped instead of being applied.

use std::fmt;

use chrono::Utc;

use crate::error::QuizError;
use crate::model::{
    AttemptRecord, AttemptResult, Delivery, ExclusionSet, Label, Question, QuestionId, SubjectId,
    Tally, Topic, TopicId,
};

/// A discrete user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    ChooseSubject(SubjectId),
    ChooseTopic(TopicId),
    SelectAnswer(Label),
    Submit,
    Next,
    RestartTopic,
    SelectAnotherTopic,
    BackToSubjects,
    BackToTopics,
}

/// Where the learner is. Question and result data live inside the phases
/// that display them, so they cannot outlive those phases.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    SelectingSubject,
    SelectingTopic,
    AwaitingAnswer {
        question: Question,
        selected: Option<Label>,
    },
    ShowingFeedback {
        question: Question,
        chosen: Label,
        result: AttemptResult,
    },
    TopicCompleted,
}

/// Data-less view of [`Phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    SelectingSubject,
    SelectingTopic,
    AwaitingAnswer,
    ShowingFeedback,
    TopicCompleted,
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::SelectingSubject => PhaseKind::SelectingSubject,
            Phase::SelectingTopic => PhaseKind::SelectingTopic,
            Phase::AwaitingAnswer { .. } => PhaseKind::AwaitingAnswer,
            Phase::ShowingFeedback { .. } => PhaseKind::ShowingFeedback,
            Phase::TopicCompleted => PhaseKind::TopicCompleted,
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseKind::SelectingSubject => write!(f, "selecting-subject"),
            PhaseKind::SelectingTopic => write!(f, "selecting-topic"),
            PhaseKind::AwaitingAnswer => write!(f, "awaiting-answer"),
            PhaseKind::ShowingFeedback => write!(f, "showing-feedback"),
            PhaseKind::TopicCompleted => write!(f, "topic-completed"),
        }
    }
}

/// Tag of an outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub generation: u64,
    pub serial: u64,
}

/// Work the session needs done before it can move on.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Topics {
        ticket: Ticket,
        subject: SubjectId,
    },
    Question {
        ticket: Ticket,
        topic: TopicId,
        excluded: ExclusionSet,
    },
    Answer {
        ticket: Ticket,
        topic: TopicId,
        question: QuestionId,
        answer: Label,
    },
}

impl Request {
    pub fn ticket(&self) -> Ticket {
        match self {
            Request::Topics { ticket, .. }
            | Request::Question { ticket, .. }
            | Request::Answer { ticket, .. } => *ticket,
        }
    }
}

/// Settlement of a [`Request`], tagged with the same ticket.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Topics {
        ticket: Ticket,
        result: Result<Vec<Topic>, QuizError>,
    },
    Question {
        ticket: Ticket,
        result: Result<Delivery, QuizError>,
    },
    Answer {
        ticket: Ticket,
        result: Result<AttemptResult, QuizError>,
    },
}

impl Response {
    pub fn ticket(&self) -> Ticket {
        match self {
            Response::Topics { ticket, .. }
            | Response::Question { ticket, .. }
            | Response::Answer { ticket, .. } => *ticket,
        }
    }
}

/// What [`Session::apply`] made of a trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Not allowed in the current phase, or a request is outstanding.
    Ignored,
    /// Applied without needing a collaborator.
    Done,
    /// Applied; the request must be performed and its response settled.
    Request(Request),
}

/// How a trigger or response ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Applied,
    Ignored,
    /// The response belonged to an abandoned request.
    Discarded,
}

#[derive(Debug, Clone)]
enum Pending {
    Topics { subject: SubjectId },
    Question { reason: FetchReason },
    Answer,
}

#[derive(Debug, Clone)]
enum FetchReason {
    TopicChosen,
    /// Leaving feedback for this question; it joins the exclusion set on success.
    Next(QuestionId),
    Restart,
}

/// The mutable quiz aggregate. Created empty when the quiz view is entered
/// and dropped when it is left; nothing is persisted.
#[derive(Debug)]
pub struct Session {
    phase: Phase,
    selected_subject: Option<SubjectId>,
    selected_topic: Option<TopicId>,
    topics: Vec<Topic>,
    answered: ExclusionSet,
    tally: Tally,
    history: Vec<AttemptRecord>,
    generation: u64,
    next_serial: u64,
    pending: Option<(Ticket, Pending)>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            phase: Phase::SelectingSubject,
            selected_subject: None,
            selected_topic: None,
            topics: Vec::new(),
            answered: ExclusionSet::new(),
            tally: Tally::default(),
            history: Vec::new(),
            generation: 0,
            next_serial: 0,
            pending: None,
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    pub fn selected_subject(&self) -> Option<&SubjectId> {
        self.selected_subject.as_ref()
    }

    pub fn selected_topic(&self) -> Option<&TopicId> {
        self.selected_topic.as_ref()
    }

    /// Topics of the selected subject.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Questions already presented in this topic session.
    pub fn answered(&self) -> &ExclusionSet {
        &self.answered
    }

    pub fn current_question(&self) -> Option<&Question> {
        match &self.phase {
            Phase::AwaitingAnswer { question, .. } | Phase::ShowingFeedback { question, .. } => {
                Some(question)
            }
            _ => None,
        }
    }

    pub fn selected_answer(&self) -> Option<&Label> {
        match &self.phase {
            Phase::AwaitingAnswer { selected, .. } => selected.as_ref(),
            Phase::ShowingFeedback { chosen, .. } => Some(chosen),
            _ => None,
        }
    }

    pub fn last_result(&self) -> Option<&AttemptResult> {
        match &self.phase {
            Phase::ShowingFeedback { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    // -----------------------------------------------------------------------
    // Triggers
    // -----------------------------------------------------------------------

    /// Apply a user trigger.
    pub fn apply(&mut self, trigger: Trigger) -> Step {
        match trigger {
            Trigger::BackToSubjects => return self.back_to_subjects(),
            Trigger::BackToTopics => return self.back_to_topics(),
            _ => {}
        }

        if self.pending.is_some() {
            tracing::trace!(?trigger, "ignored: request outstanding");
            return Step::Ignored;
        }

        let kind = self.kind();
        match trigger {
            Trigger::ChooseSubject(subject) if kind == PhaseKind::SelectingSubject => {
                Step::Request(self.issue_topics(subject))
            }
            Trigger::ChooseTopic(topic) if kind == PhaseKind::SelectingTopic => {
                self.selected_topic = Some(topic.clone());
                self.reset_topic_session();
                Step::Request(self.issue_question(topic, FetchReason::TopicChosen))
            }
            Trigger::SelectAnswer(label) => self.select_answer(label),
            Trigger::Submit => self.submit(),
            Trigger::Next => self.next(),
            Trigger::RestartTopic if kind == PhaseKind::TopicCompleted => {
                match self.selected_topic.clone() {
                    Some(topic) => {
                        self.reset_topic_session();
                        Step::Request(self.issue_question(topic, FetchReason::Restart))
                    }
                    None => Step::Ignored,
                }
            }
            Trigger::SelectAnotherTopic if kind == PhaseKind::TopicCompleted => {
                self.selected_topic = None;
                self.reset_topic_session();
                self.invalidate();
                self.enter(Phase::SelectingTopic);
                Step::Done
            }
            trigger => {
                tracing::trace!(?trigger, phase = %kind, "ignored: not allowed in phase");
                Step::Ignored
            }
        }
    }

    fn select_answer(&mut self, label: Label) -> Step {
        let Phase::AwaitingAnswer { question, selected } = &mut self.phase else {
            return Step::Ignored;
        };
        if question.option(&label).is_none() {
            tracing::trace!(%label, "ignored: not an option of the current question");
            return Step::Ignored;
        }
        *selected = Some(label);
        Step::Done
    }

    fn submit(&mut self) -> Step {
        let (topic, question, answer) = match &self.phase {
            Phase::AwaitingAnswer {
                question,
                selected: Some(label),
            } => (question.topic_id.clone(), question.id.clone(), label.clone()),
            _ => {
                tracing::trace!("ignored: nothing to submit");
                return Step::Ignored;
            }
        };
        let ticket = self.issue(Pending::Answer);
        Step::Request(Request::Answer {
            ticket,
            topic,
            question,
            answer,
        })
    }

    fn next(&mut self) -> Step {
        let Phase::ShowingFeedback { question, .. } = &self.phase else {
            return Step::Ignored;
        };
        let leaving = question.id.clone();
        match self.selected_topic.clone() {
            Some(topic) => Step::Request(self.issue_question(topic, FetchReason::Next(leaving))),
            None => Step::Ignored,
        }
    }

    fn back_to_subjects(&mut self) -> Step {
        if self.kind() == PhaseKind::SelectingSubject && self.pending.is_none() {
            return Step::Ignored;
        }
        self.selected_subject = None;
        self.selected_topic = None;
        self.topics.clear();
        self.reset_topic_session();
        self.invalidate();
        self.enter(Phase::SelectingSubject);
        Step::Done
    }

    fn back_to_topics(&mut self) -> Step {
        if self.selected_subject.is_none() {
            return Step::Ignored;
        }
        if self.kind() == PhaseKind::SelectingTopic && self.pending.is_none() {
            return Step::Ignored;
        }
        self.selected_topic = None;
        self.reset_topic_session();
        self.invalidate();
        self.enter(Phase::SelectingTopic);
        Step::Done
    }

    // -----------------------------------------------------------------------
    // Responses
    // -----------------------------------------------------------------------

    /// Fold a response into the session.
    ///
    /// Collaborator failures are returned as `Err` after the session has
    /// reacted to them, so the caller can show them verbatim.
    pub fn settle(&mut self, response: Response) -> Result<Settled, QuizError> {
        let ticket = response.ticket();
        let pending = match self.pending.take() {
            Some((expected, pending))
                if expected == ticket && ticket.generation == self.generation =>
            {
                pending
            }
            other => {
                self.pending = other;
                tracing::debug!(
                    generation = ticket.generation,
                    serial = ticket.serial,
                    current = self.generation,
                    "discarding stale response"
                );
                return Ok(Settled::Discarded);
            }
        };

        match (response, pending) {
            (Response::Topics { result, .. }, Pending::Topics { subject }) => {
                self.settle_topics(subject, result)
            }
            (Response::Question { result, .. }, Pending::Question { reason }) => {
                self.settle_question(reason, result)
            }
            (Response::Answer { result, .. }, Pending::Answer) => self.settle_answer(result),
            (response, pending) => {
                tracing::warn!(?pending, ticket = ?response.ticket(), "response kind does not match request");
                Ok(Settled::Discarded)
            }
        }
    }

    fn settle_topics(
        &mut self,
        subject: SubjectId,
        result: Result<Vec<Topic>, QuizError>,
    ) -> Result<Settled, QuizError> {
        let topics = result.inspect_err(|e| tracing::warn!(%subject, "topic fetch failed: {e}"))?;
        self.selected_subject = Some(subject);
        self.topics = topics;
        self.enter(Phase::SelectingTopic);
        Ok(Settled::Applied)
    }

    fn settle_question(
        &mut self,
        reason: FetchReason,
        result: Result<Delivery, QuizError>,
    ) -> Result<Settled, QuizError> {
        let delivery = match result {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::warn!("question fetch failed: {e}");
                if e.returns_to_selection() {
                    self.selected_topic = None;
                    self.reset_topic_session();
                    self.enter(Phase::SelectingTopic);
                } else if matches!(reason, FetchReason::TopicChosen) {
                    self.selected_topic = None;
                }
                return Err(e);
            }
        };

        if let Delivery::Delivered(question) = &delivery {
            let repeats_leaving =
                matches!(&reason, FetchReason::Next(leaving) if *leaving == question.id);
            if repeats_leaving || self.answered.contains(&question.id) {
                tracing::warn!(question = %question.id, "refusing repeated question");
                if matches!(reason, FetchReason::TopicChosen) {
                    self.selected_topic = None;
                }
                return Err(QuizError::ContractViolation {
                    question_id: question.id.clone(),
                });
            }
        }

        if let FetchReason::Next(leaving) = reason {
            self.answered.insert(leaving);
        }

        match delivery {
            Delivery::Delivered(question) => self.enter(Phase::AwaitingAnswer {
                question,
                selected: None,
            }),
            Delivery::Exhausted => self.enter(Phase::TopicCompleted),
        }
        Ok(Settled::Applied)
    }

    fn settle_answer(
        &mut self,
        result: Result<AttemptResult, QuizError>,
    ) -> Result<Settled, QuizError> {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("answer submission failed: {e}");
                if e.returns_to_selection() {
                    self.selected_topic = None;
                    self.reset_topic_session();
                    self.enter(Phase::SelectingTopic);
                }
                return Err(e);
            }
        };

        let (question, chosen) = match std::mem::replace(&mut self.phase, Phase::SelectingTopic) {
            Phase::AwaitingAnswer {
                question,
                selected: Some(chosen),
            } => (question, chosen),
            other => {
                tracing::warn!(phase = %other.kind(), "graded answer arrived outside awaiting-answer");
                self.phase = other;
                return Ok(Settled::Discarded);
            }
        };

        self.tally.record(result.is_correct);
        self.history.push(AttemptRecord {
            question_id: question.id.clone(),
            chosen: chosen.clone(),
            is_correct: result.is_correct,
            answered_at: Utc::now(),
        });
        self.enter(Phase::ShowingFeedback {
            question,
            chosen,
            result,
        });
        Ok(Settled::Applied)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn issue(&mut self, pending: Pending) -> Ticket {
        self.next_serial += 1;
        let ticket = Ticket {
            generation: self.generation,
            serial: self.next_serial,
        };
        self.pending = Some((ticket, pending));
        ticket
    }

    fn issue_topics(&mut self, subject: SubjectId) -> Request {
        let ticket = self.issue(Pending::Topics {
            subject: subject.clone(),
        });
        Request::Topics { ticket, subject }
    }

    fn issue_question(&mut self, topic: TopicId, reason: FetchReason) -> Request {
        let mut excluded = self.answered.clone();
        if let FetchReason::Next(leaving) = &reason {
            excluded.insert(leaving.clone());
        }
        let ticket = self.issue(Pending::Question { reason });
        Request::Question {
            ticket,
            topic,
            excluded,
        }
    }

    /// Abandon any outstanding request.
    fn invalidate(&mut self) {
        self.generation += 1;
        self.pending = None;
    }

    fn reset_topic_session(&mut self) {
        self.answered.clear();
        self.tally = Tally::default();
        self.history.clear();
    }

    fn enter(&mut self, phase: Phase) {
        let from = self.phase.kind();
        self.phase = phase;
        tracing::debug!(%from, to = %self.phase.kind(), "transition");
    }
}
