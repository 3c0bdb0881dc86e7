//! The `quizpath play` command: an interactive session on stdin/stdout.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use quizpath_core::model::{ProgressDelta, Subject, TopicId};
use quizpath_core::session::Settled;
use quizpath_core::traits::ProgressObserver;
use quizpath_core::{Phase, PhaseKind, QuizEngine, QuizError, Session, Trigger};

use super::ServiceArgs;

const HELP: &str = "\
Commands:
  <number>   choose the listed subject, topic or option
  <label>    select that answer option (e.g. A)
  s          submit the selected answer
  n          next question
  r          restart the topic
  t          choose another topic
  b          go back
  ?          show this help
  q          quit";

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Dispatch(Trigger),
    Help,
    Quit,
    Unknown(String),
}

/// Logs progress changes reported by the answer service.
struct LogObserver;

impl ProgressObserver for LogObserver {
    fn progress_changed(&self, topic: &TopicId, delta: &ProgressDelta) {
        tracing::debug!(%topic, progress = %delta.0, "progress updated");
    }
}

pub async fn execute(
    service: &ServiceArgs,
    subject: Option<String>,
    topic: Option<String>,
) -> Result<()> {
    let services = service.services()?;
    let engine = QuizEngine::new(services.content, services.answers)
        .with_observer(Arc::new(LogObserver));
    let subjects = engine.subjects().await?;

    if let Some(subject) = subject {
        if start(&engine, Trigger::ChooseSubject(subject.into())).await? {
            if let Some(topic) = topic {
                start(&engine, Trigger::ChooseTopic(topic.into())).await?;
            }
        }
    }

    show(&render(&engine.session(), &subjects))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let action = interpret(input, &engine.session(), &subjects);
        match action {
            Action::Quit => break,
            Action::Help => show(HELP)?,
            Action::Unknown(input) => {
                show(&format!("Unrecognised input '{input}'. Type ? for help."))?
            }
            Action::Dispatch(trigger) => {
                match engine.dispatch(trigger).await {
                    Ok(Settled::Ignored) => show("Not available right now.")?,
                    Ok(_) => {}
                    Err(err @ QuizError::Unauthorized(_)) => return Err(err.into()),
                    Err(err) => show(&describe_error(&err))?,
                }
                show(&render(&engine.session(), &subjects))?;
            }
        }
    }

    show(&format!("Session over: {}", engine.session().tally()))?;
    Ok(())
}

/// Apply a selection given on the command line. An unknown id is reported
/// and leaves the learner on the selection screen; returns whether it took.
async fn start(engine: &QuizEngine, trigger: Trigger) -> Result<bool> {
    match engine.dispatch(trigger).await {
        Ok(_) => Ok(true),
        Err(err) if err.returns_to_selection() => {
            show(&describe_error(&err))?;
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

fn show(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}")?;
    stdout.flush()?;
    Ok(())
}

fn describe_error(err: &QuizError) -> String {
    if err.returns_to_selection() {
        format!("{err}. Back to selection.")
    } else if err.is_transient() {
        format!("{err}. Try again.")
    } else {
        err.to_string()
    }
}

/// Map one trimmed input line onto an action for the current phase.
///
/// Option labels are matched exactly before the single-letter commands, so a
/// capital `B` selects option B while `b` goes back.
fn interpret(input: &str, session: &Session, subjects: &[Subject]) -> Action {
    match input {
        "q" | "quit" => return Action::Quit,
        "?" | "h" | "help" => return Action::Help,
        _ => {}
    }

    let kind = session.kind();
    let options = session
        .current_question()
        .filter(|_| kind == PhaseKind::AwaitingAnswer)
        .map(|q| q.options.as_slice())
        .unwrap_or_default();

    if let Some(option) = options.iter().find(|o| o.label.as_str() == input) {
        return Action::Dispatch(Trigger::SelectAnswer(option.label.clone()));
    }

    let trigger = match input {
        "s" => Some(Trigger::Submit),
        "n" => Some(Trigger::Next),
        "r" => Some(Trigger::RestartTopic),
        "t" => Some(Trigger::SelectAnotherTopic),
        "b" if kind == PhaseKind::SelectingTopic => Some(Trigger::BackToSubjects),
        "b" => Some(Trigger::BackToTopics),
        _ => None,
    };
    if let Some(trigger) = trigger {
        return Action::Dispatch(trigger);
    }

    let picked = match kind {
        PhaseKind::SelectingSubject => pick(subjects, input, |s| s.id.as_str())
            .map(|s| Trigger::ChooseSubject(s.id.clone())),
        PhaseKind::SelectingTopic => pick(session.topics(), input, |t| t.id.as_str())
            .map(|t| Trigger::ChooseTopic(t.id.clone())),
        PhaseKind::AwaitingAnswer => pick(options, input, |o| o.label.as_str())
            .map(|o| Trigger::SelectAnswer(o.label.clone())),
        PhaseKind::ShowingFeedback | PhaseKind::TopicCompleted => None,
    };

    picked.map_or_else(|| Action::Unknown(input.to_string()), Action::Dispatch)
}

/// Find an item by 1-based position or by case-insensitive key.
fn pick<'a, T>(items: &'a [T], input: &str, key: impl Fn(&T) -> &str) -> Option<&'a T> {
    match input.parse::<usize>() {
        Ok(n) if n >= 1 => items.get(n - 1),
        _ => items.iter().find(|item| key(item).eq_ignore_ascii_case(input)),
    }
}

fn render(session: &Session, subjects: &[Subject]) -> String {
    let mut lines = vec![String::new()];

    match session.phase() {
        Phase::SelectingSubject => {
            lines.push("Choose a subject:".to_string());
            for (i, subject) in subjects.iter().enumerate() {
                lines.push(format!(
                    "  {}. {} ({} topics)",
                    i + 1,
                    subject.name,
                    subject.topic_count
                ));
            }
            if subjects.is_empty() {
                lines.push("  (no subjects available)".to_string());
            }
        }
        Phase::SelectingTopic => {
            lines.push("Choose a topic:".to_string());
            for (i, topic) in session.topics().iter().enumerate() {
                lines.push(format!(
                    "  {}. {} ({} questions)",
                    i + 1,
                    topic.title,
                    topic.question_count
                ));
            }
            if session.topics().is_empty() {
                lines.push("  (this subject has no topics)".to_string());
            }
            lines.push("b: back to subjects".to_string());
        }
        Phase::AwaitingAnswer { question, selected } => {
            let heading = match (&question.subject_name, &question.topic_title) {
                (Some(subject), Some(topic)) => format!("[{subject} / {topic}] "),
                (None, Some(topic)) => format!("[{topic}] "),
                _ => String::new(),
            };
            lines.push(format!(
                "{heading}Question {}",
                session.tally().answered + 1
            ));
            lines.push(question.prompt.clone());
            for option in &question.options {
                let marker = if selected.as_ref() == Some(&option.label) {
                    '*'
                } else {
                    ' '
                };
                lines.push(format!(" {marker} {}) {}", option.label, option.text));
            }
            lines.push(if selected.is_some() {
                "s: submit, or pick another option".to_string()
            } else {
                "Pick an option.".to_string()
            });
        }
        Phase::ShowingFeedback {
            question,
            chosen,
            result,
        } => {
            if result.is_correct {
                lines.push(format!("Correct! {chosen} was right."));
            } else {
                let text = question
                    .option(&result.correct_answer)
                    .map(|o| format!(") {}", o.text))
                    .unwrap_or_default();
                lines.push(format!(
                    "Incorrect. The answer was {}{text}.",
                    result.correct_answer
                ));
            }
            lines.push(format!("Score: {}", session.tally()));
            lines.push("n: next question, b: back to topics".to_string());
        }
        Phase::TopicCompleted => {
            lines.push(format!("Topic completed! Score: {}", session.tally()));
            lines.push("r: restart topic, t: another topic".to_string());
        }
    }

    lines.join("\n")
}
