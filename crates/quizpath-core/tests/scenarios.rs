//! End-to-end session scenarios against scripted services.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use quizpath_core::mock::{sample_question, MockAnswers, MockContent};
use quizpath_core::model::{QuestionId, Tally};
use quizpath_core::session::Settled;
use quizpath_core::{PhaseKind, QuizEngine, QuizError, Trigger};

async fn engine_on_topic(content: Arc<MockContent>, answers: Arc<MockAnswers>) -> QuizEngine {
    let engine = QuizEngine::new(content, answers);
    engine
        .dispatch(Trigger::ChooseSubject("s1".into()))
        .await
        .unwrap();
    engine
        .dispatch(Trigger::ChooseTopic("t1".into()))
        .await
        .unwrap();
    engine
}

async fn answer_current(engine: &QuizEngine, label: &str) {
    engine
        .dispatch(Trigger::SelectAnswer(label.into()))
        .await
        .unwrap();
    engine.dispatch(Trigger::Submit).await.unwrap();
}

#[tokio::test]
async fn answering_every_question_completes_topic() {
    let content = Arc::new(MockContent::single_topic("t1", 3));
    let answers = Arc::new(MockAnswers::always("A"));
    let engine = engine_on_topic(content.clone(), answers.clone()).await;

    for _ in 0..3 {
        assert_eq!(engine.session().kind(), PhaseKind::AwaitingAnswer);
        answer_current(&engine, "A").await;
        assert_eq!(engine.session().kind(), PhaseKind::ShowingFeedback);
        engine.dispatch(Trigger::Next).await.unwrap();
    }

    let session = engine.session();
    assert_eq!(session.kind(), PhaseKind::TopicCompleted);
    assert_eq!(session.answered().len(), 3);
    assert!(session.current_question().is_none());
    assert_eq!(
        session.tally(),
        Tally {
            answered: 3,
            correct: 3
        }
    );
    assert_eq!(answers.call_count(), 3);
}

#[tokio::test]
async fn delivered_questions_never_repeat() {
    let content = Arc::new(MockContent::single_topic("t1", 5));
    let engine = engine_on_topic(content.clone(), Arc::new(MockAnswers::always("B"))).await;

    let mut seen = HashSet::new();
    while engine.session().kind() == PhaseKind::AwaitingAnswer {
        let id = engine.session().current_question().unwrap().id.clone();
        assert!(!engine.session().answered().contains(&id));
        assert!(seen.insert(id), "question delivered twice");
        answer_current(&engine, "C").await;
        engine.dispatch(Trigger::Next).await.unwrap();
    }

    assert_eq!(seen.len(), 5);
    assert_eq!(engine.session().answered().len(), 5);
    assert_eq!(engine.session().tally().correct, 0);
}

#[tokio::test]
async fn failed_submission_leaves_question_resubmittable() {
    let content = Arc::new(MockContent::single_topic("t1", 3));
    let answers = Arc::new(MockAnswers::always("A"));
    answers.fail_next(QuizError::ServiceUnavailable("connection reset".into()));
    let engine = engine_on_topic(content, answers.clone()).await;

    engine
        .dispatch(Trigger::SelectAnswer("D".into()))
        .await
        .unwrap();
    let err = engine.dispatch(Trigger::Submit).await.unwrap_err();
    assert!(matches!(err, QuizError::ServiceUnavailable(_)));

    {
        let session = engine.session();
        assert_eq!(session.kind(), PhaseKind::AwaitingAnswer);
        assert_eq!(session.current_question().unwrap().id.as_str(), "q1");
        assert_eq!(session.selected_answer().unwrap().as_str(), "D");
        assert!(!session.answered().contains(&QuestionId::new("q1")));
    }

    engine.dispatch(Trigger::Submit).await.unwrap();
    assert_eq!(engine.session().kind(), PhaseKind::ShowingFeedback);
    assert_eq!(answers.call_count(), 2);
}

#[tokio::test]
async fn restart_after_completion_fetches_with_empty_exclusions() {
    let content = Arc::new(MockContent::single_topic("t1", 2));
    let engine = engine_on_topic(content.clone(), Arc::new(MockAnswers::always("A"))).await;
    for _ in 0..2 {
        answer_current(&engine, "A").await;
        engine.dispatch(Trigger::Next).await.unwrap();
    }
    assert_eq!(engine.session().kind(), PhaseKind::TopicCompleted);
    let calls_before = content.question_calls();

    engine.dispatch(Trigger::RestartTopic).await.unwrap();

    assert_eq!(content.question_calls(), calls_before + 1);
    assert!(content.exclusions_seen().last().unwrap().is_empty());
    let session = engine.session();
    assert!(session.answered().is_empty());
    assert_eq!(session.kind(), PhaseKind::AwaitingAnswer);
    assert_eq!(session.current_question().unwrap().id.as_str(), "q1");
}

#[tokio::test]
async fn empty_topic_completes_immediately() {
    let content = Arc::new(MockContent::single_topic("t1", 0));
    let engine = engine_on_topic(content, Arc::new(MockAnswers::always("A"))).await;
    assert_eq!(engine.session().kind(), PhaseKind::TopicCompleted);
    assert!(engine.session().current_question().is_none());
}

#[tokio::test]
async fn restart_of_emptied_topic_completes_without_a_question() {
    // The topic's only question is served once, then no longer exists.
    let content = Arc::new(MockContent::single_topic("t1", 0));
    content.force_next(sample_question("q1", "t1"));
    let engine = engine_on_topic(content.clone(), Arc::new(MockAnswers::always("A"))).await;
    assert_eq!(engine.session().kind(), PhaseKind::AwaitingAnswer);

    answer_current(&engine, "A").await;
    engine.dispatch(Trigger::Next).await.unwrap();
    assert_eq!(engine.session().kind(), PhaseKind::TopicCompleted);
    assert_eq!(engine.session().answered().len(), 1);

    let settled = engine.dispatch(Trigger::RestartTopic).await.unwrap();
    assert_eq!(settled, Settled::Applied);

    let session = engine.session();
    assert_eq!(session.kind(), PhaseKind::TopicCompleted);
    assert!(session.current_question().is_none());
    assert!(session.answered().is_empty());
    assert_eq!(session.tally(), Tally::default());
    assert_eq!(content.question_calls(), 3);
    assert!(content.exclusions_seen().last().unwrap().is_empty());
}

#[tokio::test]
async fn selecting_topic_again_resets_exclusions() {
    let content = Arc::new(MockContent::single_topic("t1", 3));
    let engine = engine_on_topic(content.clone(), Arc::new(MockAnswers::always("A"))).await;
    answer_current(&engine, "A").await;
    engine.dispatch(Trigger::Next).await.unwrap();
    assert_eq!(engine.session().answered().len(), 1);

    engine.dispatch(Trigger::BackToTopics).await.unwrap();
    engine
        .dispatch(Trigger::ChooseTopic("t1".into()))
        .await
        .unwrap();

    assert!(content.exclusions_seen().last().unwrap().is_empty());
    assert_eq!(engine.session().current_question().unwrap().id.as_str(), "q1");
}

#[tokio::test(start_paused = true)]
async fn rapid_double_submit_calls_service_once() {
    let content = Arc::new(MockContent::single_topic("t1", 3));
    let answers = Arc::new(MockAnswers::always("A").with_delay(Duration::from_millis(500)));
    let engine = engine_on_topic(content, answers.clone()).await;
    engine
        .dispatch(Trigger::SelectAnswer("A".into()))
        .await
        .unwrap();

    let (first, second) = futures::join!(
        engine.dispatch(Trigger::Submit),
        engine.dispatch(Trigger::Submit)
    );

    assert_eq!(first.unwrap(), Settled::Applied);
    assert_eq!(second.unwrap(), Settled::Ignored);
    assert_eq!(answers.call_count(), 1);
    assert_eq!(engine.session().kind(), PhaseKind::ShowingFeedback);
}

#[tokio::test(start_paused = true)]
async fn navigating_away_discards_in_flight_answer() {
    let content = Arc::new(MockContent::single_topic("t1", 3));
    let answers = Arc::new(MockAnswers::always("A").with_delay(Duration::from_millis(500)));
    let engine = engine_on_topic(content, answers.clone()).await;
    engine
        .dispatch(Trigger::SelectAnswer("A".into()))
        .await
        .unwrap();

    let (submitted, back) = futures::join!(
        engine.dispatch(Trigger::Submit),
        engine.dispatch(Trigger::BackToTopics)
    );

    assert_eq!(back.unwrap(), Settled::Applied);
    assert_eq!(submitted.unwrap(), Settled::Discarded);
    let session = engine.session();
    assert_eq!(session.kind(), PhaseKind::SelectingTopic);
    assert!(session.selected_topic().is_none());
    assert!(session.history().is_empty());
    assert_eq!(answers.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn navigating_away_discards_in_flight_question() {
    let content = Arc::new(MockContent::single_topic("t1", 3).with_delay(Duration::from_millis(200)));
    let engine = QuizEngine::new(content, Arc::new(MockAnswers::always("A")));
    engine
        .dispatch(Trigger::ChooseSubject("s1".into()))
        .await
        .unwrap();

    let (fetched, back) = futures::join!(
        engine.dispatch(Trigger::ChooseTopic("t1".into())),
        engine.dispatch(Trigger::BackToSubjects)
    );

    assert_eq!(back.unwrap(), Settled::Applied);
    assert_eq!(fetched.unwrap(), Settled::Discarded);
    assert_eq!(engine.session().kind(), PhaseKind::SelectingSubject);
    assert!(engine.session().current_question().is_none());
}
