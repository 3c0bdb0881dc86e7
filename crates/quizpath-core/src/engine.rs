//! Quiz engine: drives a [`Session`] against the collaborators.
//!
//! The engine runs on a single task. The session sits in a `RefCell` that is
//! only borrowed between awaits, so several triggers can be in progress on
//! the same task (say, a double-clicked submit) and the session itself
//! decides which of them start a request.

use std::cell::{Ref, RefCell};
use std::sync::Arc;

use crate::catalog::CatalogAccessor;
use crate::error::QuizError;
use crate::model::Subject;
use crate::session::{Request, Response, Session, Settled, Step, Trigger};
use crate::submitter::AnswerSubmitter;
use crate::supplier::QuestionSupplier;
use crate::traits::{AnswerService, ContentService, ProgressObserver};

/// The quiz session engine.
pub struct QuizEngine {
    catalog: CatalogAccessor,
    supplier: QuestionSupplier,
    submitter: AnswerSubmitter,
    session: RefCell<Session>,
}

impl QuizEngine {
    /// Start a fresh session against the given services.
    pub fn new(content: Arc<dyn ContentService>, answers: Arc<dyn AnswerService>) -> Self {
        Self {
            catalog: CatalogAccessor::new(Arc::clone(&content)),
            supplier: QuestionSupplier::new(content),
            submitter: AnswerSubmitter::new(answers),
            session: RefCell::new(Session::new()),
        }
    }

    /// Notify `observer` whenever a graded answer changed progress.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.submitter = self.submitter.with_observer(observer);
        self
    }

    /// Subjects to choose from. Does not touch the session.
    pub async fn subjects(&self) -> Result<Vec<Subject>, QuizError> {
        self.catalog.list_subjects().await
    }

    /// Borrow the session for display. Do not hold the borrow across an await.
    pub fn session(&self) -> Ref<'_, Session> {
        self.session.borrow()
    }

    /// Apply a trigger and, if it needs a collaborator, perform and settle the request.
    ///
    /// Errors are returned after the session has reacted to them; nothing is retried.
    pub async fn dispatch(&self, trigger: Trigger) -> Result<Settled, QuizError> {
        let step = self.session.borrow_mut().apply(trigger);
        match step {
            Step::Ignored => Ok(Settled::Ignored),
            Step::Done => Ok(Settled::Applied),
            Step::Request(request) => {
                let response = self.perform(request).await;
                self.session.borrow_mut().settle(response)
            }
        }
    }

    /// Run one request against the collaborators.
    pub async fn perform(&self, request: Request) -> Response {
        match request {
            Request::Topics { ticket, subject } => Response::Topics {
                ticket,
                result: self.catalog.list_topics(&subject).await,
            },
            Request::Question {
                ticket,
                topic,
                excluded,
            } => Response::Question {
                ticket,
                result: self.supplier.next_question(&topic, &excluded).await,
            },
            Request::Answer {
                ticket,
                topic,
                question,
                answer,
            } => Response::Answer {
                ticket,
                result: self.submitter.submit(&topic, &question, &answer).await,
            },
        }
    }
}
