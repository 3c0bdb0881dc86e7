//! quizpath-core — Quiz session engine, service traits, and data model.
//!
//! This crate defines the data model, the collaborator traits the engine
//! consumes, and the session state machine that drives a learner through
//! a topic without repeating questions.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod mock;
pub mod model;
pub mod session;
pub mod submitter;
pub mod supplier;
pub mod traits;

pub use engine::QuizEngine;
pub use error::QuizError;
pub use session::{Phase, PhaseKind, Session, Trigger};
