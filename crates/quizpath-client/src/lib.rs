//! quizpath-client — Service implementations for the quiz engine.
//!
//! Implements the `ContentService` and `AnswerService` traits over the quiz
//! REST API and over a local TOML question bank.

pub mod bank;
pub mod config;
pub mod error;
pub mod http;

pub use bank::LocalBank;
pub use config::{create_services, load_config, QuizpathConfig, Services};
pub use error::ClientError;
pub use http::HttpQuizClient;
