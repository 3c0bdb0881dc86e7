//! Subcommand implementations.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use quizpath_client::config::load_config_from;
use quizpath_client::{create_services, QuizpathConfig, Services};

pub mod init;
pub mod play;
pub mod subjects;
pub mod topics;

/// Where to find questions. Shared by every subcommand that talks to a service.
#[derive(Args, Debug, Clone, Default)]
pub struct ServiceArgs {
    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Quiz API base URL (overrides config)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Local question bank TOML; no server is contacted
    #[arg(long)]
    pub bank: Option<PathBuf>,
}

impl ServiceArgs {
    /// Config file settings with command-line overrides applied.
    pub fn resolve(&self) -> Result<QuizpathConfig> {
        let mut config = load_config_from(self.config.as_deref())?;
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
            // An explicit server wins over a bank from the config file.
            config.bank = None;
        }
        if let Some(bank) = &self.bank {
            config.bank = Some(bank.clone());
        }
        Ok(config)
    }

    pub fn services(&self) -> Result<Services> {
        create_services(&self.resolve()?)
    }
}
