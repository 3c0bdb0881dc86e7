//! quizpath CLI — practice quiz topics from the terminal.

use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::ServiceArgs;

#[derive(Parser)]
#[command(name = "quizpath", version, about = "No-repeat quiz practice")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and sample question bank
    Init,

    /// List subjects
    Subjects {
        #[command(flatten)]
        service: ServiceArgs,
    },

    /// List the topics of a subject
    Topics {
        /// Subject id
        #[arg(long)]
        subject: String,

        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Practice a topic interactively
    Play {
        /// Start in this subject
        #[arg(long)]
        subject: Option<String>,

        /// Start in this topic (requires --subject)
        #[arg(long, requires = "subject")]
        topic: Option<String>,

        #[command(flatten)]
        service: ServiceArgs,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quizpath=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Subjects { service } => commands::subjects::execute(&service).await,
        Commands::Topics { subject, service } => {
            commands::topics::execute(&service, subject).await
        }
        Commands::Play {
            subject,
            topic,
            service,
        } => commands::play::execute(&service, subject, topic).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
