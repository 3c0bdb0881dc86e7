//! The `quizpath topics` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizpath_core::model::SubjectId;

use super::ServiceArgs;

pub async fn execute(service: &ServiceArgs, subject: String) -> Result<()> {
    let services = service.services()?;
    let topics = services
        .content
        .list_topics(&SubjectId::new(subject.clone()))
        .await?;

    if topics.is_empty() {
        println!("Subject '{subject}' has no topics.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Topic", "Questions"]);
    for topic in &topics {
        table.add_row(vec![
            Cell::new(&topic.id),
            Cell::new(&topic.title),
            Cell::new(topic.question_count),
        ]);
    }
    println!("{table}");

    Ok(())
}
