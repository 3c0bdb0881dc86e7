//! The `quizpath subjects` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::ServiceArgs;

pub async fn execute(service: &ServiceArgs) -> Result<()> {
    let services = service.services()?;
    let subjects = services.content.list_subjects().await?;

    if subjects.is_empty() {
        println!("No subjects available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Subject", "Topics"]);
    for subject in &subjects {
        table.add_row(vec![
            Cell::new(&subject.id),
            Cell::new(&subject.name),
            Cell::new(subject.topic_count),
        ]);
    }
    println!("{table}");

    Ok(())
}
