//! The `quizpath init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("quizpath.toml"), SAMPLE_CONFIG)?;
    write_if_missing(Path::new("bank.toml"), SAMPLE_BANK)?;

    println!("\nNext steps:");
    println!("  1. Practice offline: quizpath play --bank bank.toml");
    println!("  2. Or point quizpath.toml at your quiz server and set QUIZPATH_TOKEN");
    println!("  3. Run: quizpath subjects");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizpath configuration

base_url = "http://localhost:5000/api"
token = "${QUIZPATH_TOKEN}"
timeout_secs = 30

# Uncomment to practice from a local question bank instead of the server.
# bank = "bank.toml"
"#;

const SAMPLE_BANK: &str = r#"[[subjects]]
id = "geography"
name = "Geography"

[[subjects.topics]]
id = "capitals"
title = "European capitals"

[[subjects.topics.questions]]
id = "cap-fr"
prompt = "What is the capital of France?"
answer = "B"
options = [["A", "Lyon"], ["B", "Paris"], ["C", "Marseille"], ["D", "Nice"]]

[[subjects.topics.questions]]
id = "cap-de"
prompt = "What is the capital of Germany?"
answer = "A"
options = [["A", "Berlin"], ["B", "Munich"], ["C", "Hamburg"], ["D", "Bonn"]]

[[subjects.topics.questions]]
id = "cap-pt"
prompt = "What is the capital of Portugal?"
answer = "D"
options = [["A", "Porto"], ["B", "Braga"], ["C", "Faro"], ["D", "Lisbon"]]

[[subjects]]
id = "rust"
name = "Rust"

[[subjects.topics]]
id = "ownership"
title = "Ownership"

[[subjects.topics.questions]]
id = "own-move"
prompt = "What happens to a String after it is passed by value to a function?"
answer = "C"
options = [
    ["A", "It is copied"],
    ["B", "It is borrowed"],
    ["C", "It is moved"],
    ["D", "It is cloned"],
]

[[subjects.topics.questions]]
id = "own-borrow"
prompt = "How many mutable references to a value may exist at once?"
answer = "A"
options = [["A", "One"], ["B", "Two"], ["C", "Unlimited"]]
"#;
