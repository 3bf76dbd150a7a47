use anyhow::Context;
use ebert::{Agent, AppConfig, CypherValidator, LlmClient, Neo4jHttpClient};
use std::io::{BufRead, Write};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();

    let graph = Arc::new(
        Neo4jHttpClient::new(&config.graph).context("failed to create Neo4j client")?,
    );
    let llm = Arc::new(LlmClient::new(&config.llm).context("failed to create LLM client")?);

    let validator = Arc::new(
        CypherValidator::load(graph.clone())
            .await
            .context("failed to load the database schema")?,
    );

    let agent = Agent::new(
        llm.clone(),
        llm,
        graph,
        validator,
        &config.agent,
    );

    let session_id = uuid::Uuid::new_v4().to_string();

    println!("Ebert v{} — movie recommendations from a graph database", ebert::VERSION);
    println!("Ask about movies, actors or directors. Type 'exit' to quit.");
    println!();

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") {
            break;
        }

        match agent.handle(&session_id, input).await {
            Ok(answer) => println!("\n{}\n", answer),
            Err(e) => eprintln!("\nSomething went wrong: {}\n", e),
        }
    }

    Ok(())
}
