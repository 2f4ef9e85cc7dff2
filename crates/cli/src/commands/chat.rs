//! `foliant chat` — interactive REPL or single-message mode.

use anyhow::Result;
use foliant_config::AppConfig;
use foliant_core::turn::ConversationId;
use foliant_verify::Verifier;
use std::io::Write;

pub async fn run(config: AppConfig, message: Option<String>) -> Result<()> {
    let (agent, _remote) = super::build_agent(&config).await?;
    let verifier = Verifier::default();
    let conversation = ConversationId::from("cli-session");

    if let Some(message) = message {
        let result = agent.process(&conversation, &message).await?;
        let verified = verifier.verify(&result.answer, &result.traces);
        print_answer(&verified);
        return Ok(());
    }

    println!("{}", "=".repeat(60));
    println!("  Foliant — Portfolio Intelligence Agent");
    println!("  Type 'quit' or 'exit' to stop.");
    println!("{}", "=".repeat(60));
    println!();

    let stdin = std::io::stdin();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!("\nGoodbye!");
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "q") {
            println!("Goodbye!");
            break;
        }

        match agent.process(&conversation, input).await {
            Ok(result) => {
                let verified = verifier.verify(&result.answer, &result.traces);
                println!();
                print_answer(&verified);
                println!();
            }
            Err(e) => {
                eprintln!("\nError: {e}\n");
            }
        }
    }

    Ok(())
}

fn print_answer(verified: &foliant_core::answer::VerifiedAnswer) {
    println!("Agent: {}", verified.answer);
    if !verified.citations.is_empty() {
        let labels: Vec<&str> = verified
            .citations
            .iter()
            .map(|c| c.label.as_str())
            .collect();
        println!("Sources: {} (confidence: {})", labels.join(", "), verified.confidence);
    } else {
        println!("(confidence: {})", verified.confidence);
    }
    for warning in &verified.warnings {
        println!("Note: {warning}");
    }
}
