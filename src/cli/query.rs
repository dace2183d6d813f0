use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use console::style;
use inquire::{InquireError, Text};

use crate::services::{Answer, NO_CONTEXT_ANSWER};
use crate::vector_store::SearchResult;

const EXCERPT_PREVIEW_CHARS: usize = 300;

/// Interactive question loop over the stored messages. Ends on `exit`,
/// `quit`, Esc, or Ctrl+C.
pub async fn handle_interactive(
    db: &Path,
    top_k: usize,
    show_excerpts: bool,
    api_key: &str,
) -> Result<()> {
    let service = super::build_query_service(db, top_k, api_key)?;

    loop {
        let prompted = tokio::task::spawn_blocking(|| Text::new("🧠 >").prompt()).await?;

        let question = match prompted {
            Ok(question) => question.trim().to_string(),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(error) => return Err(error).context("failed to read question"),
        };

        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        match service.answer(&question).await? {
            Answer::NoContext => println!("{NO_CONTEXT_ANSWER}\n"),
            Answer::Streaming {
                mut stream,
                excerpts,
            } => {
                while let Some(fragment) = stream.recv().await {
                    let content = fragment.context("inference stream failed")?;
                    print!("{content}");
                    std::io::stdout().flush()?;
                }
                println!("\n");

                if show_excerpts {
                    print_excerpts(&excerpts);
                }
            }
        }
    }

    Ok(())
}

fn print_excerpts(excerpts: &[SearchResult]) {
    println!("Based on these message excerpts:");

    for (index, excerpt) in excerpts.iter().enumerate() {
        println!(
            "\n--- Excerpt {} ({} to {}) ---",
            index + 1,
            format_time(excerpt.start_time),
            format_time(excerpt.end_time)
        );

        let preview: String = excerpt.text.chars().take(EXCERPT_PREVIEW_CHARS).collect();
        let suffix = if excerpt.text.chars().count() > EXCERPT_PREVIEW_CHARS {
            "..."
        } else {
            ""
        };
        println!("{}{}", style(preview).dim(), suffix);
    }

    println!("---\n");
}

fn format_time(unix_seconds: i64) -> String {
    Utc.timestamp_opt(unix_seconds, 0)
        .single()
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| unix_seconds.to_string())
}
