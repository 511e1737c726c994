//! Interactive mode for persona.
//!
//! This module provides a simple line-oriented interface on stdin. It's
//! designed for pasting transcripts by hand and for scripted sessions.
//! Ctrl-C at the prompt exits; during `#extract` or `#say` it stops the run.

use crate::interrupt::{self, Input};
use crate::output;
use anyhow::Result;
use persona_core::transcript::SAMPLE_TRANSCRIPT;
use persona_core::{CancellationToken, Session};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Run the interactive loop.
///
/// This provides a simple line-oriented protocol:
/// - Lines starting with `#` are commands (extract, say, status, ...)
/// - All other lines are appended to the transcript buffer
pub async fn run_headless(
    session: &Session,
    service_url: &str,
    transcript: Option<String>,
) -> Result<()> {
    let mut buffer: Vec<String> = transcript
        .as_deref()
        .map(|t| t.lines().map(str::to_string).collect())
        .unwrap_or_default();

    println!("=== Persona Interactive Mode ===");
    println!("Service: {service_url}");
    if !buffer.is_empty() {
        println!("Transcript: {} lines loaded", buffer.len());
    }
    println!();
    print_help();
    println!();
    println!("Paste transcript lines (role: content), then #extract:");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    loop {
        let line = match interrupt::next_line_or(&mut lines, tokio::signal::ctrl_c()).await? {
            Input::Line(line) => line,
            Input::Eof => break,
            Input::Interrupted => {
                println!();
                println!("Goodbye!");
                break;
            }
        };
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let Some(command) = line.strip_prefix('#') else {
            buffer.push(line.to_string());
            continue;
        };

        let (name, rest) = command
            .trim()
            .split_once(char::is_whitespace)
            .map(|(n, r)| (n, r.trim()))
            .unwrap_or((command.trim(), ""));

        match name {
            "quit" | "exit" => {
                println!("Goodbye!");
                break;
            }
            "sample" => {
                buffer = SAMPLE_TRANSCRIPT.lines().map(str::to_string).collect();
                match session.load_transcript(SAMPLE_TRANSCRIPT) {
                    Ok(count) => println!("[TRANSCRIPT] Sample loaded ({count} messages)"),
                    Err(e) => println!("[ERROR] {e}"),
                }
            }
            "extract" => {
                if buffer.is_empty() {
                    println!("[ERROR] No transcript lines yet. Paste some or use #sample.");
                } else {
                    println!("[EXTRACTING] {} lines... Press Ctrl-C to abandon.", buffer.len());
                    let raw = buffer.join("\n");
                    tokio::select! {
                        result = session.extract(&raw) => match result {
                            Ok(memories) => output::print_memories(&memories),
                            Err(e) => println!("[ERROR] {e}"),
                        },
                        _ = tokio::signal::ctrl_c() => {
                            println!("[CANCELLED] Extraction abandoned; memories unchanged.");
                        }
                    }
                }
            }
            "say" => {
                if rest.is_empty() {
                    println!("[ERROR] Usage: #say <message>");
                } else {
                    println!("[GENERATING] Press Ctrl-C to cancel.");
                    let cancel = CancellationToken::new();
                    let run = session.generate_cancellable(rest, &cancel, |kind, text| {
                        output::print_response(kind, text);
                    });
                    let result = interrupt::cancel_on_ctrl_c(&cancel, run).await;
                    match result {
                        Ok(report) => output::print_report(&report),
                        Err(e) => println!("[ERROR] {e}"),
                    }
                }
            }
            "memories" => match session.memories() {
                Some(memories) => output::print_memories(&memories),
                None => println!("[MEMORIES] None yet. Run #extract first."),
            },
            "status" => output::print_status(&session.snapshot(), buffer.len()),
            "json" => println!("{}", serde_json::to_string_pretty(&session.snapshot())?),
            "clear" => match session.clear() {
                Ok(()) => {
                    buffer.clear();
                    println!("[CLEARED]");
                }
                Err(e) => println!("[ERROR] {e}"),
            },
            "health" => match session.health().await {
                Ok(health) => println!("[HEALTH] {} {}", health.service, health.status),
                Err(e) => println!("[ERROR] {e}"),
            },
            "help" => print_help(),
            _ => println!("[ERROR] Unknown command. Type #help for help."),
        }
        stdout.flush().ok();
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  #sample        - Load the sample transcript");
    println!("  #extract       - Extract memories from the transcript");
    println!("  #say <message> - Get all three personality responses");
    println!("  #memories      - Show extracted memories");
    println!("  #status        - Show run state");
    println!("  #json          - Dump run state as JSON");
    println!("  #clear         - Forget transcript, memories and responses");
    println!("  #health        - Check the service");
    println!("  #help          - Show this help");
    println!("  #quit          - Exit");
}
