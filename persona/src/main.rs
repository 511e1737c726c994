//! Persona - memory extraction and personality responses from the terminal.
//!
//! Paste or load a chat transcript, extract memories about the speaker,
//! then hear back from a calm mentor, a witty friend and a therapist.
//!
//! # One-shot Mode
//!
//! ```bash
//! cargo run -p persona -- --sample --message "Ugh, Monday again"
//! cargo run -p persona -- --transcript chat.txt --message "Long week" --json
//! ```
//!
//! Without `--message` the binary starts the interactive line protocol.

mod headless;
mod interrupt;
mod output;

use anyhow::{bail, Context, Result};
use clap::Parser;
use persona_core::config::DEFAULT_BASE_URL;
use persona_core::transcript::SAMPLE_TRANSCRIPT;
use persona_core::{CancellationToken, Session, SessionConfig};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "persona=info,persona_core=info,guppshupp=warn";

#[derive(Parser, Debug)]
#[command(name = "persona")]
#[command(about = "Extract memories from a chat transcript and answer in three personalities")]
struct Args {
    /// Base URL of the memory service
    #[arg(long, env = "GUPPSHUPP_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Minimum wait between generation calls, in milliseconds
    #[arg(long, env = "GUPPSHUPP_PACING_MS", default_value_t = 4000)]
    pacing_ms: u64,

    /// Transcript file with one `role: content` line per message (`-` for stdin)
    #[arg(long, conflicts_with = "sample")]
    transcript: Option<PathBuf>,

    /// Use the built-in sample transcript
    #[arg(long)]
    sample: bool,

    /// Message to answer; runs once and exits instead of prompting
    #[arg(long, short)]
    message: Option<String>,

    /// Print the final run state as JSON (one-shot mode only)
    #[arg(long, requires = "message")]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging();

    let config = SessionConfig::new(&args.api_url)
        .with_pacing_interval(Duration::from_millis(args.pacing_ms));
    let session = Session::new(config).context("failed to set up session")?;

    let transcript = load_transcript(&args)?;

    match &args.message {
        Some(message) => run_once(&session, transcript, message, args.json).await,
        None => headless::run_headless(&session, &args.api_url, transcript).await,
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve the transcript from `--sample` or `--transcript`.
fn load_transcript(args: &Args) -> Result<Option<String>> {
    if args.sample {
        return Ok(Some(SAMPLE_TRANSCRIPT.to_string()));
    }

    let Some(path) = &args.transcript else {
        return Ok(None);
    };

    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read transcript from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read transcript {}", path.display()))?
    };
    Ok(Some(text))
}

/// Extract, generate once, print, exit.
async fn run_once(
    session: &Session,
    transcript: Option<String>,
    message: &str,
    json: bool,
) -> Result<()> {
    let Some(transcript) = transcript else {
        bail!("--message needs a transcript: pass --transcript <file> or --sample");
    };

    let memories = session
        .extract(&transcript)
        .await
        .context("memory extraction failed")?;
    if !json {
        output::print_memories(&memories);
    }

    let cancel = CancellationToken::new();
    let run = session.generate_cancellable(message, &cancel, |kind, text| {
        if !json {
            output::print_response(kind, text);
        }
    });
    let report = interrupt::cancel_on_ctrl_c(&cancel, run).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    } else {
        output::print_report(&report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_args() {
        let args = Args::try_parse_from([
            "persona",
            "--api-url",
            "http://memory.local:9000",
            "--pacing-ms",
            "250",
            "--sample",
            "-m",
            "rough week",
        ])
        .unwrap();

        assert_eq!(args.api_url, "http://memory.local:9000");
        assert_eq!(args.pacing_ms, 250);
        assert_eq!(args.message.as_deref(), Some("rough week"));
        assert_eq!(load_transcript(&args).unwrap().as_deref(), Some(SAMPLE_TRANSCRIPT));
    }

    #[test]
    fn test_sample_conflicts_with_transcript() {
        let result = Args::try_parse_from(["persona", "--sample", "--transcript", "chat.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_json_requires_message() {
        assert!(Args::try_parse_from(["persona", "--json"]).is_err());
    }

    #[test]
    fn test_missing_transcript_file() {
        let args =
            Args::try_parse_from(["persona", "--transcript", "/nonexistent/chat.txt"]).unwrap();
        assert!(load_transcript(&args).is_err());
    }
}
