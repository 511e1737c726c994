//! Ctrl-C handling.
//!
//! Once tokio's handler is installed SIGINT no longer ends the process, so
//! every await the user may want to escape has to race a signal future.

use persona_core::CancellationToken;
use std::future::Future;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::warn;

/// What the prompt produced.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Read the next line, or stop early when `signal` fires.
pub async fn next_line_or<R, S>(lines: &mut Lines<R>, signal: S) -> io::Result<Input>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = io::Result<()>>,
{
    tokio::select! {
        line = lines.next_line() => Ok(line?.map_or(Input::Eof, Input::Line)),
        fired = signal => {
            fired?;
            Ok(Input::Interrupted)
        }
    }
}

/// Drive `run` to completion, cancelling `token` whenever `signal` fires.
///
/// `run` is expected to observe the token and wind down on its own.
pub async fn cancel_on<F, S, Sig>(token: &CancellationToken, run: F, mut signal: S) -> F::Output
where
    F: Future,
    S: FnMut() -> Sig,
    Sig: Future<Output = io::Result<()>>,
{
    tokio::pin!(run);
    loop {
        let fired = tokio::select! {
            output = &mut run => return output,
            fired = signal(), if !token.is_cancelled() => fired,
        };

        match fired {
            Ok(()) => {
                warn!("interrupted, cancelling run");
                token.cancel();
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for Ctrl-C");
                return run.await;
            }
        }
    }
}

/// [`cancel_on`] with Ctrl-C as the signal.
pub async fn cancel_on_ctrl_c<F: Future>(token: &CancellationToken, run: F) -> F::Output {
    cancel_on(token, run, tokio::signal::ctrl_c).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_next_line_reads_until_eof() {
        let mut lines = BufReader::new(&b"user: hi\n"[..]).lines();

        let first = next_line_or(&mut lines, std::future::pending()).await.unwrap();
        assert_eq!(first, Input::Line("user: hi".to_string()));

        let second = next_line_or(&mut lines, std::future::pending()).await.unwrap();
        assert_eq!(second, Input::Eof);
    }

    #[tokio::test]
    async fn test_signal_interrupts_a_waiting_prompt() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        let input = next_line_or(&mut lines, async { Ok(()) }).await.unwrap();
        assert_eq!(input, Input::Interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_cancels_the_run() {
        let token = CancellationToken::new();
        let watched = token.clone();
        let run = async move {
            watched.cancelled().await;
            "stopped"
        };

        let output = cancel_on(&token, run, || async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;

        assert_eq!(output, "stopped");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_run_finishing_first_leaves_token_alone() {
        let token = CancellationToken::new();
        let output = cancel_on(&token, async { 7 }, std::future::pending).await;

        assert_eq!(output, 7);
        assert!(!token.is_cancelled());
    }
}
