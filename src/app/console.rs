//! Terminal implementations of the notifier and prompter.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use track_downloader::{Notice, Notifier, Prompt, PromptOutcome, Prompter};
use tracing::{debug, warn};

/// Prints notices on stdout.
#[derive(Debug, Default)]
pub(crate) struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub(crate) fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for ConsoleNotifier {
    fn show(&self, notice: &Notice) {
        if let Notice::DownloadError { detail } = notice {
            debug!(%detail, "download error detail");
        }
        if !self.quiet {
            println!("{notice}");
        }
    }
}

/// Asks on stderr and reads `y`/`n` from stdin.
///
/// End of input counts as dismissing the prompt.
#[derive(Debug, Default)]
pub(crate) struct ConsolePrompter;

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn confirm(&self, prompt: Prompt) -> PromptOutcome {
        let question = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || ask(&question)).await;
        match answer {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(error = %e, "failed to read confirmation");
                PromptOutcome::Dismissed
            }
            Err(e) => {
                warn!(error = %e, "confirmation task aborted");
                PromptOutcome::Dismissed
            }
        }
    }
}

fn ask(question: &str) -> io::Result<PromptOutcome> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "{question} [y/N] ")?;
    stderr.flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        writeln!(stderr)?;
        return Ok(PromptOutcome::Dismissed);
    }
    Ok(parse_answer(&line))
}

fn parse_answer(line: &str) -> PromptOutcome {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => PromptOutcome::Accepted,
        "" => PromptOutcome::Dismissed,
        _ => PromptOutcome::Declined,
    }
}

/// Answers every prompt the same way, for `--yes` and scripted runs.
#[derive(Debug)]
pub(crate) struct AutoPrompter(pub(crate) PromptOutcome);

#[async_trait]
impl Prompter for AutoPrompter {
    async fn confirm(&self, prompt: Prompt) -> PromptOutcome {
        debug!(%prompt, outcome = ?self.0, "answering prompt automatically");
        self.0
    }
}
