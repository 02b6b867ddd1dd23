//! Answering session questions on the terminal.

use std::io::Write;
use std::path::PathBuf;

use relpm_core::TextEncoding;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tracing::debug;

/// Source of answers for a suspended read or write.
///
/// `None` aborts the session.
pub trait Prompter {
    /// Pick one of `candidates`.
    async fn choose_encoding(&mut self, candidates: &[TextEncoding]) -> Option<TextEncoding>;

    /// Locate a replacement for the missing track `path`.
    async fn locate_track(&mut self, path: &str) -> Option<PathBuf>;
}

/// Asks on stderr and reads answers from stdin.
pub struct StdinPrompter {
    lines: tokio::io::Lines<BufReader<Stdin>>,
}

impl StdinPrompter {
    /// Create a prompter over the process's stdin.
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn ask(&mut self, question: &str) -> Option<String> {
        eprint!("{question} ");
        let _ = std::io::stderr().flush();
        match self.lines.next_line().await {
            Ok(Some(line)) if !line.trim().is_empty() => Some(line.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                debug!("Failed to read answer: {}", e);
                None
            }
        }
    }
}

impl Default for StdinPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for StdinPrompter {
    async fn choose_encoding(&mut self, candidates: &[TextEncoding]) -> Option<TextEncoding> {
        eprintln!("Non-ASCII characters found. Which encoding should be used?");
        for (i, candidate) in candidates.iter().enumerate() {
            eprintln!("  {:>2}) {}", i + 1, candidate);
        }
        let answer = self.ask("Number or encoding name (empty to abort):").await?;
        parse_encoding_answer(&answer, candidates)
    }

    async fn locate_track(&mut self, path: &str) -> Option<PathBuf> {
        eprintln!("Track not found: {path}");
        let answer = self
            .ask("Path of any file in the folder it moved to (empty to abort):")
            .await?;
        Some(PathBuf::from(answer))
    }
}

/// Accept a 1-based index into `candidates` or any known encoding label.
pub fn parse_encoding_answer(answer: &str, candidates: &[TextEncoding]) -> Option<TextEncoding> {
    if let Ok(n) = answer.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| candidates.get(i)).copied();
    }
    TextEncoding::for_label(answer).ok()
}

/// Answers that abort every question, for `--non-interactive`.
pub struct Refuse;

impl Prompter for Refuse {
    async fn choose_encoding(&mut self, _candidates: &[TextEncoding]) -> Option<TextEncoding> {
        None
    }

    async fn locate_track(&mut self, _path: &str) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_encoding_answer() {
        let candidates = relpm_core::read_candidates();
        assert_eq!(parse_encoding_answer("1", &candidates), Some(candidates[0]));
        assert_eq!(
            parse_encoding_answer("latin1", &candidates).map(|e| e.name()),
            Some("windows-1252")
        );
        assert_eq!(parse_encoding_answer("0", &candidates), None);
        assert_eq!(parse_encoding_answer("999", &candidates), None);
        assert_eq!(parse_encoding_answer("klingon", &candidates), None);
    }
}
