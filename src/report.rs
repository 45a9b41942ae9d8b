//! Serialized console sink for probe status and result lines

use std::io::Write;
use std::sync::Mutex;

use crate::probe::TransferOutcome;
use crate::verdict::Verdict;

/// Console output shared by all probe tasks. Writes are serialized so
/// lines from concurrent probes never interleave. A "starting" line is
/// ephemeral and may be overwritten in place by whatever is printed next.
#[derive(Debug, Default)]
pub struct Console {
    lock: Mutex<()>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ephemeral in-progress line: no trailing newline, overwritable.
    pub fn start_line(&self, display_id: &str, url: &str) {
        let line = format!(
            "{} {} - Starting request -> {}",
            timestamp(),
            display_id,
            url
        );
        self.write(&line, false);
    }

    /// Permanent per-probe result line.
    pub fn result_line(&self, display_id: &str, outcome: &TransferOutcome, verdict: &Verdict) {
        let line = format!(
            "{} {:<15} {:>4} {:>8} {:>10.1} ms {:<17} {}",
            timestamp(),
            display_id,
            outcome.http_status,
            outcome.bytes_received,
            outcome.elapsed_ms,
            clip_category(&verdict.category.to_string()),
            verdict.detail
        );
        self.write(&line, true);
    }

    /// Plain message line (setup failures, final summary).
    pub fn message(&self, prefix: &str, msg: &str) {
        let line = if prefix.is_empty() {
            format!("{} {}", timestamp(), msg)
        } else {
            format!("{} {} - {}", timestamp(), prefix, msg)
        };
        self.write(&line, true);
    }

    fn write(&self, line: &str, newline: bool) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = std::io::stdout().lock();
        // \r + clear-to-eol so a pending "starting" line is overwritten
        let _ = write!(out, "\r{line}\x1b[K");
        if newline {
            let _ = writeln!(out);
        }
        let _ = out.flush();
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("[%H:%M:%S%.3f]").to_string()
}

/// Category strings wider than 20 characters are clipped for the column.
fn clip_category(s: &str) -> String {
    if s.chars().count() > 20 {
        let head: String = s.chars().take(17).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_category_is_untouched() {
        assert_eq!(clip_category("Not detected"), "Not detected");
    }

    #[test]
    fn twenty_chars_is_the_limit() {
        let exact = "a".repeat(20);
        assert_eq!(clip_category(&exact), exact);
    }

    #[test]
    fn long_category_is_clipped_with_ellipsis() {
        let clipped = clip_category("Failed to complete detection");
        assert_eq!(clipped, "Failed to complet...");
        assert_eq!(clipped.chars().count(), 20);
    }
}
