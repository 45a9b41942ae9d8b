//! Probe executor: one bounded, abortable HTTP GET per probe instance

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures_util::StreamExt;

use crate::observer::TransferObserver;
use crate::report::Console;
use crate::target::ProbeInstance;

/// Default per-probe timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Success,
    Timeout,
    AbortedByCallback,
    OtherError,
}

/// Raw result of one transfer attempt, produced exactly once per probe
/// instance and then handed to the classifier.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// HTTP status code, 0 if no response was ever received
    pub http_status: u16,
    pub bytes_received: u64,
    pub elapsed_ms: f64,
    pub kind: CompletionKind,
    /// True only when the observer itself requested the abort
    pub aborted_by_threshold: bool,
    /// Short transport error kind, empty unless `kind == OtherError`
    pub error_code: String,
    pub error_detail: String,
}

/// Append a cache-busting query parameter so caching layers cannot
/// short-circuit the probe and mask interference.
pub fn cache_busted_url(url: &str, display_id: &str) -> String {
    let mut hasher = DefaultHasher::new();
    display_id.hash(&mut hasher);
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}t={}", hasher.finish())
}

/// Low-speed cutoff: if no data arrives for timeout/1000 seconds the
/// read times out, equivalent to a 1 byte/s floor over that window.
fn low_speed_window(timeout_ms: u64) -> Duration {
    Duration::from_secs((timeout_ms / 1000).max(1))
}

/// Run one HTTP GET for `instance` and produce its outcome. Redirects
/// are never followed (a redirect is diagnostic signal, not something to
/// chase). Body bytes are counted and discarded. An `Err` here means the
/// client could not even be built; the probe then yields no verdict.
pub async fn execute(
    instance: &ProbeInstance,
    timeout_ms: u64,
    console: &Console,
) -> anyhow::Result<TransferOutcome> {
    let started = Instant::now();

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .read_timeout(low_speed_window(timeout_ms))
        .tcp_keepalive(Duration::from_secs(60))
        .user_agent(USER_AGENT)
        .build()?;

    let url = cache_busted_url(&instance.target.url, &instance.display_id);
    console.start_line(&instance.display_id, &url);

    let observer = TransferObserver::new();
    let mut http_status = 0u16;
    let mut kind = CompletionKind::Success;
    let mut error_code = String::new();
    let mut error_detail = String::new();

    let request = client
        .get(&url)
        .timeout(Duration::from_millis(timeout_ms))
        .send();
    match request.await {
        Err(e) => (kind, error_code, error_detail) = completion_for_error(&e),
        Ok(response) => {
            http_status = response.status().as_u16();
            let mut stream = response.bytes_stream();
            loop {
                match stream.next().await {
                    None => break,
                    Some(Ok(chunk)) => {
                        // content is discarded, only the count matters
                        observer.add(chunk.len() as u64);
                        if observer.should_abort() {
                            kind = CompletionKind::AbortedByCallback;
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        (kind, error_code, error_detail) = completion_for_error(&e);
                        break;
                    }
                }
            }
        }
    }

    Ok(TransferOutcome {
        http_status,
        bytes_received: observer.received(),
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
        kind,
        aborted_by_threshold: observer.aborted_by_threshold(),
        error_code,
        error_detail,
    })
}

fn completion_for_error(e: &reqwest::Error) -> (CompletionKind, String, String) {
    if e.is_timeout() {
        return (CompletionKind::Timeout, String::new(), String::new());
    }
    let code = if e.is_connect() {
        "connect"
    } else if e.is_redirect() {
        "redirect"
    } else if e.is_body() {
        "body"
    } else if e.is_decode() {
        "decode"
    } else if e.is_request() {
        "request"
    } else {
        "transport"
    };
    (
        CompletionKind::OtherError,
        code.to_string(),
        condensed(e),
    )
}

/// Flatten the error chain into one line, keeping the root cause.
fn condensed(e: &reqwest::Error) -> String {
    let mut root: &dyn std::error::Error = e;
    while let Some(inner) = root.source() {
        root = inner;
    }
    let top = e.to_string();
    let cause = root.to_string();
    if cause == top {
        top
    } else {
        format!("{top}: {cause}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Target;

    #[test]
    fn cache_buster_uses_question_mark_without_query() {
        let busted = cache_busted_url("https://a.example/file", "t1");
        assert!(busted.starts_with("https://a.example/file?t="));
        assert!(!busted.contains('&'));
    }

    #[test]
    fn cache_buster_appends_with_ampersand_when_query_present() {
        let busted = cache_busted_url("https://a.example/file?x=1", "t1");
        assert!(busted.starts_with("https://a.example/file?x=1&t="));
    }

    #[test]
    fn low_speed_window_never_drops_below_one_second() {
        assert_eq!(low_speed_window(500), Duration::from_secs(1));
        assert_eq!(low_speed_window(5000), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn refused_connection_yields_other_error() {
        let target = Target {
            id: "refused".into(),
            provider: "local".into(),
            // nothing listens on the discard port
            url: "http://127.0.0.1:9/".into(),
            repetitions: 1,
        };
        let instance = ProbeInstance::new(&target, 0);
        let console = Console::new();
        let outcome = execute(&instance, 1000, &console).await.expect("outcome");
        assert_eq!(outcome.kind, CompletionKind::OtherError);
        assert_eq!(outcome.http_status, 0);
        assert_eq!(outcome.bytes_received, 0);
        assert!(!outcome.error_code.is_empty());
    }
}
