//! Verdict classification: map a finished transfer to a diagnostic category

use std::fmt;

use crate::observer::THRESHOLD_BYTES;
use crate::probe::{CompletionKind, TransferOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictCategory {
    NotDetected,
    PossiblyDetected,
    Detected,
    DetectedLikely,
    Failed,
}

impl fmt::Display for VerdictCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerdictCategory::NotDetected => "Not detected",
            VerdictCategory::PossiblyDetected => "Possibly detected",
            VerdictCategory::Detected => "Detected",
            VerdictCategory::DetectedLikely => "Detected*",
            VerdictCategory::Failed => "Failed to complete detection",
        };
        f.write_str(s)
    }
}

/// Final diagnostic for one probe instance. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub category: VerdictCategory,
    pub detail: String,
}

/// Pure, total mapping from outcome to verdict. Cases are evaluated top
/// to bottom; the first match wins.
///
/// Completing with plenty of data means the path is healthy. A timeout
/// with zero bytes points at the connection itself being blocked, a
/// stronger signal than a timeout after partial data. An abort the
/// observer requested at threshold is a healthy path, not a failure;
/// any other abort is unexplained and suspicious.
pub fn classify(outcome: &TransferOutcome) -> Verdict {
    let (category, detail) = match outcome.kind {
        CompletionKind::Success if outcome.bytes_received >= THRESHOLD_BYTES => {
            (VerdictCategory::NotDetected, "Received >= threshold".to_string())
        }
        CompletionKind::Success => (
            VerdictCategory::PossiblyDetected,
            "Stream ended, data too small".to_string(),
        ),
        CompletionKind::Timeout if outcome.bytes_received == 0 => (
            VerdictCategory::DetectedLikely,
            "Timeout with zero bytes (likely connection blocked)".to_string(),
        ),
        CompletionKind::Timeout => (
            VerdictCategory::Detected,
            "Timeout after partial data (read blocked)".to_string(),
        ),
        CompletionKind::AbortedByCallback if outcome.aborted_by_threshold => (
            VerdictCategory::NotDetected,
            "Early abort: threshold reached".to_string(),
        ),
        CompletionKind::AbortedByCallback => (
            VerdictCategory::Detected,
            "Unexpected abort before threshold".to_string(),
        ),
        CompletionKind::OtherError => (
            VerdictCategory::Failed,
            format!(
                "transport_error={} ({})",
                outcome.error_code, outcome.error_detail
            ),
        ),
    };
    Verdict { category, detail }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(kind: CompletionKind, bytes: u64) -> TransferOutcome {
        TransferOutcome {
            http_status: 200,
            bytes_received: bytes,
            elapsed_ms: 12.3,
            kind,
            aborted_by_threshold: false,
            error_code: String::new(),
            error_detail: String::new(),
        }
    }

    #[test]
    fn success_over_threshold_is_not_detected() {
        let v = classify(&outcome(CompletionKind::Success, 70000));
        assert_eq!(v.category, VerdictCategory::NotDetected);
        assert_eq!(v.detail, "Received >= threshold");
    }

    #[test]
    fn success_exactly_at_threshold_is_not_detected() {
        let v = classify(&outcome(CompletionKind::Success, THRESHOLD_BYTES));
        assert_eq!(v.category, VerdictCategory::NotDetected);
    }

    #[test]
    fn success_with_small_body_is_possibly_detected() {
        let v = classify(&outcome(CompletionKind::Success, 500));
        assert_eq!(v.category, VerdictCategory::PossiblyDetected);
        assert_eq!(v.detail, "Stream ended, data too small");
    }

    #[test]
    fn timeout_with_zero_bytes_is_detected_likely() {
        let v = classify(&outcome(CompletionKind::Timeout, 0));
        assert_eq!(v.category, VerdictCategory::DetectedLikely);
        assert_eq!(
            v.detail,
            "Timeout with zero bytes (likely connection blocked)"
        );
    }

    #[test]
    fn timeout_after_partial_data_is_detected() {
        let v = classify(&outcome(CompletionKind::Timeout, 1024));
        assert_eq!(v.category, VerdictCategory::Detected);
        assert_eq!(v.detail, "Timeout after partial data (read blocked)");
    }

    #[test]
    fn threshold_abort_is_not_detected() {
        let mut o = outcome(CompletionKind::AbortedByCallback, THRESHOLD_BYTES);
        o.aborted_by_threshold = true;
        let v = classify(&o);
        assert_eq!(v.category, VerdictCategory::NotDetected);
        assert_eq!(v.detail, "Early abort: threshold reached");
    }

    #[test]
    fn unexplained_abort_is_detected() {
        let v = classify(&outcome(CompletionKind::AbortedByCallback, 100));
        assert_eq!(v.category, VerdictCategory::Detected);
        assert_eq!(v.detail, "Unexpected abort before threshold");
    }

    #[test]
    fn transport_error_is_failed_and_carries_detail() {
        let mut o = outcome(CompletionKind::OtherError, 0);
        o.error_code = "connect".into();
        o.error_detail = "connect refused".into();
        let v = classify(&o);
        assert_eq!(v.category, VerdictCategory::Failed);
        assert!(v.detail.contains("connect refused"));
        assert!(v.detail.starts_with("transport_error=connect"));
    }

    #[test]
    fn classification_is_deterministic() {
        let o = outcome(CompletionKind::Timeout, 42);
        assert_eq!(classify(&o), classify(&o));
    }
}
