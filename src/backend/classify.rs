//! Error classification for scrape outcomes
//!
//! Pure and deterministic: the retry driver and the orchestrator both key
//! off the verdicts produced here, and the tests rely on there being no
//! hidden state.

use super::ScrapeResult;

/// Classification of one scrape attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The attempt succeeded; no retry needed
    Success,

    /// Retrying cannot help (bad request, forbidden, not found)
    Permanent,

    /// Infrastructure hiccup; worth retrying with backoff
    Transient,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Classifies an HTTP outcome
///
/// Rules, evaluated in order:
///
/// 1. Transport-level failure (no response, or a timeout mid-body) is
///    Transient.
/// 2. 2xx is Success.
/// 3. 400, 401, 403, 404, 410, 422 are Permanent.
/// 4. 429 and all of 5xx are Transient.
/// 5. Anything else is Permanent; unknown statuses are never retried.
pub fn classify(http_status: Option<u16>, transport_error: bool) -> Verdict {
    if transport_error {
        return Verdict::Transient;
    }

    match http_status {
        Some(s) if (200..=299).contains(&s) => Verdict::Success,
        Some(400 | 401 | 403 | 404 | 410 | 422) => Verdict::Permanent,
        Some(429) => Verdict::Transient,
        Some(s) if (500..=599).contains(&s) => Verdict::Transient,
        _ => Verdict::Permanent,
    }
}

/// Classifies a full scrape result
///
/// A transport failure is recognized by an error with no status code. A
/// 2xx answer with no Markdown payload is still a failed scrape and is
/// treated as Transient.
pub fn classify_result(result: &ScrapeResult) -> Verdict {
    let transport_error = result.status_code.is_none() && result.error.is_some();
    match classify(result.status_code, transport_error) {
        Verdict::Success if !result.has_content() => Verdict::Transient,
        verdict => verdict,
    }
}
