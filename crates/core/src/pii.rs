//! PII redaction
//!
//! Citation sources and excerpts are sanitized before they reach the
//! user-visible answer footer.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    // US-style numbers: 312-555-1212, (312) 555 1212, +1 312.555.1212
    Regex::new(r"(?:\+?1[\s.\-]?)?(?:\(\d{3}\)|\d{3})[\s.\-]\d{3}[\s.\-]\d{4}")
        .expect("valid phone regex")
});

/// Replace email addresses and phone numbers with redaction markers
pub fn redact_pii(text: &str) -> String {
    let redacted = EMAIL_RE.replace_all(text, "[REDACTED_EMAIL]");
    PHONE_RE.replace_all(&redacted, "[REDACTED_PHONE]").into_owned()
}
