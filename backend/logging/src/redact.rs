//! Log Redaction Layer
//!
//! Scrubs bearer tokens, JWTs and Marionette session ids from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());
static JWT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"eyJ[a-zA-Z0-9_\-]+\.eyJ[a-zA-Z0-9_\-]+\.[a-zA-Z0-9_\-]*").unwrap()
});
// Both the JSON form and the `sessionId=...` form.
static SESSION_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"("sessionId"\s*:\s*)"[^"]*"|(sessionId\s*=\s*)[^\s,;&]+"#).unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = BEARER_RE.replace_all(input, "[REDACTED_TOKEN]");
    let redacted = JWT_RE.replace_all(&redacted, "[REDACTED_TOKEN]");
    SESSION_ID_RE
        .replace_all(&redacted, |caps: &regex::Captures| match caps.get(1) {
            Some(json_key) => format!("{}\"[REDACTED_SESSION]\"", json_key.as_str()),
            None => format!("{}[REDACTED_SESSION]", &caps[2]),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let raw = "Authorization: Bearer abc.def-123 then eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxIn0.sig_x";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("abc.def-123"));
        assert!(!clean.contains("eyJzdWIiOiIxIn0"));
        assert!(clean.starts_with("Authorization: [REDACTED_TOKEN]"));
    }

    #[test]
    fn session_id_values_are_scrubbed() {
        let raw = r#"{"sessionId": "4f0c-77aa", "capabilities": {}}"#;
        assert_eq!(
            redact_sensitive_data(raw),
            r#"{"sessionId": "[REDACTED_SESSION]", "capabilities": {}}"#
        );
        assert_eq!(
            redact_sensitive_data("closing sessionId=4f0c-77aa, bye"),
            "closing sessionId=[REDACTED_SESSION], bye"
        );
    }

    #[test]
    fn ordinary_text_is_untouched() {
        let raw = r#"[0,1,"WebDriver:Navigate",{"url":"https://example.com"}]"#;
        assert_eq!(redact_sensitive_data(raw), raw);
    }
}
