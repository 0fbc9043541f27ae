//! Best-effort secret scrubbing for logs and error messages.

use std::sync::LazyLock;

use regex::Regex;

// key=value, key: value, and "key value" forms
static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(api[_-]?key|token|secret|password|auth)\b(\s*[:=]\s*|\s+)([^\s"']+)"#)
        .unwrap()
});

static BEARER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bBearer\s+([A-Za-z0-9\-_\.]+)").unwrap());

// Common provider key shapes
static OPENAI_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bsk-[A-Za-z0-9]{20,}\b").unwrap());
static GROQ_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bgsk_[A-Za-z0-9]{20,}\b").unwrap());

/// Replace recognizable secrets in `input` with `[REDACTED]`.
///
/// Best-effort: not every secret format will be caught.
pub fn redact_secrets(input: &str) -> String {
    let out = KEY_VALUE.replace_all(input, "$1$2[REDACTED]");
    let out = BEARER.replace_all(&out, "Bearer [REDACTED]");
    let out = OPENAI_KEY.replace_all(&out, "[REDACTED]");
    let out = GROQ_KEY.replace_all(&out, "[REDACTED]");
    out.into_owned()
}

/// Redact an API key, keeping a short prefix and suffix for debugging.
pub fn redact_api_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    if key.len() <= 8 {
        return "[REDACTED]".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}

/// Scrub an error's display text before it leaves the process.
pub fn sanitize_error(err: &dyn std::error::Error) -> String {
    redact_secrets(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_forms_redacted() {
        assert_eq!(redact_secrets("api_key=abc123"), "api_key=[REDACTED]");
        assert_eq!(redact_secrets("password: hunter2"), "password: [REDACTED]");
        assert_eq!(redact_secrets("TOKEN xyzzy"), "TOKEN [REDACTED]");
    }

    #[test]
    fn bearer_and_provider_keys_redacted() {
        assert_eq!(
            redact_secrets("Authorization: Bearer abc.def-ghi"),
            "Authorization: Bearer [REDACTED]"
        );
        let redacted = redact_secrets("key sk-abcdefghijklmnopqrstuvwx in use");
        assert!(!redacted.contains("sk-abcdefghijklmnopqrstuvwx"));
    }

    #[test]
    fn plain_text_untouched() {
        let text = "listing directory /home/user/workspace";
        assert_eq!(redact_secrets(text), text);
    }

    #[test]
    fn api_key_keeps_prefix_and_suffix() {
        assert_eq!(redact_api_key(""), "");
        assert_eq!(redact_api_key("short"), "[REDACTED]");
        assert_eq!(redact_api_key("sk-1234567890abcdef"), "sk-1...cdef");
    }
}
