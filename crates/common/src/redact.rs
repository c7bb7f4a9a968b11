//! Keeping credentials out of logs and terminal output

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Placeholder written in place of sensitive values
pub const REDACTED: &str = "[REDACTED]";

/// Words that mark a key as sensitive wherever they appear in it
const SENSITIVE_WORDS: &[&str] = &[
    "token",
    "secret",
    "password",
    "passwd",
    "pwd",
    "auth",
    "authorization",
    "credential",
    "credentials",
    "apikey",
    "cookie",
    "session",
];

/// Whole keys that are sensitive even though their words alone are not
const SENSITIVE_KEYS: &[&str] = &["key", "api_key", "access_key", "private_key"];

/// Keys that contain a sensitive word but carry no secret
const NOT_SENSITIVE: &[&str] = &["token_expiry", "token_type", "expires_in"];

/// A string that never prints its contents.
///
/// `Debug` and `Display` both render `[REDACTED]`; use [`Secret::expose`] at
/// the single point where the real value is needed.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Whether a field name looks like it carries a credential.
///
/// `newPassword`, `client-secret` and `X_AUTH_TOKEN` all normalize to
/// snake_case and match on the word they contain.
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = to_snake_case(key);
    if NOT_SENSITIVE.contains(&normalized.as_str()) {
        return false;
    }
    SENSITIVE_KEYS.contains(&normalized.as_str())
        || normalized
            .split('_')
            .any(|word| SENSITIVE_WORDS.contains(&word))
}

fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c == '-' || c == '.' || c == ' ' {
            out.push('_');
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Copy of `value` with every sensitive key's value replaced by `[REDACTED]`
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if is_sensitive_key(k) {
                        (k.clone(), Value::String(REDACTED.to_string()))
                    } else {
                        (k.clone(), redact_json(v))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        other => other.clone(),
    }
}

/// Short, non-reversible preview of a token for terminal output
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 8 {
        return REDACTED.to_string();
    }
    let prefix: String = token.chars().take(4).collect();
    format!("{}…{}", prefix, REDACTED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_secret_never_prints_value() {
        let secret = Secret::new("hunter2");
        assert_eq!(secret.to_string(), "[REDACTED]");
        assert_eq!(format!("{:?}", secret), "Secret([REDACTED])");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_sensitive_key_detection() {
        assert!(is_sensitive_key("password"));
        assert!(is_sensitive_key("Authorization"));
        assert!(is_sensitive_key("api-key"));
        assert!(is_sensitive_key("apiKey"));
        assert!(is_sensitive_key("user_password"));
        assert!(!is_sensitive_key("email"));
        assert!(!is_sensitive_key("expiresIn"));
        assert!(!is_sensitive_key("token_expiry"));
        assert!(!is_sensitive_key("author"));
    }

    #[test]
    fn test_camel_case_and_credential_keys() {
        for key in ["newPassword", "clientSecret", "credentials", "credential", "pwd", "auth", "X-Auth-Token", "APIKey", "key"] {
            assert!(is_sensitive_key(key), "{} should be sensitive", key);
        }

        let body = json!({
            "newPassword": "p1",
            "clientSecret": "s1",
            "credentials": "c1",
            "pwd": "w1",
            "expiresIn": 3600
        });
        let redacted = redact_json(&body);
        assert_eq!(redacted["newPassword"], REDACTED);
        assert_eq!(redacted["clientSecret"], REDACTED);
        assert_eq!(redacted["credentials"], REDACTED);
        assert_eq!(redacted["pwd"], REDACTED);
        assert_eq!(redacted["expiresIn"], 3600);
    }

    #[test]
    fn test_redact_json_masks_nested_values() {
        let body = json!({
            "email": "qa@example.com",
            "password": "hunter2",
            "profile": { "auth_token": "abc", "name": "QA" },
            "items": [{ "token": "t" }]
        });

        let redacted = redact_json(&body);
        assert_eq!(redacted["email"], "qa@example.com");
        assert_eq!(redacted["password"], REDACTED);
        assert_eq!(redacted["profile"]["auth_token"], REDACTED);
        assert_eq!(redacted["profile"]["name"], "QA");
        assert_eq!(redacted["items"][0]["token"], REDACTED);
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), REDACTED);
        let masked = mask_token("eyJhbGciOiJIUzI1NiJ9.payload");
        assert!(masked.starts_with("eyJh"));
        assert!(!masked.contains("payload"));
    }
}
