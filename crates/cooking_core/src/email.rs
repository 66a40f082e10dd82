use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .expect("email pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid email address {0:?}")]
pub struct InvalidEmail(pub String);

/// Trims the optional notification address; blank means "no address".
pub fn normalize_email(email: Option<&str>) -> Result<Option<String>, InvalidEmail> {
    let Some(raw) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    if EMAIL.is_match(raw) {
        Ok(Some(raw.to_string()))
    } else {
        Err(InvalidEmail(raw.to_string()))
    }
}
