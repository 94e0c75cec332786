//! Anonymous voter identity
//!
//! An identity is the lowercase hex SHA-256 of a few environment attributes joined
//! with `|`. It is stable for a given environment and is not an authentication
//! credential.
//!
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Opaque per-environment identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Attributes hashed into an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityAttributes {
    pub user_agent: String,
    pub language: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub color_depth: u32,
    pub time_zone: String,
    pub hardware_concurrency: usize,
}

impl IdentityAttributes {
    /// Attributes of the current process environment. There is no screen,
    /// so screen size and color depth are zero.
    pub fn from_env(user_agent: &str) -> Self {
        let language = std::env::var("LANG")
            .ok()
            .map(|lang| normalize_language(&lang))
            .filter(|lang| !lang.is_empty())
            .unwrap_or_else(|| "en-US".to_string());
        let time_zone = std::env::var("TZ")
            .ok()
            .filter(|tz| !tz.is_empty())
            .unwrap_or_else(|| "UTC".to_string());
        Self {
            user_agent: user_agent.to_string(),
            language,
            screen_width: 0,
            screen_height: 0,
            color_depth: 0,
            time_zone,
            hardware_concurrency: std::thread::available_parallelism().map_or(1, usize::from),
        }
    }

    /// `userAgent|language|WxH|colorDepth|timeZone|hardwareConcurrency`
    pub fn canonical(&self) -> String {
        format!(
            "{}|{}|{}x{}|{}|{}|{}",
            self.user_agent,
            self.language,
            self.screen_width,
            self.screen_height,
            self.color_depth,
            self.time_zone,
            self.hardware_concurrency
        )
    }

    pub fn fingerprint(&self) -> Identity {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().as_bytes());
        Identity(format!("{:x}", hasher.finalize()))
    }
}

// en_US.UTF-8 -> en-US
fn normalize_language(lang: &str) -> String {
    let base = lang.split(['.', '@']).next().unwrap_or_default();
    if base == "C" || base == "POSIX" {
        return String::new();
    }
    base.replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> IdentityAttributes {
        IdentityAttributes {
            user_agent: "Mozilla/5.0".into(),
            language: "en-US".into(),
            screen_width: 1920,
            screen_height: 1080,
            color_depth: 24,
            time_zone: "America/Chicago".into(),
            hardware_concurrency: 8,
        }
    }

    #[test]
    fn test_canonical_form() {
        assert_eq!(
            attrs().canonical(),
            "Mozilla/5.0|en-US|1920x1080|24|America/Chicago|8"
        );
    }

    #[test]
    fn test_fingerprint_stable_hex() {
        let a = attrs().fingerprint();
        let b = attrs().fingerprint();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
        assert!(
            a.as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
        let mut other = attrs();
        other.hardware_concurrency = 4;
        assert_ne!(other.fingerprint(), a);
    }

    #[test]
    fn test_empty_attributes_digest() {
        let empty = IdentityAttributes {
            user_agent: String::new(),
            language: String::new(),
            screen_width: 0,
            screen_height: 0,
            color_depth: 0,
            time_zone: String::new(),
            hardware_concurrency: 0,
        };
        assert_eq!(empty.canonical(), "||0x0|0||0");
        // sha256("||0x0|0||0")
        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"||0x0|0||0");
            format!("{:x}", hasher.finalize())
        };
        assert_eq!(empty.fingerprint().as_str(), expected);
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("en_US.UTF-8"), "en-US");
        assert_eq!(normalize_language("de_DE@euro"), "de-DE");
        assert_eq!(normalize_language("C"), "");
        assert_eq!(normalize_language("fr"), "fr");
    }
}
