//! Product code ("fanhao") extraction.
//!
//! A code is 2-5 letters, a hyphen and 2-5 digits (`IPX-922`). Codes are
//! always stored upper-case.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static CODE_SEARCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[a-z]{2,5}-[0-9]{2,5}").expect("valid code pattern"));

static CODE_EXACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,5}-[0-9]{2,5}$").expect("valid code pattern"));

/// A validated, upper-case product code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Code(String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Not a valid product code: {0:?}")]
pub struct InvalidCode(pub String);

impl Code {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl FromStr for Code {
    type Err = InvalidCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if CODE_EXACT.is_match(&upper) {
            Ok(Code(upper))
        } else {
            Err(InvalidCode(s.to_string()))
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Code {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Find the first code embedded in a file name.
pub fn extract_code(file_name: &str) -> Option<Code> {
    CODE_SEARCH
        .find(file_name)
        .map(|m| Code(m.as_str().to_ascii_uppercase()))
}

/// Actor name from a result title: whatever follows the last space.
pub fn extract_actor_name(title: &str) -> Option<String> {
    let (_, tail) = title.trim_end().rsplit_once(' ')?;
    let tail = tail.trim();
    if tail.is_empty() {
        None
    } else {
        Some(tail.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_filename() {
        assert_eq!(extract_code("IPX-922.mp4").unwrap().as_str(), "IPX-922");
    }

    #[test]
    fn test_extract_is_case_insensitive() {
        assert_eq!(extract_code("ipx-922.mp4").unwrap().as_str(), "IPX-922");
        assert_eq!(
            extract_code("[site] ssis-001 uncensored.mkv").unwrap().as_str(),
            "SSIS-001"
        );
    }

    #[test]
    fn test_extract_no_match() {
        assert!(extract_code("random_clip.mp4").is_none());
        assert!(extract_code("A-123.mp4").is_none());
        assert!(extract_code("ABC-1.mp4").is_none());
        assert!(extract_code("ABC123.mp4").is_none());
    }

    #[test]
    fn test_extract_takes_first_match() {
        let code = extract_code("ABP-100 and IPX-922.mp4").unwrap();
        assert_eq!(code.as_str(), "ABP-100");
    }

    #[test]
    fn test_extract_follows_pattern_limits() {
        // Longer runs are clipped to the pattern's bounds.
        assert_eq!(extract_code("ABC-123456.mp4").unwrap().as_str(), "ABC-12345");
        assert_eq!(extract_code("XABCDEF-12.mp4").unwrap().as_str(), "BCDEF-12");
    }

    #[test]
    fn test_code_from_str() {
        assert_eq!("ipx-922".parse::<Code>().unwrap().as_str(), "IPX-922");
        assert!("IPX922".parse::<Code>().is_err());
        assert!("IPX-922 extra".parse::<Code>().is_err());
        assert!("ABCDEF-12".parse::<Code>().is_err());
    }

    #[test]
    fn test_code_serde_as_string() {
        let code: Code = "IPX-922".parse().unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"IPX-922\"");
        let parsed: Code = serde_json::from_str("\"abp-100\"").unwrap();
        assert_eq!(parsed.as_str(), "ABP-100");
        assert!(serde_json::from_str::<Code>("\"nope\"").is_err());
    }

    #[test]
    fn test_extract_actor_name() {
        assert_eq!(
            extract_actor_name("IPX-922 坂道みる").as_deref(),
            Some("坂道みる")
        );
        assert_eq!(
            extract_actor_name("SSIS-001 Some Long Title Name").as_deref(),
            Some("Name")
        );
        assert_eq!(extract_actor_name("IPX-922"), None);
        assert_eq!(extract_actor_name(""), None);
        assert_eq!(extract_actor_name("IPX-922 坂道みる  ").as_deref(), Some("坂道みる"));
    }
}
