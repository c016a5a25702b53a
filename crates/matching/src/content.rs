use {
    base64::{Engine as _, engine::general_purpose::STANDARD as BASE64},
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::warn,
};

use crate::anchored::AnchoredRegex;

/// A predicate over a string or binary value.
///
/// Serialized as a single-key object, e.g. `{"equalTo": "ping"}` or
/// `{"binaryEqualTo": "AAEC"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentPattern {
    EqualTo(String),
    Contains(String),
    /// Regex that must match the whole value.
    Matches(AnchoredRegex),
    DoesNotMatch(AnchoredRegex),
    /// Semantic JSON equality, ignoring formatting.
    EqualToJson(Value),
    /// Base64-encoded bytes compared against the raw payload.
    BinaryEqualTo(String),
    /// `true` matches only a missing value, `false` only a present one.
    Absent(bool),
}

impl ContentPattern {
    pub fn equal_to(value: impl Into<String>) -> Self {
        Self::EqualTo(value.into())
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self::Contains(value.into())
    }

    pub fn matches(regex: &str) -> Result<Self, regex::Error> {
        AnchoredRegex::new(regex).map(Self::Matches)
    }

    pub fn does_not_match(regex: &str) -> Result<Self, regex::Error> {
        AnchoredRegex::new(regex).map(Self::DoesNotMatch)
    }

    pub fn binary_equal_to(bytes: &[u8]) -> Self {
        Self::BinaryEqualTo(BASE64.encode(bytes))
    }

    /// Whether this pattern is declared over bytes rather than text.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::BinaryEqualTo(_))
    }

    /// Match an optional value, as for headers and query parameters.
    pub fn matches_value(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (Self::Absent(absent), value) => *absent == value.is_none(),
            (_, None) => false,
            (_, Some(value)) => self.matches_str(value),
        }
    }

    pub fn matches_str(&self, value: &str) -> bool {
        match self {
            Self::EqualTo(expected) => value == expected,
            Self::Contains(expected) => value.contains(expected.as_str()),
            Self::Matches(regex) => regex.is_match(value),
            Self::DoesNotMatch(regex) => !regex.is_match(value),
            Self::EqualToJson(expected) => serde_json::from_str::<Value>(value)
                .map(|actual| &actual == expected)
                .unwrap_or(false),
            Self::BinaryEqualTo(_) => self.matches_bytes(value.as_bytes()),
            Self::Absent(absent) => !absent,
        }
    }

    /// Match a raw payload. Text patterns see the payload decoded as UTF-8
    /// with invalid sequences replaced.
    pub fn matches_bytes(&self, value: &[u8]) -> bool {
        match self {
            Self::BinaryEqualTo(expected) => match BASE64.decode(expected) {
                Ok(expected) => expected == value,
                Err(e) => {
                    warn!(error = %e, "binaryEqualTo pattern is not valid base64");
                    false
                },
            },
            _ => self.matches_str(&String::from_utf8_lossy(value)),
        }
    }

    /// The expected value in the form it was declared, for diagnostics.
    pub fn expected(&self) -> String {
        match self {
            Self::EqualTo(v) | Self::Contains(v) | Self::BinaryEqualTo(v) => v.clone(),
            Self::Matches(re) | Self::DoesNotMatch(re) => re.as_str().to_string(),
            Self::EqualToJson(v) => v.to_string(),
            Self::Absent(absent) => absent.to_string(),
        }
    }
}
