use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{anchored::AnchoredRegex, content::ContentPattern};

/// Reference to a named custom matcher plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMatcherDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

/// Selects HTTP requests.
///
/// At most one of the four URL fields is expected to be set; when several
/// are, all of them must match. A missing method or `ANY` matches every
/// method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Exact path plus query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Exact path, query ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    /// Regex over path plus query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<AnchoredRegex>,
    /// Regex over the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path_pattern: Option<AnchoredRegex>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, ContentPattern>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_parameters: BTreeMap<String, ContentPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_matcher: Option<CustomMatcherDefinition>,
}

impl RequestPattern {
    /// Matches every request.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn for_url_path(path: impl Into<String>) -> Self {
        Self {
            url_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn for_url_pattern(regex: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            url_pattern: Some(AnchoredRegex::new(regex)?),
            ..Self::default()
        })
    }

    pub fn for_url_path_pattern(regex: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            url_path_pattern: Some(AnchoredRegex::new(regex)?),
            ..Self::default()
        })
    }

    pub fn for_custom_matcher(
        name: impl Into<String>,
        parameters: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            custom_matcher: Some(CustomMatcherDefinition {
                name: name.into(),
                parameters,
            }),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into().to_uppercase());
        self
    }

    pub fn with_header(mut self, name: &str, pattern: ContentPattern) -> Self {
        self.headers.insert(name.to_lowercase(), pattern);
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, pattern: ContentPattern) -> Self {
        self.query_parameters.insert(name.into(), pattern);
        self
    }
}
