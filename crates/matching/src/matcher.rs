use std::{collections::HashMap, fmt, sync::Arc};

use tracing::warn;

use crate::{pattern::RequestPattern, request::Request};

/// Outcome of matching a request against a pattern.
///
/// Distance is in `[0, 1]`: `0` is an exact match, `1` matched nothing.
/// Only exact matches select channels or fire triggers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    distance: f64,
}

impl MatchResult {
    pub const EXACT: MatchResult = MatchResult { distance: 0.0 };
    pub const NO_MATCH: MatchResult = MatchResult { distance: 1.0 };

    pub fn partial(distance: f64) -> Self {
        Self {
            distance: distance.clamp(0.0, 1.0),
        }
    }

    pub fn of(matched: bool) -> Self {
        if matched { Self::EXACT } else { Self::NO_MATCH }
    }

    /// Mean distance of the sub-results; exact only if every one is.
    pub fn aggregate(results: impl IntoIterator<Item = MatchResult>) -> Self {
        let (count, total) = results
            .into_iter()
            .fold((0usize, 0.0), |(n, sum), r| (n + 1, sum + r.distance));
        if count == 0 {
            return Self::EXACT;
        }
        Self::partial(total / count as f64)
    }

    pub fn is_exact_match(&self) -> bool {
        self.distance == 0.0
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }
}

/// Request matching capability supplied by the HTTP stubbing layer.
pub trait RequestMatcher: Send + Sync {
    fn match_request(
        &self,
        request: &Request,
        pattern: &RequestPattern,
        custom_matchers: &CustomMatchers,
    ) -> MatchResult;

    fn is_exact_match(
        &self,
        request: &Request,
        pattern: &RequestPattern,
        custom_matchers: &CustomMatchers,
    ) -> bool {
        self.match_request(request, pattern, custom_matchers)
            .is_exact_match()
    }
}

/// A named matcher referenced from a pattern's `customMatcher` block.
pub trait RequestMatcherExtension: Send + Sync {
    fn name(&self) -> &str;

    fn match_request(
        &self,
        request: &Request,
        parameters: &serde_json::Map<String, serde_json::Value>,
    ) -> MatchResult;
}

/// Registered custom matchers, looked up by name.
#[derive(Clone, Default)]
pub struct CustomMatchers {
    matchers: HashMap<String, Arc<dyn RequestMatcherExtension>>,
}

impl CustomMatchers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, matcher: Arc<dyn RequestMatcherExtension>) {
        self.matchers.insert(matcher.name().to_string(), matcher);
    }

    pub fn with(mut self, matcher: Arc<dyn RequestMatcherExtension>) -> Self {
        self.register(matcher);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn RequestMatcherExtension>> {
        self.matchers.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl fmt::Debug for CustomMatchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.matchers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CustomMatchers")
            .field("names", &names)
            .finish()
    }
}

/// Method, URL, header, query-parameter and custom-matcher predicates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRequestMatcher;

impl DefaultRequestMatcher {
    fn match_method(request: &Request, pattern: &RequestPattern) -> MatchResult {
        match pattern.method.as_deref() {
            None => MatchResult::EXACT,
            Some(m) if m.eq_ignore_ascii_case("ANY") => MatchResult::EXACT,
            Some(m) => MatchResult::of(m.eq_ignore_ascii_case(&request.method)),
        }
    }

    fn match_url(request: &Request, pattern: &RequestPattern) -> Vec<MatchResult> {
        let mut results = Vec::new();
        if let Some(url) = &pattern.url {
            results.push(MatchResult::of(&request.url == url));
        }
        if let Some(path) = &pattern.url_path {
            results.push(MatchResult::of(request.path() == path));
        }
        if let Some(regex) = &pattern.url_pattern {
            results.push(MatchResult::of(regex.is_match(&request.url)));
        }
        if let Some(regex) = &pattern.url_path_pattern {
            results.push(MatchResult::of(regex.is_match(request.path())));
        }
        results
    }

    fn match_custom(
        request: &Request,
        pattern: &RequestPattern,
        custom_matchers: &CustomMatchers,
    ) -> Option<MatchResult> {
        let definition = pattern.custom_matcher.as_ref()?;
        match custom_matchers.get(&definition.name) {
            Some(matcher) => Some(matcher.match_request(request, &definition.parameters)),
            None => {
                warn!(name = %definition.name, "custom matcher is not registered");
                Some(MatchResult::NO_MATCH)
            },
        }
    }
}

impl RequestMatcher for DefaultRequestMatcher {
    fn match_request(
        &self,
        request: &Request,
        pattern: &RequestPattern,
        custom_matchers: &CustomMatchers,
    ) -> MatchResult {
        let mut results = vec![Self::match_method(request, pattern)];
        results.extend(Self::match_url(request, pattern));

        for (name, header) in &pattern.headers {
            results.push(MatchResult::of(header.matches_value(request.header(name))));
        }

        if !pattern.query_parameters.is_empty() {
            let params = request.query_params();
            for (name, param) in &pattern.query_parameters {
                let value = params
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.as_str());
                results.push(MatchResult::of(param.matches_value(value)));
            }
        }

        results.extend(Self::match_custom(request, pattern, custom_matchers));
        MatchResult::aggregate(results)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::content::ContentPattern, rstest::rstest};

    #[rstest]
    #[case(RequestPattern::for_url("/api/trigger"), "/api/trigger", true)]
    #[case(RequestPattern::for_url("/api/trigger"), "/api/trigger?x=1", false)]
    #[case(RequestPattern::for_url_path("/api/trigger"), "/api/trigger?x=1", true)]
    #[case(RequestPattern::for_url_pattern("/api/.*").unwrap(), "/api/other?x=1", true)]
    #[case(RequestPattern::for_url_pattern("/api/.*").unwrap(), "/web/other", false)]
    #[case(RequestPattern::for_url_path_pattern("/api/[a-z]+").unwrap(), "/api/other?x=1", true)]
    #[case(RequestPattern::any(), "/anything", true)]
    fn url_matching(#[case] pattern: RequestPattern, #[case] url: &str, #[case] exact: bool) {
        let result =
            DefaultRequestMatcher.match_request(&Request::get(url), &pattern, &CustomMatchers::new());
        assert_eq!(result.is_exact_match(), exact);
    }

    #[test]
    fn partial_match_is_not_exact() {
        let pattern = RequestPattern::for_url("/a").with_method("POST");
        let result =
            DefaultRequestMatcher.match_request(&Request::get("/a"), &pattern, &CustomMatchers::new());
        assert!(!result.is_exact_match());
        assert!(result.distance() > 0.0 && result.distance() < 1.0);
    }

    #[test]
    fn headers_and_query_params() {
        let pattern = RequestPattern::for_url_path("/ws")
            .with_header("X-Room", ContentPattern::equal_to("blue"))
            .with_query_param("user", ContentPattern::matches("[a-z]+").unwrap());
        let matching = Request::get("/ws?user=alice").with_header("x-room", "blue");
        let wrong_header = Request::get("/ws?user=alice").with_header("x-room", "red");
        let custom = CustomMatchers::new();
        assert!(DefaultRequestMatcher.is_exact_match(&matching, &pattern, &custom));
        assert!(!DefaultRequestMatcher.is_exact_match(&wrong_header, &pattern, &custom));
    }

    struct TenantMatcher;

    impl RequestMatcherExtension for TenantMatcher {
        fn name(&self) -> &str {
            "tenant"
        }

        fn match_request(
            &self,
            request: &Request,
            parameters: &serde_json::Map<String, serde_json::Value>,
        ) -> MatchResult {
            let expected = parameters.get("id").and_then(|v| v.as_str());
            MatchResult::of(expected.is_some() && request.header("x-tenant") == expected)
        }
    }

    #[test]
    fn custom_matcher_by_name() {
        let mut params = serde_json::Map::new();
        params.insert("id".into(), serde_json::json!("t1"));
        let pattern = RequestPattern::for_custom_matcher("tenant", params);
        let request = Request::get("/").with_header("X-Tenant", "t1");

        let custom = CustomMatchers::new().with(Arc::new(TenantMatcher));
        assert!(DefaultRequestMatcher.is_exact_match(&request, &pattern, &custom));
        assert!(!DefaultRequestMatcher.is_exact_match(&request, &pattern, &CustomMatchers::new()));
    }
}
