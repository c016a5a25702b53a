//! Request and content matching.
//!
//! The HTTP stubbing engine that owns full request matching lives outside the
//! message core. This crate defines the shapes the core consumes from it: the
//! [`Request`] that opened a channel or hit an HTTP stub, the
//! [`RequestPattern`] used to select such requests, and a [`RequestMatcher`]
//! capability. [`DefaultRequestMatcher`] covers method, URL, header, query
//! and custom-matcher predicates.

pub mod anchored;
pub mod content;
pub mod matcher;
pub mod pattern;
pub mod request;

pub use {
    anchored::AnchoredRegex,
    content::ContentPattern,
    matcher::{
        CustomMatchers, DefaultRequestMatcher, MatchResult, RequestMatcher,
        RequestMatcherExtension,
    },
    pattern::{CustomMatcherDefinition, RequestPattern},
    request::Request,
};
