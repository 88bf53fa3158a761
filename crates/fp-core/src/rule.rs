//! Rule-matching capability
//!
//! The engine never interprets rule syntax. A [`RuleParser`] turns one list
//! line into a [`FilterRule`], and the rule answers whether a request matches.

use crate::types::Request;

/// Error returned when a rule line cannot be parsed.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RuleParseError {
    #[error("empty rule")]
    Empty,
    #[error("comment line")]
    Comment,
    #[error("unsupported rule: {0}")]
    Unsupported(String),
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Error returned when a rule fails to evaluate against a request.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RuleMatchError {
    #[error("request has no host: {0}")]
    MissingHost(String),
    #[error("rule evaluation failed: {0}")]
    Evaluation(String),
}

/// A parsed rule that can be evaluated against requests.
pub trait FilterRule: Send + Sync {
    fn matches(&self, request: &Request<'_>) -> Result<bool, RuleMatchError>;
}

/// Parses list lines into rules.
pub trait RuleParser: Send + Sync {
    type Rule: FilterRule;

    fn parse_rule(&self, line: &str) -> Result<Self::Rule, RuleParseError>;
}

impl<R: FilterRule + ?Sized> FilterRule for Box<R> {
    fn matches(&self, request: &Request<'_>) -> Result<bool, RuleMatchError> {
        (**self).matches(request)
    }
}

impl<P: RuleParser + ?Sized> RuleParser for &P {
    type Rule = P::Rule;

    fn parse_rule(&self, line: &str) -> Result<Self::Rule, RuleParseError> {
        (**self).parse_rule(line)
    }
}
