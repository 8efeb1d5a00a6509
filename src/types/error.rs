use thiserror::Error;

use crate::template::TemplateError;

/// Errors raised while turning a rule document into a [`RuleSet`](super::RuleSet).
///
/// These are never recovered internally: expansion of the offending fragment
/// stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unknown condition or action '{key}'")]
    InvalidIdentifier { key: String },

    #[error("invalid compound condition keys: {} (expected any, all, not)", keys.join(", "))]
    InvalidCompoundKeys { keys: Vec<String> },

    #[error("invalid for_each keys: {} (expected for_each, rule)", keys.join(", "))]
    InvalidLoopKeys { keys: Vec<String> },

    #[error("for_each loop has no 'rule'")]
    MissingLoopRule,

    #[error("unsupported value of type {shape} for '{key}'")]
    InvalidRuleType { key: String, shape: &'static str },

    #[error("construct key mismatch: '{actual}' filed under '{expected}'")]
    KeyMismatch { expected: String, actual: String },

    #[error("cannot build a ruleset from a {shape}")]
    UnsupportedSpec { shape: &'static str },

    #[error(transparent)]
    Template(#[from] TemplateError),
}
