use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::error::CompileError;
use crate::template::{self, Bindings, TemplateError};

/// Rule keys accepted as conditions, mapped to the provider's canonical names.
const CONDITION_KEYS: &[(&str, &str)] = &[
    ("from", "from"),
    ("to", "to"),
    ("subject", "subject"),
    ("has", "hasTheWord"),
    ("match", "hasTheWord"),
    ("does_not_have", "doesNotHaveTheWord"),
    ("missing", "doesNotHaveTheWord"),
    ("no_match", "doesNotHaveTheWord"),
    ("smartlabel", "smartLabelToApply"),
];

/// Rule keys accepted as actions, mapped to the provider's canonical names.
const ACTION_KEYS: &[(&str, &str)] = &[
    ("label", "label"),
    ("important", "shouldAlwaysMarkAsImportant"),
    ("mark_as_important", "shouldAlwaysMarkAsImportant"),
    ("not_important", "shouldNeverMarkAsImportant"),
    ("never_mark_as_important", "shouldNeverMarkAsImportant"),
    ("archive", "shouldArchive"),
    ("read", "shouldMarkAsRead"),
    ("mark_as_read", "shouldMarkAsRead"),
    ("star", "shouldStar"),
    ("trash", "shouldTrash"),
    ("delete", "shouldTrash"),
    ("not_spam", "shouldNeverSpam"),
    ("forward", "forwardTo"),
];

/// `has: <value>` shortcuts that expand to `has:<value>` search terms.
const HAS_SHORTCUTS: &[&str] = &[
    "attachment",
    "document",
    "drive",
    "presentation",
    "spreadsheet",
    "youtube",
    "userlabels",
    "nouserlabels",
];

/// Shortcut keys rewritten to `<operator>:(<value>)` search terms.
const SEARCH_OPERATORS: &[(&str, &str)] = &[
    ("bcc", "bcc"),
    ("category", "category"),
    ("cc", "cc"),
    ("deliveredto", "deliveredto"),
    ("filename", "filename"),
    ("is", "is"),
    ("labeled", "label"),
    ("larger", "larger"),
    ("list", "list"),
    ("rfc822msgid", "rfc822msgid"),
    ("size", "size"),
    ("smaller", "smaller"),
];

/// Shortcut keys rewritten to unparenthesized `<operator>:<value>` search terms.
const DATE_OPERATORS: &[&str] = &["after", "before"];

pub(crate) const HAS_THE_WORD: &str = "hasTheWord";
pub(crate) const DOES_NOT_HAVE_THE_WORD: &str = "doesNotHaveTheWord";

/// Whether a [`Construct`] is a filter condition or a filter action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstructKind {
    Condition,
    Action,
}

impl ConstructKind {
    fn identifiers(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ConstructKind::Condition => CONDITION_KEYS,
            ConstructKind::Action => ACTION_KEYS,
        }
    }

    /// Resolve a rule key to its canonical name, accepting canonical names as-is.
    fn canonical_key(self, key: &str) -> Result<&'static str, CompileError> {
        let table = self.identifiers();
        table
            .iter()
            .find(|(alias, _)| *alias == key)
            .or_else(|| table.iter().find(|(_, canonical)| *canonical == key))
            .map(|(_, canonical)| *canonical)
            .ok_or_else(|| CompileError::InvalidIdentifier {
                key: key.to_owned(),
            })
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructKind::Condition => write!(f, "condition"),
            ConstructKind::Action => write!(f, "action"),
        }
    }
}

/// Joiner for compound condition values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Joiner {
    And,
    Or,
}

impl Joiner {
    fn as_str(self) -> &'static str {
        match self {
            Joiner::And => " AND ",
            Joiner::Or => " OR ",
        }
    }
}

/// One normalized key/value pair of a filter: a single condition or action.
///
/// Equality, ordering and hashing consider the kind, the canonical key and the
/// rendered value (including the `-` prefix of a negated condition).
#[derive(Debug, Clone)]
pub struct Construct {
    kind: ConstructKind,
    key: &'static str,
    value: String,
    negated: bool,
}

impl Construct {
    /// Build a construct from a rule key and value.
    ///
    /// Condition shortcuts (`list`, `is`, `has: attachment`, ...) are rewritten
    /// before the key is resolved. Condition values containing spaces are quoted.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidIdentifier`] if `key` is not a known
    /// identifier for `kind`.
    pub fn build(kind: ConstructKind, key: &str, value: &str) -> Result<Self, CompileError> {
        let construct = Self::unquoted(kind, key, value)?;
        Ok(match kind {
            ConstructKind::Condition => Construct {
                value: quote_if_necessary(&construct.value),
                ..construct
            },
            ConstructKind::Action => construct,
        })
    }

    /// Shorthand for `build(ConstructKind::Condition, ..)`.
    ///
    /// # Errors
    ///
    /// See [`Construct::build`].
    pub fn condition(key: &str, value: &str) -> Result<Self, CompileError> {
        Self::build(ConstructKind::Condition, key, value)
    }

    /// Shorthand for `build(ConstructKind::Action, ..)`.
    ///
    /// # Errors
    ///
    /// See [`Construct::build`].
    pub fn action(key: &str, value: &str) -> Result<Self, CompileError> {
        Self::build(ConstructKind::Action, key, value)
    }

    /// Like [`build`](Self::build) but stores the value without quoting.
    pub(crate) fn unquoted(kind: ConstructKind, key: &str, value: &str) -> Result<Self, CompileError> {
        let (key, value) = match kind {
            ConstructKind::Condition => remap(key, value),
            ConstructKind::Action => (key, Cow::Borrowed(value)),
        };
        Ok(Construct {
            kind,
            key: kind.canonical_key(key)?,
            value: value.into_owned(),
            negated: false,
        })
    }

    /// A single condition whose value is `values` joined and parenthesized.
    ///
    /// Values are deduplicated and sorted; each is quoted when necessary.
    pub(crate) fn joined(
        key: &str,
        joiner: Joiner,
        values: impl IntoIterator<Item = String>,
    ) -> Result<Self, CompileError> {
        Self::unquoted(ConstructKind::Condition, key, &join_values(joiner, values))
    }

    /// A construct of the same kind and key as `self` whose value ANDs together
    /// `values`. Used to collapse several constructs filed under one key.
    pub(crate) fn conjunction(&self, values: impl IntoIterator<Item = String>) -> Self {
        Construct {
            kind: self.kind,
            key: self.key,
            value: join_values(Joiner::And, values),
            negated: false,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ConstructKind {
        self.kind
    }

    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// The externally visible value, prefixed with `-` when negated.
    #[must_use]
    pub fn value(&self) -> Cow<'_, str> {
        if self.negated {
            Cow::Owned(format!("-{}", self.value))
        } else {
            Cow::Borrowed(&self.value)
        }
    }

    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// The same construct with its negation toggled. Negating twice restores the original.
    #[must_use]
    pub fn negated(&self) -> Self {
        Construct {
            negated: !self.negated,
            ..self.clone()
        }
    }

    /// Interpolate `{name}` placeholders in the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] if the value is not a valid template or uses
    /// an unbound name.
    pub fn apply_format(&mut self, bindings: &Bindings) -> Result<(), TemplateError> {
        self.value = template::render(&self.value, bindings)?;
        Ok(())
    }

    fn sort_key(&self) -> (&str, Cow<'_, str>, ConstructKind) {
        (self.key, self.value(), self.kind)
    }
}

impl PartialEq for Construct {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for Construct {}

impl PartialOrd for Construct {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Construct {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl Hash for Construct {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state);
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value())
    }
}

/// Rewrite shortcut condition keys into the search-term family they stand for.
fn remap<'a>(key: &'a str, value: &'a str) -> (&'a str, Cow<'a, str>) {
    if key == "has" && HAS_SHORTCUTS.contains(&value) {
        return (HAS_THE_WORD, Cow::Owned(format!("has:{value}")));
    }
    if let Some((_, operator)) = SEARCH_OPERATORS.iter().find(|(alias, _)| *alias == key) {
        let (family, term) = split_negation(value);
        return (family, Cow::Owned(format!("{operator}:({term})")));
    }
    if let Some(operator) = DATE_OPERATORS.iter().find(|op| **op == key) {
        let (family, term) = split_negation(value);
        return (family, Cow::Owned(format!("{operator}:{term}")));
    }
    (key, Cow::Borrowed(value))
}

fn split_negation(value: &str) -> (&'static str, &str) {
    match value.strip_prefix('-') {
        Some(rest) => (DOES_NOT_HAVE_THE_WORD, rest),
        None => (HAS_THE_WORD, value),
    }
}

/// Sort, deduplicate, quote and parenthesize `values`.
fn join_values(joiner: Joiner, values: impl IntoIterator<Item = String>) -> String {
    let mut values: Vec<String> = values.into_iter().collect();
    values.sort();
    values.dedup();
    let quoted: Vec<String> = values.iter().map(|v| quote_if_necessary(v)).collect();
    format!("({})", quoted.join(joiner.as_str()))
}

/// Wrap a condition value in double quotes if it contains a space and is not
/// already quoted, parenthesized, or negated.
#[must_use]
pub fn quote_if_necessary(value: &str) -> String {
    let parenthesized = value.starts_with('(') && value.ends_with(')');
    if value.contains(' ') && !value.contains('"') && !value.starts_with('-') && !parenthesized {
        format!("\"{value}\"")
    } else {
        value.to_owned()
    }
}
