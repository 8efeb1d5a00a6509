use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::rule::{Rule, RuleKey};

/// An ordered, deduplicated collection of compiled [`Rule`]s.
///
/// Iteration follows insertion order. Two rules with the same resolved content
/// are the same rule: adding the second is a no-op.
///
/// # Example
///
/// ```
/// use mailrules::RuleSet;
///
/// let ruleset = RuleSet::from_yaml(
///     "
/// - from: alice@x.com
///   trash: true
/// - from: alice@x.com
///   delete: true
/// ",
/// )
/// .unwrap();
/// assert_eq!(ruleset.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Arc<Rule>>,
    keys: HashSet<RuleKey>,
}

impl RuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, returning `false` if an equal rule is already present.
    pub fn add(&mut self, rule: impl Into<Arc<Rule>>) -> bool {
        let rule = rule.into();
        let key = rule.key();
        if !self.keys.insert(key) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn contains(&self, rule: &Rule) -> bool {
        self.keys.contains(&rule.key())
    }

    /// Rules in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.iter()
    }

    /// Rules ordered by resolved content.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Arc<Rule>> {
        let mut rules: Vec<&Arc<Rule>> = self.rules.iter().collect();
        rules.sort_by_cached_key(|r| r.key());
        rules
    }

    /// Publishable rules ordered by resolved content.
    pub fn publishable(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.sorted().into_iter().filter(|r| r.is_publishable())
    }

    /// Flattened, identified records for every publishable rule, ready to be
    /// rendered into a filter feed.
    #[must_use]
    pub fn export(&self) -> Vec<ExportedRule> {
        self.publishable()
            .map(|rule| ExportedRule {
                id: rule.key().digest(),
                properties: rule
                    .flatten()
                    .into_iter()
                    .map(|(key, construct)| (key.to_owned(), construct.value().into_owned()))
                    .collect(),
            })
            .collect()
    }

    /// Parse a YAML rule document and compile it.
    ///
    /// Convenience for [`load_yaml`](crate::load_yaml) followed by
    /// [`compile`](crate::compile).
    ///
    /// # Errors
    ///
    /// Returns [`Error`](crate::Error) on load or compile failure.
    pub fn from_yaml(input: &str) -> Result<Self, crate::Error> {
        let specs = crate::load::load_yaml(input)?;
        Ok(crate::expand::compile(&specs)?)
    }

    /// Read a YAML rule file and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`Error`](crate::Error) on I/O, load, or compile failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::Error> {
        let specs = crate::load::load_file(path)?;
        Ok(crate::expand::compile(&specs)?)
    }
}

impl Extend<Arc<Rule>> for RuleSet {
    fn extend<I: IntoIterator<Item = Arc<Rule>>>(&mut self, iter: I) {
        for rule in iter {
            self.add(rule);
        }
    }
}

impl Extend<Rule> for RuleSet {
    fn extend<I: IntoIterator<Item = Rule>>(&mut self, iter: I) {
        for rule in iter {
            self.add(rule);
        }
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut ruleset = Self::new();
        ruleset.extend(iter);
        ruleset
    }
}

impl IntoIterator for RuleSet {
    type Item = Arc<Rule>;
    type IntoIter = std::vec::IntoIter<Arc<Rule>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Arc<Rule>;
    type IntoIter = std::slice::Iter<'a, Arc<Rule>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let publishable = self.rules.iter().filter(|r| r.is_publishable()).count();
        write!(f, "RuleSet({} rules, {publishable} publishable)", self.rules.len())
    }
}

/// A publishable rule as it appears in a filter feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedRule {
    /// Stable content-derived identifier.
    pub id: u64,
    /// One `(key, value)` pair per canonical key, sorted by key.
    pub properties: Vec<(String, String)>,
}
