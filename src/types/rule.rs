use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::construct::{Construct, ConstructKind};
use super::error::CompileError;
use super::spec::Spec;
use crate::compound::build_compound;
use crate::template::{Bindings, TemplateError};

/// Every construct of a rule, including inherited ones, keyed by canonical key.
pub type RuleData = BTreeMap<&'static str, BTreeSet<Construct>>;

/// One mail filter: a bundle of conditions and actions.
///
/// A rule may inherit from a base rule. Inherited conditions are ANDed with
/// the rule's own; an action defined on the rule replaces the inherited action
/// under the same key. The base is shared, never mutated through the child.
///
/// Equality, ordering and hashing use the fully resolved [`data()`](Self::data),
/// so two rules that compile to the same filter are the same rule.
#[derive(Debug, Clone, Default)]
pub struct Rule {
    conditions: BTreeMap<&'static str, BTreeSet<Construct>>,
    actions: BTreeMap<&'static str, Construct>,
    base: Option<Arc<Rule>>,
}

impl Rule {
    /// An empty rule inheriting from `base`.
    #[must_use]
    pub fn new(base: Option<Arc<Rule>>) -> Self {
        Self {
            conditions: BTreeMap::new(),
            actions: BTreeMap::new(),
            base,
        }
    }

    /// Build a rule from a mapping of rule keys to values.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if any entry cannot be added; see [`add()`](Self::add).
    pub fn from_mapping(
        data: &BTreeMap<String, Spec>,
        base: Option<Arc<Rule>>,
    ) -> Result<Self, CompileError> {
        let mut rule = Self::new(base);
        for (key, value) in data {
            rule.add(key, value)?;
        }
        Ok(rule)
    }

    /// Add a rule key with its value.
    ///
    /// Strings and booleans become a single condition, or an action if `key`
    /// is not a condition. Mappings are compound conditions. Sequences add each
    /// element under the same key.
    ///
    /// # Errors
    ///
    /// - [`CompileError::InvalidIdentifier`] if `key` is neither a condition nor an action.
    /// - [`CompileError::InvalidRuleType`] for numbers and nulls.
    /// - [`CompileError::InvalidCompoundKeys`] for a malformed compound condition.
    pub fn add(&mut self, key: &str, value: &Spec) -> Result<(), CompileError> {
        match value {
            Spec::Flag(flag) => self.add_construction(key, if *flag { "true" } else { "false" }),
            Spec::Scalar(text) => self.add_construction(key, text),
            Spec::Mapping(_) => {
                for condition in build_compound(key, value)? {
                    self.file(condition);
                }
                Ok(())
            }
            Spec::Sequence(items) => items.iter().try_for_each(|item| self.add(key, item)),
            Spec::Number(_) | Spec::Null => Err(CompileError::InvalidRuleType {
                key: key.to_owned(),
                shape: value.shape(),
            }),
        }
    }

    fn add_construction(&mut self, key: &str, value: &str) -> Result<(), CompileError> {
        let construct = match Construct::condition(key, value) {
            Ok(condition) => condition,
            Err(CompileError::InvalidIdentifier { .. }) => Construct::action(key, value)?,
            Err(other) => return Err(other),
        };
        self.file(construct);
        Ok(())
    }

    /// Add an already-built construct under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::KeyMismatch`] if `key` differs from the construct's own key.
    pub fn insert(&mut self, key: &str, construct: Construct) -> Result<(), CompileError> {
        if key != construct.key() {
            return Err(CompileError::KeyMismatch {
                expected: key.to_owned(),
                actual: construct.key().to_owned(),
            });
        }
        self.file(construct);
        Ok(())
    }

    fn file(&mut self, construct: Construct) {
        let key = construct.key();
        match construct.kind() {
            ConstructKind::Condition => {
                self.conditions.entry(key).or_default().insert(construct);
            }
            // A given action is only taken once; the latest value wins.
            ConstructKind::Action => {
                self.actions.insert(key, construct);
            }
        }
    }

    #[must_use]
    pub fn base(&self) -> Option<&Arc<Rule>> {
        self.base.as_ref()
    }

    /// All constructs of this rule merged over those of its ancestors.
    #[must_use]
    pub fn data(&self) -> RuleData {
        let mut data = self.base.as_ref().map(|b| b.data()).unwrap_or_default();
        for (key, conditions) in &self.conditions {
            data.entry(*key)
                .or_default()
                .extend(conditions.iter().cloned());
        }
        for (key, action) in &self.actions {
            data.insert(*key, BTreeSet::from([action.clone()]));
        }
        data
    }

    /// Resolved conditions, sorted.
    #[must_use]
    pub fn conditions(&self) -> Vec<Construct> {
        self.constructs(ConstructKind::Condition)
    }

    /// Resolved actions, sorted.
    #[must_use]
    pub fn actions(&self) -> Vec<Construct> {
        self.constructs(ConstructKind::Action)
    }

    fn constructs(&self, kind: ConstructKind) -> Vec<Construct> {
        self.data()
            .into_values()
            .flatten()
            .filter(|c| c.kind() == kind)
            .collect()
    }

    /// Whether the provider would accept this rule: at least one condition and
    /// one action after inheritance.
    #[must_use]
    pub fn is_publishable(&self) -> bool {
        let data = self.data();
        let has = |kind: ConstructKind| data.values().flatten().any(|c| c.kind() == kind);
        has(ConstructKind::Condition) && has(ConstructKind::Action)
    }

    /// One construct per key. Several constructs under a key are combined into
    /// a single parenthesized `AND` of their sorted values.
    #[must_use]
    pub fn flatten(&self) -> BTreeMap<&'static str, Construct> {
        self.data()
            .into_iter()
            .filter_map(|(key, constructs)| {
                let first = constructs.first()?.clone();
                let flat = if constructs.len() == 1 {
                    first
                } else {
                    first.conjunction(constructs.iter().map(|c| c.value().into_owned()))
                };
                Some((key, flat))
            })
            .collect()
    }

    /// Interpolate `{name}` placeholders into this rule's own constructs.
    /// Inherited constructs are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] on a malformed template or an unbound name.
    pub fn apply_format(&mut self, bindings: &Bindings) -> Result<(), TemplateError> {
        for conditions in self.conditions.values_mut() {
            *conditions = std::mem::take(conditions)
                .into_iter()
                .map(|mut c| c.apply_format(bindings).map(|()| c))
                .collect::<Result<_, _>>()?;
        }
        for action in self.actions.values_mut() {
            action.apply_format(bindings)?;
        }
        Ok(())
    }

    /// The canonical, comparable form of the resolved data.
    #[must_use]
    pub fn key(&self) -> RuleKey {
        RuleKey(
            self.data()
                .into_iter()
                .map(|(key, constructs)| {
                    let values = constructs.iter().map(|c| c.value().into_owned()).collect();
                    (key, values)
                })
                .collect(),
        )
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Rule {}

impl PartialOrd for Rule {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rule {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule(")?;
        for (i, (key, construct)) in self.flatten().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{key}={}", construct.value())?;
        }
        write!(f, ")")
    }
}

/// Sorted `(key, sorted values)` pairs identifying a rule by content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleKey(Vec<(&'static str, Vec<String>)>);

impl RuleKey {
    /// A stable identifier derived from the content: the first eight bytes of
    /// the BLAKE3 digest of the canonical encoding, little-endian.
    #[must_use]
    pub fn digest(&self) -> u64 {
        let mut hasher = blake3::Hasher::new();
        for (key, values) in &self.0 {
            write_field(&mut hasher, key);
            hasher.update(&(values.len() as u64).to_le_bytes());
            for value in values {
                write_field(&mut hasher, value);
            }
        }
        let mut id = [0u8; 8];
        id.copy_from_slice(&hasher.finalize().as_bytes()[..8]);
        u64::from_le_bytes(id)
    }

    /// Iterate over the `(key, values)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (*k, v.as_slice()))
    }
}

fn write_field(hasher: &mut blake3::Hasher, text: &str) {
    hasher.update(&(text.len() as u64).to_le_bytes());
    hasher.update(text.as_bytes());
}
