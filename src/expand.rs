use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::template::Bindings;
use crate::types::{CompileError, Rule, RuleSet, Spec};

const FOR_EACH: &str = "for_each";
const LOOP_RULE: &str = "rule";
const MORE: &str = "more";
const INDEX: &str = "index";
const ITEM: &str = "item";

/// Compile a list of top-level rule specifications into one [`RuleSet`].
///
/// # Errors
///
/// Returns the first [`CompileError`] raised by any entry.
pub fn compile(specs: &[Spec]) -> Result<RuleSet, CompileError> {
    let mut ruleset = RuleSet::new();
    for spec in specs {
        ruleset.extend(expand(spec, None)?);
    }
    debug!(entries = specs.len(), rules = ruleset.len(), "compiled rule document");
    Ok(ruleset)
}

/// Expand one specification fragment into rules inheriting from `base`.
///
/// - A mapping with `for_each` expands its `rule` once per element, with
///   `{index}` and `{item}` (or the element's own keys) bound in every value.
/// - A mapping with `more` yields its own rule, then expands `more` with that
///   rule as the base.
/// - Any other mapping yields a single rule.
/// - A sequence expands each element against the same base.
///
/// # Errors
///
/// Returns [`CompileError`] on the first malformed fragment. Nothing is
/// partially compiled.
pub fn expand(spec: &Spec, base: Option<Arc<Rule>>) -> Result<RuleSet, CompileError> {
    expand_scoped(spec, base, &Bindings::new())
}

fn expand_scoped(
    spec: &Spec,
    base: Option<Arc<Rule>>,
    bindings: &Bindings,
) -> Result<RuleSet, CompileError> {
    match spec {
        Spec::Mapping(map) if map.contains_key(FOR_EACH) => expand_loop(map, base, bindings),
        Spec::Mapping(map) => {
            let mut own = map.clone();
            let more = own.remove(MORE);

            let rule = Arc::new(build_rule(&own, base, bindings)?);
            let mut ruleset = RuleSet::new();
            ruleset.add(Arc::clone(&rule));

            if let Some(more) = more.filter(|m| !m.is_empty()) {
                ruleset.extend(expand_scoped(&more, Some(rule), bindings)?);
            }
            Ok(ruleset)
        }
        Spec::Sequence(items) => {
            let mut ruleset = RuleSet::new();
            for item in items {
                ruleset.extend(expand_scoped(item, base.clone(), bindings)?);
            }
            Ok(ruleset)
        }
        other => Err(CompileError::UnsupportedSpec {
            shape: other.shape(),
        }),
    }
}

/// Build a rule and interpolate the loop variables in scope into its own values.
fn build_rule(
    data: &BTreeMap<String, Spec>,
    base: Option<Arc<Rule>>,
    bindings: &Bindings,
) -> Result<Rule, CompileError> {
    let mut rule = Rule::from_mapping(data, base)?;
    if !bindings.is_empty() {
        rule.apply_format(bindings)?;
    }
    Ok(rule)
}

fn expand_loop(
    map: &BTreeMap<String, Spec>,
    base: Option<Arc<Rule>>,
    bindings: &Bindings,
) -> Result<RuleSet, CompileError> {
    let unexpected: Vec<String> = map
        .keys()
        .filter(|k| *k != FOR_EACH && *k != LOOP_RULE)
        .cloned()
        .collect();
    if !unexpected.is_empty() {
        return Err(CompileError::InvalidLoopKeys { keys: unexpected });
    }

    let body = map.get(LOOP_RULE).ok_or(CompileError::MissingLoopRule)?;
    let items = match map.get(FOR_EACH) {
        Some(Spec::Sequence(items)) => items.as_slice(),
        Some(other) => {
            return Err(CompileError::InvalidRuleType {
                key: FOR_EACH.to_owned(),
                shape: other.shape(),
            });
        }
        None => &[],
    };

    let mut ruleset = RuleSet::new();
    for (index, item) in items.iter().enumerate() {
        let scope = bindings.scoped(&iteration_bindings(index, item)?);
        ruleset.extend(expand_scoped(body, base.clone(), &scope)?);
    }
    Ok(ruleset)
}

/// `{index}` plus either `{item}` for a leaf element or one name per key of a
/// mapping element. A mapping element may not define `index` itself.
fn iteration_bindings(index: usize, item: &Spec) -> Result<Bindings, CompileError> {
    let mut vars = Bindings::new().with(INDEX, index.to_string());
    match item {
        Spec::Mapping(fields) => {
            if fields.contains_key(INDEX) {
                return Err(CompileError::InvalidLoopKeys {
                    keys: vec![INDEX.to_owned()],
                });
            }
            for (name, value) in fields {
                let text = value.as_text().ok_or_else(|| CompileError::InvalidRuleType {
                    key: name.clone(),
                    shape: value.shape(),
                })?;
                vars.insert(name.clone(), text);
            }
        }
        leaf => {
            let text = leaf.as_text().ok_or_else(|| CompileError::InvalidRuleType {
                key: FOR_EACH.to_owned(),
                shape: leaf.shape(),
            })?;
            vars.insert(ITEM, text);
        }
    }
    Ok(vars)
}
