use std::collections::BTreeMap;

use crate::types::{CompileError, Construct, Joiner, Spec};

const ANY: &str = "any";
const ALL: &str = "all";
const NOT: &str = "not";

/// Expand an `any` / `all` / `not` specification into condition constructs.
///
/// A plain string yields a single condition. The returned constructs are
/// sorted so that equivalent specifications compile identically.
pub(crate) fn build_compound(key: &str, spec: &Spec) -> Result<Vec<Construct>, CompileError> {
    let compound = match spec {
        Spec::Scalar(value) => return Ok(vec![Construct::condition(key, value)?]),
        Spec::Mapping(map) => map,
        other => {
            return Err(CompileError::InvalidRuleType {
                key: key.to_owned(),
                shape: other.shape(),
            });
        }
    };

    check_keys(compound)?;

    let mut conditions = Vec::new();
    if let Some(values) = compound.get(ANY) {
        conditions.extend(joined(key, Joiner::Or, values)?);
    }
    if let Some(values) = compound.get(ALL) {
        conditions.extend(joined(key, Joiner::And, values)?);
    }
    if let Some(inner) = compound.get(NOT) {
        conditions.extend(build_compound(key, inner)?.iter().map(Construct::negated));
    }
    conditions.sort();
    Ok(conditions)
}

fn check_keys(compound: &BTreeMap<String, Spec>) -> Result<(), CompileError> {
    let invalid: Vec<String> = compound
        .keys()
        .filter(|k| ![ANY, ALL, NOT].contains(&k.as_str()))
        .cloned()
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(CompileError::InvalidCompoundKeys { keys: invalid })
    }
}

/// A single string is one value, not a list of characters.
fn joined(key: &str, joiner: Joiner, values: &Spec) -> Result<Option<Construct>, CompileError> {
    let values: Vec<String> = match values {
        Spec::Scalar(value) => vec![value.clone()],
        Spec::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Spec::Scalar(value) => Ok(value.clone()),
                other => Err(CompileError::InvalidRuleType {
                    key: key.to_owned(),
                    shape: other.shape(),
                }),
            })
            .collect::<Result<_, _>>()?,
        other => {
            return Err(CompileError::InvalidRuleType {
                key: key.to_owned(),
                shape: other.shape(),
            });
        }
    };
    if values.is_empty() {
        return Ok(None);
    }
    Construct::joined(key, joiner, values).map(Some)
}
