use std::collections::BTreeSet;

use tracing::debug;

use super::error::ReconcileError;
use super::provider::{Criteria, Filter, FilterAction};
use crate::types::{DOES_NOT_HAVE_THE_WORD, HAS_THE_WORD, Rule};

const LABEL: &str = "label";
const FORWARD_TO: &str = "forwardTo";

/// Whether a system action adds or removes its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Add,
    Remove,
}

/// Actions expressed as an edit of a built-in label.
const SYSTEM_ACTIONS: &[(&str, Edit, &str)] = &[
    ("shouldAlwaysMarkAsImportant", Edit::Add, "IMPORTANT"),
    ("shouldArchive", Edit::Remove, "INBOX"),
    ("shouldMarkAsRead", Edit::Remove, "UNREAD"),
    ("shouldNeverMarkAsImportant", Edit::Remove, "IMPORTANT"),
    ("shouldNeverSpam", Edit::Remove, "SPAM"),
    ("shouldStar", Edit::Add, "STARRED"),
    ("shouldTrash", Edit::Add, "TRASH"),
];

/// Map a publishable rule onto the provider's filter shape.
///
/// `resolve_label` turns a label name into a label id; it decides whether
/// missing labels are created or stood in for.
pub(crate) fn to_filter(
    rule: &Rule,
    mut resolve_label: impl FnMut(&str) -> Result<String, ReconcileError>,
) -> Result<Filter, ReconcileError> {
    let mut criteria = Criteria::default();
    let mut add = BTreeSet::new();
    let mut remove = BTreeSet::new();
    let mut forward = None;

    for (key, construct) in rule.flatten() {
        let value = construct.value().into_owned();
        match key {
            "from" => criteria.from = Some(value),
            "to" => criteria.to = Some(value),
            "subject" => criteria.subject = Some(value),
            HAS_THE_WORD => criteria.query = Some(value),
            DOES_NOT_HAVE_THE_WORD => criteria.negated_query = Some(value),
            LABEL => {
                add.insert(resolve_label(&value)?);
            }
            FORWARD_TO => forward = Some(value),
            other => match SYSTEM_ACTIONS.iter().find(|(name, _, _)| *name == other) {
                Some((_, edit, label)) if value == "true" => {
                    let target = match edit {
                        Edit::Add => &mut add,
                        Edit::Remove => &mut remove,
                    };
                    target.insert((*label).to_owned());
                }
                Some(_) => {}
                None => debug!(key = other, "no filter field for construct"),
            },
        }
    }

    Ok(Filter {
        id: None,
        criteria,
        action: FilterAction {
            add_label_ids: add.into_iter().collect(),
            remove_label_ids: remove.into_iter().collect(),
            forward,
        },
    })
}

/// The comparable content of a filter: criteria and action, ignoring the id
/// and the order of label ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FilterShape {
    criteria: Criteria,
    add: BTreeSet<String>,
    remove: BTreeSet<String>,
    forward: Option<String>,
}

impl From<&Filter> for FilterShape {
    fn from(filter: &Filter) -> Self {
        Self {
            criteria: filter.criteria.clone(),
            add: filter.action.add_label_ids.iter().cloned().collect(),
            remove: filter.action.remove_label_ids.iter().cloned().collect(),
            forward: filter.action.forward.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::types::Spec;

    fn rule(pairs: &[(&str, Spec)]) -> Rule {
        let data: BTreeMap<String, Spec> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        Rule::from_mapping(&data, None).unwrap()
    }

    fn by_name(name: &str) -> Result<String, ReconcileError> {
        Ok(format!("id:{name}"))
    }

    #[test]
    fn criteria_fields() {
        let filter = to_filter(
            &rule(&[
                ("from", "a@x.com".into()),
                ("to", "b@x.com".into()),
                ("subject", "hello there".into()),
                ("has", "list:x".into()),
                ("missing", "spam".into()),
            ]),
            by_name,
        )
        .unwrap();
        assert_eq!(filter.criteria.from.as_deref(), Some("a@x.com"));
        assert_eq!(filter.criteria.to.as_deref(), Some("b@x.com"));
        assert_eq!(filter.criteria.subject.as_deref(), Some("\"hello there\""));
        assert_eq!(filter.criteria.query.as_deref(), Some("list:x"));
        assert_eq!(filter.criteria.negated_query.as_deref(), Some("spam"));
    }

    #[test]
    fn system_actions() {
        let filter = to_filter(
            &rule(&[
                ("from", "a".into()),
                ("archive", true.into()),
                ("read", true.into()),
                ("star", true.into()),
                ("important", true.into()),
                ("not_spam", true.into()),
            ]),
            by_name,
        )
        .unwrap();
        assert_eq!(filter.action.add_label_ids, vec!["IMPORTANT", "STARRED"]);
        assert_eq!(filter.action.remove_label_ids, vec!["INBOX", "SPAM", "UNREAD"]);
    }

    #[test]
    fn false_actions_edit_nothing() {
        let base = Arc::new(rule(&[("from", "a".into()), ("archive", true.into())]));
        let data = BTreeMap::from([
            ("archive".to_owned(), Spec::from(false)),
            ("trash".to_owned(), Spec::from(false)),
        ]);
        let child = Rule::from_mapping(&data, Some(base)).unwrap();
        let filter = to_filter(&child, by_name).unwrap();
        assert_eq!(filter.action, FilterAction::default());
    }

    #[test]
    fn labels_and_forward() {
        let filter = to_filter(
            &rule(&[
                ("from", "a".into()),
                ("label", "Receipts".into()),
                ("forward", "me@y.com".into()),
                ("trash", true.into()),
            ]),
            by_name,
        )
        .unwrap();
        assert_eq!(filter.action.add_label_ids, vec!["TRASH", "id:Receipts"]);
        assert_eq!(filter.action.forward.as_deref(), Some("me@y.com"));
    }

    #[test]
    fn label_resolution_errors_propagate() {
        let failing = |_: &str| -> Result<String, ReconcileError> {
            Err(ReconcileError::provider("create label")("quota".into()))
        };
        let result = to_filter(&rule(&[("from", "a".into()), ("label", "x".into())]), failing);
        assert!(matches!(result, Err(ReconcileError::Provider { .. })));
    }

    #[test]
    fn shape_ignores_id_and_order() {
        let mut a = Filter::default();
        a.action.add_label_ids = vec!["x".into(), "y".into()];
        let mut b = a.clone();
        b.id = Some("remote".into());
        b.action.add_label_ids = vec!["y".into(), "x".into()];
        assert_eq!(FilterShape::from(&a), FilterShape::from(&b));
        b.criteria.from = Some("z".into());
        assert_ne!(FilterShape::from(&a), FilterShape::from(&b));
    }
}
