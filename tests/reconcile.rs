
use std::time::{Duration, Instant};

use fake::FakeProvider;
use mailrules::reconcile::{Criteria, FilterAction, ReconcileError};
use mailrules::{Filter, ReconcileOptions, Reconciler, RuleSet};

fn options() -> ReconcileOptions {
    ReconcileOptions::new().create_delay(Duration::ZERO)
}

fn ruleset(input: &str) -> RuleSet {
    RuleSet::from_yaml(input).unwrap()
}

fn from_filter(from: &str, action: FilterAction) -> Filter {
    Filter {
        id: None,
        criteria: Criteria {
            from: Some(from.to_owned()),
            ..Criteria::default()
        },
        action,
    }
}

fn labelled(names: &[&str]) -> FakeProvider {
    names
        .iter()
        .fold(FakeProvider::with_system_labels(), |p, name| p.with_label(name))
}

#[test]
fn upload_excludes_non_publishable() {
    let rules = ruleset(
        "
- {from: alice, archive: true}
- {from: bob}
- {archive: true}
",
    );
    let mut reconciler = Reconciler::new(FakeProvider::new(), options()).unwrap();
    let report = reconciler.upload(&rules).unwrap();

    assert_eq!(report.created.len(), 1);
    let provider = reconciler.into_provider();
    assert_eq!(provider.filters.len(), 1);
    assert_eq!(
        provider.filters[0],
        Filter {
            id: Some("Filter_1".into()),
            ..from_filter(
                "alice",
                FilterAction {
                    remove_label_ids: vec!["INBOX".into()],
                    ..FilterAction::default()
                }
            )
        }
    );
}

#[test]
fn upload_forward() {
    let rules = ruleset("[{from: alice, forward: bob}]");
    let mut reconciler = Reconciler::new(FakeProvider::new(), options()).unwrap();
    reconciler.upload(&rules).unwrap();
    let body = serde_json::to_value(&reconciler.provider().filters[0]).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "id": "Filter_1",
            "criteria": {"from": "alice"},
            "action": {"forward": "bob"}
        })
    );
}

#[test]
fn upload_creates_missing_labels_once() {
    let rules = ruleset(
        "
- {from: alice, label: Friends}
- {from: bob, label: friends}
- {from: carol, label: work}
",
    );
    let provider = labelled(&["work"]);
    let mut reconciler = Reconciler::new(provider, options()).unwrap();
    let report = reconciler.upload(&rules).unwrap();

    assert_eq!(report.created.len(), 3);
    assert_eq!(report.labels_created.len(), 1);
    assert_eq!(report.labels_created[0].name, "Friends");
    let provider = reconciler.provider();
    assert_eq!(
        provider
            .calls
            .iter()
            .filter(|c| c.starts_with("create_label"))
            .count(),
        1
    );
}

#[test]
fn label_names_are_normalized() {
    let rules = ruleset("{from: alice, label: foo bar}");
    let provider = labelled(&["foo-bar"]);
    let existing = provider.label_id("foo-bar").unwrap().to_owned();
    let mut reconciler = Reconciler::new(provider, options()).unwrap();
    let report = reconciler.upload(&rules).unwrap();

    assert!(report.labels_created.is_empty());
    assert_eq!(report.created[0].action.add_label_ids, vec![existing]);
}

#[test]
fn existing_filters_are_not_recreated() {
    let rules = ruleset("{from: alice, star: true, important: true}");
    let remote = from_filter(
        "alice",
        FilterAction {
            add_label_ids: vec!["STARRED".into(), "IMPORTANT".into()],
            ..FilterAction::default()
        },
    );
    let mut reconciler =
        Reconciler::new(FakeProvider::new().with_filter(remote), options()).unwrap();
    let report = reconciler.sync(&rules).unwrap();
    assert!(report.is_noop());
    assert!(reconciler.provider().calls.is_empty());
}

#[test]
fn prune_deletes_stale_filters() {
    let rules = ruleset("{from: alice, trash: true}");
    let keep = from_filter(
        "alice",
        FilterAction {
            add_label_ids: vec!["TRASH".into()],
            ..FilterAction::default()
        },
    );
    let stale = from_filter("mallory", FilterAction::default());
    let provider = FakeProvider::new().with_filter(keep).with_filter(stale);
    let mut reconciler = Reconciler::new(provider, options()).unwrap();

    let report = reconciler.prune_filters(&rules).unwrap();
    assert_eq!(report.deleted.len(), 1);
    assert_eq!(report.deleted[0].criteria.from.as_deref(), Some("mallory"));
    assert_eq!(reconciler.provider().filters.len(), 1);
}

#[test]
fn remote_filters_without_action() {
    let filters: Vec<Filter> =
        serde_json::from_str(r#"[{"id": "f1", "criteria": {"from": "alice"}}]"#).unwrap();
    let mut provider = FakeProvider::new();
    provider.filters = filters;
    let mut reconciler = Reconciler::new(provider, options()).unwrap();
    let report = reconciler.sync(&ruleset("{from: alice, star: true}")).unwrap();
    assert_eq!(report.upload.created.len(), 1);
    assert_eq!(report.prune.deleted[0].id.as_deref(), Some("f1"));
}

#[test]
fn sync_reaches_fixed_point() {
    let rules = ruleset(
        "
- from: alice
  label: Friends
  more:
    subject: party
    star: true
- for_each: [one, two]
  rule: {to: '{item}@x.com', label: 'lists/{item}', archive: true}
",
    );
    let provider = FakeProvider::with_system_labels()
        .with_filter(from_filter("old", FilterAction::default()));
    let mut reconciler = Reconciler::new(provider, options()).unwrap();

    let first = reconciler.sync(&rules).unwrap();
    assert_eq!(first.upload.created.len(), 4);
    assert_eq!(first.prune.deleted.len(), 1);

    let second = reconciler.sync(&rules).unwrap();
    assert!(second.is_noop());
    assert!(reconciler.plan(&rules).unwrap().is_empty());
}

#[test]
fn dry_run_changes_nothing() {
    let rules = ruleset(
        "
- {from: alice, label: brand new}
- {from: bob, archive: true}
",
    );
    let provider = labelled(&["unused"]).with_filter(from_filter("old", FilterAction::default()));
    let before_labels = provider.labels.clone();
    let before_filters = provider.filters.clone();
    let mut reconciler = Reconciler::new(provider, options().dry_run(true)).unwrap();

    let report = reconciler.sync(&rules).unwrap();
    assert_eq!(report.upload.created.len(), 2);
    assert_eq!(report.upload.labels_created[0].id, "FakeLabel_brand-new");
    assert_eq!(report.prune.deleted.len(), 1);
    let labels = reconciler.prune_labels(&rules).unwrap();
    assert_eq!(labels.deleted.len(), 1);

    let provider = reconciler.into_provider();
    assert!(provider.calls.is_empty());
    assert_eq!(provider.labels, before_labels);
    assert_eq!(provider.filters, before_filters);
}

#[test]
fn plan_does_not_create_labels() {
    let rules = ruleset("{from: alice, label: brand new}");
    let reconciler = Reconciler::new(FakeProvider::new(), options()).unwrap();
    let plan = reconciler.plan(&rules).unwrap();
    assert_eq!(plan.create.len(), 1);
    assert_eq!(plan.missing_labels, vec!["brand new"]);
    assert!(reconciler.provider().calls.is_empty());
}

#[test]
fn plan_reports_each_missing_label_once() {
    let rules = ruleset(
        "
- {from: a, label: Friends}
- {from: b, label: friends}
- {from: c, label: foo bar}
- {from: d, label: foo-bar}
",
    );
    let reconciler = Reconciler::new(FakeProvider::new(), options()).unwrap();
    let plan = reconciler.plan(&rules).unwrap();
    assert_eq!(plan.missing_labels, vec!["Friends", "foo bar"]);
}

#[test]
fn overridden_action_without_effect_is_not_uploaded() {
    let rules = ruleset(
        "
from: alice
archive: true
more:
  subject: party
  archive: false
",
    );
    let empty = Filter {
        criteria: Criteria {
            from: Some("alice".into()),
            subject: Some("party".into()),
            ..Criteria::default()
        },
        ..Filter::default()
    };
    let provider = FakeProvider::new().with_filter(empty);
    let mut reconciler = Reconciler::new(provider, options()).unwrap();

    let plan = reconciler.plan(&rules).unwrap();
    assert_eq!(plan.create.len(), 1);
    assert_eq!(plan.delete.len(), 1);

    let report = reconciler.sync(&rules).unwrap();
    assert_eq!(report.upload.created.len(), 1);
    assert_eq!(
        report.upload.created[0].action.remove_label_ids,
        vec!["INBOX"]
    );
    assert_eq!(report.prune.deleted[0].criteria.subject.as_deref(), Some("party"));
    assert!(reconciler
        .provider()
        .filters
        .iter()
        .all(|f| !f.action.is_empty()));
    assert!(reconciler.sync(&rules).unwrap().is_noop());
}

#[test]
fn creations_are_paced() {
    let delay = Duration::from_millis(30);
    let rules = ruleset(
        "
- {from: a, star: true}
- {from: b, star: true}
- {from: c, star: true}
",
    );
    let mut reconciler =
        Reconciler::new(FakeProvider::new(), ReconcileOptions::new().create_delay(delay)).unwrap();

    let start = Instant::now();
    let report = reconciler.upload(&rules).unwrap();
    assert_eq!(report.created.len(), 3);
    assert!(start.elapsed() >= delay * 2);
}

#[test]
fn dry_run_is_not_paced() {
    let delay = Duration::from_millis(30);
    let rules = ruleset(
        "
- {from: a, star: true}
- {from: b, star: true}
- {from: c, star: true}
",
    );
    let options = ReconcileOptions::new().create_delay(delay).dry_run(true);
    let mut reconciler = Reconciler::new(FakeProvider::new(), options).unwrap();

    let start = Instant::now();
    let report = reconciler.upload(&rules).unwrap();
    assert_eq!(report.created.len(), 3);
    assert!(start.elapsed() < delay);
}

#[test]
fn prune_labels_not_in_ruleset() {
    let rules = ruleset("[{from: alice, label: one}]");
    let provider = labelled(&["one", "two", "three"]);
    let two = provider.label_id("two").unwrap().to_owned();
    let three = provider.label_id("three").unwrap().to_owned();
    let mut reconciler = Reconciler::new(provider, options()).unwrap();

    let report = reconciler.prune_labels(&rules).unwrap();
    let deleted: Vec<&str> = report.deleted.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(deleted, vec!["three", "two"]);
    assert_eq!(
        reconciler.provider().calls,
        vec![format!("delete_label {three}"), format!("delete_label {two}")]
    );
}

#[test]
fn prune_labels_error_is_fatal_by_default() {
    let rules = ruleset("[{from: alice, label: one}]");
    let mut provider = labelled(&["one", "two", "three"]);
    provider.broken_labels = provider.labels.iter().map(|l| l.id.clone()).collect();
    let mut reconciler = Reconciler::new(provider, options()).unwrap();

    let err = reconciler.prune_labels(&rules).unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Provider {
            operation: "delete label",
            ..
        }
    ));
}

#[test]
fn prune_labels_can_continue_on_error() {
    let rules = ruleset("[{from: alice, label: one}]");
    let mut provider = labelled(&["one", "two", "three"]);
    provider.broken_labels = provider.labels.iter().map(|l| l.id.clone()).collect();
    let mut reconciler = Reconciler::new(provider, options().continue_on_error(true)).unwrap();

    let report = reconciler.prune_labels(&rules).unwrap();
    assert!(report.deleted.is_empty());
    assert_eq!(report.skipped.len(), 2);
}

#[test]
fn prune_labels_honors_filter() {
    let rules = ruleset("[{from: alice, label: one}]");
    let provider = labelled(&["one", "news/daily", "news/weekly", "old news"]);
    let mut reconciler = Reconciler::new(provider, options().label_filter("news/")).unwrap();

    let report = reconciler.prune_labels(&rules).unwrap();
    let deleted: Vec<&str> = report.deleted.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(deleted, vec!["news/daily", "news/weekly"]);
}

#[test]
fn invalid_label_filter() {
    let err = Reconciler::new(FakeProvider::new(), options().label_filter("(")).unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidLabelFilter { .. }));
}
