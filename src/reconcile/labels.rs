use std::collections::HashMap;

use tracing::info;

use super::error::ReconcileError;
use super::provider::{Label, LabelType, Provider};

const SEPARATORS: [char; 3] = [' ', '-', '/'];

/// The account's labels for the duration of one reconciliation run, looked up
/// by name case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct LabelCache {
    labels: Vec<Label>,
    by_name: HashMap<String, usize>,
}

impl LabelCache {
    #[must_use]
    pub fn new(labels: Vec<Label>) -> Self {
        let mut cache = Self::default();
        for label in labels {
            cache.insert(label);
        }
        cache
    }

    /// Read a fresh snapshot from `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Provider`] if listing fails.
    pub fn load<P: Provider + ?Sized>(provider: &P) -> Result<Self, ReconcileError> {
        let labels = provider
            .list_labels()
            .map_err(ReconcileError::provider("list labels"))?;
        Ok(Self::new(labels))
    }

    /// Record a label. The first label seen under a name wins lookups.
    pub fn insert(&mut self, label: Label) {
        self.by_name
            .entry(label.name.to_lowercase())
            .or_insert(self.labels.len());
        self.labels.push(label);
    }

    /// Find the label `name` refers to.
    ///
    /// Matching ignores case, and treats space, `-` and `/` as interchangeable:
    /// `"foo bar"` finds an existing `"Foo-Bar"` or `"foo/bar"`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Label> {
        candidates(name)
            .iter()
            .find_map(|candidate| self.by_name.get(candidate))
            .map(|&i| &self.labels[i])
    }

    /// Find `name`, or create it through `provider`.
    ///
    /// In dry-run mode nothing is created remotely: a placeholder label is
    /// cached instead so later lookups in the run resolve to it.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Provider`] if creation fails.
    pub fn get_or_create<P: Provider + ?Sized>(
        &mut self,
        name: &str,
        provider: &mut P,
        dry_run: bool,
    ) -> Result<Label, ReconcileError> {
        if let Some(label) = self.find(name) {
            return Ok(label.clone());
        }
        let label = if dry_run {
            let label = placeholder(name);
            info!(label = %name, id = %label.id, "would create label");
            label
        } else {
            let label = provider
                .create_label(name)
                .map_err(ReconcileError::provider("create label"))?;
            info!(label = %name, id = %label.id, "created label");
            label
        };
        self.insert(label.clone());
        Ok(label)
    }

    /// Find `name`, or cache a placeholder for it without touching the provider.
    pub fn get_or_placeholder(&mut self, name: &str) -> Label {
        if let Some(label) = self.find(name) {
            return label.clone();
        }
        let label = placeholder(name);
        self.insert(label.clone());
        label
    }

    /// Labels in the order they were recorded.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Whether `label` was synthesized locally rather than read from the provider.
#[must_use]
pub fn is_placeholder(label: &Label) -> bool {
    label.id.starts_with(PLACEHOLDER_PREFIX)
}

const PLACEHOLDER_PREFIX: &str = "FakeLabel_";

fn placeholder(name: &str) -> Label {
    Label {
        message_list_visibility: Some("hide".to_owned()),
        label_list_visibility: Some("labelHide".to_owned()),
        messages_total: Some(0),
        messages_unread: Some(0),
        threads_total: Some(0),
        threads_unread: Some(0),
        ..Label::new(
            format!("{PLACEHOLDER_PREFIX}{}", name.replace(' ', "-")),
            name,
        )
        .with_type(LabelType::User)
    }
}

/// The lowercased name, then every single-separator substitution of it.
fn candidates(name: &str) -> Vec<String> {
    let lower = name.to_lowercase();
    let mut out = vec![lower.clone()];
    for from in SEPARATORS {
        for to in SEPARATORS {
            if from != to && lower.contains(from) {
                let variant = lower.replace(from, &to.to_string());
                if !out.contains(&variant) {
                    out.push(variant);
                }
            }
        }
    }
    out
}
