//! Reconciliation of compiled rules against a mail provider's filters and labels.
//!
//! A [`Reconciler`] diffs the publishable rules of a [`RuleSet`] against a
//! snapshot of the provider's filters, comparing criteria and action content
//! only. Running [`Reconciler::sync`] twice in a row performs no changes the
//! second time.

mod error;
mod labels;
mod options;
mod provider;
mod resource;

use std::collections::HashSet;
use std::thread;

use regex::Regex;
use tracing::{debug, info, info_span, warn};

pub use error::ReconcileError;
pub use labels::{LabelCache, is_placeholder};
pub use options::ReconcileOptions;
pub use provider::{Criteria, Filter, FilterAction, Label, LabelType, Provider, ProviderError};
use resource::{FilterShape, to_filter};

use crate::types::RuleSet;

/// Filters a [`Reconciler::upload`] created, or would create in dry-run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub created: Vec<Filter>,
    pub labels_created: Vec<Label>,
}

/// Filters a [`Reconciler::prune_filters`] deleted, or would delete in dry-run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub deleted: Vec<Filter>,
}

/// Outcome of [`Reconciler::sync`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub upload: UploadReport,
    pub prune: PruneReport,
}

impl SyncReport {
    /// Whether the remote state already matched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.upload.created.is_empty() && self.prune.deleted.is_empty()
    }
}

/// Outcome of [`Reconciler::prune_labels`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPruneReport {
    pub deleted: Vec<Label>,
    /// Labels whose deletion failed and was skipped.
    pub skipped: Vec<Label>,
}

/// The changes a sync would make, computed from a single snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub create: Vec<Filter>,
    pub delete: Vec<Filter>,
    /// Label names the rules use that do not exist yet.
    pub missing_labels: Vec<String>,
}

impl Plan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.delete.is_empty()
    }
}

/// Applies a [`RuleSet`] to a [`Provider`].
#[derive(Debug)]
pub struct Reconciler<P> {
    provider: P,
    options: ReconcileOptions,
    label_filter: Option<Regex>,
}

impl<P: Provider> Reconciler<P> {
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidLabelFilter`] if the configured label
    /// filter is not a valid regular expression.
    pub fn new(provider: P, options: ReconcileOptions) -> Result<Self, ReconcileError> {
        let label_filter = options
            .label_filter
            .as_deref()
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
                    ReconcileError::InvalidLabelFilter {
                        pattern: pattern.to_owned(),
                        source,
                    }
                })
            })
            .transpose()?;
        Ok(Self {
            provider,
            options,
            label_filter,
        })
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    #[must_use]
    pub fn into_provider(self) -> P {
        self.provider
    }

    /// Compute the creates and deletes a sync would perform, without touching
    /// the provider beyond reading it. Missing labels are not created.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Provider`] if listing labels or filters fails.
    pub fn plan(&self, ruleset: &RuleSet) -> Result<Plan, ReconcileError> {
        let _span = info_span!("plan", rules = ruleset.len()).entered();
        let mut labels = LabelCache::load(&self.provider)?;
        let remote = self.list_filters()?;

        let mut missing_labels = Vec::new();
        let wanted = self.map_rules(ruleset, |name| {
            if labels.find(name).is_none() {
                missing_labels.push(name.to_owned());
            }
            Ok(labels.get_or_placeholder(name).id)
        })?;
        let remote_shapes: Vec<FilterShape> = remote.iter().map(FilterShape::from).collect();
        let wanted_shapes: Vec<FilterShape> = wanted.iter().map(FilterShape::from).collect();

        let plan = Plan {
            create: wanted
                .into_iter()
                .zip(&wanted_shapes)
                .filter(|(_, shape)| !remote_shapes.contains(shape))
                .map(|(filter, _)| filter)
                .collect(),
            delete: remote
                .into_iter()
                .zip(&remote_shapes)
                .filter(|(_, shape)| !wanted_shapes.contains(shape))
                .map(|(filter, _)| filter)
                .collect(),
            missing_labels,
        };
        info!(
            create = plan.create.len(),
            delete = plan.delete.len(),
            missing_labels = plan.missing_labels.len(),
            "computed plan"
        );
        Ok(plan)
    }

    /// Create a filter for every publishable rule that has no structurally
    /// identical remote filter. Labels are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Provider`] on the first failed provider call.
    pub fn upload(&mut self, ruleset: &RuleSet) -> Result<UploadReport, ReconcileError> {
        let dry_run = self.options.dry_run;
        let _span = info_span!("upload", rules = ruleset.len(), dry_run).entered();
        let mut labels = LabelCache::load(&self.provider)?;
        let mut existing: Vec<FilterShape> =
            self.list_filters()?.iter().map(FilterShape::from).collect();

        let mut report = UploadReport::default();
        for rule in ruleset.publishable() {
            let provider = &mut self.provider;
            let labels_created = &mut report.labels_created;
            let filter = to_filter(rule, |name| {
                let known = labels.find(name).is_some();
                let label = labels.get_or_create(name, &mut *provider, dry_run)?;
                if !known {
                    labels_created.push(label.clone());
                }
                Ok(label.id)
            })?;
            if filter.action.is_empty() {
                debug!(%rule, "rule maps to a filter without actions");
                continue;
            }

            let shape = FilterShape::from(&filter);
            if existing.contains(&shape) {
                debug!(%rule, "filter already exists");
                continue;
            }

            let created = if dry_run {
                info!(%rule, "would create filter");
                filter
            } else {
                if !report.created.is_empty() && !self.options.create_delay.is_zero() {
                    thread::sleep(self.options.create_delay);
                }
                let created = self
                    .provider
                    .create_filter(&filter)
                    .map_err(ReconcileError::provider("create filter"))?;
                info!(%rule, id = created.id.as_deref().unwrap_or_default(), "created filter");
                created
            };
            existing.push(shape);
            report.created.push(created);
        }
        info!(
            created = report.created.len(),
            labels_created = report.labels_created.len(),
            "upload finished"
        );
        Ok(report)
    }

    /// Delete every remote filter that matches no publishable rule.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Provider`] on the first failed provider call.
    pub fn prune_filters(&mut self, ruleset: &RuleSet) -> Result<PruneReport, ReconcileError> {
        let dry_run = self.options.dry_run;
        let _span = info_span!("prune_filters", rules = ruleset.len(), dry_run).entered();
        let mut labels = LabelCache::load(&self.provider)?;
        let wanted: Vec<FilterShape> = self
            .map_rules(ruleset, |name| Ok(labels.get_or_placeholder(name).id))?
            .iter()
            .map(FilterShape::from)
            .collect();

        let mut report = PruneReport::default();
        for filter in self.list_filters()? {
            if wanted.contains(&FilterShape::from(&filter)) {
                continue;
            }
            let id = filter.id.clone().unwrap_or_default();
            if dry_run {
                info!(%id, "would delete filter");
            } else {
                self.provider
                    .delete_filter(&id)
                    .map_err(ReconcileError::provider("delete filter"))?;
                info!(%id, "deleted filter");
            }
            report.deleted.push(filter);
        }
        info!(deleted = report.deleted.len(), "prune finished");
        Ok(report)
    }

    /// [`upload`](Self::upload) then [`prune_filters`](Self::prune_filters),
    /// each against a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReconcileError`] of either step.
    pub fn sync(&mut self, ruleset: &RuleSet) -> Result<SyncReport, ReconcileError> {
        let _span = info_span!("sync").entered();
        let upload = self.upload(ruleset)?;
        let prune = self.prune_filters(ruleset)?;
        Ok(SyncReport { upload, prune })
    }

    /// Delete user labels that no publishable rule applies, restricted to
    /// names matching the configured label filter. Deletion runs in name order.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Provider`] if listing fails, or if a deletion
    /// fails and `continue_on_error` is off.
    pub fn prune_labels(&mut self, ruleset: &RuleSet) -> Result<LabelPruneReport, ReconcileError> {
        let dry_run = self.options.dry_run;
        let _span = info_span!("prune_labels", rules = ruleset.len(), dry_run).entered();
        let mut labels = LabelCache::load(&self.provider)?;

        let used: HashSet<String> = self
            .map_rules(ruleset, |name| Ok(labels.get_or_placeholder(name).id))?
            .into_iter()
            .flat_map(|filter| filter.action.add_label_ids)
            .collect();

        let mut unused: Vec<Label> = labels
            .labels()
            .iter()
            .filter(|label| label.label_type == LabelType::User && !is_placeholder(label))
            .filter(|label| !used.contains(&label.id))
            .filter(|label| {
                self.label_filter
                    .as_ref()
                    .is_none_or(|filter| filter.is_match(&label.name))
            })
            .cloned()
            .collect();
        unused.sort_by(|a, b| a.name.cmp(&b.name));

        let mut report = LabelPruneReport::default();
        for label in unused {
            if dry_run {
                info!(label = %label.name, id = %label.id, "would delete label");
                report.deleted.push(label);
                continue;
            }
            match self.provider.delete_label(&label.id) {
                Ok(()) => {
                    info!(label = %label.name, id = %label.id, "deleted label");
                    report.deleted.push(label);
                }
                Err(source) if self.options.continue_on_error => {
                    warn!(label = %label.name, id = %label.id, error = %source, "skipping label");
                    report.skipped.push(label);
                }
                Err(source) => return Err(ReconcileError::provider("delete label")(source)),
            }
        }
        info!(
            deleted = report.deleted.len(),
            skipped = report.skipped.len(),
            "label prune finished"
        );
        Ok(report)
    }

    fn list_filters(&self) -> Result<Vec<Filter>, ReconcileError> {
        self.provider
            .list_filters()
            .map_err(ReconcileError::provider("list filters"))
    }

    /// Map every publishable rule, dropping filters without actions and rules
    /// that map to an identical filter.
    fn map_rules(
        &self,
        ruleset: &RuleSet,
        mut resolve_label: impl FnMut(&str) -> Result<String, ReconcileError>,
    ) -> Result<Vec<Filter>, ReconcileError> {
        let mut filters: Vec<Filter> = Vec::new();
        for rule in ruleset.publishable() {
            let filter = to_filter(rule, &mut resolve_label)?;
            if filter.action.is_empty() {
                debug!(%rule, "rule maps to a filter without actions");
                continue;
            }
            let shape = FilterShape::from(&filter);
            if !filters.iter().any(|f| FilterShape::from(f) == shape) {
                filters.push(filter);
            }
        }
        Ok(filters)
    }
}
