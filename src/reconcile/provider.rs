use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Failure reported by a [`Provider`]. Transport and authentication are the
/// provider's business; the reconciler only propagates or tolerates them.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// The remote mail account the rules are reconciled against.
///
/// Calls are blocking and made one at a time.
pub trait Provider {
    fn list_labels(&self) -> Result<Vec<Label>, ProviderError>;

    fn create_label(&mut self, name: &str) -> Result<Label, ProviderError>;

    fn delete_label(&mut self, id: &str) -> Result<(), ProviderError>;

    fn list_filters(&self) -> Result<Vec<Filter>, ProviderError>;

    /// Create `filter`, returning it with its assigned id.
    fn create_filter(&mut self, filter: &Filter) -> Result<Filter, ProviderError>;

    fn delete_filter(&mut self, id: &str) -> Result<(), ProviderError>;
}

impl<P: Provider + ?Sized> Provider for &mut P {
    fn list_labels(&self) -> Result<Vec<Label>, ProviderError> {
        (**self).list_labels()
    }

    fn create_label(&mut self, name: &str) -> Result<Label, ProviderError> {
        (**self).create_label(name)
    }

    fn delete_label(&mut self, id: &str) -> Result<(), ProviderError> {
        (**self).delete_label(id)
    }

    fn list_filters(&self) -> Result<Vec<Filter>, ProviderError> {
        (**self).list_filters()
    }

    fn create_filter(&mut self, filter: &Filter) -> Result<Filter, ProviderError> {
        (**self).create_filter(filter)
    }

    fn delete_filter(&mut self, id: &str) -> Result<(), ProviderError> {
        (**self).delete_filter(id)
    }
}

/// Whether a label was created by the account owner or is built in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelType {
    System,
    #[default]
    User,
}

/// A mailbox label as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_list_visibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_list_visibility: Option<String>,
    #[serde(rename = "type", default)]
    pub label_type: LabelType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages_total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages_unread: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads_total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads_unread: Option<u64>,
}

impl Label {
    /// A user label with only its identity filled in.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            message_list_visibility: None,
            label_list_visibility: None,
            label_type: LabelType::User,
            messages_total: None,
            messages_unread: None,
            threads_total: None,
            threads_unread: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, label_type: LabelType) -> Self {
        self.label_type = label_type;
        self
    }
}

/// A server-side mail filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub criteria: Criteria,
    #[serde(default)]
    pub action: FilterAction,
}

/// What a filter matches. Fields the reconciler never writes are kept in
/// `extra` so that a remote filter using them is never mistaken for a
/// compiled one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negated_query: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// What a filter does to matching messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterAction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub add_label_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_label_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward: Option<String>,
}

impl FilterAction {
    /// Whether the action would leave matching messages untouched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add_label_ids.is_empty() && self.remove_label_ids.is_empty() && self.forward.is_none()
    }
}
