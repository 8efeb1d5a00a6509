use thiserror::Error;

use super::provider::ProviderError;

/// Errors raised while reconciling compiled rules against a provider.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("provider failed to {operation}: {source}")]
    Provider {
        operation: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("invalid label filter {pattern:?}: {source}")]
    InvalidLabelFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl ReconcileError {
    /// Wrap a provider failure, for use with `map_err`.
    pub(crate) fn provider(operation: &'static str) -> impl FnOnce(ProviderError) -> Self {
        move |source| ReconcileError::Provider { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message() {
        let err = ReconcileError::provider("delete label")("HTTP 500".into());
        assert_eq!(err.to_string(), "provider failed to delete label: HTTP 500");
    }

    #[test]
    fn invalid_label_filter_message() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = ReconcileError::InvalidLabelFilter {
            pattern: "(".into(),
            source,
        };
        assert!(err.to_string().starts_with("invalid label filter \"(\": "));
    }
}
