use std::time::Duration;

use serde::{Deserialize, Deserializer};

const DEFAULT_CREATE_DELAY: Duration = Duration::from_millis(1500);

/// Settings for a reconciliation run.
///
/// Deserializes from a config table; every field is optional.
///
/// ```
/// use std::time::Duration;
/// use mailrules::ReconcileOptions;
///
/// let options: ReconcileOptions =
///     serde_json::from_str(r#"{"dry_run": true, "create_delay_ms": 250}"#).unwrap();
/// assert!(options.dry_run);
/// assert_eq!(options.create_delay, Duration::from_millis(250));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileOptions {
    /// Compute and log every change without performing any.
    pub dry_run: bool,
    /// Pause between consecutive filter creations.
    #[serde(rename = "create_delay_ms", deserialize_with = "millis")]
    pub create_delay: Duration,
    /// Log and skip failed label deletions instead of aborting.
    pub continue_on_error: bool,
    /// Only prune labels whose name matches this pattern at its start.
    pub label_filter: Option<String>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            create_delay: DEFAULT_CREATE_DELAY,
            continue_on_error: false,
            label_filter: None,
        }
    }
}

impl ReconcileOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    #[must_use]
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    #[must_use]
    pub fn label_filter(mut self, pattern: impl Into<String>) -> Self {
        self.label_filter = Some(pattern.into());
        self
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}
