//! Reading rule documents into [`Spec`] entries.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::types::Spec;

const IGNORE: &str = "ignore";

/// Errors produced while reading a rule document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Parse a YAML rule document into its top-level entries.
///
/// A single mapping is treated as a one-entry list and an empty document as an
/// empty list. Entries whose `ignore` value is truthy are dropped.
///
/// # Errors
///
/// Returns [`LoadError::Yaml`] if `input` is not valid YAML.
pub fn load_yaml(input: &str) -> Result<Vec<Spec>, LoadError> {
    let value: serde_yaml::Value = serde_yaml::from_str(input)?;
    Ok(entries(Spec::from(value)))
}

/// Parse a JSON rule document; same entry handling as [`load_yaml`].
///
/// # Errors
///
/// Returns [`LoadError::Json`] if `input` is not valid JSON.
pub fn load_json(input: &str) -> Result<Vec<Spec>, LoadError> {
    let value: serde_json::Value = serde_json::from_str(input)?;
    Ok(entries(Spec::from(value)))
}

/// Read a rule file. Files ending in `.json` are parsed as JSON, anything
/// else as YAML.
///
/// # Errors
///
/// Returns [`LoadError`] on I/O or syntax failure.
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<Spec>, LoadError> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!(path = %path.display(), bytes = input.len(), "read rule file");
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json(&input),
        _ => load_yaml(&input),
    }
}

fn entries(document: Spec) -> Vec<Spec> {
    let entries = match document {
        Spec::Null => Vec::new(),
        Spec::Sequence(items) => items,
        other => vec![other],
    };
    let total = entries.len();
    let kept: Vec<Spec> = entries
        .into_iter()
        .filter(|entry| !entry.is_ignored())
        .map(strip_ignore)
        .collect();
    if kept.len() < total {
        debug!(ignored = total - kept.len(), "skipped ignored entries");
    }
    kept
}

fn strip_ignore(entry: Spec) -> Spec {
    match entry {
        Spec::Mapping(mut map) => {
            map.remove(IGNORE);
            Spec::Mapping(map)
        }
        other => other,
    }
}
