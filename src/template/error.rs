use thiserror::Error;

/// Errors produced when interpolating loop variables into a rule value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("malformed template {template:?}: {message}")]
    Malformed { template: String, message: String },

    #[error("undefined template variable '{name}' in {template:?}")]
    MissingVariable { name: String, template: String },

    #[error("unsupported replacement field '{{{field}}}' in {template:?}; only named fields are allowed")]
    UnsupportedField { field: String, template: String },
}
