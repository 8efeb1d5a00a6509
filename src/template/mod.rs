//! `{name}` placeholder interpolation for `for_each` loops.
//!
//! Templates follow the familiar brace syntax: `{name}` is replaced by the
//! bound value, `{{` and `}}` produce literal braces. Positional fields (`{}`,
//! `{0}`), attribute or index access, conversions and format specs are
//! rejected.

mod error;
mod grammar;

use std::collections::BTreeMap;

pub use error::TemplateError;
use grammar::Segment;

/// Named values available to a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    vars: BTreeMap<String, String>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`, replacing any previous binding.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// A new scope holding `self` overlaid with `inner`; inner names shadow outer ones.
    #[must_use]
    pub fn scoped(&self, inner: &Bindings) -> Bindings {
        let mut vars = self.vars.clone();
        vars.extend(inner.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        Bindings { vars }
    }
}

/// Substitute every `{name}` field in `template` with its binding.
///
/// # Errors
///
/// Returns [`TemplateError`] if the template is malformed, uses an unsupported
/// field form, or names a variable that is not bound.
pub fn render(template: &str, bindings: &Bindings) -> Result<String, TemplateError> {
    use winnow::Parser;

    if !template.contains(['{', '}']) {
        return Ok(template.to_owned());
    }

    let segments = grammar::segments
        .parse(template)
        .map_err(|e| TemplateError::Malformed {
            template: template.to_owned(),
            message: e.to_string(),
        })?;

    let mut out = String::with_capacity(template.len());
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Field(field) => {
                let name = field_name(field).ok_or_else(|| TemplateError::UnsupportedField {
                    field: field.to_owned(),
                    template: template.to_owned(),
                })?;
                let value = bindings
                    .get(name)
                    .ok_or_else(|| TemplateError::MissingVariable {
                        name: name.to_owned(),
                        template: template.to_owned(),
                    })?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

fn field_name(field: &str) -> Option<&str> {
    let positional = field.is_empty() || field.chars().all(|c| c.is_ascii_digit());
    let decorated = field.contains([':', '!', '.', '[']);
    (!positional && !decorated).then_some(field)
}
