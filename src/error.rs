use thiserror::Error;

use crate::CompileError;
use crate::load::LoadError;
use crate::reconcile::ReconcileError;

/// Unified error type covering loading, compilation, and reconciliation.
///
/// Returned by convenience methods like [`RuleSet::from_yaml()`](crate::RuleSet::from_yaml)
/// and [`RuleSet::from_file()`](crate::RuleSet::from_file).
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_messages() {
        let err = Error::from(CompileError::MissingLoopRule);
        assert_eq!(err.to_string(), "for_each loop has no 'rule'");
    }

    #[test]
    fn from_yaml_surfaces_compile_errors() {
        let err = crate::RuleSet::from_yaml("colour: red\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Compile(CompileError::InvalidIdentifier { ref key }) if key == "colour"
        ));
    }

    #[test]
    fn from_yaml_surfaces_load_errors() {
        let err = crate::RuleSet::from_yaml("from: [unterminated").unwrap_err();
        assert!(matches!(err, Error::Load(LoadError::Yaml(_))));
    }
}
