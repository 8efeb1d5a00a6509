mod compound;
mod error;
mod expand;
pub mod load;
pub mod reconcile;
pub mod template;
mod types;

pub use error::Error;
pub use expand::{compile, expand};
pub use load::{LoadError, load_file, load_json, load_yaml};
pub use reconcile::{
    Filter, Label, Plan, Provider, ReconcileError, ReconcileOptions, Reconciler,
};
pub use template::{Bindings, TemplateError};
pub use types::{
    CompileError, Construct, ConstructKind, ExportedRule, Rule, RuleData, RuleKey, RuleSet, Spec,
    quote_if_necessary,
};
