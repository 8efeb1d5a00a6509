mod construct;
mod error;
mod rule;
mod ruleset;
mod spec;

pub use construct::{Construct, ConstructKind, quote_if_necessary};
pub(crate) use construct::{DOES_NOT_HAVE_THE_WORD, HAS_THE_WORD, Joiner};
pub use error::CompileError;
pub use rule::{Rule, RuleData, RuleKey};
pub use ruleset::{ExportedRule, RuleSet};
pub use spec::Spec;
