use std::collections::BTreeMap;
use std::fmt;

/// A parsed rule document node.
///
/// Produced from YAML or JSON by the loaders in [`crate::load`]. Every rule
/// value is dispatched on its variant; numbers and nulls are kept so that they
/// can be reported as unsupported rather than silently coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Spec {
    Flag(bool),
    Scalar(String),
    Number(String),
    Null,
    Mapping(BTreeMap<String, Spec>),
    Sequence(Vec<Spec>),
}

impl Spec {
    /// A short name for this node's shape, used in error messages.
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Spec::Flag(_) => "bool",
            Spec::Scalar(_) => "string",
            Spec::Number(_) => "number",
            Spec::Null => "null",
            Spec::Mapping(_) => "mapping",
            Spec::Sequence(_) => "sequence",
        }
    }

    /// Build a mapping node from `(key, value)` pairs.
    #[must_use]
    pub fn mapping<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Spec>,
    {
        Spec::Mapping(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    #[must_use]
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Spec>> {
        match self {
            Spec::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Text usable as a template substitution, for leaf nodes only.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Spec::Flag(b) => Some(b.to_string()),
            Spec::Scalar(s) | Spec::Number(s) => Some(s.clone()),
            Spec::Null | Spec::Mapping(_) | Spec::Sequence(_) => None,
        }
    }

    /// Whether this node is absent or holds nothing to expand.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Spec::Null => true,
            Spec::Mapping(map) => map.is_empty(),
            Spec::Sequence(items) => items.is_empty(),
            Spec::Scalar(s) => s.is_empty(),
            Spec::Flag(_) | Spec::Number(_) => false,
        }
    }

    /// Whether this is a mapping whose `ignore` key holds a truthy value.
    ///
    /// `false`, null, zero and empty values keep the entry; anything else,
    /// including a string such as `"yes"`, skips it.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        self.as_mapping()
            .and_then(|m| m.get("ignore"))
            .is_some_and(Spec::is_truthy)
    }

    fn is_truthy(&self) -> bool {
        match self {
            Spec::Flag(b) => *b,
            Spec::Number(n) => n.parse::<f64>().map_or(true, |v| v != 0.0),
            other => !other.is_empty(),
        }
    }
}

impl From<bool> for Spec {
    fn from(v: bool) -> Self {
        Spec::Flag(v)
    }
}

impl From<&str> for Spec {
    fn from(v: &str) -> Self {
        Spec::Scalar(v.to_owned())
    }
}

impl From<String> for Spec {
    fn from(v: String) -> Self {
        Spec::Scalar(v)
    }
}

impl From<i64> for Spec {
    fn from(v: i64) -> Self {
        Spec::Number(v.to_string())
    }
}

impl<T: Into<Spec>> From<Vec<T>> for Spec {
    fn from(v: Vec<T>) -> Self {
        Spec::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<serde_yaml::Value> for Spec {
    fn from(value: serde_yaml::Value) -> Self {
        use serde_yaml::Value as Y;
        match value {
            Y::Null => Spec::Null,
            Y::Bool(b) => Spec::Flag(b),
            Y::Number(n) => Spec::Number(n.to_string()),
            Y::String(s) => Spec::Scalar(s),
            Y::Sequence(items) => Spec::Sequence(items.into_iter().map(Spec::from).collect()),
            Y::Mapping(map) => Spec::Mapping(
                map.into_iter()
                    .map(|(k, v)| (yaml_key(k), Spec::from(v)))
                    .collect(),
            ),
            Y::Tagged(tagged) => {
                let tagged = *tagged;
                Spec::from(tagged.value)
            }
        }
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Y;
    match key {
        Y::String(s) => s,
        Y::Bool(b) => b.to_string(),
        Y::Number(n) => n.to_string(),
        Y::Null => "null".to_owned(),
        other => format!("{other:?}"),
    }
}

impl From<serde_json::Value> for Spec {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as J;
        match value {
            J::Null => Spec::Null,
            J::Bool(b) => Spec::Flag(b),
            J::Number(n) => Spec::Number(n.to_string()),
            J::String(s) => Spec::Scalar(s),
            J::Array(items) => Spec::Sequence(items.into_iter().map(Spec::from).collect()),
            J::Object(map) => {
                Spec::Mapping(map.into_iter().map(|(k, v)| (k, Spec::from(v))).collect())
            }
        }
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spec::Flag(b) => write!(f, "{b}"),
            Spec::Scalar(s) => write!(f, "{s:?}"),
            Spec::Number(n) => write!(f, "{n}"),
            Spec::Null => write!(f, "null"),
            Spec::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Spec::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_yaml_value() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("from: alice\narchive: true\nlarger: 10\nmore: [a, b]").unwrap();
        let spec = Spec::from(value);
        let map = spec.as_mapping().unwrap();
        assert_eq!(map["from"], Spec::Scalar("alice".into()));
        assert_eq!(map["archive"], Spec::Flag(true));
        assert_eq!(map["larger"], Spec::Number("10".into()));
        assert_eq!(map["more"], Spec::from(vec!["a", "b"]));
    }

    #[test]
    fn from_json_value() {
        let value = serde_json::json!({"to": "bob", "ignore": true, "x": null});
        let spec = Spec::from(value);
        assert!(spec.is_ignored());
        assert_eq!(spec.as_mapping().unwrap()["x"], Spec::Null);
    }

    #[test]
    fn ignore_is_truthy() {
        assert!(Spec::mapping([("ignore", true)]).is_ignored());
        assert!(Spec::mapping([("ignore", "yes")]).is_ignored());
        assert!(Spec::mapping([("ignore", 1_i64)]).is_ignored());
        assert!(!Spec::mapping([("ignore", false)]).is_ignored());
        assert!(!Spec::mapping([("ignore", 0_i64)]).is_ignored());
        assert!(!Spec::mapping([("ignore", "")]).is_ignored());
        assert!(!Spec::mapping([("ignore", Spec::Null)]).is_ignored());
        assert!(!Spec::from("ignore").is_ignored());
    }

    #[test]
    fn shapes() {
        assert_eq!(Spec::Null.shape(), "null");
        assert_eq!(Spec::from(3_i64).shape(), "number");
        assert_eq!(Spec::from(vec![true]).shape(), "sequence");
    }

    #[test]
    fn as_text_leaves_only() {
        assert_eq!(Spec::from(7_i64).as_text().as_deref(), Some("7"));
        assert_eq!(Spec::from(false).as_text().as_deref(), Some("false"));
        assert_eq!(Spec::from(vec!["a"]).as_text(), None);
    }

    #[test]
    fn display() {
        let spec = Spec::mapping([("a", Spec::from(vec!["x", "y"])), ("b", Spec::Flag(true))]);
        assert_eq!(spec.to_string(), r#"{a: ["x", "y"], b: true}"#);
    }
}
