//! Specification documents
//!
//! A specification is a YAML tree of [`SpecNode`]s. Inner nodes adjust the
//! inherited context (category prefix, receiver, variable bindings); nodes
//! carrying `method` or `expr` are leaves that expand into test cases.

use crate::error::{GenError, GenResult};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// One node of the specification tree
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecNode {
    /// Name fragment appended to the accumulated prefix
    pub category: Option<String>,

    /// Receiver for descendants. `Some(None)` clears an inherited receiver.
    #[serde(rename = "self", deserialize_with = "present")]
    pub receiver: Option<Option<Receiver>>,

    /// Declared type of the receiver
    pub self_type: Option<String>,

    /// Variable bindings merged into scope (insert-or-overwrite)
    pub vars: BTreeMap<String, serde_yaml::Value>,

    /// Skip this whole subtree
    pub ignored: bool,

    /// Child nodes, visited in order
    pub sub: Vec<SpecNode>,

    /// Method name; marks a method-call leaf
    pub method: Option<String>,

    /// Expression template; marks an expression leaf
    pub expr: Option<String>,

    /// Parameter descriptors, one per argument position
    pub params: Vec<String>,

    /// Trailing-argument descriptors; `None` means `[emptyRest]`
    pub rest: Option<Vec<String>>,

    /// Leading positions that are always present; -1 means all
    pub mandatory: Option<i64>,

    /// Declared return type, passed through to templates
    pub ret_type: Option<String>,
}

/// Receiver expression(s): a single string or a list of alternatives
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Receiver {
    One(String),
    Many(Vec<String>),
}

impl Receiver {
    /// Receiver alternatives with surrounding whitespace removed
    pub fn exprs(&self) -> Vec<String> {
        match self {
            Receiver::One(s) => vec![s.trim().to_string()],
            Receiver::Many(list) => list.iter().map(|s| s.trim().to_string()).collect(),
        }
    }
}

/// What a leaf node generates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind<'a> {
    Method(&'a str),
    Expr(&'a str),
}

impl SpecNode {
    /// Leaf kind of this node, `None` for pure context nodes.
    ///
    /// Fails when both `method` and `expr` are set.
    pub fn leaf(&self, path: &NodePath) -> GenResult<Option<LeafKind<'_>>> {
        match (&self.method, &self.expr) {
            (Some(_), Some(_)) => Err(GenError::AmbiguousLeaf {
                path: path.to_string(),
            }),
            (Some(method), None) => Ok(Some(LeafKind::Method(method))),
            (None, Some(expr)) => Ok(Some(LeafKind::Expr(expr))),
            (None, None) => Ok(None),
        }
    }

    /// Number of mandatory positions, `None` when every position is mandatory
    pub fn mandatory(&self, path: &NodePath) -> GenResult<Option<usize>> {
        match self.mandatory {
            None | Some(-1) => Ok(None),
            Some(n) if n >= 0 => Ok(Some(n as usize)),
            Some(n) => Err(GenError::InvalidMandatory {
                path: path.to_string(),
                value: n,
            }),
        }
    }
}

/// Load a specification document from disk
pub fn load_file(path: &Path) -> GenResult<SpecNode> {
    let text = std::fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
    load_str(&text, path)
}

/// Parse a specification document from text; `origin` is used in errors
pub fn load_str(text: &str, origin: &Path) -> GenResult<SpecNode> {
    // An empty document is an empty root node.
    if text.trim().is_empty() {
        return Ok(SpecNode::default());
    }
    serde_yaml::from_str(text).map_err(|e| GenError::parse(origin, e))
}

/// Render a scalar YAML value as expression text
pub(crate) fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Location of a node inside a document, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    origin: PathBuf,
    steps: Vec<usize>,
}

impl NodePath {
    /// Path of a document's root node
    pub fn root(origin: impl Into<PathBuf>) -> Self {
        Self {
            origin: origin.into(),
            steps: Vec::new(),
        }
    }

    /// Path of the `index`-th child
    pub fn child(&self, index: usize) -> Self {
        let mut steps = self.steps.clone();
        steps.push(index);
        Self {
            origin: self.origin.clone(),
            steps,
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:/", self.origin.display())?;
        let steps: Vec<String> = self.steps.iter().map(|i| format!("sub[{}]", i)).collect();
        write!(f, "{}", steps.join("/"))
    }
}

/// Distinguishes an absent field (`None`) from an explicit null (`Some(None)`)
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> SpecNode {
        load_str(text, Path::new("test.yaml")).unwrap()
    }

    #[test]
    fn test_parse_nested_tree() {
        let node = parse(
            r#"
category: math
vars:
  small: paramOf("1", "2")
  limit: 10
sub:
  - method: max
    params: [small, small]
    mandatory: 1
    ret_type: number
"#,
        );
        assert_eq!(node.category.as_deref(), Some("math"));
        assert_eq!(node.vars.len(), 2);
        assert_eq!(scalar_text(&node.vars["limit"]).as_deref(), Some("10"));
        assert_eq!(node.sub.len(), 1);
        let leaf = &node.sub[0];
        assert_eq!(leaf.method.as_deref(), Some("max"));
        assert_eq!(leaf.params, vec!["small", "small"]);
        assert_eq!(leaf.mandatory, Some(1));
        assert_eq!(leaf.rest, None);
    }

    #[test]
    fn test_receiver_forms() {
        let one = parse("self: ' new Foo() '\nself_type: Foo\n");
        assert_eq!(
            one.receiver.unwrap().unwrap().exprs(),
            vec!["new Foo()".to_string()]
        );

        let many = parse("self: ['a', 'b']\n");
        assert_eq!(many.receiver.unwrap().unwrap().exprs().len(), 2);

        let cleared = parse("self: ~\n");
        assert_eq!(cleared.receiver, Some(None));

        let absent = parse("category: x\n");
        assert_eq!(absent.receiver, None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = load_str("methd: foo\n", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, GenError::Parse { .. }));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_ambiguous_leaf() {
        let node = parse("method: foo\nexpr: 'a + b'\n");
        let path = NodePath::root("x.yaml").child(2);
        let err = node.leaf(&path).unwrap_err();
        assert_eq!(err.to_string(), "Node x.yaml:/sub[2] declares both 'method' and 'expr'");
    }

    #[test]
    fn test_mandatory_values() {
        let path = NodePath::root("x.yaml");
        assert_eq!(parse("mandatory: -1\n").mandatory(&path).unwrap(), None);
        assert_eq!(parse("mandatory: 2\n").mandatory(&path).unwrap(), Some(2));
        assert!(parse("mandatory: -2\n").mandatory(&path).is_err());
        assert_eq!(parse("method: f\n").mandatory(&path).unwrap(), None);
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(parse("  \n"), SpecNode::default());
    }
}
