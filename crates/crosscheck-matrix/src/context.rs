//! Inherited walking state
//!
//! A [`Context`] is never mutated once built. Entering a node produces a new
//! value for its children; the parent's value is untouched, so nothing a
//! subtree does can be observed by its later siblings. Variable bindings are
//! shared behind an `Rc` and copied only by nodes that declare `vars`.

use crate::error::{GenError, GenResult};
use crate::spec::{scalar_text, NodePath, SpecNode};
use crate::supplier::Scope;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Separator appended after every category fragment
pub const CATEGORY_SEPARATOR: &str = "_";

#[derive(Debug, Clone, Default)]
pub struct Context {
    prefix: String,
    receiver: Option<Rc<Vec<String>>>,
    self_type: Option<String>,
    vars: Rc<BTreeMap<String, String>>,
}

impl Context {
    /// Empty root context
    pub fn new() -> Self {
        Self::default()
    }

    /// Context seen by `node`'s children and by `node` itself when it is a leaf
    pub fn enter(&self, node: &SpecNode, path: &NodePath) -> GenResult<Context> {
        let mut next = self.clone();

        if let Some(category) = &node.category {
            next.prefix.push_str(category);
            next.prefix.push_str(CATEGORY_SEPARATOR);
        }

        // a new receiver brings its own type, or none
        if let Some(receiver) = &node.receiver {
            next.receiver = receiver.as_ref().map(|r| Rc::new(r.exprs()));
            next.self_type = node.self_type.clone();
        } else if node.self_type.is_some() {
            next.self_type = node.self_type.clone();
        }

        if !node.vars.is_empty() {
            let vars = Rc::make_mut(&mut next.vars);
            for (name, value) in &node.vars {
                let text = scalar_text(value).ok_or_else(|| GenError::InvalidVar {
                    path: path.to_string(),
                    var: name.clone(),
                })?;
                vars.insert(name.clone(), text);
            }
        }

        Ok(next)
    }

    /// Accumulated name prefix, including the trailing separator
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Active receiver alternatives
    pub fn receiver(&self) -> Option<&[String]> {
        self.receiver.as_deref().map(Vec::as_slice)
    }

    /// Declared receiver type
    pub fn self_type(&self) -> Option<&str> {
        self.self_type.as_deref()
    }

    /// Current variable bindings
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Bindings in the shape suppliers consume
    pub fn scope(&self) -> Scope<'_> {
        Scope {
            vars: &self.vars,
            self_type: self.self_type.as_deref(),
        }
    }
}
