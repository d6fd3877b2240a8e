//! Specification tree walker
//!
//! Walks one or more specification documents, threading a [`Context`] down
//! the tree, and expands every leaf into [`TestCase`]s grouped by derived
//! name. Walking is single-threaded and finishes before any group runs.

use crate::case::{Side, TestCase, TestGroup};
use crate::context::Context;
use crate::error::{GenError, GenResult};
use crate::expand::{expand, Combination};
use crate::spec::{self, LeafKind, NodePath, SpecNode};
use crate::supplier::{from_fn, BoxSupplier, RestVariant, SupplierRegistry, Variant};
use regex::{NoExpand, Regex};
use std::collections::BTreeMap;
use std::path::Path;

/// Rest descriptor used when a leaf declares none
pub const DEFAULT_REST: &str = "emptyRest";

/// Builds test groups from specification trees
#[derive(Debug)]
pub struct Generator {
    registry: SupplierRegistry,
    filter: Regex,
    pars: Regex,
    groups: BTreeMap<String, Vec<TestCase>>,
    ignored: usize,
    verbose: bool,
}

impl Generator {
    /// Create a generator keeping only names that match `filter`
    pub fn new(filter: &str) -> GenResult<Self> {
        let filter = Regex::new(filter).map_err(|e| GenError::InvalidFilter {
            pattern: filter.to_string(),
            error: e.to_string(),
        })?;
        Ok(Self {
            registry: SupplierRegistry::with_builtins(),
            filter,
            pars: Regex::new(r"\bpars\b").map_err(|e| GenError::InvalidFilter {
                pattern: r"\bpars\b".to_string(),
                error: e.to_string(),
            })?,
            groups: BTreeMap::new(),
            ignored: 0,
            verbose: false,
        })
    }

    /// Use a custom supplier registry
    pub fn with_registry(mut self, registry: SupplierRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Print progress while reading documents
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Read and walk one specification file
    pub fn load(&mut self, path: &Path) -> GenResult<()> {
        if self.verbose {
            println!("reading {}", path.display());
        }
        let root = spec::load_file(path)?;
        self.process(&root, path)
    }

    /// Walk an already parsed document. Groups accumulate across calls.
    pub fn process(&mut self, root: &SpecNode, origin: &Path) -> GenResult<()> {
        self.visit(root, &Context::new(), &NodePath::root(origin))
    }

    fn visit(&mut self, node: &SpecNode, parent: &Context, path: &NodePath) -> GenResult<()> {
        if node.ignored {
            self.ignored += 1;
            return Ok(());
        }

        let ctx = parent.enter(node, path)?;

        for (i, child) in node.sub.iter().enumerate() {
            self.visit(child, &ctx, &path.child(i))?;
        }

        if let Some(kind) = node.leaf(path)? {
            self.expand_leaf(node, kind, &ctx, path)?;
        }
        Ok(())
    }

    fn expand_leaf(
        &mut self,
        node: &SpecNode,
        kind: LeafKind<'_>,
        ctx: &Context,
        path: &NodePath,
    ) -> GenResult<()> {
        let name = match kind {
            LeafKind::Method(method) => format!("{}{}", ctx.prefix(), method),
            LeafKind::Expr(expr) => format!("{}{}", ctx.prefix(), sanitize(expr)),
        };
        if !self.filter.is_match(&name) {
            return Ok(());
        }

        let mut mandatory = node.mandatory(path)?;
        let receiver = ctx.receiver();
        let scope = ctx.scope();
        let registry = &self.registry;

        let mut positions: Vec<BoxSupplier<'_, Variant>> = Vec::new();
        if let Some(receivers) = receiver {
            positions.push(from_fn(move || {
                Ok(receivers.iter().map(Variant::same).collect())
            }));
            mandatory = mandatory.map(|m| m + 1);
        }
        for param in &node.params {
            positions.push(from_fn(move || registry.positional(param, scope)));
        }

        let default_rest = [DEFAULT_REST.to_string()];
        let rest_descs = node.rest.as_deref().unwrap_or(&default_rest);
        let rest: Vec<BoxSupplier<'_, RestVariant>> = rest_descs
            .iter()
            .map(|desc| from_fn(move || registry.rest(desc, scope)))
            .collect();

        let combos = expand(&positions, mandatory, &rest).map_err(|source| GenError::Supplier {
            name: name.clone(),
            path: path.to_string(),
            source,
        })?;

        let cases: Vec<TestCase> = combos
            .into_iter()
            .map(|combo| self.build_case(&name, kind, receiver.is_some(), combo, node, ctx))
            .collect();
        self.groups.entry(name).or_default().extend(cases);
        Ok(())
    }

    fn build_case(
        &self,
        name: &str,
        kind: LeafKind<'_>,
        has_receiver: bool,
        combo: Combination,
        node: &SpecNode,
        ctx: &Context,
    ) -> TestCase {
        let side = |args: Vec<String>| -> Side {
            let (receiver, args) = if has_receiver {
                let mut args = args.into_iter();
                (args.next(), args.collect::<Vec<_>>())
            } else {
                (None, args)
            };
            let joined = args.join(", ");
            let expr = match kind {
                LeafKind::Method(method) => {
                    let dot = if has_receiver { "self." } else { "" };
                    format!("{}{}({})", dot, method, joined)
                }
                LeafKind::Expr(expr) => self.pars.replace_all(expr, NoExpand(&joined)).into_owned(),
            };
            Side { expr, receiver }
        };

        TestCase {
            name: name.to_string(),
            reference: side(combo.reference),
            target: side(combo.target),
            ret_type: node.ret_type.clone(),
            self_type: ctx.self_type().map(str::to_string),
        }
    }

    /// Number of ignored subtrees seen so far
    pub fn ignored(&self) -> usize {
        self.ignored
    }

    /// Total number of generated cases
    pub fn case_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Groups generated so far, by name
    pub fn groups(&self) -> &BTreeMap<String, Vec<TestCase>> {
        &self.groups
    }

    /// Hand the groups over for execution, ordered by name
    pub fn into_groups(self) -> Vec<TestGroup> {
        self.groups
            .into_iter()
            .map(|(name, cases)| TestGroup::new(name, cases))
            .collect()
    }
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`
pub fn sanitize(expr: &str) -> String {
    expr.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
