//! Parameter candidate suppliers
//!
//! Parameter and rest descriptors in a specification are small call
//! expressions such as `paramOf("1", "-1")` or `concat(ints, pair("1n", "1"))`.
//! They are parsed into a [`Descriptor`] and resolved against a
//! [`SupplierRegistry`] of named callbacks and the variable bindings that are
//! in scope at the leaf being expanded.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Maximum nesting of variable references while resolving one descriptor
const MAX_BINDING_DEPTH: usize = 32;

/// One concrete argument value in both runtimes' syntax
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Variant {
    /// Runtime-A (reference) text
    pub reference: String,
    /// Runtime-B (target) text
    pub target: String,
}

impl Variant {
    pub fn new(reference: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            target: target.into(),
        }
    }

    /// A variant spelled identically on both sides
    pub fn same(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            reference: text.clone(),
            target: text,
        }
    }
}

/// Trailing arguments appended to a fully saturated call
pub type RestVariant = Vec<Variant>;

/// Supplier failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupplierError {
    #[error("cannot parse descriptor '{text}': {message}")]
    Parse { text: String, message: String },

    #[error("unknown supplier '{0}'")]
    Unknown(String),

    #[error("'{name}' expects {expected}")]
    Arity { name: String, expected: String },

    #[error("'{name}': {message}")]
    Argument { name: String, message: String },

    #[error("variable '{0}' is not bound")]
    Unbound(String),

    #[error("variable '{0}' refers back to itself")]
    RecursiveBinding(String),

    #[error("no receiver type in scope")]
    NoSelfType,
}

/// Something that produces a finite, ordered list of candidates on demand
pub trait Supplier<T> {
    fn supply(&self) -> Result<Vec<T>, SupplierError>;
}

impl<T, F> Supplier<T> for F
where
    F: Fn() -> Result<Vec<T>, SupplierError>,
{
    fn supply(&self) -> Result<Vec<T>, SupplierError> {
        self()
    }
}

/// Boxed supplier as consumed by the expander
pub type BoxSupplier<'a, T> = Box<dyn Supplier<T> + 'a>;

/// Box a closure as a supplier
pub fn from_fn<'a, T, F>(f: F) -> BoxSupplier<'a, T>
where
    T: 'a,
    F: Fn() -> Result<Vec<T>, SupplierError> + 'a,
{
    Box::new(f)
}

/// Bindings visible to suppliers at a leaf
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub vars: &'a BTreeMap<String, String>,
    pub self_type: Option<&'a str>,
}

/// Descriptor argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Quoted string literal, unescaped
    Str(String),
    /// Numeric literal kept verbatim (`1`, `-0.5`, `0x1F`, `1e10`)
    Number(String),
    /// Bare identifier
    Ident(String),
    /// Nested call
    Call(Descriptor),
}

/// Parsed descriptor: `name` or `name(args…)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub name: String,
    /// `None` for a bare identifier
    pub args: Option<Vec<Arg>>,
}

impl Descriptor {
    pub fn parse(text: &str) -> Result<Self, SupplierError> {
        let mut parser = DescriptorParser::new(text);
        parser.skip_ws();
        let name = parser.ident()?;
        let desc = parser.call_tail(name)?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(desc)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(args) = &self.args {
            let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            write!(f, "({})", parts.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Str(s) => write!(f, "{:?}", s),
            Arg::Number(n) | Arg::Ident(n) => write!(f, "{}", n),
            Arg::Call(d) => write!(f, "{}", d),
        }
    }
}

struct DescriptorParser<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> SupplierError {
        SupplierError::Parse {
            text: self.text.to_string(),
            message: format!("{} at offset {}", message, self.pos),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> Result<String, SupplierError> {
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
            _ => return Err(self.error("expected identifier")),
        }
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn call_tail(&mut self, name: String) -> Result<Descriptor, SupplierError> {
        self.skip_ws();
        if self.peek() != Some('(') {
            return Ok(Descriptor { name, args: None });
        }
        self.pos += 1;
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(Descriptor {
                name,
                args: Some(args),
            });
        }
        loop {
            self.skip_ws();
            args.push(self.arg()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
        Ok(Descriptor {
            name,
            args: Some(args),
        })
    }

    fn arg(&mut self) -> Result<Arg, SupplierError> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => self.string(q).map(Arg::Str),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let start = self.pos;
                self.pos += 1;
                while self
                    .peek()
                    .is_some_and(|c| c.is_alphanumeric() || c == '.' || c == '_')
                {
                    self.pos += 1;
                }
                Ok(Arg::Number(self.chars[start..self.pos].iter().collect()))
            }
            _ => {
                let name = self.ident()?;
                let desc = self.call_tail(name)?;
                Ok(match desc.args {
                    None => Arg::Ident(desc.name),
                    Some(_) => Arg::Call(desc),
                })
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, SupplierError> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) if c == quote || c == '\\' => out.push(c),
                        Some(c) => {
                            out.push('\\');
                            out.push(c);
                        }
                        None => return Err(self.error("unterminated string")),
                    }
                    self.pos += 1;
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}

type PositionalFn =
    dyn Fn(&str, &[Arg], &Resolver<'_>) -> Result<Vec<Variant>, SupplierError> + Send + Sync;
type RestFn =
    dyn Fn(&str, &[Arg], &Resolver<'_>) -> Result<Vec<RestVariant>, SupplierError> + Send + Sync;

/// Named supplier callbacks
#[derive(Clone)]
pub struct SupplierRegistry {
    positional: HashMap<String, Arc<PositionalFn>>,
    rest: HashMap<String, Arc<RestFn>>,
}

impl fmt::Debug for SupplierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut positional: Vec<_> = self.positional.keys().collect();
        let mut rest: Vec<_> = self.rest.keys().collect();
        positional.sort();
        rest.sort();
        f.debug_struct("SupplierRegistry")
            .field("positional", &positional)
            .field("rest", &rest)
            .finish()
    }
}

impl Default for SupplierRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl SupplierRegistry {
    /// Registry without any suppliers
    pub fn empty() -> Self {
        Self {
            positional: HashMap::new(),
            rest: HashMap::new(),
        }
    }

    /// Registry with the built-in suppliers
    pub fn with_builtins() -> Self {
        let mut reg = Self::empty();

        reg.register_positional("paramOf", |_, args, r| {
            args.iter().map(|a| r.text(a).map(Variant::same)).collect()
        });
        reg.register_positional("pair", |name, args, r| match args {
            [a, b] => Ok(vec![Variant::new(r.text(a)?, r.text(b)?)]),
            _ => Err(arity(name, "exactly 2 arguments")),
        });
        reg.register_positional("pairs", |name, args, r| {
            if args.len() % 2 != 0 {
                return Err(arity(name, "an even number of arguments"));
            }
            args.chunks(2)
                .map(|p| -> Result<Variant, SupplierError> {
                    Ok(Variant::new(r.text(&p[0])?, r.text(&p[1])?))
                })
                .collect()
        });
        reg.register_positional("concat", |_, args, r| {
            let mut out = Vec::new();
            for arg in args {
                out.extend(r.variants(arg)?);
            }
            Ok(out)
        });
        reg.register_positional("var", |name, args, r| match args {
            [a] => {
                let var = r.name_of(name, a)?;
                r.scope
                    .vars
                    .get(&var)
                    .map(|text| vec![Variant::same(text.clone())])
                    .ok_or(SupplierError::Unbound(var))
            }
            _ => Err(arity(name, "exactly 1 argument")),
        });
        reg.register_positional("selfType", |name, args, r| {
            if !args.is_empty() {
                return Err(arity(name, "no arguments"));
            }
            r.scope
                .self_type
                .map(|t| vec![Variant::same(t)])
                .ok_or(SupplierError::NoSelfType)
        });

        reg.register_rest("emptyRest", |name, args, _| {
            if !args.is_empty() {
                return Err(arity(name, "no arguments"));
            }
            Ok(vec![Vec::new()])
        });
        reg.register_rest("restOf", |_, args, r| {
            let mut out = Vec::new();
            for arg in args {
                out.extend(r.variants(arg)?.into_iter().map(|v| vec![v]));
            }
            Ok(out)
        });
        reg.register_rest("spread", |_, args, r| {
            let items = args
                .iter()
                .map(|a| r.text(a).map(Variant::same))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(vec![items])
        });

        reg
    }

    /// Register (or replace) a positional supplier
    pub fn register_positional<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&str, &[Arg], &Resolver<'_>) -> Result<Vec<Variant>, SupplierError>
            + Send
            + Sync
            + 'static,
    {
        self.positional.insert(name.into(), Arc::new(f));
    }

    /// Register (or replace) a rest supplier
    pub fn register_rest<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&str, &[Arg], &Resolver<'_>) -> Result<Vec<RestVariant>, SupplierError>
            + Send
            + Sync
            + 'static,
    {
        self.rest.insert(name.into(), Arc::new(f));
    }

    /// Evaluate a positional descriptor
    pub fn positional(&self, text: &str, scope: Scope<'_>) -> Result<Vec<Variant>, SupplierError> {
        let desc = Descriptor::parse(text)?;
        self.resolver(scope).positional(&desc, 0)
    }

    /// Evaluate a rest descriptor
    pub fn rest(&self, text: &str, scope: Scope<'_>) -> Result<Vec<RestVariant>, SupplierError> {
        let desc = Descriptor::parse(text)?;
        self.resolver(scope).rest(&desc, 0)
    }

    fn resolver<'a>(&'a self, scope: Scope<'a>) -> Resolver<'a> {
        Resolver {
            registry: self,
            scope,
            depth: 0,
        }
    }
}

fn arity(name: &str, expected: &str) -> SupplierError {
    SupplierError::Arity {
        name: name.to_string(),
        expected: expected.to_string(),
    }
}

/// Evaluation context handed to supplier callbacks
pub struct Resolver<'a> {
    registry: &'a SupplierRegistry,
    pub scope: Scope<'a>,
    depth: usize,
}

impl Resolver<'_> {
    /// Argument as literal text. Bound identifiers yield their bound text,
    /// unbound ones their own spelling (`undefined`, `null`, `NaN`).
    pub fn text(&self, arg: &Arg) -> Result<String, SupplierError> {
        match arg {
            Arg::Str(s) | Arg::Number(s) => Ok(s.clone()),
            Arg::Ident(name) => Ok(self
                .scope
                .vars
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.clone())),
            Arg::Call(desc) => Err(SupplierError::Argument {
                name: desc.name.clone(),
                message: "a call cannot be used as literal text".to_string(),
            }),
        }
    }

    /// Argument as a nested positional descriptor
    pub fn variants(&self, arg: &Arg) -> Result<Vec<Variant>, SupplierError> {
        match arg {
            Arg::Call(desc) => self.positional(desc, self.depth),
            Arg::Ident(name) => self.positional(
                &Descriptor {
                    name: name.clone(),
                    args: None,
                },
                self.depth,
            ),
            other => Err(SupplierError::Argument {
                name: other.to_string(),
                message: "expected a supplier, found a literal".to_string(),
            }),
        }
    }

    fn name_of(&self, supplier: &str, arg: &Arg) -> Result<String, SupplierError> {
        match arg {
            Arg::Str(s) | Arg::Ident(s) => Ok(s.clone()),
            _ => Err(SupplierError::Argument {
                name: supplier.to_string(),
                message: "expected a variable name".to_string(),
            }),
        }
    }

    fn nested(&self, depth: usize) -> Resolver<'_> {
        Resolver {
            registry: self.registry,
            scope: self.scope,
            depth,
        }
    }

    /// Parse the text bound to `name`, if it is a bare identifier in scope
    fn follow_binding(
        &self,
        desc: &Descriptor,
        depth: usize,
    ) -> Result<Option<Descriptor>, SupplierError> {
        if desc.args.is_some() {
            return Ok(None);
        }
        let Some(bound) = self.scope.vars.get(&desc.name) else {
            return Ok(None);
        };
        if depth >= MAX_BINDING_DEPTH {
            return Err(SupplierError::RecursiveBinding(desc.name.clone()));
        }
        Descriptor::parse(bound).map(Some)
    }

    fn positional(&self, desc: &Descriptor, depth: usize) -> Result<Vec<Variant>, SupplierError> {
        if let Some(target) = self.follow_binding(desc, depth)? {
            return self.positional(&target, depth + 1);
        }
        let f = self
            .registry
            .positional
            .get(&desc.name)
            .ok_or_else(|| SupplierError::Unknown(desc.name.clone()))?;
        let args = desc.args.as_deref().unwrap_or(&[]);
        f(&desc.name, args, &self.nested(depth))
    }

    fn rest(&self, desc: &Descriptor, depth: usize) -> Result<Vec<RestVariant>, SupplierError> {
        if let Some(target) = self.follow_binding(desc, depth)? {
            return self.rest(&target, depth + 1);
        }
        let f = self
            .registry
            .rest
            .get(&desc.name)
            .ok_or_else(|| SupplierError::Unknown(desc.name.clone()))?;
        let args = desc.args.as_deref().unwrap_or(&[]);
        f(&desc.name, args, &self.nested(depth))
    }
}
