//! Source rendering for both runtimes

use crate::case::TestCase;
use crate::error::{GenError, GenResult};
use minijinja::{context, Environment};
use serde::Serialize;
use std::path::Path;

const REFERENCE: &str = "reference.ts";
const TARGET: &str = "target.ets";

const BUILTIN_REFERENCE: &str = include_str!("../templates/reference.ts.j2");
const BUILTIN_TARGET: &str = include_str!("../templates/target.ets.j2");

/// What a template sees for one chunk
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChunkView<'a> {
    /// Group name
    pub name: &'a str,
    /// Chunk index inside the group
    pub chunk: usize,
    pub cases: &'a [TestCase],
}

/// Turns a chunk into source text for each runtime
pub trait Renderer: Send + Sync {
    /// Runtime-A program printing the observed results as JSON
    fn render_reference(&self, view: &ChunkView<'_>) -> GenResult<String>;

    /// Runtime-B program checking its results against `expected`
    fn render_target(&self, view: &ChunkView<'_>, expected: &serde_json::Value)
        -> GenResult<String>;
}

/// minijinja-backed renderer
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer").finish_non_exhaustive()
    }
}

impl TemplateRenderer {
    /// Renderer using the built-in templates
    pub fn new() -> GenResult<Self> {
        Self::from_sources(BUILTIN_REFERENCE.to_string(), BUILTIN_TARGET.to_string())
    }

    /// Renderer using the given template sources
    pub fn from_sources(reference: String, target: String) -> GenResult<Self> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.add_template_owned(REFERENCE, reference)?;
        env.add_template_owned(TARGET, target)?;
        Ok(Self { env })
    }

    /// Renderer using template files, falling back to the built-ins
    pub fn from_files(reference: Option<&Path>, target: Option<&Path>) -> GenResult<Self> {
        let read = |path: Option<&Path>, builtin: &str| -> GenResult<String> {
            match path {
                Some(p) => std::fs::read_to_string(p).map_err(|e| GenError::io(p, e)),
                None => Ok(builtin.to_string()),
            }
        };
        Self::from_sources(
            read(reference, BUILTIN_REFERENCE)?,
            read(target, BUILTIN_TARGET)?,
        )
    }
}

impl Renderer for TemplateRenderer {
    fn render_reference(&self, view: &ChunkView<'_>) -> GenResult<String> {
        let template = self.env.get_template(REFERENCE)?;
        Ok(template.render(context! {
            name => view.name,
            chunk => view.chunk,
            cases => view.cases,
        })?)
    }

    fn render_target(
        &self,
        view: &ChunkView<'_>,
        expected: &serde_json::Value,
    ) -> GenResult<String> {
        let template = self.env.get_template(TARGET)?;
        Ok(template.render(context! {
            name => view.name,
            chunk => view.chunk,
            cases => view.cases,
            expected => expected,
        })?)
    }
}
