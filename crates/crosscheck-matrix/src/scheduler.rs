//! Chunked execution of test groups on a bounded worker pool
//!
//! Each group is owned by exactly one worker from start to finish; its
//! chunks run in index order. For every chunk the reference program is
//! rendered and run, its stdout becomes the expected results, and the target
//! program is rendered with those results embedded. With verification on,
//! the target program is then compiled and executed. A failing chunk is
//! recorded and counted; it never stops other chunks or groups.

use crate::case::{TestCase, TestGroup};
use crate::error::{GenError, GenResult};
use crate::render::{ChunkView, Renderer};
use crate::toolchain::{describe_exit, ProcessOutput, Toolchain};
use crate::totals::{Summary, Totals};
use crate::walker::sanitize;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEFAULT_CHUNK_SIZE: usize = 200;
pub const DEFAULT_WORKERS: usize = 8;

/// Scheduler settings, passed explicitly at construction
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Receives rendered target sources
    pub out_dir: PathBuf,
    /// Receives reference sources, captured results and compiled artifacts
    pub tmp_dir: PathBuf,
    pub chunk_size: usize,
    pub workers: usize,
    /// Compile and run target sources after writing them
    pub verify: bool,
    pub reference_ext: String,
    pub target_ext: String,
    pub verbose: bool,
}

impl SchedulerConfig {
    pub fn new(out_dir: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            tmp_dir: tmp_dir.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            verify: false,
            reference_ext: "ts".to_string(),
            target_ext: "ets".to_string(),
            verbose: false,
        }
    }

    /// File stem shared by every artifact of one chunk.
    ///
    /// Group names come from free-form `category` and `method` text, so the
    /// stem is reduced to `[A-Za-z0-9_]` and always stays inside its directory.
    pub fn stem(name: &str, chunk: usize) -> String {
        format!("{}_{}", sanitize(name), chunk)
    }

    pub fn reference_path(&self, name: &str, chunk: usize) -> PathBuf {
        self.tmp_dir
            .join(format!("{}.{}", Self::stem(name, chunk), self.reference_ext))
    }

    pub fn result_path(&self, name: &str, chunk: usize) -> PathBuf {
        self.tmp_dir
            .join(format!("{}.json", Self::stem(name, chunk)))
    }

    pub fn target_path(&self, name: &str, chunk: usize) -> PathBuf {
        self.out_dir
            .join(format!("{}.{}", Self::stem(name, chunk), self.target_ext))
    }

    pub fn artifact_path(&self, name: &str, chunk: usize) -> PathBuf {
        self.tmp_dir
            .join(format!("{}.abc", Self::stem(name, chunk)))
    }
}

/// Empty the output directory and make sure the temporary one exists
pub fn prepare_dirs(config: &SchedulerConfig) -> GenResult<()> {
    if config.out_dir.exists() {
        fs::remove_dir_all(&config.out_dir).map_err(|e| GenError::io(&config.out_dir, e))?;
    }
    fs::create_dir_all(&config.out_dir).map_err(|e| GenError::io(&config.out_dir, e))?;
    fs::create_dir_all(&config.tmp_dir).map_err(|e| GenError::io(&config.tmp_dir, e))?;
    Ok(())
}

/// Pipeline step a chunk failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Reference,
    Parse,
    Render,
    Compile,
    Run,
    Io,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Parse => "parse",
            Self::Render => "render",
            Self::Compile => "compile",
            Self::Run => "run",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why one chunk did not pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    pub group: String,
    pub chunk: usize,
    pub stage: Stage,
    /// Command line, when a subprocess was involved
    pub command: Option<String>,
    pub exit_code: Option<i32>,
    /// Captured diagnostics or error message
    pub message: String,
}

impl ChunkFailure {
    fn new(group: &str, chunk: usize, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            group: group.to_string(),
            chunk,
            stage,
            command: None,
            exit_code: None,
            message: message.into(),
        }
    }

    fn from_process(group: &str, chunk: usize, stage: Stage, output: &ProcessOutput) -> Self {
        Self {
            group: group.to_string(),
            chunk,
            stage,
            command: Some(output.command.clone()),
            exit_code: output.exit_code,
            message: output.diagnostics().to_string(),
        }
    }
}

impl fmt::Display for ChunkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} chunk {}: {} failed", self.group, self.chunk, self.stage)?;
        if self.command.is_some() {
            write!(f, " ({})", describe_exit(self.exit_code))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ChunkOutcome {
    /// Target program compiled and ran cleanly
    Passed,
    /// Target program written; verification disabled
    Generated,
    Failed(ChunkFailure),
}

impl ChunkOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Outcomes for one group, in chunk order
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub name: String,
    pub cases: usize,
    pub chunks: Vec<ChunkOutcome>,
    pub duration: Duration,
}

impl GroupReport {
    pub fn failures(&self) -> impl Iterator<Item = &ChunkFailure> {
        self.chunks.iter().filter_map(|outcome| match outcome {
            ChunkOutcome::Failed(failure) => Some(failure),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub totals: Summary,
    pub groups: Vec<GroupReport>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &ChunkFailure> {
        self.groups.iter().flat_map(GroupReport::failures)
    }
}

pub struct Scheduler {
    config: SchedulerConfig,
    renderer: Box<dyn Renderer>,
    toolchain: Box<dyn Toolchain>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        renderer: Box<dyn Renderer>,
        toolchain: Box<dyn Toolchain>,
    ) -> Self {
        Self {
            config,
            renderer,
            toolchain,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Toolchain preconditions; call once before [`run`](Self::run)
    pub fn check_environment(&self) -> GenResult<()> {
        self.toolchain.check_environment()
    }

    /// Run every group and wait for all of them.
    ///
    /// Only pool construction can fail; chunk failures are recorded in the
    /// report and in `totals`.
    pub fn run(&self, groups: Vec<TestGroup>, totals: &Totals) -> GenResult<RunReport> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.workers.max(1))
            .thread_name(|i| format!("crosscheck-worker-{}", i))
            .build()
            .map_err(|e| GenError::ThreadPool(e.to_string()))?;

        let reports: Vec<GroupReport> = pool.install(|| {
            groups
                .into_par_iter()
                .map(|group| self.run_group(&group, totals))
                .collect()
        });

        Ok(RunReport {
            totals: totals.snapshot(),
            groups: reports,
        })
    }

    fn run_group(&self, group: &TestGroup, totals: &Totals) -> GroupReport {
        let start = Instant::now();
        totals.add_cases(group.len());

        let chunks = group
            .chunks(self.config.chunk_size)
            .enumerate()
            .map(|(idx, cases)| {
                totals.add_file();
                if self.config.verbose {
                    println!("{} {}", group.name, idx);
                }
                let outcome = self
                    .run_chunk(&group.name, idx, cases)
                    .unwrap_or_else(ChunkOutcome::Failed);
                if outcome.is_failure() {
                    totals.add_failure();
                }
                outcome
            })
            .collect();

        GroupReport {
            name: group.name.clone(),
            cases: group.len(),
            chunks,
            duration: start.elapsed(),
        }
    }

    fn run_chunk(
        &self,
        name: &str,
        idx: usize,
        cases: &[TestCase],
    ) -> Result<ChunkOutcome, ChunkFailure> {
        let fail = |stage: Stage, message: String| ChunkFailure::new(name, idx, stage, message);
        let view = ChunkView {
            name,
            chunk: idx,
            cases,
        };

        // a. reference program
        let reference = self
            .renderer
            .render_reference(&view)
            .map_err(|e| fail(Stage::Render, e.to_string()))?;
        let reference_path = self.config.reference_path(name, idx);
        write(&reference_path, &reference).map_err(|e| fail(Stage::Io, e))?;

        if self.config.verbose {
            println!("run reference for {} {}", name, idx);
        }
        let output = self
            .toolchain
            .run_reference(&reference_path)
            .map_err(|e| fail(Stage::Reference, e.to_string()))?;
        if !output.success() {
            return Err(ChunkFailure::from_process(name, idx, Stage::Reference, &output));
        }
        write(&self.config.result_path(name, idx), &output.stdout)
            .map_err(|e| fail(Stage::Io, e))?;

        // b. expected results
        let expected: serde_json::Value = serde_json::from_str(&output.stdout)
            .map_err(|e| fail(Stage::Parse, format!("invalid result document: {}", e)))?;
        check_expected(&expected, cases.len()).map_err(|m| fail(Stage::Parse, m))?;

        // c. target program
        let target = self
            .renderer
            .render_target(&view, &expected)
            .map_err(|e| fail(Stage::Render, e.to_string()))?;
        let target_path = self.config.target_path(name, idx);
        write(&target_path, &target).map_err(|e| fail(Stage::Io, e))?;

        if !self.config.verify {
            return Ok(ChunkOutcome::Generated);
        }

        // d. verification
        if self.config.verbose {
            println!("compile {}", target_path.display());
        }
        let artifact = self.config.artifact_path(name, idx);
        let compiled = self
            .toolchain
            .compile_target(&target_path, &artifact)
            .map_err(|e| fail(Stage::Compile, e.to_string()))?;
        if !compiled.success() {
            return Err(ChunkFailure::from_process(name, idx, Stage::Compile, &compiled));
        }

        if self.config.verbose {
            println!("run {}", artifact.display());
        }
        let ran = self
            .toolchain
            .run_target(&artifact)
            .map_err(|e| fail(Stage::Run, e.to_string()))?;
        if !ran.success() {
            return Err(ChunkFailure::from_process(name, idx, Stage::Run, &ran));
        }

        Ok(ChunkOutcome::Passed)
    }
}

fn write(path: &Path, contents: &str) -> Result<(), String> {
    fs::write(path, contents).map_err(|e| GenError::io(path, e).to_string())
}

/// The result document must hold one `{value}` or `{error}` entry per case
fn check_expected(expected: &serde_json::Value, count: usize) -> Result<(), String> {
    let entries = expected
        .as_array()
        .ok_or_else(|| "result document is not an array".to_string())?;
    if entries.len() != count {
        return Err(format!(
            "expected {} results, got {}",
            count,
            entries.len()
        ));
    }
    for (i, entry) in entries.iter().enumerate() {
        let tagged = entry
            .as_object()
            .map(|obj| obj.contains_key("value") || obj.contains_key("error"))
            .unwrap_or(false);
        if !tagged {
            return Err(format!("result {} has neither 'value' nor 'error'", i));
        }
    }
    Ok(())
}
