//! External toolchain invocation
//!
//! Runtime-A is an interpreter driven through a configurable command prefix
//! (`npx ts-node` by default). Runtime-B is a compiler plus a virtual machine
//! found under a toolchain installation root. Every invocation captures
//! stdout and stderr separately: stdout is result data, stderr is diagnostics.

use crate::error::{GenError, GenResult};
use regex::Regex;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Node.js releases the reference runtime is pinned to
pub const DEFAULT_VERSION_PATTERN: &str = r"^21\.4(\.|\s*$)";

/// Script the version probe evaluates
const VERSION_PROBE: &str = "console.log(process.versions.node)";

/// Captured result of one subprocess
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Command line as executed
    pub command: String,
    /// Exit code; `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ProcessOutput {
    /// Check if the process exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Diagnostic text: stderr, or stdout when stderr is empty
    pub fn diagnostics(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim_end()
        } else {
            self.stderr.trim_end()
        }
    }
}

/// The three external tools a run needs
pub trait Toolchain: Send + Sync {
    /// Verify preconditions once, before any group runs
    fn check_environment(&self) -> GenResult<()>;

    /// Run a rendered runtime-A source; stdout carries the results
    fn run_reference(&self, source: &Path) -> GenResult<ProcessOutput>;

    /// Compile a rendered runtime-B source into `artifact`
    fn compile_target(&self, source: &Path, artifact: &Path) -> GenResult<ProcessOutput>;

    /// Execute a compiled runtime-B artifact
    fn run_target(&self, artifact: &Path) -> GenResult<ProcessOutput>;
}

/// Toolchain backed by real subprocesses
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    reference_prefix: Vec<String>,
    version_pattern: Option<Regex>,
    panda: Option<PathBuf>,
}

impl CommandToolchain {
    /// Create a toolchain running runtime-A sources through `prefix`.
    ///
    /// No version check is performed until one is configured with
    /// [`with_version_pattern`](Self::with_version_pattern).
    pub fn new(prefix: Vec<String>) -> Self {
        Self {
            reference_prefix: prefix,
            version_pattern: None,
            panda: None,
        }
    }

    /// Require the reference runtime's reported version to match `pattern`
    pub fn with_version_pattern(mut self, pattern: &str) -> GenResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            GenError::environment(format!("invalid version pattern '{}': {}", pattern, e))
        })?;
        self.version_pattern = Some(regex);
        Ok(self)
    }

    /// Enable runtime-B verification using the installation at `root`
    pub fn with_panda(mut self, root: Option<PathBuf>) -> Self {
        self.panda = root;
        self
    }

    pub fn reference_prefix(&self) -> &[String] {
        &self.reference_prefix
    }

    pub fn es2panda(&self) -> Option<PathBuf> {
        self.panda.as_ref().map(|root| root.join("bin").join("es2panda"))
    }

    pub fn ark(&self) -> Option<PathBuf> {
        self.panda.as_ref().map(|root| root.join("bin").join("ark"))
    }

    pub fn stdlib(&self) -> Option<PathBuf> {
        self.panda
            .as_ref()
            .map(|root| root.join("plugins").join("ets").join("etsstdlib.abc"))
    }

    fn reference_command(&self, extra: &[&OsStr]) -> GenResult<(OsString, Vec<OsString>)> {
        let (program, prefix_args) = self
            .reference_prefix
            .split_first()
            .ok_or_else(|| GenError::environment("reference runtime prefix is empty"))?;
        let mut args: Vec<OsString> = prefix_args.iter().map(OsString::from).collect();
        args.extend(extra.iter().map(|a| a.to_os_string()));
        Ok((OsString::from(program), args))
    }

    fn check_version(&self, pattern: &Regex) -> GenResult<()> {
        let (program, args) =
            self.reference_command(&[OsStr::new("-e"), OsStr::new(VERSION_PROBE)])?;
        let output = execute(&program, &args).map_err(|e| GenError::environment(e.to_string()))?;
        if !output.success() {
            return Err(GenError::environment(format!(
                "'{}' exited with {}: {}",
                output.command,
                describe_exit(output.exit_code),
                output.diagnostics()
            )));
        }
        let version = output.stdout.trim();
        if !pattern.is_match(version) {
            return Err(GenError::environment(format!(
                "unsupported reference runtime version '{}' (expected to match '{}')",
                version,
                pattern.as_str()
            )));
        }
        Ok(())
    }

    fn require(&self, path: Option<PathBuf>, what: &str) -> GenResult<PathBuf> {
        path.ok_or_else(|| GenError::environment(format!("{} requested but no toolchain root is configured", what)))
    }
}

impl Toolchain for CommandToolchain {
    fn check_environment(&self) -> GenResult<()> {
        self.reference_command(&[])?;
        if let Some(pattern) = &self.version_pattern {
            self.check_version(pattern)?;
        }
        if self.panda.is_some() {
            for path in [self.es2panda(), self.ark(), self.stdlib()].into_iter().flatten() {
                if !path.is_file() {
                    return Err(GenError::environment(format!(
                        "missing toolchain file {}",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    fn run_reference(&self, source: &Path) -> GenResult<ProcessOutput> {
        let (program, args) = self.reference_command(&[source.as_os_str()])?;
        execute(&program, &args)
    }

    fn compile_target(&self, source: &Path, artifact: &Path) -> GenResult<ProcessOutput> {
        let es2panda = self.require(self.es2panda(), "compilation")?;
        let args: Vec<OsString> = vec![
            "--extension=ets".into(),
            "--opt-level=2".into(),
            "--output".into(),
            artifact.into(),
            source.into(),
        ];
        execute(es2panda.as_os_str(), &args)
    }

    fn run_target(&self, artifact: &Path) -> GenResult<ProcessOutput> {
        let ark = self.require(self.ark(), "execution")?;
        let stdlib = self.require(self.stdlib(), "execution")?;
        let args: Vec<OsString> = vec![
            "--no-async-jit=true".into(),
            "--gc-trigger-type=debug".into(),
            "--boot-panda-files".into(),
            stdlib.into(),
            "--load-runtimes=ets".into(),
            artifact.into(),
            "ETSGLOBAL::main".into(),
        ];
        execute(ark.as_os_str(), &args)
    }
}

/// Run `program` to completion with captured output
fn execute(program: &OsStr, args: &[OsString]) -> GenResult<ProcessOutput> {
    let command = command_line(program, args);
    let start = Instant::now();

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| GenError::Spawn {
            command: command.clone(),
            error: e.to_string(),
        })?
        .wait_with_output()
        .map_err(|e| GenError::Spawn {
            command: command.clone(),
            error: e.to_string(),
        })?;

    Ok(ProcessOutput {
        command,
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration: start.elapsed(),
    })
}

fn command_line(program: &OsStr, args: &[OsString]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(OsString::as_os_str))
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable exit status
pub fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn sh() -> CommandToolchain {
        CommandToolchain::new(vec!["sh".to_string()])
    }

    fn script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("script.sh");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_run_reference_separates_streams() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "echo warning >&2\necho '[1]'\n");
        let output = sh().run_reference(&path).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "[1]\n");
        assert_eq!(output.stderr, "warning\n");
        assert_eq!(output.diagnostics(), "warning");
        assert!(output.command.starts_with("sh "));
    }

    #[test]
    fn test_non_zero_exit_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "echo partial\nexit 3\n");
        let output = sh().run_reference(&path).unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.diagnostics(), "partial");
    }

    #[test]
    fn test_spawn_failure_is_execution_error() {
        let toolchain = CommandToolchain::new(vec!["crosscheck-no-such-binary".to_string()]);
        let err = toolchain.run_reference(Path::new("x.ts")).unwrap_err();
        assert!(matches!(err, GenError::Spawn { .. }));
        assert_eq!(err.kind(), ErrorKind::Execution);
    }

    #[test]
    fn test_version_check() {
        let matching = CommandToolchain::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 21.4.0".to_string(),
        ])
        .with_version_pattern(DEFAULT_VERSION_PATTERN)
        .unwrap();
        assert!(matching.check_environment().is_ok());

        let wrong = CommandToolchain::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 20.11.1".to_string(),
        ])
        .with_version_pattern(DEFAULT_VERSION_PATTERN)
        .unwrap();
        let err = wrong.check_environment().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Environment);
        assert!(err.to_string().contains("20.11.1"));
    }

    #[test]
    fn test_version_pattern_rejects_lookalikes() {
        let pattern = Regex::new(DEFAULT_VERSION_PATTERN).unwrap();
        assert!(pattern.is_match("21.4"));
        assert!(pattern.is_match("21.4.0"));
        assert!(!pattern.is_match("21.40.0"));
        assert!(!pattern.is_match("121.4.0"));
    }

    #[test]
    fn test_environment_check_failures() {
        let empty = CommandToolchain::new(Vec::new());
        assert_eq!(
            empty.check_environment().unwrap_err().kind(),
            ErrorKind::Environment
        );

        let missing = CommandToolchain::new(vec!["crosscheck-no-such-binary".to_string()])
            .with_version_pattern(DEFAULT_VERSION_PATTERN)
            .unwrap();
        assert_eq!(
            missing.check_environment().unwrap_err().kind(),
            ErrorKind::Environment
        );
    }

    #[test]
    fn test_panda_layout_checked() {
        let root = TempDir::new().unwrap();
        let toolchain = sh().with_panda(Some(root.path().to_path_buf()));
        let err = toolchain.check_environment().unwrap_err();
        assert!(err.to_string().contains("es2panda"));

        fs::create_dir_all(root.path().join("bin")).unwrap();
        fs::create_dir_all(root.path().join("plugins/ets")).unwrap();
        fs::write(root.path().join("bin/es2panda"), "").unwrap();
        fs::write(root.path().join("bin/ark"), "").unwrap();
        fs::write(root.path().join("plugins/ets/etsstdlib.abc"), "").unwrap();
        assert!(toolchain.check_environment().is_ok());
    }

    #[test]
    fn test_target_commands_without_root() {
        let err = sh()
            .compile_target(Path::new("a.ets"), Path::new("a.abc"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Environment);
    }

    #[test]
    fn test_describe_exit() {
        assert_eq!(describe_exit(Some(2)), "exit code 2");
        assert_eq!(describe_exit(None), "signal");
    }
}
