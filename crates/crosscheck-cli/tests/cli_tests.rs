//! CLI integration tests
//!
//! Tests the complete CLI experience including:
//! - Help messages and completions
//! - Listing groups
//! - Full generation with `sh` standing in for the reference runtime
//! - Exit codes for every failure kind

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const SPEC: &str = r#"
category: cat
sub:
  - method: foo
    params: ['paramOf("1", "2")', 'paramOf("3")']
  - ignored: true
    sub:
      - method: skipped
  - category: x
    sub:
      - expr: 'pars + 1'
        params: ['paramOf("5")']
"#;

const SH_REFERENCE: &str = r#"printf '%s\n' '[{% for c in cases %}{% if not loop.first %},{% endif %}{"value": {{ c.reference.expr|tojson }}}{% endfor %}]'
"#;

const SH_FAILING: &str = "echo 'ReferenceError: foo is not defined' >&2\nexit 1\n";

const TARGET: &str = r#"{% for c in cases %}{{ c.target.expr }} == {{ expected[loop.index0].value }}
{% endfor %}"#;

/// Isolated command running inside `dir` with no user config or env overrides
fn crosscheck_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("crosscheck").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("NO_COLOR", "1")
        .env_remove("CROSSCHECK_CHUNK_SIZE")
        .env_remove("CROSSCHECK_WORKERS")
        .env_remove("CROSSCHECK_TS_NODE")
        .env_remove("CROSSCHECK_PANDA")
        .env_remove("CROSSCHECK_JSON");
    cmd
}

fn project(reference_template: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("spec.yaml"), SPEC).unwrap();
    fs::write(dir.path().join("reference.j2"), reference_template).unwrap();
    fs::write(dir.path().join("target.j2"), TARGET).unwrap();
    fs::write(
        dir.path().join("crosscheck.toml"),
        r#"
[generator]
workers = 2

[toolchain]
ts_node = "sh"
node_version = ""

[templates]
reference = "reference.j2"
target = "target.j2"
"#,
    )
    .unwrap();
    dir
}

// ══════════════════════════════════════════════════════════════════════════════
// HELP AND COMPLETIONS
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_help_lists_commands_and_exit_codes() {
    let dir = TempDir::new().unwrap();
    crosscheck_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("completions"))
        .stdout(predicate::str::contains("EXIT CODES"));
}

#[test]
fn test_completions_bash() {
    let dir = TempDir::new().unwrap();
    crosscheck_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("crosscheck"));
}

// ══════════════════════════════════════════════════════════════════════════════
// INVALID OPTIONS
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_out_dir_is_usage_error() {
    let dir = project(SH_REFERENCE);
    crosscheck_cmd(dir.path())
        .args(["generate", "--tmp", "tmp", "spec.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--out"));
}

#[test]
fn test_missing_specs_is_usage_error() {
    let dir = project(SH_REFERENCE);
    crosscheck_cmd(dir.path())
        .args(["generate", "--out", "out", "--tmp", "tmp"])
        .assert()
        .code(2);
}

#[test]
fn test_zero_chunk_size_rejected() {
    let dir = project(SH_REFERENCE);
    crosscheck_cmd(dir.path())
        .args(["generate", "--out", "out", "--tmp", "tmp", "--chunk-size", "0", "spec.yaml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("chunk_size"));
}

#[test]
fn test_bad_filter_rejected() {
    let dir = project(SH_REFERENCE);
    crosscheck_cmd(dir.path())
        .args(["list", "--filter", "(", "spec.yaml"])
        .assert()
        .code(2);
}

// ══════════════════════════════════════════════════════════════════════════════
// LIST
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_list_groups() {
    let dir = project(SH_REFERENCE);
    crosscheck_cmd(dir.path())
        .args(["list", "spec.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cat_foo"))
        .stdout(predicate::str::contains("cat_x_pars___1"))
        .stdout(predicate::str::contains("total tests: 3"))
        .stdout(predicate::str::contains("ignored subtrees: 1"))
        .stdout(predicate::str::contains("skipped").not());
}

#[test]
fn test_list_json() {
    let dir = project(SH_REFERENCE);
    let output = crosscheck_cmd(dir.path())
        .args(["list", "--json", "--filter", "foo", "spec.yaml"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["groups"][0]["name"], "cat_foo");
    assert_eq!(json["groups"][0]["cases"], 2);
}

#[test]
fn test_malformed_spec_exit_code() {
    let dir = project(SH_REFERENCE);
    fs::write(dir.path().join("bad.yaml"), "sub:\n  - method: a\n    expr: b\n").unwrap();
    crosscheck_cmd(dir.path())
        .args(["list", "bad.yaml"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("bad.yaml:/sub[0]"));
}

#[test]
fn test_unknown_supplier_exit_code() {
    let dir = project(SH_REFERENCE);
    fs::write(
        dir.path().join("bad.yaml"),
        "method: f\nparams: ['nosuch(1)']\n",
    )
    .unwrap();
    crosscheck_cmd(dir.path())
        .args(["list", "bad.yaml"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("'f'"))
        .stderr(predicate::str::contains("unknown supplier 'nosuch'"));
}

// ══════════════════════════════════════════════════════════════════════════════
// GENERATE
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_generate_writes_target_sources() {
    let dir = project(SH_REFERENCE);
    fs::create_dir_all(dir.path().join("out")).unwrap();
    fs::write(dir.path().join("out/stale.ets"), "old").unwrap();

    crosscheck_cmd(dir.path())
        .args(["generate", "--out", "out", "--tmp", "tmp", "spec.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("total tests: 3"))
        .stdout(predicate::str::contains("failed files: 0/2"))
        .stdout(predicate::str::contains("ignored subtrees: 1"));

    let foo = fs::read_to_string(dir.path().join("out/cat_foo_0.ets")).unwrap();
    assert_eq!(foo, "foo(1, 3) == foo(1, 3)\nfoo(2, 3) == foo(2, 3)\n");
    let expr = fs::read_to_string(dir.path().join("out/cat_x_pars___1_0.ets")).unwrap();
    assert_eq!(expr, "5 + 1 == 5 + 1\n");
    assert!(!dir.path().join("out/stale.ets").exists());
    assert!(dir.path().join("tmp/cat_foo_0.ts").exists());
}

#[test]
fn test_generate_chunking_flag() {
    let dir = project(SH_REFERENCE);
    crosscheck_cmd(dir.path())
        .args(["generate", "-o", "out", "-t", "tmp", "-c", "1", "spec.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("failed files: 0/3"));
    assert!(dir.path().join("out/cat_foo_1.ets").exists());
}

#[test]
fn test_generate_reports_failures() {
    let dir = project(SH_FAILING);
    crosscheck_cmd(dir.path())
        .args(["generate", "--out", "out", "--tmp", "tmp", "spec.yaml"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed files: 2/2"))
        .stderr(predicate::str::contains("reference failed"))
        .stderr(predicate::str::contains("ReferenceError: foo is not defined"));
    assert!(!dir.path().join("out/cat_foo_0.ets").exists());
}

#[test]
fn test_generate_json_summary() {
    let dir = project(SH_FAILING);
    let output = crosscheck_cmd(dir.path())
        .args(["generate", "--json", "--out", "out", "--tmp", "tmp", "spec.yaml"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total"], 3);
    assert_eq!(json["failed"], 2);
    assert_eq!(json["failures"][0]["stage"], "reference");
}

// ══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_reference_runtime() {
    let dir = project(SH_REFERENCE);
    fs::write(
        dir.path().join("crosscheck.toml"),
        "[toolchain]\nts_node = \"crosscheck-no-such-runtime\"\n",
    )
    .unwrap();
    crosscheck_cmd(dir.path())
        .args(["generate", "--out", "out", "--tmp", "tmp", "spec.yaml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("crosscheck-no-such-runtime"));
}

#[test]
fn test_wrong_reference_version() {
    let dir = project(SH_REFERENCE);
    fs::write(
        dir.path().join("crosscheck.toml"),
        "[toolchain]\nts_node = \"sh:-c:echo 18.0.0\"\n",
    )
    .unwrap();
    crosscheck_cmd(dir.path())
        .args(["generate", "--out", "out", "--tmp", "tmp", "spec.yaml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("18.0.0"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_incomplete_target_toolchain() {
    let dir = project(SH_REFERENCE);
    let panda = dir.path().join("panda");
    fs::create_dir_all(&panda).unwrap();
    crosscheck_cmd(dir.path())
        .args(["generate", "--out", "out", "--tmp", "tmp", "--run-ets"])
        .arg(&panda)
        .arg("spec.yaml")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("es2panda"));
}
