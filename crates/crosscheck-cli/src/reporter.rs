//! Run reporter - display generation results

use colored::*;
use crosscheck_matrix::{ChunkFailure, ChunkOutcome, GroupReport, RunReport, Summary};

pub struct Reporter {
    /// Show one line per group
    verbose: bool,
}

impl Reporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Report a finished run
    pub fn report(&self, report: &RunReport) {
        if self.verbose {
            for group in &report.groups {
                self.print_group(group);
            }
            println!();
        }

        self.print_failures(report);
        print_summary(&report.totals);
    }

    fn print_group(&self, group: &GroupReport) {
        let failed = group.failures().count();
        let label = if failed > 0 {
            "FAIL".red().bold()
        } else if group.chunks.iter().all(|c| matches!(c, ChunkOutcome::Passed)) {
            "PASS".green().bold()
        } else {
            "GEN".cyan().bold()
        };
        println!(
            "{} {} ({} cases, {} files, {:.2?})",
            label,
            group.name,
            group.cases,
            group.chunks.len(),
            group.duration
        );
    }

    fn print_failures(&self, report: &RunReport) {
        let failures: Vec<&ChunkFailure> = report.failures().collect();
        if failures.is_empty() {
            return;
        }

        eprintln!("{}", "Failures:".red().bold());
        eprintln!();
        for failure in failures {
            eprintln!("  {} {}", "●".red(), failure);
            if let Some(command) = &failure.command {
                eprintln!("    {} {}", "command:".dimmed(), command);
            }
            for line in failure.message.lines() {
                eprintln!("    {}", line.dimmed());
            }
            eprintln!();
        }
    }
}

/// Totals block shared by every output mode
pub fn print_summary(totals: &Summary) {
    println!("{}", "─".repeat(50));
    println!("total tests: {}", totals.cases.to_string().bold());
    let failed = format!("{}/{}", totals.failed, totals.files);
    println!(
        "failed files: {}",
        if totals.failed > 0 {
            failed.red().bold()
        } else {
            failed.green()
        }
    );
    println!("ignored subtrees: {}", totals.ignored);

    let status = if totals.success() {
        "PASSED".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!("Result: {}", status);
}

/// JSON document for `--json`
pub fn summary_json(report: &RunReport) -> serde_json::Value {
    serde_json::json!({
        "total": report.totals.cases,
        "files": report.totals.files,
        "failed": report.totals.failed,
        "ignored": report.totals.ignored,
        "success": report.totals.success(),
        "failures": report.failures().collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosscheck_matrix::Stage;
    use std::time::Duration;

    fn report(failed: bool) -> RunReport {
        let chunks = if failed {
            vec![
                ChunkOutcome::Generated,
                ChunkOutcome::Failed(ChunkFailure {
                    group: "str_at".to_string(),
                    chunk: 1,
                    stage: Stage::Reference,
                    command: Some("npx ts-node /tmp/str_at_1.ts".to_string()),
                    exit_code: Some(1),
                    message: "TypeError: x\n  at line 3".to_string(),
                }),
            ]
        } else {
            vec![ChunkOutcome::Generated]
        };
        RunReport {
            totals: Summary {
                cases: 300,
                files: chunks.len(),
                failed: usize::from(failed),
                ignored: 2,
            },
            groups: vec![GroupReport {
                name: "str_at".to_string(),
                cases: 300,
                chunks,
                duration: Duration::from_millis(20),
            }],
        }
    }

    #[test]
    fn test_summary_json() {
        let json = summary_json(&report(true));
        assert_eq!(json["total"], 300);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["success"], false);
        assert_eq!(json["failures"][0]["stage"], "reference");
        assert_eq!(json["failures"][0]["chunk"], 1);
    }

    #[test]
    fn test_report_does_not_panic() {
        colored::control::set_override(false);
        Reporter::new(true).report(&report(true));
        Reporter::new(false).report(&report(false));
        colored::control::unset_override();
    }
}
