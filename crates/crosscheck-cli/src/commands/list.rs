//! List command - walk specifications and show the resulting groups

use crate::status::Status;
use anyhow::Result;
use colored::*;
use crosscheck_matrix::Generator;
use std::path::PathBuf;

/// Arguments for the list command
pub struct ListArgs {
    pub filter: Option<String>,
    pub config: Option<PathBuf>,
    pub no_color: bool,
    pub json: bool,
    pub specs: Vec<PathBuf>,
}

/// Run the list command
pub fn run(args: ListArgs) -> Result<Status> {
    if args.no_color {
        colored::control::set_override(false);
    }

    let mut settings = super::load_settings(args.config.as_deref())?;
    if let Some(filter) = &args.filter {
        settings.filter = filter.clone();
    }
    settings.validate()?;

    let mut generator = Generator::new(&settings.filter)?;
    for spec in &args.specs {
        generator.load(spec)?;
    }

    if args.json {
        let groups: Vec<_> = generator
            .groups()
            .iter()
            .map(|(name, cases)| serde_json::json!({ "name": name, "cases": cases.len() }))
            .collect();
        println!(
            "{}",
            serde_json::json!({
                "groups": groups,
                "total": generator.case_count(),
                "ignored": generator.ignored(),
            })
        );
    } else {
        let width = generator.groups().keys().map(String::len).max().unwrap_or(0);
        for (name, cases) in generator.groups() {
            println!("{:<width$}  {}", name, cases.len().to_string().bold(), width = width);
        }
        println!("{}", "─".repeat(50));
        println!(
            "{} groups, total tests: {}, ignored subtrees: {}",
            generator.groups().len(),
            generator.case_count().to_string().bold(),
            generator.ignored()
        );
    }

    if args.no_color {
        colored::control::unset_override();
    }

    Ok(Status::Ok)
}
