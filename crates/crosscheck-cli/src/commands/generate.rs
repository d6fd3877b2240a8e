//! Generate command - full walk, render, run and verify pipeline

use crate::reporter::{self, Reporter};
use crate::status::Status;
use anyhow::Result;
use colored::*;
use crosscheck_config::{split_prefix, Settings};
use crosscheck_matrix::{
    prepare_dirs, CommandToolchain, Generator, Scheduler, SchedulerConfig, TemplateRenderer,
    Totals,
};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the generate command
pub struct GenerateArgs {
    pub out: PathBuf,
    pub tmp: PathBuf,
    pub chunk_size: Option<usize>,
    pub workers: Option<usize>,
    pub ts_node: Option<String>,
    pub filter: Option<String>,
    pub run_ets: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub no_color: bool,
    pub json: bool,
    pub specs: Vec<PathBuf>,
}

impl GenerateArgs {
    /// Command-line flags take precedence over every configuration layer
    fn apply(&self, settings: &mut Settings) -> Result<()> {
        if let Some(size) = self.chunk_size {
            settings.chunk_size = size;
        }
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if let Some(prefix) = &self.ts_node {
            settings.ts_node = split_prefix(prefix);
        }
        if let Some(filter) = &self.filter {
            settings.filter = filter.clone();
        }
        if self.run_ets.is_some() {
            settings.panda = self.run_ets.clone();
        }
        settings.validate()?;
        Ok(())
    }
}

/// Run the generate command
pub fn run(args: GenerateArgs) -> Result<Status> {
    if args.no_color {
        colored::control::set_override(false);
    }
    let start = Instant::now();

    let mut settings = super::load_settings(args.config.as_deref())?;
    args.apply(&mut settings)?;

    let mut toolchain = CommandToolchain::new(settings.ts_node.clone()).with_panda(settings.panda.clone());
    if let Some(pattern) = &settings.node_version {
        toolchain = toolchain.with_version_pattern(pattern)?;
    }
    let renderer = TemplateRenderer::from_files(
        settings.reference_template.as_deref(),
        settings.target_template.as_deref(),
    )?;

    let config = SchedulerConfig {
        out_dir: args.out.clone(),
        tmp_dir: args.tmp.clone(),
        chunk_size: settings.chunk_size,
        workers: settings.workers,
        verify: settings.verify(),
        reference_ext: settings.reference_ext.clone(),
        target_ext: settings.target_ext.clone(),
        verbose: args.verbose,
    };
    let scheduler = Scheduler::new(config, Box::new(renderer), Box::new(toolchain));
    scheduler.check_environment()?;

    let mut generator = Generator::new(&settings.filter)?.with_verbose(args.verbose);
    for spec in &args.specs {
        generator.load(spec)?;
    }

    let totals = Totals::new();
    totals.add_ignored(generator.ignored());

    if args.verbose && !args.json {
        println!(
            "{} {} cases in {} groups, {} workers",
            "Generating".bold(),
            generator.case_count(),
            generator.groups().len(),
            settings.workers
        );
    }

    prepare_dirs(scheduler.config())?;
    let report = scheduler.run(generator.into_groups(), &totals)?;

    if args.json {
        println!("{}", reporter::summary_json(&report));
    } else {
        Reporter::new(args.verbose).report(&report);
        if args.verbose {
            println!("Time: {:.2?}", start.elapsed());
        }
    }

    if args.no_color {
        colored::control::unset_override();
    }

    Ok(if report.totals.success() {
        Status::Ok
    } else {
        Status::TestsFailed
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> GenerateArgs {
        GenerateArgs {
            out: PathBuf::from("out"),
            tmp: PathBuf::from("tmp"),
            chunk_size: None,
            workers: None,
            ts_node: None,
            filter: None,
            run_ets: None,
            config: None,
            verbose: false,
            no_color: true,
            json: false,
            specs: Vec::new(),
        }
    }

    #[test]
    fn test_flags_override_settings() {
        let mut settings = Settings::default();
        let args = GenerateArgs {
            chunk_size: Some(10),
            workers: Some(0),
            ts_node: Some("deno:run".to_string()),
            run_ets: Some(PathBuf::from("/opt/panda")),
            ..args()
        };
        args.apply(&mut settings).unwrap();
        assert_eq!(settings.chunk_size, 10);
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.ts_node, vec!["deno", "run"]);
        assert!(settings.verify());
    }

    #[test]
    fn test_invalid_flag_values_rejected() {
        let mut settings = Settings::default();
        let args = GenerateArgs {
            chunk_size: Some(0),
            ..args()
        };
        assert!(args.apply(&mut settings).is_err());

        let mut settings = Settings::default();
        let args = GenerateArgs {
            filter: Some("(".to_string()),
            ..self::args()
        };
        assert!(args.apply(&mut settings).is_err());
    }

    #[test]
    fn test_absent_flags_keep_settings() {
        let mut settings = Settings {
            chunk_size: 33,
            ..Default::default()
        };
        args().apply(&mut settings).unwrap();
        assert_eq!(settings.chunk_size, 33);
        assert_eq!(settings.ts_node, vec!["npx", "ts-node"]);
    }
}
