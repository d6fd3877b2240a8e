use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::*;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod reporter;
mod status;

use status::Status;

/// Equivalence test generator for a reference and a target runtime.
///
/// Reads declarative specification trees, expands every method or
/// expression into all argument combinations, records what the reference
/// runtime computes for each, and writes target-runtime programs that check
/// the same results.
///
/// EXAMPLES:
///     crosscheck generate --out gen --tmp /tmp/cc specs/*.yaml
///     crosscheck generate --out gen --tmp /tmp/cc --run-ets ~/panda specs/string.yaml
///     crosscheck list --filter '^str_' specs/string.yaml
///
/// ENVIRONMENT VARIABLES:
///     CROSSCHECK_CHUNK_SIZE   Cases per generated file
///     CROSSCHECK_WORKERS      Concurrent workers
///     CROSSCHECK_TS_NODE      Colon-separated reference runtime prefix
///     CROSSCHECK_PANDA        Target toolchain root (enables verification)
///     CROSSCHECK_JSON         Set to '1' for JSON output by default
///     NO_COLOR                Set to disable colored output
///
/// EXIT CODES:
///     0  all chunks passed    1  some chunks failed    2  invalid options
///     3  environment not usable    4  invalid specification
#[derive(Parser)]
#[command(name = "crosscheck")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate (and optionally verify) equivalence tests
    ///
    /// Walks the specification files, runs every chunk through the reference
    /// runtime and writes target-runtime sources into the output directory.
    /// The output directory is emptied first.
    ///
    /// EXAMPLES:
    ///     crosscheck generate --out gen --tmp tmp spec.yaml
    ///     crosscheck generate --out gen --tmp tmp --workers 16 --chunk-size 50 spec.yaml
    ///     crosscheck generate --out gen --tmp tmp --ts-node node_modules/.bin/ts-node spec.yaml
    #[command(visible_alias = "g")]
    Generate {
        /// Directory receiving target sources
        #[arg(long, short = 'o')]
        out: PathBuf,
        /// Directory for reference sources, captured results and artifacts
        #[arg(long, short = 't')]
        tmp: PathBuf,
        /// Cases per generated file
        #[arg(long, short = 'c')]
        chunk_size: Option<usize>,
        /// Concurrent workers
        #[arg(long, short = 'p', visible_alias = "proc")]
        workers: Option<usize>,
        /// Colon-separated reference runtime prefix
        #[arg(long)]
        ts_node: Option<String>,
        /// Only generate tests whose name matches this regex
        #[arg(long, short = 'f')]
        filter: Option<String>,
        /// Compile and run target sources with the toolchain at this root
        #[arg(long, value_name = "PANDA")]
        run_ets: Option<PathBuf>,
        /// Configuration file (default: nearest crosscheck.toml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print progress for every file and chunk
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Disable colored output
        #[arg(long, env = "NO_COLOR")]
        no_color: bool,
        /// Print the summary as JSON
        #[arg(long, env = "CROSSCHECK_JSON")]
        json: bool,
        /// Specification files
        #[arg(required = true)]
        specs: Vec<PathBuf>,
    },

    /// List test groups without running anything
    ///
    /// EXAMPLES:
    ///     crosscheck list spec.yaml
    ///     crosscheck list --filter '^arr_' --json spec.yaml
    #[command(visible_alias = "ls")]
    List {
        /// Only list tests whose name matches this regex
        #[arg(long, short = 'f')]
        filter: Option<String>,
        /// Configuration file (default: nearest crosscheck.toml)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Disable colored output
        #[arg(long, env = "NO_COLOR")]
        no_color: bool,
        /// Print groups as JSON
        #[arg(long, env = "CROSSCHECK_JSON")]
        json: bool,
        /// Specification files
        #[arg(required = true)]
        specs: Vec<PathBuf>,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     crosscheck completions bash > ~/.bash_completions/crosscheck.bash
    ///     crosscheck completions zsh > ~/.zfunc/_crosscheck
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            Status::from_error(&err).into()
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<Status> {
    match cli.command {
        Commands::Generate {
            out,
            tmp,
            chunk_size,
            workers,
            ts_node,
            filter,
            run_ets,
            config,
            verbose,
            no_color,
            json,
            specs,
        } => commands::generate::run(commands::generate::GenerateArgs {
            out,
            tmp,
            chunk_size,
            workers,
            ts_node,
            filter,
            run_ets,
            config,
            verbose,
            no_color,
            json,
            specs,
        }),
        Commands::List {
            filter,
            config,
            no_color,
            json,
            specs,
        } => commands::list::run(commands::list::ListArgs {
            filter,
            config,
            no_color,
            json,
            specs,
        }),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(Status::Ok)
        }
    }
}
