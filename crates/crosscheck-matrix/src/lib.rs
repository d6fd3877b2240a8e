//! Crosscheck matrix engine
//!
//! Generates equivalence tests between a reference runtime and a target
//! runtime from declarative specification trees:
//! - Specification documents and node paths (`spec`)
//! - Parameter suppliers resolved from descriptors (`supplier`)
//! - Combinatorial expansion with optional tails and rest arguments (`expand`)
//! - Context tree walking and grouping by derived name (`walker`)
//! - Source rendering through templates (`render`)
//! - Toolchain subprocesses (`toolchain`)
//! - Chunked execution on a bounded worker pool (`scheduler`)
//!
//! # Example
//!
//! ```no_run
//! use crosscheck_matrix::{
//!     prepare_dirs, CommandToolchain, Generator, Scheduler, SchedulerConfig,
//!     TemplateRenderer, Totals,
//! };
//! use std::path::Path;
//!
//! let mut generator = Generator::new(".*").unwrap();
//! generator.load(Path::new("string.yaml")).unwrap();
//! let totals = Totals::new();
//! totals.add_ignored(generator.ignored());
//!
//! let config = SchedulerConfig::new("out", "tmp");
//! prepare_dirs(&config).unwrap();
//! let toolchain = CommandToolchain::new(vec!["npx".into(), "ts-node".into()]);
//! let scheduler = Scheduler::new(
//!     config,
//!     Box::new(TemplateRenderer::new().unwrap()),
//!     Box::new(toolchain),
//! );
//! let report = scheduler.run(generator.into_groups(), &totals).unwrap();
//! assert!(report.totals.success());
//! ```

pub mod case;
pub mod context;
pub mod error;
pub mod expand;
pub mod render;
pub mod scheduler;
pub mod spec;
pub mod supplier;
pub mod toolchain;
pub mod totals;
pub mod walker;

// Re-export main types
pub use case::{Side, TestCase, TestGroup};
pub use context::Context;
pub use error::{ErrorKind, GenError, GenResult};
pub use expand::{expand, Combination, ABSENT};
pub use render::{ChunkView, Renderer, TemplateRenderer};
pub use scheduler::{
    prepare_dirs, ChunkFailure, ChunkOutcome, GroupReport, RunReport, Scheduler, SchedulerConfig,
    Stage, DEFAULT_CHUNK_SIZE, DEFAULT_WORKERS,
};
pub use spec::{load_file, load_str, NodePath, SpecNode};
pub use supplier::{
    from_fn, Arg, BoxSupplier, Descriptor, Resolver, RestVariant, Scope, Supplier, SupplierError,
    SupplierRegistry, Variant,
};
pub use toolchain::{CommandToolchain, ProcessOutput, Toolchain, DEFAULT_VERSION_PATTERN};
pub use totals::{Summary, Totals};
pub use walker::{sanitize, Generator};
