//! # Conversion
//!
//! The decision-and-transformation engine behind `jomos`.
//!
//! Converting a host happens in a strict order:
//!
//! 1. **Facts** - a [`HostProbe`] measures the host once into [`HostFacts`]
//! 2. **Tuning** - [`tuning::compute`] derives swappiness and VFS cache
//!    pressure from installed RAM
//! 3. **Gate** - [`gate::resolve`] combines facts, [`FeatureFlags`] and tuning
//!    into a [`Plan`]: staged config edits, command groups, post-install
//!    adjustments
//! 4. **Patch** - [`ConfigPatcher`] applies the edit plan to the staging tree,
//!    idempotently and one file at a time
//! 5. **Execute** - [`CommandPlanExecutor`] runs the command groups
//!    best-effort, yielding one [`ExecutionRecord`] per step
//!
//! ## Example
//!
//! ```ignore
//! use conversion::{gate, tuning, CommandPlanExecutor, ConfigPatcher, FeatureFlags, HostFacts};
//!
//! let facts = HostFacts::gather(&probe)?;
//! let tuning = tuning::compute(facts.ram_kb)?;
//! let plan = gate::resolve(&facts, &FeatureFlags::default(), &tuning);
//!
//! let report = ConfigPatcher::new("staging").apply(&plan.edits, plan.dry_run);
//! for record in CommandPlanExecutor::new(&runner).run(plan.command_groups(&lists), plan.dry_run) {
//!     println!("{} {}", record.outcome, record.command);
//! }
//! ```
//!
//! ## Collaborator traits
//!
//! - [`ShellRunner`]: executes shell command strings
//! - [`HostProbe`]: measures the host
//! - [`CommandSource`]: supplies command groups
//! - [`RunObserver`]: receives progress while a plan runs
//!
//! The engine never spawns processes or prints on its own; it logs through
//! the `log` facade.

pub mod commands;
pub mod context;
pub mod error;
pub mod executor;
pub mod facts;
pub mod gate;
pub mod patcher;
pub mod tuning;
pub mod types;

// Re-export main types at crate root
pub use commands::{CommandGroup, CommandLists, CommandSource, GroupKind};
pub use context::{NoObserver, RunObserver, ShellRunner};
pub use error::{EditError, Error, Result};
pub use executor::{CommandPlanExecutor, CommandRun, POST_INSTALL_GROUP};
pub use facts::{HostFacts, HostProbe, InstructionSetTier, SwapKind};
pub use gate::{Condition, Plan};
pub use patcher::{
    ConfigPatcher, EditEntry, EditOutcome, EditPlan, EditStatus, FileChange, FileReport, Matcher,
    PatchReport,
};
pub use tuning::TuningValues;
pub use types::{CommandOutput, ExecutionRecord, FeatureFlags, Outcome, RunSummary};
