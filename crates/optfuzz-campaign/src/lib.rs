//! Fuzz campaign driver.
//!
//! Each iteration asks the external generator for a fresh program and
//! pushes it through the compiler, either the whole optimization
//! pipeline or the normalization pass plus one pass under test.
//!
//! - [`process`] - invoke an external tool and classify its outcome
//! - [`toolchain`] - command lines for generator, compiler, and optimizer
//! - [`artifacts`] - best-effort removal of transient files
//! - [`progress`] - progress bar rendering
//! - [`driver`] - the campaign loop

pub mod artifacts;
pub mod driver;
pub mod process;
pub mod progress;
pub mod toolchain;

pub use artifacts::ArtifactGuard;
pub use driver::{CampaignDriver, CampaignSummary};
pub use process::{invoke, Invocation, StdoutTarget, ToolOutcome};
pub use progress::{render_progress, NoProgress, ProgressSink, TerminalProgress};
pub use toolchain::Toolchain;
