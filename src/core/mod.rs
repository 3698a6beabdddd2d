// Public modules
pub mod config;
pub mod deploy;
pub mod error;
pub mod executor;
pub mod layout;
pub mod lock;
pub mod orchestrator;
pub mod plan;
pub mod prune;
pub mod ssh;
pub mod target;

// Internal modules - not part of public API
pub(crate) mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use executor::{CommandOutput, RemoteExecutor};
pub use layout::{ReleaseId, ReleaseLayout};
pub use plan::{Mode, ReleasePlan, Step, StepKind};
pub use target::{Target, TargetName};
