//! Discovery of OpenROAD-flow-scripts build targets.
//!
//! Raw `make` targets are classified ([`classify`]), turned into
//! [`Action`](orfs_core::Action)s with ready-to-run command lines
//! ([`discovery`]) and memoized per session ([`cache`]).

pub mod cache;
pub mod classify;
pub mod discovery;
pub mod invocation;
pub mod overrides;

pub use cache::DiscoveryCache;
pub use classify::{Classification, classify};
pub use discovery::{Discovery, FlowEnvironment, TargetListing, TaskDiscovery, WorkspaceDiscovery};
pub use invocation::MakeInvocation;
pub use overrides::{OverrideTable, StageOverride};
