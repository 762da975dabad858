//! Three-level task tree over discovered actions.
//!
//! Workspace roots hold stages, stages hold substages. Nodes are projected
//! fresh on each read from the memoized discovery result; the only state
//! kept between reads is which stages are highlighted.

pub mod highlight;
pub mod naming;
pub mod node;
pub mod projector;
pub mod session;

pub use highlight::{HighlightSet, HighlightState};
pub use node::{Collapsible, NodeCommand, NodeKind, TreeNode};
pub use session::{Effect, Session, SessionEvent};
