//! fd-sync: Node execution tree synchronizer.
//!
//! Maintains, per observed workflow execution, a merge-owned map of runtime
//! records keyed by scoped id, joins it against the compiled workflow graph
//! into a display tree, expands parent nodes lazily, filters by phase, and
//! keeps polling the admin API until everything reaches a terminal phase.

pub mod expand;
pub mod filter;
pub mod merge;
pub mod poll;
pub mod rows;
pub mod session;
pub mod tasks;
pub mod tree;

use thiserror::Error;

pub use filter::FilterState;
pub use merge::NodeExecutionsById;
pub use poll::{should_poll, Poller};
pub use session::ExecutionTreeSession;
pub use tree::{DisplayNode, DisplayTree};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Admin(#[from] fd_admin::AdminError),
    #[error("unknown node: {0}")]
    UnknownNode(String),
    #[error("session closed")]
    SessionClosed,
}
