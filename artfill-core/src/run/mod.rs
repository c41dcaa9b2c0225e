//! Run orchestration: live counters and the coordinator that walks the
//! library and feeds the resolver.

mod coordinator;
mod stats;

pub use coordinator::RunCoordinator;
pub use stats::RunStats;
