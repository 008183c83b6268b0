//! # System Constants
//!
//! Operational boundaries of the batch search engine: result caps, paging
//! defaults, queue timing and the index field names the runner filters on.

use std::time::Duration;

pub use crate::state_machine::{BatchSearchState, TaskState};

/// Hard cap on the number of results persisted for a single batch search.
pub const MAX_BATCH_RESULT_SIZE: usize = 60_000;

/// Runner defaults, overridable through configuration
pub mod runner {
    pub const DEFAULT_THROTTLE_MS: u64 = 0;
    pub const DEFAULT_MAX_TIME_SECONDS: u64 = 100_000;
    pub const DEFAULT_SCROLL_SIZE: usize = 1_000;
}

/// Bind-parameter arithmetic of the relational result store.
///
/// Each persisted result binds `COLUMNS_PER_RESULT_ROW` parameters on a
/// multi-row `INSERT ... VALUES (...), (...)`, and a single statement may
/// bind at most `MAX_BIND_PARAMETERS`.
pub mod store {
    pub const MAX_BIND_PARAMETERS: usize = 32_768;
    pub const COLUMNS_PER_RESULT_ROW: usize = 9;
    pub const INSERT_SAFETY_MARGIN_ROWS: usize = 140;
}

/// Job queue timing
pub mod queue {
    use super::Duration;

    pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(60);
}

/// Index field names used by batch search filters
pub mod fields {
    pub const CONTENT_TYPE: &str = "contentType";
    pub const DIRNAME: &str = "dirname";
    pub const CONTENT: &str = "content";
}
