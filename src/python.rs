//! Out-of-process analysis scripts.
//!
//! Every analysis (resume parsing, GitHub review, job demand, ...) lives in an
//! external script that prints a single JSON document to stdout. This module
//! owns spawning those scripts, bounding how many run at once, and turning
//! their output into `serde_json::Value`.

pub mod invoker;
pub mod output;

pub use invoker::{InvokerConfig, InvokerStatsSnapshot, ProcessInvoker};

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read script output: {0}")]
    Io(#[from] std::io::Error),

    /// Non-zero exit, or killed by a signal (`code` is `None`).
    #[error("script exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    /// The script exited cleanly but printed `{"error": "..."}`.
    #[error("script reported an error: {0}")]
    ScriptReported(String),

    #[error("script timed out after {0:?}")]
    TimedOut(Duration),

    #[error("script run was cancelled")]
    Cancelled,

    #[error("script stdout exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("script pool saturated ({queued} callers already waiting)")]
    Saturated { queued: usize },

    #[error("script pool is closed")]
    PoolClosed,
}
