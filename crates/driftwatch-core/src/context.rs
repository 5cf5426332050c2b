//! Run context and cooperative cancellation.
//!
//! The context replaces free-floating global state: the binary installs
//! signal handlers that flip the cancellation flag, and the pipeline checks
//! it between stages. In-flight subprocesses and fetches run to completion
//! (bounded by their own timeouts); the run stops at the next checkpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{DriftError, Result};

/// Per-run context threaded through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancelled: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for signal handlers to request cancellation.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Request cooperative cancellation.
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Checked between pipeline stages; errors once cancellation is requested.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DriftError::Cancelled)
        } else {
            Ok(())
        }
    }
}
