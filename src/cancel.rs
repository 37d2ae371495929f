use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SimulationError;

/// Shared flag for cooperative cancellation. Clones observe the same flag.
/// The engine polls it between generation chunks and between grid points.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), SimulationError> {
        if self.is_cancelled() { Err(SimulationError::Cancelled) } else { Ok(()) }
    }
}
