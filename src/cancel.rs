use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{BasketError, Result};

/// Cooperative cancellation signal shared between a caller and its workers.
///
/// Clones observe the same flag. Engines poll it between units of work and
/// bail out with [`BasketError::Cancelled`] once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(BasketError::Cancelled)
        } else {
            Ok(())
        }
    }
}
