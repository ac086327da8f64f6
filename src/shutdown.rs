//! Cooperative shutdown signal.
//!
//! Both monitoring loops check a shared flag each iteration, so the process
//! can stop them deterministically (Ctrl-C, end of stream) instead of
//! abandoning a detached worker at exit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared stop flag. Cloning hands out another handle to the same flag.
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let flag = ShutdownFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_tripped());
        flag.trip();
        assert!(clone.is_tripped());
    }
}
