use std::cell::Cell;
use std::rc::Rc;

/// Cooperative cancellation flag shared between whoever issued a render and
/// the render itself. Clones observe the same flag.
///
/// Rendering runs on the viewer's event loop, so the flag is a plain `Cell`.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    /// `Err(RenderError::Cancelled)` once cancelled, for use with `?` inside
    /// render code.
    pub fn check(&self) -> Result<(), crate::error::RenderError> {
        if self.is_cancelled() {
            Err(crate::error::RenderError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_cancellation() {
        let token = CancellationToken::new();
        let worker = token.clone();
        assert!(worker.check().is_ok());

        token.cancel();
        token.cancel();
        assert!(worker.is_cancelled());
        assert!(worker.check().unwrap_err().is_cancelled());
    }

    #[test]
    fn test_fresh_tokens_are_independent() {
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        a.cancel();
        assert!(!b.is_cancelled());
    }
}
