//! Cooperative cancellation for analysis passes.
//!
//! The token is `tokio_util`'s; clones observe the same flag. Traversals call
//! [`CancelCheck::check`] with `?` so that a cancelled walk ends as "not
//! applicable".

pub use tokio_util::sync::CancellationToken;

pub trait CancelCheck {
    /// `Some(())` while the analysis may continue, `None` once cancelled.
    fn check(&self) -> Option<()>;
}

impl CancelCheck for CancellationToken {
    fn check(&self) -> Option<()> {
        if self.is_cancelled() {
            None
        } else {
            Some(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert_eq!(other.check(), Some(()));
        token.cancel();
        assert!(other.is_cancelled());
        assert_eq!(other.check(), None);
    }

    #[test]
    fn child_tokens_stop_with_the_parent() {
        let token = CancellationToken::new();
        let child = token.child_token();
        token.cancel();
        assert_eq!(child.check(), None);
    }
}
