//! Cancellation and deadline scope for reads, walks and windows
//!
//! A [`Context`] pairs a [`CancellationToken`] with an optional deadline.
//! Derived contexts are cancelled together with their parent and never
//! outlive the parent's deadline.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellable scope with an optional deadline
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Create a root context that is never done until cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing cancellation token
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derive a child context that is done at `deadline` at the latest
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child context that is done after `timeout` at the latest
    ///
    /// A timeout too large to represent as an instant adds no deadline; the
    /// child still inherits the parent's.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => Self {
                token: self.token.child_token(),
                deadline: self.deadline,
            },
        }
    }

    /// Cancel this context and every context derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The deadline, if one was set
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The underlying cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once cancelled or past the deadline
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_not_done() {
        let ctx = Context::new();
        assert!(!ctx.is_done());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_propagates_to_children() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(60));

        parent.cancel();

        assert!(parent.is_done());
        assert!(child.is_done());
    }

    #[test]
    fn test_cancelling_child_leaves_parent_running() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(60));

        child.cancel();

        assert!(child.is_done());
        assert!(!parent.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_keeps_earlier_parent_deadline() {
        let parent = Context::new().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(10));

        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_resolves_at_deadline() {
        let start = Instant::now();
        let ctx = Context::new().with_timeout(Duration::from_millis(250));

        assert!(!ctx.is_done());
        ctx.done().await;

        assert!(ctx.is_done());
        assert_eq!(Instant::now() - start, Duration::from_millis(250));
    }

    #[test]
    fn test_unrepresentable_timeout_adds_no_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_secs(u64::MAX));
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_done());

        let parent = Context::new().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::MAX);
        assert_eq!(child.deadline(), parent.deadline());

        parent.cancel();
        assert!(child.is_done());
    }

    #[tokio::test]
    async fn test_done_resolves_on_cancel() {
        let ctx = Context::new();
        let handle = ctx.clone();
        tokio::spawn(async move { handle.cancel() });

        ctx.done().await;
        assert!(ctx.is_done());
    }
}
