//! Cancellation and deadline handling for a single resolution

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ResolveError, ResolveResult};

/// Per-call context for [`IdentityResolver::resolve`](crate::IdentityResolver::resolve).
///
/// Every fetch of the aggregation races against the token and the deadline;
/// whichever fires first aborts the whole resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Abort the resolution once `timeout` has elapsed from now.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) async fn guard<T, F>(&self, work: F) -> ResolveResult<T>
    where
        F: Future<Output = ResolveResult<T>>,
    {
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ResolveError::Cancelled),
            () = deadline => Err(ResolveError::DeadlineExceeded),
            result = work => result,
        }
    }
}
