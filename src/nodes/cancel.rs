use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// One-shot shutdown signal shared by every task of a session.
///
/// It moves from unsignaled to signaled exactly once and never resets.
/// Tasks hold clones and wait on [`CancellationBroadcast::cancelled`]
/// next to their blocking I/O, so they wake the moment it fires.
#[derive(Clone, Debug, Default)]
pub struct CancellationBroadcast {
    token: CancellationToken,
}

impl CancellationBroadcast {
    pub fn new() -> Self {
        CancellationBroadcast {
            token: CancellationToken::new(),
        }
    }

    /// Fire the signal. Returns `false` if it had already fired.
    pub fn signal(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.token.cancel();
        true
    }

    pub fn is_signaled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}
