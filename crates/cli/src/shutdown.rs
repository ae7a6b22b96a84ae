use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Turns SIGINT/SIGTERM into cancellation of the running pipeline. The
/// orchestrator stops at the next chunk boundary and abandons queued work.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn register_handlers(&self) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let signal_name = wait_for_signal().await;
            info!(signal = signal_name, "Stopping the run");
            coordinator.requested.store(true, Ordering::SeqCst);
            coordinator.token.cancel();
        });
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("Failed to install SIGTERM handler");
    tokio::select! {
        result = signal::ctrl_c() => {
            result.expect("Failed to install SIGINT handler");
            "SIGINT"
        }
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    signal::ctrl_c()
        .await
        .expect("Failed to install SIGINT handler");
    "SIGINT"
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// 128 + SIGINT
    ShutdownRequested = 130,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::ShutdownRequested.as_i32(), 130);
    }

    #[tokio::test]
    async fn fresh_coordinator_is_not_cancelled() {
        let coordinator = ShutdownCoordinator::new(CancellationToken::new());
        assert!(!coordinator.is_shutdown_requested());
        assert!(!coordinator.cancel_token().is_cancelled());
    }
}
