use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Cancels the migration on SIGINT or SIGTERM. The run loop finishes the
/// record in flight and stores a resumable token before the process exits.
/// A second signal exits at once.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    cancel_token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self { cancel_token }
    }

    pub fn register_handlers(&self) {
        let cancel_token = self.cancel_token.clone();

        tokio::spawn(async move {
            let name = next_signal().await;
            info!(signal = name, "Stopping after the current record, send again to abort");
            cancel_token.cancel();

            let name = next_signal().await;
            warn!(signal = name, "Aborting without saving the chunk in flight");
            std::process::exit(ExitCode::ShutdownRequested.as_i32());
        });
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

/// Waits for SIGINT or SIGTERM and returns its name. A handler that cannot
/// be installed never fires.
async fn next_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Process exit codes of `shopmig`.
#[derive(Debug, Clone, Copy)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// A step ended with an Error token.
    StepFailed = 2,
    ShutdownRequested = 130,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
