use std::io;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// SIGINT/SIGTERM handlers registered up front.
///
/// Once [`install`](Self::install) returns the default disposition is gone,
/// so an interrupt during startup is observed instead of killing the process
/// with the redirect chain still in place.
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl ShutdownSignals {
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(windows)]
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Cancels `shutdown` on the first signal. Returns early if something
    /// else cancels it first.
    pub async fn cancel_on_signal(mut self, shutdown: CancellationToken) {
        #[cfg(unix)]
        tokio::select! {
            _ = self.interrupt.recv() => info!("Received SIGINT"),
            _ = self.terminate.recv() => info!("Received SIGTERM"),
            _ = shutdown.cancelled() => return,
        }

        #[cfg(windows)]
        tokio::select! {
            _ = self.ctrl_c.recv() => info!("Received Ctrl-C"),
            _ = shutdown.cancelled() => return,
        }

        info!("Shutting down");
        shutdown.cancel();
    }
}
