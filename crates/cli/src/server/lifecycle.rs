use anyhow::Context;
use dnsproxy_application::use_cases::Redirector;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Installs the redirect, serves until shutdown, and always tears the
/// redirect down again.
///
/// A shutdown requested while the rules were being installed skips serving
/// and goes straight to removal.
pub async fn run_with_redirect<F>(
    redirector: Option<&Redirector>,
    shutdown: &CancellationToken,
    serve: F,
) -> anyhow::Result<()>
where
    F: Future<Output = anyhow::Result<()>>,
{
    if let Some(redirector) = redirector {
        if let Err(e) = redirector.start().await {
            remove_redirect(redirector).await;
            return Err(e).context("failed to install redirect rules");
        }
    }

    let serve_result = if shutdown.is_cancelled() {
        info!("Shutdown requested during startup, not serving");
        Ok(())
    } else {
        serve.await
    };

    if let Some(redirector) = redirector {
        remove_redirect(redirector).await;
    }

    serve_result
}

async fn remove_redirect(redirector: &Redirector) {
    if let Err(e) = redirector.close().await {
        error!(error = %e, "Failed to remove redirect rules");
    }
}
