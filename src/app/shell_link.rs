//! Usage: One-shot link between the desktop shell and the migration console.
//!
//! The console announces that its initialization has started; the shell answers exactly once
//! with the redirect URLs it captured, in capture order.

use crate::shared::error::AppResult;
use tokio::sync::oneshot;

#[derive(Debug)]
pub struct ShellEndpoint {
    started: oneshot::Receiver<()>,
    redirects: oneshot::Sender<Vec<String>>,
}

#[derive(Debug)]
pub struct ConsoleEndpoint {
    started: oneshot::Sender<()>,
    redirects: oneshot::Receiver<Vec<String>>,
}

pub fn shell_link() -> (ShellEndpoint, ConsoleEndpoint) {
    let (started_tx, started_rx) = oneshot::channel();
    let (redirects_tx, redirects_rx) = oneshot::channel();
    (
        ShellEndpoint {
            started: started_rx,
            redirects: redirects_tx,
        },
        ConsoleEndpoint {
            started: started_tx,
            redirects: redirects_rx,
        },
    )
}

impl ConsoleEndpoint {
    /// Signals "init started" and waits for the shell's single redirect delivery.
    pub async fn init(self) -> AppResult<Vec<String>> {
        self.started
            .send(())
            .map_err(|_| "INTERNAL_ERROR: shell closed before console init".to_string())?;
        let redirects = self
            .redirects
            .await
            .map_err(|_| "INTERNAL_ERROR: shell closed without delivering redirects".to_string())?;
        tracing::debug!(count = redirects.len(), "redirects delivered to console");
        Ok(redirects)
    }
}

impl ShellEndpoint {
    /// Waits for the console to start, then hands over the captured redirects.
    pub async fn serve(self, redirects: Vec<String>) -> AppResult<()> {
        self.started
            .await
            .map_err(|_| "INTERNAL_ERROR: console closed before init".to_string())?;
        self.redirects
            .send(redirects)
            .map_err(|_| "INTERNAL_ERROR: console closed before receiving redirects".to_string())?;
        Ok(())
    }
}
