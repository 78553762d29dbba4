//! The operator console: reads commands from a line-oriented input
//! (stdin in the binary).

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::ShutdownHandle;

/// Stops the accept loop and the lobby supervisor.
pub const CLOSE_COMMAND: &str = "CLOSE";

/// Reads commands until `CLOSE` or end of input.
///
/// Unknown lines are logged and ignored. End of input ends the console
/// without stopping the server.
pub async fn run_console<R>(input: R, shutdown: ShutdownHandle)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let command = line.trim();
                if command == CLOSE_COMMAND {
                    tracing::info!("close command received");
                    shutdown.trigger();
                    return;
                }
                if !command.is_empty() {
                    tracing::warn!(%command, "unknown console command");
                }
            }
            Ok(None) => {
                tracing::debug!("console input closed");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "console read failed");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_triggers_shutdown() {
        let shutdown = ShutdownHandle::new();
        run_console(&b"status\n  CLOSE  \nignored\n"[..], shutdown.clone()).await;
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_eof_does_not_trigger_shutdown() {
        let shutdown = ShutdownHandle::new();
        run_console(&b"close\nCLOSE NOW\n"[..], shutdown.clone()).await;
        assert!(!shutdown.is_triggered());
    }
}
