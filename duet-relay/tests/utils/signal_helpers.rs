use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;

use super::mock_signaling::SentSignal;

/// Timeout for a single expected signal (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 2000;

/// Window in which no signal is expected (ms).
pub const QUIET_WINDOW_MS: u64 = 200;

pub async fn next_signal(rx: &mut mpsc::UnboundedReceiver<SentSignal>) -> Result<SentSignal> {
    match tokio::time::timeout(Duration::from_millis(SIGNAL_TIMEOUT_MS), rx.recv()).await {
        Ok(Some(sent)) => Ok(sent),
        Ok(None) => anyhow::bail!("Signal channel closed"),
        Err(_) => anyhow::bail!("Timeout waiting for signal"),
    }
}

/// Asserts that nothing is sent for a short while.
pub async fn expect_quiet(rx: &mut mpsc::UnboundedReceiver<SentSignal>) -> Result<()> {
    match tokio::time::timeout(Duration::from_millis(QUIET_WINDOW_MS), rx.recv()).await {
        Ok(Some(sent)) => anyhow::bail!("Unexpected signal: {:?}", sent),
        _ => Ok(()),
    }
}
