use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::bot::dispatcher::Dispatcher;
use crate::error::{DeskmateError, ErrorKind, Result};
use crate::telegram::TelegramClient;

const ERROR_BACKOFF: Duration = Duration::from_secs(3);
const DEFAULT_RATE_LIMIT_BACKOFF_SECS: u64 = 5;

/// Long-poll Telegram until `cancel` fires, handling each update on its own
/// task. In-flight handlers are awaited before returning.
pub async fn run_polling(
    telegram: TelegramClient,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) -> Result<()> {
    let tracker = TaskTracker::new();
    let mut offset: Option<i64> = None;

    tracing::info!("Polling Telegram for updates");

    let outcome = loop {
        let updates = tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            updates = telegram.get_updates(offset) => updates,
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    let dispatcher = Arc::clone(&dispatcher);
                    tracker.spawn(async move {
                        let update_id = update.update_id;
                        if let Err(e) = dispatcher.handle_update(update).await {
                            tracing::error!(update_id, error = %e, "Failed to handle update");
                        }
                    });
                }
            }
            Err(e) if e.kind() == ErrorKind::Configuration => {
                tracing::error!(error = %e, "Telegram polling cannot continue");
                break Err(e);
            }
            Err(DeskmateError::ApiRateLimit { retry_after }) => {
                let wait = retry_after.unwrap_or(DEFAULT_RATE_LIMIT_BACKOFF_SECS);
                tracing::warn!(retry_after_secs = wait, "Telegram rate limit hit");
                if pause(&cancel, Duration::from_secs(wait)).await {
                    break Ok(());
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Polling failed, retrying");
                if pause(&cancel, ERROR_BACKOFF).await {
                    break Ok(());
                }
            }
        }
    };

    tracker.close();
    if !tracker.is_empty() {
        tracing::info!(in_flight = tracker.len(), "Waiting for in-flight updates");
    }
    tracker.wait().await;
    tracing::info!("Telegram polling stopped");

    outcome
}

/// Sleep for `duration`; true if cancelled first.
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}
