use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::shared::errors::AppError;
use crate::shared::types::ContractEvent;

/// Parse a JSON-lines event log. Blank lines are skipped; lines that are not a
/// valid event envelope are logged and dropped.
pub fn parse_event_lines(content: &str) -> Vec<ContractEvent> {
    let mut events = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ContractEvent>(line) {
            Ok(event) => events.push(event),
            Err(e) => warn!(line = index + 1, error = %e, "skipping invalid event line"),
        }
    }
    events
}

/// Load every event from a JSON-lines file
pub async fn load_events(path: impl AsRef<Path>) -> Result<Vec<ContractEvent>, AppError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::EventSource(format!("{}: {}", path.display(), e)))?;
    let events = parse_event_lines(&content);
    info!(path = %path.display(), count = events.len(), "loaded event log");
    Ok(events)
}

/// Feed a JSON-lines file into an ingestion channel, in file order.
/// Returns the number of events sent; stops early if the receiver is dropped.
pub async fn stream_events(
    path: impl AsRef<Path>,
    sender: mpsc::Sender<ContractEvent>,
) -> Result<usize, AppError> {
    let events = load_events(path).await?;
    let mut sent = 0;
    for event in events {
        if sender.send(event).await.is_err() {
            debug!(sent, "event receiver closed, stopping source");
            break;
        }
        sent += 1;
    }
    Ok(sent)
}
