//! JSON-lines vote ingestion
//!
//! Each non-blank line is one `VoteEvent`:
//!
//! ```text
//! {"partyId":"p1","trackId":"spotify-abc","userId":"guest","vote":true}
//! ```
//!
//! Lines are parsed on the reading side and handed to a dispatcher task
//! through a bounded channel, so a slow store applies backpressure to the
//! reader.

use crate::error::{AppError, Result};
use festify_core::VoteEvent;
use festify_queue::{DispatchSummary, VoteDispatcher};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Totals for one ingest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Lines that could not be parsed as a `VoteEvent`
    pub skipped: usize,

    /// Events handed to the dispatcher
    pub dispatch: DispatchSummary,
}

/// Read events from `reader` until EOF and dispatch them
pub async fn ingest<R>(
    reader: R,
    dispatcher: VoteDispatcher,
    channel_capacity: usize,
) -> Result<IngestReport>
where
    R: AsyncBufRead + Unpin,
{
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));
    let worker = tokio::spawn(async move { dispatcher.run(rx).await });

    let mut skipped = 0;
    let mut lines = reader.lines();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match serde_json::from_str::<VoteEvent>(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_number, "skipping malformed vote event: {}", e);
                skipped += 1;
                continue;
            }
        };

        if tx.send(event).await.is_err() {
            break;
        }
    }
    drop(tx);

    let dispatch = worker
        .await
        .map_err(|e| AppError::Dispatcher(e.to_string()))?;

    info!(
        processed = dispatch.processed,
        failed = dispatch.failed,
        skipped,
        "ingest finished"
    );

    Ok(IngestReport { skipped, dispatch })
}
