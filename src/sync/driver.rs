//! Async driver: feeds editor text into a [`DiagramView`] on a tokio clock.
//!
//! Edits arrive on a bounded channel; the driver sleeps until the pending
//! parse is due and forwards every resulting [`Action`] to the host. When the
//! edit channel closes, a still-pending parse is flushed before returning.

#[cfg(test)]
#[path = "driver_test.rs"]
mod driver_test;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::schema::SchemaParser;
use crate::view::{Action, DiagramView};

/// Run until `edits` closes, then hand the view back.
pub async fn run_sync_driver<P: SchemaParser>(
    mut view: DiagramView<P>,
    mut edits: mpsc::Receiver<String>,
    actions: mpsc::UnboundedSender<Action>,
) -> DiagramView<P> {
    let start = Instant::now();
    info!(debounce_ms = view.config().debounce_ms, "sync driver started");

    loop {
        let deadline = view.sync_deadline();
        let wake = start + Duration::from_millis(deadline.unwrap_or(0));

        tokio::select! {
            maybe_text = edits.recv() => {
                if let Some(text) = maybe_text {
                    let scheduled = view.on_content_changed(&text, elapsed_ms(start));
                    debug!(scheduled, len = text.len(), "sync driver: edit received");
                } else {
                    if view.sync_deadline().is_some() {
                        emit(&actions, view.flush());
                    }
                    break;
                }
            }
            () = tokio::time::sleep_until(wake), if deadline.is_some() => {
                emit(&actions, view.poll(elapsed_ms(start)));
            }
        }
    }

    info!(parses = view.sync().parse_count(), "sync driver stopped");
    view
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn emit(tx: &mpsc::UnboundedSender<Action>, batch: Vec<Action>) {
    for action in batch {
        if let Err(e) = tx.send(action) {
            warn!(error = %e, "sync driver: action receiver dropped");
        }
    }
}
