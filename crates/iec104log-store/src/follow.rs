//! Background tail follower (feature `async`).
//!
//! The polling loop runs as its own task holding its own [`TailCursor`];
//! consumers receive non-empty batches on a channel and stop the task with
//! a [`CancellationToken`] or by dropping the receiver.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::store::ConnectionLogStore;
use crate::tail::{poll, TailBatch, TailCursor};

/// Batches buffered between the follower and its consumer.
const CHANNEL_CAPACITY: usize = 64;

/// Handle to a running follower.
#[derive(Debug)]
pub struct Follower {
    pub batches: mpsc::Receiver<TailBatch>,
    pub task: JoinHandle<TailCursor>,
}

/// Poll `store` every `period`, starting at `cursor`.
///
/// The task returns its final cursor when cancelled or when the receiver
/// is dropped. The cursor only covers batches the channel accepted, so a
/// batch dropped by cancellation is delivered again by a follower resumed
/// from it. Must be called inside a tokio runtime.
pub fn spawn_follower(
    store: Arc<ConnectionLogStore>,
    cursor: TailCursor,
    period: Duration,
    cancel: CancellationToken,
) -> Follower {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(follow(store, cursor, period, cancel, tx));
    Follower { batches: rx, task }
}

async fn follow(
    store: Arc<ConnectionLogStore>,
    mut cursor: TailCursor,
    period: Duration,
    cancel: CancellationToken,
    tx: mpsc::Sender<TailBatch>,
) -> TailCursor {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(store = store.name(), position = cursor.position, "follower started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // Ingestion reads the backing file with blocking I/O.
        let ingesting = Arc::clone(&store);
        match tokio::task::spawn_blocking(move || ingesting.try_ingest()).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!(store = store.name(), error = %err, "follower ingest failed"),
            Err(err) => warn!(store = store.name(), error = %err, "follower ingest task failed"),
        }

        let batch = poll(&store, cursor);
        let next = batch.next_cursor;
        if batch.is_empty() {
            cursor = next;
            continue;
        }
        // A consumer that stops reading must not keep the task from stopping.
        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = tx.send(batch) => {
                if sent.is_err() {
                    break;
                }
            }
        }
        cursor = next;
    }

    debug!(store = store.name(), position = cursor.position, "follower stopped");
    cursor
}
