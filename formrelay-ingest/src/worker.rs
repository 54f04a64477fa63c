//! Ingestion worker: relay in, documents out.
//!
//! Messages are handled strictly one at a time. A message that fails to
//! decode or persist is logged and dropped; the loop only ends on shutdown or
//! when the relay channel is gone.

use std::sync::Arc;
use std::time::Duration;

use formrelay_core::{
    DecodedRecord, DocumentStore, IngestError, RelayError, RelayMessage, RelayReceiver,
};
use tokio::sync::broadcast;

use crate::decode::decode_payload;

/// Pause after a failed receive so a broken socket does not spin the loop.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct IngestWorker {
    receiver: Box<dyn RelayReceiver>,
    store: Arc<dyn DocumentStore>,
}

impl IngestWorker {
    pub fn new(receiver: Box<dyn RelayReceiver>, store: Arc<dyn DocumentStore>) -> Self {
        Self { receiver, store }
    }

    /// Receive loop. Returns when `shutdown` fires or the relay closes.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let IngestWorker {
            mut receiver,
            store,
        } = self;
        tracing::info!("Ingestion worker started");

        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Ok(message) => handle(store.as_ref(), message).await,
                    Err(RelayError::Closed) => {
                        tracing::info!("Relay channel closed, ingestion worker stopping");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to receive relay message");
                        tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutting down ingestion worker...");
                    break;
                }
            }
        }

        tracing::info!("Ingestion worker stopped");
    }

    /// Decode one payload and insert it, without going through the relay.
    pub async fn process(&self, payload: &[u8]) -> Result<DecodedRecord, IngestError> {
        process_payload(self.store.as_ref(), payload).await
    }
}

async fn handle(store: &dyn DocumentStore, message: RelayMessage) {
    tracing::info!(
        source = %message.source,
        payload = %String::from_utf8_lossy(&message.payload),
        "Received relay message"
    );

    match process_payload(store, &message.payload).await {
        Ok(record) => tracing::info!(
            source = %message.source,
            fields = record.field_count() - 1,
            "Stored submission"
        ),
        Err(e @ IngestError::Parse(_)) => {
            tracing::error!(source = %message.source, error = %e, "Dropped malformed submission")
        }
        Err(e @ IngestError::Store(_)) => {
            tracing::error!(source = %message.source, error = %e, "Failed to store submission")
        }
    }
}

async fn process_payload(
    store: &dyn DocumentStore,
    payload: &[u8],
) -> Result<DecodedRecord, IngestError> {
    let record = decode_payload(payload)?;

    if tracing::enabled!(tracing::Level::DEBUG) {
        if let Ok(pretty) = serde_json::to_string_pretty(&record) {
            tracing::debug!(document = %pretty, "Decoded submission");
        }
    }

    store.insert(&record).await?;
    Ok(record)
}
