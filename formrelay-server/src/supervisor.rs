//! Lifecycle of the two pipeline units.
//!
//! The front end and the ingestion worker run as separate tasks that share
//! nothing but the relay. The supervisor starts both and waits for both; it
//! never sees a submission.

use std::sync::Arc;

use anyhow::Result;
use formrelay_core::config::HttpConfig;
use formrelay_core::{
    FormRelayConfig, PgDocumentStore, RelaySender, UdpRelayReceiver, UdpRelaySender,
};
use formrelay_ingest::IngestWorker;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::http;

/// Everything the two units need, wired but not yet running.
pub struct Units {
    pub listener: TcpListener,
    pub http: HttpConfig,
    pub relay: Arc<dyn RelaySender>,
    pub worker: IngestWorker,
}

/// Production wiring: TCP listener, UDP relay, Postgres store.
pub async fn assemble(config: &FormRelayConfig) -> Result<Units> {
    let store = PgDocumentStore::new(&config.store)?;
    if let Err(e) = store.ensure_schema().await {
        // Inserts keep failing per message until the store is reachable.
        tracing::warn!(error = %e, "Could not prepare store table");
    }

    let relay_addr = config.relay.addr();
    let receiver = UdpRelayReceiver::bind(&relay_addr, config.relay.max_datagram_size).await?;
    tracing::info!("Server started on socket://{}", receiver.local_addr()?);
    let sender = UdpRelaySender::connect(&relay_addr, config.relay.max_datagram_size).await?;

    let listener = TcpListener::bind(config.http.addr()).await?;

    Ok(Units {
        listener,
        http: config.http.clone(),
        relay: Arc::new(sender),
        worker: IngestWorker::new(Box::new(receiver), Arc::new(store)),
    })
}

/// Run both units until each has finished. A unit that fails is logged and
/// does not stop the other one.
pub async fn supervise(units: Units, shutdown: &broadcast::Sender<()>) -> Result<()> {
    let Units {
        listener,
        http,
        relay,
        worker,
    } = units;

    let front_end = tokio::spawn(
        http::serve(listener, http, relay, shutdown.subscribe())
            .instrument(tracing::info_span!("front_end")),
    );
    let ingest = tokio::spawn(
        worker
            .run(shutdown.subscribe())
            .instrument(tracing::info_span!("ingest_worker")),
    );

    let (front_end, ingest) = tokio::join!(front_end, ingest);

    match front_end {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(unit = "front_end", error = %e, "Server error"),
        Err(e) => tracing::error!(unit = "front_end", error = %e, "Task failed"),
    }
    if let Err(e) = ingest {
        tracing::error!(unit = "ingest_worker", error = %e, "Task failed");
    }

    Ok(())
}

pub async fn run(config: &FormRelayConfig, shutdown: &broadcast::Sender<()>) -> Result<()> {
    let units = assemble(config).await?;
    supervise(units, shutdown).await
}
