//! End-to-end: real TCP listener, UDP relay and ingestion worker, with the
//! in-memory store standing in for Postgres.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use formrelay_core::config::HttpConfig;
use formrelay_core::{DecodedRecord, MemoryStore, UdpRelayReceiver, UdpRelaySender};
use formrelay_ingest::IngestWorker;
use formrelay_server::supervisor::{supervise, Units};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

async fn start_pipeline() -> (SocketAddr, MemoryStore, broadcast::Sender<()>, tokio::task::JoinHandle<anyhow::Result<()>>) {
    let receiver = UdpRelayReceiver::bind("127.0.0.1:0", 1024).await.unwrap();
    let relay_addr = receiver.local_addr().unwrap().to_string();
    let sender = UdpRelaySender::connect(&relay_addr, 1024).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http_addr = listener.local_addr().unwrap();

    let store = MemoryStore::new();
    let units = Units {
        listener,
        http: HttpConfig {
            static_root: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../static")),
            ..HttpConfig::default()
        },
        relay: Arc::new(sender),
        worker: IngestWorker::new(Box::new(receiver), Arc::new(store.clone())),
    };

    let (tx, _) = broadcast::channel(1);
    let supervisor_tx = tx.clone();
    let handle = tokio::spawn(async move { supervise(units, &supervisor_tx).await });

    (http_addr, store, tx, handle)
}

async fn raw_request(addr: SocketAddr, request: String) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).to_ascii_lowercase()
}

async fn post_form(addr: SocketAddr, body: &str) -> String {
    raw_request(
        addr,
        format!(
            "POST /message HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ),
    )
    .await
}

async fn wait_for_records(store: &MemoryStore, count: usize) -> Vec<DecodedRecord> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let records = store.records();
        if records.len() >= count || tokio::time::Instant::now() > deadline {
            return records;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_submission_flows_from_http_to_store() {
    let (addr, store, tx, handle) = start_pipeline().await;

    let response = post_form(addr, "name=Ann&age=30").await;
    assert!(response.starts_with("http/1.1 302"), "{}", response);
    assert!(response.contains("location: /\r\n"), "{}", response);

    let records = wait_for_records(&store, 1).await;
    assert_eq!(records.len(), 1);
    let fields: Vec<(&str, &str)> = records[0].iter().collect();
    assert_eq!(fields[0].0, "data");
    assert_eq!(&fields[1..], &[("name", "Ann"), ("age", "30")]);

    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("supervisor should stop after shutdown")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_malformed_submission_is_dropped_and_pipeline_keeps_going() {
    let (addr, store, tx, handle) = start_pipeline().await;

    let response = post_form(addr, "bad").await;
    assert!(response.starts_with("http/1.1 302"), "{}", response);

    let response = post_form(addr, "name=Bob").await;
    assert!(response.starts_with("http/1.1 302"), "{}", response);

    let records = wait_for_records(&store, 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("name"), Some("Bob"));

    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_unknown_page_is_404_html() {
    let (addr, _store, tx, handle) = start_pipeline().await;

    let response = raw_request(
        addr,
        "GET /nope.html HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n".to_string(),
    )
    .await;
    assert!(response.starts_with("http/1.1 404"), "{}", response);
    assert!(response.contains("content-type: text/html"), "{}", response);

    tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
