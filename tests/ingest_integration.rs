//! Ingestion boundary integration tests over a real Unix socket

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tidepool::core::{IngestConfig, ShutdownSignal};
use tidepool::event::{encode_line, Event, EventKind};
use tidepool::ingest::{IngestCounters, IngestServer, TransferQueue};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

fn socket_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tidepool-{}-{}.sock", name, std::process::id()))
}

async fn wait_for(queue: &TransferQueue, len: usize) {
    for _ in 0..200 {
        if queue.len() >= len {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

struct Harness {
    config: IngestConfig,
    queue: Arc<TransferQueue>,
    counters: Arc<IngestCounters>,
    shutdown: ShutdownSignal,
    server: tokio::task::JoinHandle<tidepool::core::Result<()>>,
}

impl Harness {
    fn start(name: &str) -> Self {
        let config = IngestConfig {
            socket_path: socket_path(name),
            read_timeout_ms: 50,
            shutdown_grace_ms: 200,
            ..IngestConfig::default()
        };
        let queue = Arc::new(TransferQueue::new(config.queue_capacity));
        let counters = Arc::new(IngestCounters::default());
        let shutdown = ShutdownSignal::new();
        let server = IngestServer::bind(&config, queue.clone(), counters.clone()).unwrap();
        let server = tokio::spawn(server.serve(shutdown.clone()));
        Self {
            config,
            queue,
            counters,
            shutdown,
            server,
        }
    }

    async fn stop(self) {
        self.shutdown.trigger();
        self.server.await.unwrap().unwrap();
        assert!(!self.config.socket_path.exists());
    }
}

#[tokio::test]
async fn test_valid_messages_reach_the_queue() {
    let harness = Harness::start("valid");
    let mut stream = UnixStream::connect(&harness.config.socket_path).await.unwrap();
    for event in [
        Event::agent_start("a1", 1.0),
        Event::tool_start("a1", "Read", 2.0),
        Event::agent_stop("a1", 3.0, false),
    ] {
        stream.write_all(encode_line(&event).unwrap().as_bytes()).await.unwrap();
    }
    stream.shutdown().await.unwrap();

    wait_for(&harness.queue, 3).await;
    let kinds: Vec<EventKind> = harness.queue.drain().iter().map(Event::kind).collect();
    assert_eq!(kinds, vec![EventKind::AgentStart, EventKind::ToolStart, EventKind::AgentStop]);

    let stats = harness.counters.snapshot();
    assert_eq!(stats.messages_accepted, 3);
    assert_eq!(stats.decode_errors, 0);
    harness.stop().await;
}

#[tokio::test]
async fn test_malformed_message_is_counted_and_skipped() {
    let harness = Harness::start("malformed");
    let mut stream = UnixStream::connect(&harness.config.socket_path).await.unwrap();
    stream
        .write_all(b"{\"event\":\"agent_teleport\",\"agent_id\":\"a1\"}\n")
        .await
        .unwrap();
    let valid = encode_line(&Event::agent_start("a2", 5.0)).unwrap();
    stream.write_all(valid.as_bytes()).await.unwrap();
    stream.shutdown().await.unwrap();

    wait_for(&harness.queue, 1).await;
    let events = harness.queue.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].agent_id(), "a2");

    let stats = harness.counters.snapshot();
    assert_eq!(stats.decode_errors, 1);
    assert_eq!(stats.messages_accepted, 1);
    harness.stop().await;
}

#[tokio::test]
async fn test_several_producers_share_the_queue() {
    let harness = Harness::start("producers");
    let mut tasks = Vec::new();
    for n in 0..4 {
        let path = harness.config.socket_path.clone();
        tasks.push(tokio::spawn(async move {
            let mut stream = UnixStream::connect(path).await.unwrap();
            let line = encode_line(&Event::agent_start(&format!("agent-{}", n), n as f64)).unwrap();
            stream.write_all(line.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    wait_for(&harness.queue, 4).await;
    assert_eq!(harness.queue.len(), 4);
    assert_eq!(harness.counters.snapshot().connections_accepted, 4);
    harness.stop().await;
}
