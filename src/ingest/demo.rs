//! Demo mode - synthetic agents for running without a producer
//!
//! Demo agents go through the same [`TransferQueue`] as real events; the
//! spawner never touches simulation state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::TransferQueue;
use crate::core::{ShutdownSignal, SystemClock, WallClock};
use crate::event::Event;

const LABELS: [&str; 8] = [
    "Find API endpoints",
    "Run test suite",
    "Write output.json",
    "Search documentation",
    "Analyze logs",
    "Edit config.toml",
    "Review PR changes",
    "Explore codebase",
];

const AGENT_TYPES: [&str; 5] = [
    "Explore",
    "general-purpose",
    "Plan",
    "code-reviewer",
    "feature-dev:code-architect",
];

const TOOLS: [&str; 5] = ["Read", "Bash", "Write", "Grep", "Edit"];

const SUMMARIES: [&str; 4] = ["main.rs", "cargo test", "*.ts", "TODO"];

const MCP_TOOLS: [&str; 3] = [
    "mcp__codex__codex",
    "mcp__notion__notion-search",
    "mcp__context7__query-docs",
];

const TASK_SUBJECTS: [&str; 4] = [
    "Fix flaky test",
    "Add retry logic",
    "Update changelog",
    "Refactor parser",
];

/// One scripted step of a demo agent
#[derive(Debug, Clone, PartialEq)]
pub enum DemoAction {
    ToolStart { tool: String, summary: String },
    ToolStop { tool: String },
    TaskCompleted { subject: String },
    Stop { error: bool },
}

impl DemoAction {
    fn into_event(self, agent_id: &str, timestamp: f64) -> Event {
        match self {
            DemoAction::ToolStart { tool, summary } => Event::tool_start(agent_id, &tool, timestamp)
                .with_field("tool_input_summary", Value::String(summary)),
            DemoAction::ToolStop { tool } => Event::tool_stop(agent_id, &tool, timestamp),
            DemoAction::TaskCompleted { subject } => Event::task_completed(&subject, timestamp),
            DemoAction::Stop { error } => Event::agent_stop(agent_id, timestamp, error),
        }
    }
}

/// Script a lifecycle: a pause, 2-5 tool calls, maybe an MCP call, a stop
pub fn plan_lifecycle(rng: &mut impl Rng) -> Vec<(Duration, DemoAction)> {
    let mut steps = Vec::new();
    let mut first = Duration::from_secs_f64(rng.gen_range(2.0..5.0));

    for _ in 0..rng.gen_range(2..=5) {
        let tool = pick(rng, &TOOLS).to_string();
        let delay = first + Duration::from_secs_f64(rng.gen_range(0.5..1.5));
        first = Duration::ZERO;
        steps.push((
            delay,
            DemoAction::ToolStart {
                tool: tool.clone(),
                summary: pick(rng, &SUMMARIES).to_string(),
            },
        ));
        steps.push((
            Duration::from_secs_f64(rng.gen_range(0.1..0.4)),
            DemoAction::ToolStop { tool },
        ));
    }

    if rng.gen_bool(0.55) {
        let tool = pick(rng, &MCP_TOOLS).to_string();
        let summary = tool.split("__").nth(1).unwrap_or_default().to_string();
        steps.push((
            Duration::from_millis(300),
            DemoAction::ToolStart {
                tool: tool.clone(),
                summary,
            },
        ));
        steps.push((
            Duration::from_secs_f64(rng.gen_range(3.0..6.0)),
            DemoAction::ToolStop { tool },
        ));
    }

    if rng.gen_bool(0.3) {
        steps.push((
            Duration::from_millis(200),
            DemoAction::TaskCompleted {
                subject: pick(rng, &TASK_SUBJECTS).to_string(),
            },
        ));
    }

    steps.push((
        Duration::from_millis(500),
        DemoAction::Stop {
            error: rng.gen_bool(0.1),
        },
    ));
    steps
}

fn pick<'a>(rng: &mut impl Rng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// Spawns scripted demo agents onto the transfer queue
#[derive(Clone)]
pub struct DemoSpawner {
    queue: Arc<TransferQueue>,
    handle: Handle,
    shutdown: ShutdownSignal,
    rng: Arc<Mutex<ChaCha8Rng>>,
    next_id: Arc<AtomicU64>,
}

impl DemoSpawner {
    pub fn new(
        queue: Arc<TransferQueue>,
        handle: Handle,
        shutdown: ShutdownSignal,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            queue,
            handle,
            shutdown,
            rng: Arc::new(Mutex::new(rng)),
            next_id: Arc::new(AtomicU64::new(100)),
        }
    }

    /// Push an `agent_start` now and script the rest of its lifecycle on
    /// the runtime; returns the new agent id
    pub fn spawn_agent(&self) -> String {
        let agent_id = format!("demo-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (agent_type, description, steps) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let agent_type = pick(&mut *rng, &AGENT_TYPES);
            let description = pick(&mut *rng, &LABELS);
            (agent_type, description, plan_lifecycle(&mut *rng))
        };

        let start = Event::agent_start(&agent_id, SystemClock.unix_secs())
            .with_field("agent_type", Value::from(agent_type))
            .with_field("description", Value::from(description));
        self.queue.push(start);
        debug!(agent_id = %agent_id, agent_type, "Demo agent spawned");

        let queue = Arc::clone(&self.queue);
        let shutdown = self.shutdown.clone();
        let id = agent_id.clone();
        self.handle.spawn(async move {
            for (delay, action) in steps {
                tokio::select! {
                    _ = shutdown.wait() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
                queue.push(action.into_event(&id, SystemClock.unix_secs()));
            }
        });

        agent_id
    }

    /// Keep spawning agents every few seconds until shutdown
    pub fn start_background(&self) -> JoinHandle<()> {
        let spawner = self.clone();
        self.handle.spawn(async move {
            info!("Demo mode started");
            loop {
                spawner.spawn_agent();
                let pause = {
                    let mut rng = spawner.rng.lock().unwrap_or_else(PoisonError::into_inner);
                    Duration::from_secs_f64(rng.gen_range(3.0..8.0))
                };
                tokio::select! {
                    _ = spawner.shutdown.wait() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
            info!("Demo mode stopped");
        })
    }
}
