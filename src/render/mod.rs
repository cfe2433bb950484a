//! Rendering - turns snapshots into something a person can watch
//!
//! Renderers only ever see immutable [`Snapshot`]s. They report viewer
//! input back to the tick driver as [`ViewerCommand`]s.

pub mod art;
pub mod canvas;
pub mod metrics;
pub mod palette;
pub mod terminal;

use std::time::Instant;

use tracing::info;

use crate::core::types::Bounds;
use crate::core::Result;
use crate::simulation::entity::AgentPhase;
use crate::simulation::snapshot::Snapshot;

pub use canvas::Canvas;
pub use metrics::RenderMetrics;
pub use terminal::TerminalRenderer;

/// Requests from the viewer that reach beyond the renderer itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    Quit,
    SpawnDemoAgent,
}

pub trait Renderer {
    fn name(&self) -> &'static str;

    /// Drawable area, when the renderer has one
    fn viewport(&self) -> Option<Bounds> {
        None
    }

    fn render(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Commands entered since the last call
    fn poll_commands(&mut self) -> Result<Vec<ViewerCommand>> {
        Ok(Vec::new())
    }
}

/// Renderer without a display; logs a summary line every `summary_every` frames
pub struct HeadlessRenderer {
    summary_every: u64,
    metrics: RenderMetrics,
}

impl HeadlessRenderer {
    pub fn new(summary_every: u64) -> Self {
        Self {
            summary_every,
            metrics: RenderMetrics::new(),
        }
    }

    pub fn frames(&self) -> u64 {
        self.metrics.frames
    }

    pub fn metrics(&self) -> &RenderMetrics {
        &self.metrics
    }
}

impl Renderer for HeadlessRenderer {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn render(&mut self, snapshot: &Snapshot) -> Result<()> {
        let started = Instant::now();
        if self.summary_every > 0 && snapshot.tick % self.summary_every == 0 {
            info!(
                tick = snapshot.tick,
                entities = snapshot.entities.len(),
                agents_active = snapshot.count_agents_in(AgentPhase::Active),
                effects = snapshot.effects.len(),
                tool_calls = snapshot.stats.total_tool_calls,
                events = snapshot.stats.events_seen,
                decode_errors = snapshot.ingest.decode_errors,
                queue_dropped = snapshot.queue_dropped,
                weather = snapshot.environment.weather.as_str(),
                "Snapshot"
            );
        }
        self.metrics.record(started.elapsed(), snapshot.entities.len());
        Ok(())
    }
}
