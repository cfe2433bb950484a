//! Fixed-rate tick driver
//!
//! Runs on its own thread while ingestion lives on the Tokio runtime. A
//! tick is never interrupted: shutdown is only observed between ticks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::snapshot::Snapshot;
use super::tick::Simulation;
use crate::core::{Result, ShutdownSignal};
use crate::ingest::{IngestCounters, TransferQueue};
use crate::render::{Renderer, ViewerCommand};

/// Falling further behind than this many ticks resets the schedule
const MAX_LAG_TICKS: u32 = 5;

/// Result of a finished run
#[derive(Debug, Clone, Default)]
pub struct DriverSummary {
    pub ticks: u64,
    pub last_snapshot: Option<Arc<Snapshot>>,
}

pub struct TickDriver {
    simulation: Simulation,
    queue: Arc<TransferQueue>,
    counters: Arc<IngestCounters>,
    shutdown: ShutdownSignal,
    interval: Duration,
    paced: bool,
    max_ticks: Option<u64>,
}

impl TickDriver {
    pub fn new(
        simulation: Simulation,
        queue: Arc<TransferQueue>,
        counters: Arc<IngestCounters>,
        shutdown: ShutdownSignal,
    ) -> Self {
        let interval = Duration::from_secs_f64(simulation.config().tick_dt());
        Self {
            simulation,
            queue,
            counters,
            shutdown,
            interval,
            paced: true,
            max_ticks: None,
        }
    }

    /// Stop after `max` ticks
    pub fn with_max_ticks(mut self, max: u64) -> Self {
        self.max_ticks = Some(max);
        self
    }

    /// Run ticks back to back instead of at the configured rate
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Tick until shutdown, the tick limit, or a renderer error
    ///
    /// `on_command` receives every viewer command except `Quit`, which
    /// triggers shutdown directly.
    pub fn run(
        &mut self,
        renderer: &mut dyn Renderer,
        mut on_command: impl FnMut(ViewerCommand),
    ) -> Result<DriverSummary> {
        info!(
            renderer = renderer.name(),
            interval_ms = self.interval.as_millis() as u64,
            "Tick driver started"
        );
        let mut summary = DriverSummary::default();
        let mut deadline = Instant::now();

        loop {
            if self.shutdown.is_triggered() {
                break;
            }
            if self.max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }

            if let Some(bounds) = renderer.viewport() {
                self.simulation.resize(bounds);
            }
            let snapshot = self.simulation.tick(&self.queue, self.counters.snapshot())?;
            renderer.render(&snapshot)?;

            for command in renderer.poll_commands()? {
                match command {
                    ViewerCommand::Quit => {
                        info!("Quit requested by viewer");
                        self.shutdown.trigger();
                    }
                    other => on_command(other),
                }
            }

            summary.ticks += 1;
            summary.last_snapshot = Some(snapshot);

            if self.paced {
                deadline += self.interval;
                let now = Instant::now();
                if deadline > now {
                    std::thread::sleep(deadline - now);
                } else if now - deadline > self.interval * MAX_LAG_TICKS {
                    debug!(lag_ms = (now - deadline).as_millis() as u64, "Tick driver fell behind");
                    deadline = now;
                }
            }
        }

        info!(ticks = summary.ticks, "Tick driver stopped");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EnvironmentConfig, ManualClock, SimulationConfig};
    use crate::event::Event;
    use crate::render::HeadlessRenderer;
    use chrono::NaiveDate;

    fn driver(queue: Arc<TransferQueue>, shutdown: ShutdownSignal) -> TickDriver {
        let noon = NaiveDate::from_ymd_opt(2024, 6, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        let config = SimulationConfig {
            rng_seed: Some(1),
            ..SimulationConfig::default()
        };
        let simulation = Simulation::new(config, EnvironmentConfig::default(), Box::new(ManualClock::new(noon)));
        TickDriver::new(simulation, queue, Arc::new(IngestCounters::default()), shutdown)
    }

    #[test]
    fn test_runs_until_tick_limit() {
        let queue = Arc::new(TransferQueue::new(16));
        queue.push(Event::agent_start("a1", 0.0));
        let mut driver = driver(queue.clone(), ShutdownSignal::new()).unpaced().with_max_ticks(10);
        let mut renderer = HeadlessRenderer::new(0);

        let summary = driver.run(&mut renderer, |_| {}).unwrap();
        assert_eq!(summary.ticks, 10);
        assert_eq!(renderer.frames(), 10);
        assert!(queue.is_empty());
        let last = summary.last_snapshot.unwrap();
        assert!(last.find_agent("a1").is_some());
    }

    #[test]
    fn test_stops_when_shutdown_already_triggered() {
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        let mut driver = driver(Arc::new(TransferQueue::new(4)), shutdown).unpaced();
        let summary = driver.run(&mut HeadlessRenderer::new(0), |_| {}).unwrap();
        assert_eq!(summary.ticks, 0);
        assert!(summary.last_snapshot.is_none());
    }
}
