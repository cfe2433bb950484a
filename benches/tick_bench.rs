use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use tidepool::core::{EnvironmentConfig, ManualClock, SimulationConfig};
use tidepool::event::Event;
use tidepool::ingest::IngestStats;
use tidepool::simulation::Simulation;

fn populated(agents: usize) -> Simulation {
    let config = SimulationConfig {
        rng_seed: Some(0xBEEF),
        ..SimulationConfig::default()
    };
    let noon = NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .expect("valid date");
    let mut sim = Simulation::new(config, EnvironmentConfig::default(), Box::new(ManualClock::new(noon)));
    let starts = (0..agents)
        .map(|i| Event::agent_start(&format!("agent-{}", i), 0.0))
        .collect();
    sim.step(starts, IngestStats::default(), 0).expect("seed tick");
    // Let every agent finish entering
    for _ in 0..100 {
        sim.step(Vec::new(), IngestStats::default(), 0).expect("warm tick");
    }
    sim
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for agents in [10usize, 100, 500] {
        group.bench_function(format!("agents{}_tool_burst", agents), |b| {
            b.iter_batched(
                || {
                    let events: Vec<Event> = (0..agents)
                        .map(|i| Event::tool_start(&format!("agent-{}", i), "Read", 1.0))
                        .collect();
                    (populated(agents), events)
                },
                |(mut sim, events)| sim.step(events, IngestStats::default(), 0).expect("tick"),
                BatchSize::LargeInput,
            );
        });
        group.bench_function(format!("agents{}_idle", agents), |b| {
            let mut sim = populated(agents);
            b.iter(|| sim.step(Vec::new(), IngestStats::default(), 0).expect("tick"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
