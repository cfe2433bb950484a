//! Simulation - everything the tick owns
//!
//! The tick is the only writer of the registry, statistics, environment and
//! effects. Renderers see [`Snapshot`]s, never the state itself.

pub mod driver;
pub mod effects;
pub mod entity;
pub mod environment;
pub mod log;
pub mod milestones;
pub mod population;
pub mod registry;
pub mod snapshot;
pub mod stats;
pub mod tick;

pub use driver::{DriverSummary, TickDriver};
pub use effects::{Effect, EffectKind, Effects};
pub use entity::{AgentPhase, Entity, EntityKind, ExitVariant, ToolStyle};
pub use environment::{EnvironmentClock, EnvironmentState, Weather};
pub use milestones::{Milestone, MilestoneKind, MilestoneTracker};
pub use registry::{Outcome, Registry, StepContext};
pub use snapshot::{EntityView, EntityViewKind, Snapshot};
pub use stats::{SessionStats, StatsView};
pub use tick::Simulation;
