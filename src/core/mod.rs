pub mod clock;
pub mod config;
pub mod error;
pub mod shutdown;
pub mod types;

pub use clock::{ManualClock, SystemClock, WallClock};
pub use config::{EnvironmentConfig, IngestConfig, SimulationConfig, TidepoolConfig};
pub use error::{Result, TidepoolError};
pub use shutdown::ShutdownSignal;
