//! Tidepool - a terminal aquarium animating live agent activity
//!
//! Lifecycle events arrive over a local socket ([`ingest`]), pass through a
//! bounded transfer queue, and drive a fixed-rate simulation
//! ([`simulation`]) whose per-tick snapshots are drawn by a [`render`]er.

pub mod core;
pub mod event;
pub mod ingest;
pub mod render;
pub mod simulation;
pub mod ui;
