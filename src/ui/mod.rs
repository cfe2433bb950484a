//! Viewer-side state, independent of any particular renderer

pub mod state;

pub use state::{PanelMode, ViewState};
