//! Viewer state - selection, panel and scroll position

use crate::core::types::EntityId;
use crate::simulation::snapshot::Snapshot;

/// Bottom panel tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelMode {
    #[default]
    Log,
    Stats,
    Detail,
}

impl PanelMode {
    pub const ALL: [PanelMode; 3] = [PanelMode::Log, PanelMode::Stats, PanelMode::Detail];

    pub fn next(self) -> Self {
        match self {
            PanelMode::Log => PanelMode::Stats,
            PanelMode::Stats => PanelMode::Detail,
            PanelMode::Detail => PanelMode::Log,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PanelMode::Log => "log",
            PanelMode::Stats => "stats",
            PanelMode::Detail => "detail",
        }
    }
}

/// What the viewer is looking at
///
/// The selection is an entity id, re-resolved against every snapshot. It
/// never holds a reference into simulation state.
#[derive(Debug, Default)]
pub struct ViewState {
    /// Currently selected agent (if any)
    pub selected: Option<EntityId>,
    pub panel: PanelMode,
    /// Log lines scrolled back from the newest
    pub log_scroll: usize,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a selection that no longer resolves
    pub fn refresh(&mut self, snapshot: &Snapshot) {
        if let Some(id) = self.selected {
            if snapshot.find(id).is_none() {
                self.selected = None;
                if self.panel == PanelMode::Detail {
                    self.panel = PanelMode::Log;
                }
            }
        }
        self.log_scroll = self.log_scroll.min(snapshot.log.len().saturating_sub(1));
    }

    pub fn select_next(&mut self, snapshot: &Snapshot) {
        self.cycle(snapshot, 1);
    }

    pub fn select_prev(&mut self, snapshot: &Snapshot) {
        self.cycle(snapshot, -1);
    }

    fn cycle(&mut self, snapshot: &Snapshot, step: isize) {
        let agents = snapshot.selectable_agents();
        if agents.is_empty() {
            self.selected = None;
            return;
        }
        let len = agents.len() as isize;
        let idx = match self.selected.and_then(|id| agents.iter().position(|a| *a == id)) {
            Some(current) => (current as isize + step).rem_euclid(len),
            None if step > 0 => 0,
            None => len - 1,
        };
        self.selected = Some(agents[idx as usize]);
        self.panel = PanelMode::Detail;
    }

    /// Clear selection
    pub fn deselect(&mut self) {
        self.selected = None;
        if self.panel == PanelMode::Detail {
            self.panel = PanelMode::Log;
        }
    }

    pub fn next_panel(&mut self) {
        self.panel = self.panel.next();
    }

    pub fn scroll_up(&mut self, log_len: usize) {
        self.log_scroll = (self.log_scroll + 1).min(log_len.saturating_sub(1));
    }

    pub fn scroll_down(&mut self) {
        self.log_scroll = self.log_scroll.saturating_sub(1);
    }
}
