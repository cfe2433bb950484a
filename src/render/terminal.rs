//! Terminal renderer - the aquarium drawn with ratatui on crossterm
//!
//! Layout, top to bottom: one HUD line, the tank, and a tabbed panel
//! (log / stats / detail). Raw mode and the alternate screen are restored
//! when the renderer is dropped, including on error paths.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use chrono::{Local, TimeZone};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{block::Title, Block, Borders, Paragraph},
    Frame, Terminal,
};

use super::canvas::Canvas;
use super::metrics::RenderMetrics;
use super::{Renderer, ViewerCommand};
use crate::core::types::Bounds;
use crate::core::{Result, TidepoolError};
use crate::simulation::entity::AgentPhase;
use crate::simulation::snapshot::{EntityViewKind, Snapshot};
use crate::ui::{PanelMode, ViewState};

/// Rows taken by the bottom panel, borders included
const PANEL_HEIGHT: u16 = 9;
/// Rows taken by the HUD line
const HUD_HEIGHT: u16 = 1;
const TOP_TOOLS: usize = 5;

fn terminal_error(context: &str, err: io::Error) -> TidepoolError {
    TidepoolError::Terminal(format!("{}: {}", context, err))
}

pub struct TerminalRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    view: ViewState,
    metrics: RenderMetrics,
    pending: Vec<ViewerCommand>,
}

impl TerminalRenderer {
    /// Take over the terminal: raw mode, alternate screen, hidden cursor
    pub fn new() -> Result<Self> {
        enable_raw_mode().map_err(|e| terminal_error("failed to enable raw mode", e))?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(terminal_error("failed to enter alternate screen", err));
        }
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = match Terminal::new(backend) {
            Ok(terminal) => terminal,
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                return Err(terminal_error("failed to build terminal backend", err));
            }
        };
        terminal.hide_cursor().ok();
        Ok(Self {
            terminal,
            view: ViewState::new(),
            metrics: RenderMetrics::new(),
            pending: Vec::new(),
        })
    }

    fn handle_key(&mut self, key: KeyEvent, snapshot: &Snapshot) {
        match (key.code, key.modifiers) {
            (KeyCode::Char('q') | KeyCode::Char('Q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                self.pending.push(ViewerCommand::Quit);
            }
            (KeyCode::Char('d'), _) => self.pending.push(ViewerCommand::SpawnDemoAgent),
            (KeyCode::Tab, _) => self.view.next_panel(),
            (KeyCode::Right, _) => self.view.select_next(snapshot),
            (KeyCode::Left, _) => self.view.select_prev(snapshot),
            (KeyCode::Esc, _) => self.view.deselect(),
            (KeyCode::Up, _) => self.view.scroll_up(snapshot.log.len()),
            (KeyCode::Down, _) => self.view.scroll_down(),
            _ => {}
        }
    }

    fn read_input(&mut self, snapshot: &Snapshot) -> Result<()> {
        while event::poll(Duration::ZERO).map_err(|e| terminal_error("failed to poll input", e))? {
            let input = event::read().map_err(|e| terminal_error("failed to read input", e))?;
            if let Event::Key(key) = input {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key, snapshot);
                }
            }
        }
        Ok(())
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        self.terminal.show_cursor().ok();
        if let Err(err) = disable_raw_mode() {
            tracing::error!(?err, "failed to disable raw mode");
        }
        if let Err(err) = execute!(self.terminal.backend_mut(), LeaveAlternateScreen) {
            tracing::error!(?err, "failed to leave alternate screen");
        }
    }
}

impl Renderer for TerminalRenderer {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn viewport(&self) -> Option<Bounds> {
        let size = self.terminal.size().ok()?;
        let height = size.height.saturating_sub(HUD_HEIGHT + PANEL_HEIGHT);
        Some(Bounds::new(f32::from(size.width), f32::from(height)))
    }

    fn render(&mut self, snapshot: &Snapshot) -> Result<()> {
        let started = Instant::now();
        self.view.refresh(snapshot);

        let view = &self.view;
        let metrics = &self.metrics;
        self.terminal
            .draw(|frame| draw(frame, snapshot, view, metrics))
            .map_err(|e| terminal_error("failed to draw frame", e))?;

        self.metrics.record(started.elapsed(), snapshot.entities.len());
        self.read_input(snapshot)
    }

    fn poll_commands(&mut self) -> Result<Vec<ViewerCommand>> {
        Ok(std::mem::take(&mut self.pending))
    }
}

fn draw(frame: &mut Frame<'_>, snapshot: &Snapshot, view: &ViewState, metrics: &RenderMetrics) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HUD_HEIGHT),
            Constraint::Min(0),
            Constraint::Length(PANEL_HEIGHT),
        ])
        .split(frame.size());

    draw_hud(frame, rows[0], snapshot, metrics);
    draw_tank(frame, rows[1], snapshot, view);
    draw_panel(frame, rows[2], snapshot, view);
}

fn draw_hud(frame: &mut Frame<'_>, area: Rect, snapshot: &Snapshot, metrics: &RenderMetrics) {
    let env = &snapshot.environment;
    let stats = &snapshot.stats;
    let line = Line::from(vec![
        Span::styled(" tidepool ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(format!(
            " {:02}:{:02} {:?} {} | agents {}/{} | tools {} | events {} | errors {} | dropped {} | {:.1}ms",
            env.hour,
            env.minute,
            env.phase,
            env.weather.as_str(),
            stats.active_agents,
            stats.agent_count,
            stats.total_tool_calls,
            stats.events_seen,
            stats.error_count,
            snapshot.queue_dropped,
            metrics.avg_frame_time_ms(),
        )),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_tank(frame: &mut Frame<'_>, area: Rect, snapshot: &Snapshot, view: &ViewState) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let mut canvas = Canvas::new(area.width as usize, area.height as usize);
    canvas.draw_snapshot(snapshot, view.selected);

    let lines: Vec<Line> = (0..canvas.height())
        .map(|y| {
            let spans: Vec<Span> = canvas
                .row(y)
                .iter()
                .map(|cell| {
                    Span::styled(
                        cell.ch.to_string(),
                        Style::default().fg(cell.fg.to_term()).bg(cell.bg.to_term()),
                    )
                })
                .collect();
            Line::from(spans)
        })
        .collect();
    frame.render_widget(Paragraph::new(Text::from(lines)), area);
}

fn draw_panel(frame: &mut Frame<'_>, area: Rect, snapshot: &Snapshot, view: &ViewState) {
    let mut title = vec![Span::raw(" ")];
    for mode in PanelMode::ALL {
        let style = if mode == view.panel {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        title.push(Span::styled(mode.title(), style));
        title.push(Span::raw(" "));
    }
    let block = Block::default()
        .title(Line::from(title))
        .title(Title::from(" q quit  d demo  tab panel  ←/→ select  esc clear ").alignment(Alignment::Right))
        .borders(Borders::ALL);
    let inner_height = block.inner(area).height as usize;

    let lines = match view.panel {
        PanelMode::Log => log_lines(snapshot, view.log_scroll, inner_height),
        PanelMode::Stats => stats_lines(snapshot),
        PanelMode::Detail => detail_lines(snapshot, view),
    };
    frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

fn clock_time(unix_secs: f64) -> String {
    Local
        .timestamp_opt(unix_secs.floor() as i64, 0)
        .single()
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

fn log_lines(snapshot: &Snapshot, scroll: usize, rows: usize) -> Vec<Line<'static>> {
    let end = snapshot.log.len().saturating_sub(scroll);
    let start = end.saturating_sub(rows);
    snapshot.log[start..end]
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(clock_time(entry.timestamp), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(
                    format!("{:<15}", entry.category.as_str()),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(entry.detail.clone()),
            ])
        })
        .collect()
}

fn stats_lines(snapshot: &Snapshot) -> Vec<Line<'static>> {
    let stats = &snapshot.stats;
    let uptime = stats.uptime_secs as u64;
    let mut lines = vec![
        Line::from(format!(
            "uptime {:02}:{:02}:{:02}   agents {} active / {} total   orphans {}",
            uptime / 3600,
            (uptime / 60) % 60,
            uptime % 60,
            stats.active_agents,
            stats.agent_count,
            stats.orphan_count
        )),
        Line::from(format!(
            "tool calls {}   errors {}   tasks {}   milestones {}",
            stats.total_tool_calls, stats.error_count, stats.tasks_completed, stats.milestones_fired
        )),
        Line::from(format!(
            "connections {}   messages {}   decode errors {}   dropped {}",
            snapshot.ingest.connections_accepted,
            snapshot.ingest.messages_accepted,
            snapshot.ingest.decode_errors,
            snapshot.queue_dropped
        )),
    ];
    let top: Vec<String> = stats
        .top_tools(TOP_TOOLS)
        .into_iter()
        .map(|(name, count)| format!("{} {}", name, count))
        .collect();
    if !top.is_empty() {
        lines.push(Line::from(format!("top tools: {}", top.join(", "))));
    }
    lines
}

fn detail_lines(snapshot: &Snapshot, view: &ViewState) -> Vec<Line<'static>> {
    let Some(entity) = view.selected.and_then(|id| snapshot.find(id)) else {
        return vec![Line::from("no agent selected (←/→ to pick one)")];
    };
    let EntityViewKind::Agent {
        agent_id,
        agent_type,
        title,
        phase,
        exit_variant,
        orphan,
        tool_calls,
        current_tool,
        ..
    } = &entity.kind
    else {
        return Vec::new();
    };

    let status = match (phase, exit_variant) {
        (AgentPhase::Exiting, Some(variant)) => format!("exiting ({:?})", variant),
        _ => format!("{:?}", phase).to_lowercase(),
    };
    let mut lines = vec![
        Line::from(Span::styled(title.clone(), Style::default().add_modifier(Modifier::BOLD))),
        Line::from(format!(
            "id {}   type {}   status {}{}",
            agent_id,
            agent_type.as_deref().unwrap_or("-"),
            status,
            if *orphan { "   (no start seen)" } else { "" }
        )),
        Line::from(format!(
            "tool calls {}   current {}   alive {:.0}s",
            tool_calls,
            current_tool.as_deref().unwrap_or("-"),
            snapshot.sim_time - entity.spawned_at
        )),
    ];
    if let Some(label) = &entity.label {
        lines.push(Line::from(format!("last: {}", label.text)));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_time_format() {
        let text = clock_time(0.0);
        assert_eq!(text.len(), 8);
        assert_eq!(text.matches(':').count(), 2);
    }
}
