//! Ratatui-based terminal UI.
//!
//! The TUI provides a settings panel for choosing a metric, geography,
//! smoothing, date range and scale, then renders the selected series.

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::data::FeedError;
use crate::domain::{Metric, ROOT, Snapshot};
use crate::error::AppError;
use crate::math::Transform;
use crate::report::{SeriesQuery, SeriesView, select};
use crate::service::Aggregator;

mod plotters_chart;

use plotters_chart::{SeriesPlottersChart, fmt_day};

const FIELDS: usize = 6;
const FIELD_METRIC: usize = 0;
const FIELD_GEO: usize = 1;
const FIELD_TRANSFORM: usize = 2;
const FIELD_FROM: usize = 3;
const FIELD_TO: usize = 4;
const FIELD_SCALE: usize = 5;

/// Start the TUI on a snapshot. With an aggregator, `r` re-fetches the feeds.
pub fn run(snapshot: Arc<Snapshot>, aggregator: Option<Arc<Aggregator>>) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(snapshot, aggregator);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateField {
    From,
    To,
}

struct App {
    snapshot: Arc<Snapshot>,
    aggregator: Option<Arc<Aggregator>>,
    metric: Metric,
    geo: &'static str,
    transform: Transform,
    log_scale: bool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    date_input: String,
    editing: Option<DateField>,
    selected_field: usize,
    status: String,
    /// Result of a refresh running on a worker thread.
    pending: Option<Receiver<Result<Arc<Snapshot>, FeedError>>>,
}

impl App {
    fn new(snapshot: Arc<Snapshot>, aggregator: Option<Arc<Aggregator>>) -> Self {
        let status = match (snapshot.first_date(), snapshot.last_date()) {
            (Some(a), Some(b)) => format!("snapshot {a} .. {b}"),
            _ => "snapshot has no dates".to_string(),
        };
        Self {
            snapshot,
            aggregator,
            metric: Metric::NewCases,
            geo: ROOT,
            transform: Transform::Trailing,
            log_scale: false,
            from: None,
            to: None,
            date_input: String::new(),
            editing: None,
            selected_field: 0,
            status,
            pending: None,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.poll_refresh() {
                needs_redraw = true;
            }
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns true when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing.is_some() {
            self.handle_date_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.selected_field = self.selected_field.saturating_sub(1),
            KeyCode::Down => self.selected_field = (self.selected_field + 1).min(FIELDS - 1),
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter => match self.selected_field {
                FIELD_FROM => self.start_date_edit(DateField::From),
                FIELD_TO => self.start_date_edit(DateField::To),
                _ => {}
            },
            KeyCode::Char('m') => self.cycle_metric(),
            KeyCode::Char('g') => self.cycle_geo(1),
            KeyCode::Char('t') => self.cycle_transform(),
            KeyCode::Char('l') => self.toggle_scale(),
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
        false
    }

    fn handle_date_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing = None;
                self.status = "Date edit canceled.".to_string();
            }
            KeyCode::Enter => self.apply_date_input(),
            KeyCode::Backspace => {
                self.date_input.pop();
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || c == '-' {
                    self.date_input.push(c);
                }
            }
            _ => {}
        }
    }

    fn adjust_field(&mut self, delta: i32) {
        match self.selected_field {
            FIELD_METRIC => self.cycle_metric(),
            FIELD_GEO => self.cycle_geo(delta),
            FIELD_TRANSFORM => self.cycle_transform(),
            FIELD_SCALE => self.toggle_scale(),
            _ => {}
        }
    }

    fn cycle_metric(&mut self) {
        self.metric = self.metric.next();
        // Deaths only exist per region; fall back to the country when the
        // current geography is not in the new hierarchy.
        if self.metric.hierarchy_kind().hierarchy().get(self.geo).is_none() {
            self.geo = ROOT;
        }
        self.status = format!("metric: {}", self.metric.display_name());
    }

    fn cycle_geo(&mut self, delta: i32) {
        let codes: Vec<&'static str> = self.metric.hierarchy_kind().hierarchy().codes().collect();
        if codes.is_empty() {
            return;
        }
        let cur = codes.iter().position(|c| *c == self.geo).unwrap_or(0);
        let n = codes.len() as i64;
        let next = (cur as i64 + i64::from(delta)).rem_euclid(n) as usize;
        self.geo = codes[next];
        self.status = format!("area: {}", self.geo_name());
    }

    fn cycle_transform(&mut self) {
        self.transform = self.transform.next();
        self.status = format!("smoothing: {}", self.transform.display_name());
    }

    fn toggle_scale(&mut self) {
        self.log_scale = !self.log_scale;
        self.status = if self.log_scale { "log scale" } else { "linear scale" }.to_string();
    }

    fn start_date_edit(&mut self, field: DateField) {
        let current = match field {
            DateField::From => self.from,
            DateField::To => self.to,
        };
        self.date_input = current.map(|d| d.to_string()).unwrap_or_default();
        self.editing = Some(field);
        self.status = "Editing date (YYYY-MM-DD, empty = open). Enter to apply, Esc to cancel.".to_string();
    }

    fn apply_date_input(&mut self) {
        let Some(field) = self.editing.take() else {
            return;
        };
        let trimmed = self.date_input.trim();
        let value = if trimmed.is_empty() {
            None
        } else {
            match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                Ok(d) => Some(d),
                Err(e) => {
                    self.status = format!("Invalid date '{trimmed}': {e}");
                    return;
                }
            }
        };
        match field {
            DateField::From => self.from = value,
            DateField::To => self.to = value,
        }
        self.status = format!("range: {} .. {}", fmt_bound(self.from), fmt_bound(self.to));
    }

    fn refresh(&mut self) {
        let Some(aggregator) = &self.aggregator else {
            self.status = "Viewing a saved snapshot; nothing to refresh.".to_string();
            return;
        };
        if self.pending.is_some() {
            self.status = "Refresh already running.".to_string();
            return;
        }

        // Fetching blocks on the network; keep the UI responsive meanwhile.
        let (tx, rx) = mpsc::channel();
        let aggregator = Arc::clone(aggregator);
        let spawned = thread::Builder::new()
            .name("epi-tui-refresh".to_string())
            .spawn(move || {
                let _ = tx.send(aggregator.refresh());
            });
        match spawned {
            Ok(_) => {
                self.pending = Some(rx);
                self.status = "Refreshing feeds…".to_string();
            }
            Err(e) => self.status = format!("Failed to start refresh: {e}"),
        }
    }

    /// Apply a finished background refresh. Returns true when the screen changed.
    fn poll_refresh(&mut self) -> bool {
        let Some(rx) = &self.pending else {
            return false;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => Err(FeedError::Unavailable("refresh worker exited".into())),
        };
        self.pending = None;
        match outcome {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                self.status = format!("refreshed: {} dates", self.snapshot.dates.len());
            }
            Err(err) => {
                self.status = format!("Refresh failed, keeping previous data: {err}");
            }
        }
        true
    }

    fn geo_name(&self) -> &'static str {
        self.metric
            .hierarchy_kind()
            .hierarchy()
            .get(self.geo)
            .map(|n| n.display_name)
            .unwrap_or(self.geo)
    }

    fn query(&self, transform: Transform) -> SeriesQuery {
        SeriesQuery {
            metric: self.metric,
            geo: self.geo.to_string(),
            transform,
            from: self.from,
            to: self.to,
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("epi", Style::default().fg(Color::Cyan)),
            Span::raw(" - Belgian epidemiological rollup"),
        ]));

        let span = match (self.snapshot.first_date(), self.snapshot.last_date()) {
            (Some(a), Some(b)) => format!("{a} .. {b}"),
            _ => "-".to_string(),
        };
        let source = self
            .aggregator
            .as_ref()
            .map(|a| a.status().source)
            .unwrap_or_else(|| "saved snapshot".to_string());
        lines.push(Line::from(Span::styled(
            format!(
                "fetched: {} | dates: {span} | source: {source}",
                self.snapshot.timestamp.format("%Y-%m-%d %H:%M UTC"),
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(32)])
            .split(area);

        self.draw_chart(frame, chunks[0]);
        self.draw_settings(frame, chunks[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = format!(
            "{} - {} ({})",
            self.metric.display_name(),
            self.geo_name(),
            self.transform.display_name()
        );
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let shown = select(&self.snapshot, &self.query(self.transform));
        let raw = select(&self.snapshot, &self.query(Transform::Identity));
        let (shown, raw) = match (shown, raw) {
            (Ok(shown), Ok(raw)) => (shown, raw),
            (Err(e), _) | (_, Err(e)) => {
                let msg = Paragraph::new(e.to_string()).style(Style::default().fg(Color::Yellow));
                frame.render_widget(msg, inner);
                return;
            }
        };

        let Some(data) = chart_data(&shown, &raw, self.log_scale) else {
            let msg = Paragraph::new("No data in range.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let fmt_y = if self.log_scale { fmt_axis_y_log } else { fmt_axis_y };
        let (chart_rect, insets) = chart_layout(inner);
        let widget = SeriesPlottersChart {
            segments: &data.segments,
            points: &data.points,
            start: data.start,
            x_bounds: data.x_bounds,
            y_bounds: data.y_bounds,
            y_label: self.metric.key().to_string(),
            fmt_y,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, &data, fmt_y);
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let date_value = |field: DateField, value: Option<NaiveDate>| {
            if self.editing == Some(field) {
                format!("{}_", self.date_input)
            } else {
                fmt_bound(value)
            }
        };

        let items = vec![
            ListItem::new(format!("Metric: {}", self.metric.key())),
            ListItem::new(format!("Area: {} {}", self.geo, self.geo_name())),
            ListItem::new(format!("Smoothing: {}", self.transform.key())),
            ListItem::new(format!("From: {}", date_value(DateField::From, self.from))),
            ListItem::new(format!("To: {}", date_value(DateField::To, self.to))),
            ListItem::new(format!("Scale: {}", if self.log_scale { "log" } else { "linear" })),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);

        if self.editing.is_some() {
            let hint = Paragraph::new("Editing date…")
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
            let rect = Rect {
                x: area.x + 2,
                y: area.y + area.height.saturating_sub(2),
                width: area.width.saturating_sub(4),
                height: 1,
            };
            frame.render_widget(hint, rect);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter edit date  m metric  g area  t smoothing  l log  r refresh  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn fmt_bound(d: Option<NaiveDate>) -> String {
    d.map(|d| d.to_string()).unwrap_or_else(|| "open".to_string())
}

/// Chart-ready data for one selection; x is the day offset from `start`.
#[derive(Debug, Clone, PartialEq)]
struct ChartData {
    segments: Vec<Vec<(f64, f64)>>,
    points: Vec<(f64, f64)>,
    start: NaiveDate,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// Build chart series for Plotters, or `None` when nothing is plottable.
fn chart_data(shown: &SeriesView, raw: &SeriesView, log_scale: bool) -> Option<ChartData> {
    let start = *shown.dates.first()?;
    let scale = |v: i64| {
        let v = v as f64;
        if log_scale { (v.max(0.0) + 1.0).log10() } else { v }
    };

    let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for (i, v) in shown.values.iter().enumerate() {
        match v {
            Some(v) => current.push((i as f64, scale(*v))),
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    let points: Vec<(f64, f64)> = raw
        .values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i as f64, scale(v))))
        .collect();

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(_, y) in segments.iter().flatten().chain(&points) {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        return None;
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);

    let last = (shown.dates.len().max(2) - 1) as f64;
    Some(ChartData {
        segments,
        points,
        start,
        x_bounds: [0.0, last],
        y_bounds: [y_min - pad, y_max + pad],
    })
}

fn fmt_axis_y(v: f64) -> String {
    format!("{v:.0}")
}

fn fmt_axis_y_log(v: f64) -> String {
    format!("{:.0}", (10f64.powf(v) - 1.0).max(0.0))
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    data: &ChartData,
    fmt_y: fn(f64) -> String,
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);
    let [x0, x1] = data.x_bounds;
    let [y0, y1] = data.y_bounds;

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_day(data.start, x0 + u * (x1 - x0));
        let label_len = label.len() as u16;
        let start = x.saturating_sub(label_len / 2);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_y(y0 + u * (y1 - y0));
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label_len);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("date")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::domain::{GeoSeries, SkipLast};
    use crate::service::testing::{ScriptedSource, west_flanders_day};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn snapshot() -> Arc<Snapshot> {
        let dates: Vec<NaiveDate> = (1..=10).map(d).collect();
        let mut cases = GeoSeries::new();
        cases.insert("BE".into(), (1..=10).map(Some).collect());
        cases.insert("WV".into(), vec![Some(1); 10]);
        let mut deaths = GeoSeries::new();
        deaths.insert("BE".into(), vec![Some(0); 10]);
        let series = BTreeMap::from([(Metric::NewCases, cases), (Metric::Deaths, deaths)]);
        Arc::new(Snapshot::assemble(Utc::now(), dates, series))
    }

    fn view(values: Vec<Option<i64>>) -> SeriesView {
        SeriesView {
            metric: Metric::NewCases,
            geo: "BE".into(),
            geo_name: "Belgium".into(),
            transform: Transform::Identity,
            dates: (1..=values.len() as u32).map(d).collect(),
            values,
        }
    }

    #[test]
    fn missing_points_split_segments() {
        let v = view(vec![Some(1), Some(2), None, Some(4)]);
        let data = chart_data(&v, &v, false).unwrap();
        assert_eq!(data.segments, vec![vec![(0.0, 1.0), (1.0, 2.0)], vec![(3.0, 4.0)]]);
        assert_eq!(data.points.len(), 3);
        assert_eq!(data.x_bounds, [0.0, 3.0]);
        assert!(data.y_bounds[0] < 1.0 && data.y_bounds[1] > 4.0);
    }

    #[test]
    fn all_missing_is_not_plottable() {
        let v = view(vec![None, None]);
        assert!(chart_data(&v, &v, false).is_none());
        assert!(chart_data(&view(vec![]), &view(vec![]), false).is_none());
    }

    #[test]
    fn log_scale_round_trips_through_axis_labels() {
        let v = view(vec![Some(0), Some(99)]);
        let data = chart_data(&v, &v, true).unwrap();
        assert_eq!(data.points[0].1, 0.0);
        assert!((data.points[1].1 - 2.0).abs() < 1e-12);
        assert_eq!(fmt_axis_y_log(2.0), "99");
    }

    #[test]
    fn switching_to_deaths_falls_back_to_country() {
        let mut app = App::new(snapshot(), None);
        app.geo = "WV";
        while app.metric != Metric::Deaths {
            app.handle_key(KeyCode::Char('m'));
        }
        assert_eq!(app.geo, ROOT);
    }

    #[test]
    fn geo_cycles_through_hierarchy_both_ways() {
        let mut app = App::new(snapshot(), None);
        let start = app.geo;
        app.cycle_geo(1);
        assert_ne!(app.geo, start);
        app.cycle_geo(-1);
        assert_eq!(app.geo, start);
        app.cycle_geo(-1);
        assert!(app.metric.hierarchy_kind().hierarchy().get(app.geo).is_some());
    }

    #[test]
    fn date_edit_applies_and_rejects() {
        let mut app = App::new(snapshot(), None);
        app.selected_field = FIELD_FROM;
        app.handle_key(KeyCode::Enter);
        for c in "2021-01-03".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.from, Some(d(3)));
        assert!(app.editing.is_none());

        app.selected_field = FIELD_TO;
        app.handle_key(KeyCode::Enter);
        for c in "2021-02-30".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.to, None);
        assert!(app.status.starts_with("Invalid date"), "{}", app.status);

        let shown = select(&app.snapshot, &app.query(Transform::Identity)).unwrap();
        assert_eq!(shown.dates.first(), Some(&d(3)));
    }

    #[test]
    fn refresh_without_aggregator_keeps_snapshot() {
        let mut app = App::new(snapshot(), None);
        let before = Arc::clone(&app.snapshot);
        assert!(!app.handle_key(KeyCode::Char('r')));
        assert!(Arc::ptr_eq(&before, &app.snapshot));
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    fn wait_for_refresh(app: &mut App) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !app.poll_refresh() {
            assert!(std::time::Instant::now() < deadline, "refresh never finished");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn refresh_runs_in_background_and_swaps_snapshot() {
        let source = ScriptedSource::new(vec![Ok(west_flanders_day(7))]);
        let aggregator = Arc::new(Aggregator::new(Box::new(source), SkipLast::uniform(0)));
        let mut app = App::new(snapshot(), Some(aggregator));

        assert!(!app.handle_key(KeyCode::Char('r')));
        assert!(app.status.starts_with("Refreshing"), "{}", app.status);
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.status, "Refresh already running.");

        wait_for_refresh(&mut app);
        assert!(app.pending.is_none());
        assert_eq!(app.snapshot.series(Metric::NewCases, "BE"), Some(&vec![Some(7)]));
        assert!(app.status.starts_with("refreshed"), "{}", app.status);
    }

    #[test]
    fn failed_background_refresh_keeps_snapshot() {
        let source = ScriptedSource::new(vec![Err(FeedError::Unavailable("down".into()))]);
        let aggregator = Arc::new(Aggregator::new(Box::new(source), SkipLast::uniform(0)));
        let mut app = App::new(snapshot(), Some(aggregator));
        let before = Arc::clone(&app.snapshot);

        app.handle_key(KeyCode::Char('r'));
        wait_for_refresh(&mut app);
        assert!(Arc::ptr_eq(&before, &app.snapshot));
        assert!(app.status.starts_with("Refresh failed"), "{}", app.status);
    }
}
