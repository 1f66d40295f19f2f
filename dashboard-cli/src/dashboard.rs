use crate::{export::write_export, source::Source, Error, Runner};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use firewatch_telemetry::{
    export::CSV_HEADER,
    severity::{DANGER_THRESHOLD, WARNING_THRESHOLD},
    Node, NodeStatus, Reading, SeverityBand, Snapshot, TargetZone, TelemetryProcessor,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Row, Table, TableState},
    DefaultTerminal, Frame,
};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use strum::IntoEnumIterator;
use tokio::sync::mpsc::Receiver;

#[derive(Parser)]
pub(super) struct Cli {
    /// Poll the database every n milliseconds
    #[arg(long, default_value_t = 5000)]
    interval: u64,

    /// Directory to write exported CSV files to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Debug)]
enum Update {
    Snapshot(NaiveDate, Snapshot),
    PollFailed(String),
}

struct App {
    zone: TargetZone,
    today: NaiveDate,
    snapshot: Option<Snapshot>,
    updated: Option<DateTime<Utc>>,

    /// Latched when an alert is raised, until acknowledged.
    alert_pending: bool,

    status: Option<String>,
    table_state: TableState,
}

impl App {
    fn new(zone: TargetZone) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));

        Self {
            zone,
            today: zone.today(),
            snapshot: None,
            updated: None,
            alert_pending: false,
            status: None,
            table_state,
        }
    }

    fn next(&mut self) {
        self.table_state.scroll_down_by(1);
    }

    fn previous(&mut self) {
        self.table_state.scroll_up_by(1);
    }

    fn acknowledge(&mut self) {
        self.alert_pending = false;
    }

    fn update(&mut self, update: Update) {
        match update {
            Update::Snapshot(today, snapshot) => {
                if snapshot.should_alert {
                    self.alert_pending = true;
                }

                self.today = today;
                self.snapshot = Some(snapshot);
                self.updated = Some(Utc::now());
                self.status = None;
            }
            Update::PollFailed(e) => self.status = Some(format!("Poll failed: {e}")),
        }
    }

    async fn export(&mut self, dir: &Path) {
        let Some(snapshot) = &self.snapshot else {
            self.status = Some("Nothing to export yet".to_string());
            return;
        };

        let export = snapshot.export(self.today, &self.zone);

        self.status = Some(match write_export(&export, dir).await {
            Ok(path) => format!("Exported {} readings to {}", export.rows, path.display()),
            Err(e) => format!("Export failed: {e}"),
        });
    }

    fn draw(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Percentage(40),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.draw_banner(f, chunks[0]);
        self.draw_nodes(f, chunks[1]);
        self.draw_charts(f, chunks[2]);
        self.draw_table(f, chunks[3]);
        self.draw_footer(f, chunks[4]);
    }

    fn draw_banner(&self, f: &mut Frame, area: Rect) {
        let line = match &self.snapshot {
            None => Line::from("Waiting for first poll"),
            Some(Snapshot {
                latest: Some(latest),
                band: Some(band),
                ..
            }) => {
                let style = Style::default()
                    .fg(band_colour(*band))
                    .add_modifier(Modifier::BOLD);

                let mut spans = vec![Span::styled(
                    format!("Fire severity {}% ({band})", latest.fire_severity),
                    style,
                )];

                if self.alert_pending {
                    spans.push(Span::raw("  "));
                    spans.push(Span::styled(
                        "ALERT, press 'a' to acknowledge",
                        style.add_modifier(Modifier::REVERSED),
                    ));
                }

                Line::from(spans)
            }
            Some(_) => Line::from("No data"),
        };

        f.render_widget(
            Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Status")),
            area,
        );
    }

    fn draw_nodes(&self, f: &mut Frame, area: Rect) {
        let latest = self.snapshot.as_ref().and_then(|s| s.latest.as_ref());

        let spans: Vec<Span> = Node::iter()
            .flat_map(|node| {
                let status = latest.map(|r| r.node(node)).unwrap_or_default();
                [
                    Span::styled(
                        format!(" {node}: {status} "),
                        Style::default().fg(Color::Black).bg(status_colour(status)),
                    ),
                    Span::raw(" "),
                ]
            })
            .collect();

        f.render_widget(
            Paragraph::new(Line::from(spans))
                .block(Block::default().borders(Borders::ALL).title("Nodes")),
            area,
        );
    }

    fn draw_charts(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let readings = self.readings();

        let temperatures = series(readings, &self.zone, |r| r.average_temperature);
        let (low, high) = padded_bounds(&temperatures, 1.0).unwrap_or((0.0, 50.0));

        let temperature_chart = Chart::new(vec![Dataset::default()
            .name("Average")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(&temperatures)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Temperature (°C)"),
        )
        .x_axis(time_axis())
        .y_axis(
            Axis::default()
                .bounds([low, high])
                .labels(vec![format!("{low:.1}"), format!("{high:.1}")]),
        );

        f.render_widget(temperature_chart, chunks[0]);

        let severities = series(readings, &self.zone, |r| r.fire_severity);
        let warning = [(0.0, WARNING_THRESHOLD), (24.0, WARNING_THRESHOLD)];
        let danger = [(0.0, DANGER_THRESHOLD), (24.0, DANGER_THRESHOLD)];

        let severity_chart = Chart::new(vec![
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(band_colour(SeverityBand::Warning)))
                .data(&warning),
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(band_colour(SeverityBand::Danger)))
                .data(&danger),
            Dataset::default()
                .name("Severity")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Magenta))
                .data(&severities),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Fire severity (%)"),
        )
        .x_axis(time_axis())
        .y_axis(
            Axis::default()
                .bounds([0.0, 100.0])
                .labels(vec!["0", "50", "100"]),
        );

        f.render_widget(severity_chart, chunks[1]);
    }

    fn draw_table(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Readings for {}", self.today));

        let Some(snapshot) = self.snapshot.as_ref().filter(|s| !s.readings.is_empty()) else {
            f.render_widget(Paragraph::new("No data").block(block), area);
            return;
        };

        let header = Row::new(CSV_HEADER).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::UNDERLINED),
        );

        let rows: Vec<Row> = snapshot
            .rows(&self.zone)
            .into_iter()
            .zip(&snapshot.readings)
            .map(|(row, reading)| {
                Row::new(row.columns())
                    .style(Style::default().fg(band_colour(reading.severity_band())))
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(30),
                Constraint::Percentage(20),
                Constraint::Percentage(15),
                Constraint::Percentage(15),
                Constraint::Percentage(20),
            ],
        )
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().bg(Color::Blue).fg(Color::Black));

        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn draw_footer(&self, f: &mut Frame, area: Rect) {
        let mut text = "q quit | j/k scroll | a acknowledge | e export".to_string();

        if let Some(updated) = self.updated {
            text.push_str(&format!(
                " | updated {}",
                self.zone.localise(&updated).format("%H:%M:%S")
            ));
        }

        if let Some(status) = &self.status {
            text.push_str(&format!(" | {status}"));
        }

        f.render_widget(
            Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
            area,
        );
    }

    fn readings(&self) -> &[Reading] {
        self.snapshot
            .as_ref()
            .map(|s| s.readings.as_slice())
            .unwrap_or_default()
    }
}

fn band_colour(band: SeverityBand) -> Color {
    match band {
        SeverityBand::Safe => Color::Green,
        SeverityBand::Warning => Color::Yellow,
        SeverityBand::Danger => Color::Red,
    }
}

fn status_colour(status: NodeStatus) -> Color {
    match status {
        NodeStatus::Online => Color::Green,
        NodeStatus::Offline => Color::Red,
        NodeStatus::Unknown => Color::Gray,
    }
}

fn time_axis<'a>() -> Axis<'a> {
    Axis::default()
        .bounds([0.0, 24.0])
        .labels(vec!["00:00", "12:00", "24:00"])
}

/// Plots a value against the hour of the day it was read at.
fn series(
    readings: &[Reading],
    zone: &TargetZone,
    value: impl Fn(&Reading) -> f64,
) -> Vec<(f64, f64)> {
    readings
        .iter()
        .map(|r| {
            let hours =
                zone.localise(&r.timestamp).num_seconds_from_midnight() as f64 / 3600.0;
            (hours, value(r))
        })
        .collect()
}

fn padded_bounds(points: &[(f64, f64)], padding: f64) -> Option<(f64, f64)> {
    let mut values = points.iter().map(|(_, y)| *y);
    let first = values.next()?;

    let (low, high) = values.fold((first, first), |(low, high), y| (low.min(y), high.max(y)));
    Some((low - padding, high + padding))
}

impl Runner for Cli {
    async fn run(&self, source: Source, zone: TargetZone) -> Result<(), Error> {
        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let (exit_tx, mut exit_rx) = tokio::sync::watch::channel(false);
        let interval = Duration::from_millis(self.interval);

        // Poll for new readings
        let handle = tokio::spawn(async move {
            let mut processor = TelemetryProcessor::new(zone);
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let update = match source.fetch().await {
                            Ok(records) => {
                                let today = zone.today();
                                Update::Snapshot(today, processor.process(&records, today))
                            }
                            Err(e) => Update::PollFailed(e.to_string()),
                        };

                        if tx.send(update).await.is_err() {
                            return;
                        }
                    }
                    Ok(_) = exit_rx.changed() => {
                        return;
                    }
                }
            }
        });

        let mut app = App::new(zone);

        let mut terminal = ratatui::init();
        let result = self.ui_loop(&mut terminal, &mut app, &mut rx).await;
        ratatui::restore();

        let _ = exit_tx.send(true);
        let _ = handle.await;

        result
    }
}

impl Cli {
    async fn ui_loop(
        &self,
        terminal: &mut DefaultTerminal,
        app: &mut App,
        rx: &mut Receiver<Update>,
    ) -> Result<(), Error> {
        loop {
            terminal.draw(|f| app.draw(f))?;

            // Handle keyboard input
            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => break Ok(()),
                            KeyCode::Char('j') | KeyCode::Down => app.next(),
                            KeyCode::Char('k') | KeyCode::Up => app.previous(),
                            KeyCode::Char('a') => app.acknowledge(),
                            KeyCode::Char('e') => app.export(&self.output_dir).await,
                            _ => {}
                        }
                    }
                }
            }

            // Handle new snapshots
            while let Ok(update) = rx.try_recv() {
                app.update(update);
            }
        }
    }
}
