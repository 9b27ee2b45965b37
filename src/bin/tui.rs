//! Gate Predict TUI - live view of a running prediction session
//!
//! Drives a session with the real-time ticker and displays:
//! - Venue map (gates, beacons, pedestrian and approach radius)
//! - Per-gate confidence with its proximity / vector / dwell breakdown
//! - Dispatch status (target gate, ETA, car status)
//! - Activity log, newest first
//!
//! Keys: s start, x stop, r reset, d random direction change, q quit

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gate_predict::domain::ActivityKind;
use gate_predict::infra::{Config, Metrics};
use gate_predict::services::movement::random_offset;
use gate_predict::services::{run_ticker, ticker, Session, SharedSession};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::canvas::{Canvas, Circle, Points},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Redraw cadence, independent of the simulation tick
const FRAME_RATE: Duration = Duration::from_millis(50);

/// Parse a `#RRGGBB` gate color, falling back to white
fn gate_color(hex: &str) -> Color {
    hex.parse::<Color>().unwrap_or(Color::White)
}

fn confidence_color(confidence: u8, threshold: u8) -> Color {
    if confidence > threshold {
        Color::Red
    } else if confidence >= threshold / 2 {
        Color::Yellow
    } else {
        Color::Green
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let config = Config::load(&args);
    let tick_interval = Duration::from_millis(config.tick_interval_ms());

    let metrics = Arc::new(Metrics::new());
    let session = ticker::shared(Session::with_metrics(config, metrics.clone()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ticker_handle =
        tokio::spawn(run_ticker(session.clone(), tick_interval, shutdown_rx, |_, _| {}));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(&mut terminal, &session, &metrics);

    let _ = shutdown_tx.send(true);
    let _ = ticker_handle.await;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &SharedSession,
    metrics: &Metrics,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::from_entropy();

    loop {
        {
            let s = session.lock();
            terminal.draw(|f| draw_ui(f, &s, metrics))?;
        }

        if event::poll(FRAME_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let mut s = session.lock();
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('s') => {
                        s.start();
                    }
                    KeyCode::Char('x') => {
                        s.stop();
                    }
                    KeyCode::Char('r') => s.reset(),
                    KeyCode::Char('d') => {
                        let offset = random_offset(&mut rng, s.config().perturb_max_degrees());
                        s.perturb_direction(offset);
                    }
                    _ => {}
                }
            }
        }
    }
}

fn draw_ui(f: &mut Frame, session: &Session, metrics: &Metrics) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Map + side panels
            Constraint::Length(12), // Activity log
        ])
        .split(f.area());

    draw_header(f, main_chunks[0], session, metrics);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main_chunks[1]);

    draw_map(f, middle[0], session);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(7)])
        .split(middle[1]);

    draw_confidence_panel(f, side[0], session);
    draw_dispatch_panel(f, side[1], session);
    draw_log_panel(f, main_chunks[2], session);
}

fn draw_header(f: &mut Frame, area: Rect, session: &Session, metrics: &Metrics) {
    let (status_text, status_color) =
        if session.is_running() { ("RUNNING", Color::Green) } else { ("STOPPED", Color::Red) };
    let ped = session.pedestrian();

    let header = Paragraph::new(Line::from(vec![
        Span::styled("Gate Predict ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("| "),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw(format!(" | Tick {} ", session.tick_count())),
        Span::raw(format!("| Heading {:.0}° ", ped.heading)),
        Span::raw("| Dispatches: "),
        Span::styled(format!("{}", metrics.dispatches_total()), Style::default().fg(Color::Yellow)),
        Span::raw(" | s start  x stop  r reset  d direction  q quit"),
    ]))
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(header, area);
}

fn draw_map(f: &mut Frame, area: Rect, session: &Session) {
    let config = session.config();
    let width = config.venue_width();
    let height = config.venue_height();
    let radius = config.scoring().approach_radius;
    let ped = session.pedestrian();
    // Venue y grows downward, canvas y grows upward
    let flip = |y: f64| height - y;

    let beacon_coords: Vec<(f64, f64)> =
        config.beacons().iter().map(|b| (b.position.x, flip(b.position.y))).collect();

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(" Venue ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .marker(Marker::Braille)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(move |ctx| {
            ctx.draw(&Points { coords: &beacon_coords, color: Color::DarkGray });

            for gate in config.gates() {
                let color = gate_color(&gate.color);
                let (x, y) = (gate.position.x, flip(gate.position.y));
                ctx.draw(&Circle { x, y, radius, color });
                ctx.print(x, y, Span::styled("■", Style::default().fg(color)));
            }

            ctx.layer();
            let (px, py) = (ped.position.x, flip(ped.position.y));
            let heading = ped.heading_rad();
            ctx.draw(&ratatui::widgets::canvas::Line {
                x1: px,
                y1: py,
                x2: px + heading.cos() * 30.0,
                y2: py - heading.sin() * 30.0,
                color: Color::Cyan,
            });
            ctx.print(px, py, Span::styled("●", Style::default().fg(Color::White)));
        });

    f.render_widget(canvas, area);
}

fn draw_confidence_panel(f: &mut Frame, area: Rect, session: &Session) {
    let config = session.config();
    let threshold = config.dispatch().trigger_threshold;
    let readings = session.gate_readings();

    let block = Block::default()
        .title(format!(" Gate Confidence (dispatch > {}%) ", threshold))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(2); readings.len().max(1)])
        .split(inner);

    for (reading, row) in readings.iter().zip(rows.iter()) {
        let name = config.gate(&reading.id).map(|g| g.name.as_str()).unwrap_or(reading.id.as_str());
        let in_zone = session.pedestrian().approach_zone.as_ref() == Some(&reading.id);
        let label = format!(
            "{}{} {}% (p{:.0} v{:.0} d{:.0})",
            name,
            if in_zone { " *" } else { "" },
            reading.confidence,
            reading.breakdown.proximity,
            reading.breakdown.vector,
            reading.breakdown.dwell,
        );
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(confidence_color(reading.confidence, threshold)))
            .ratio(f64::from(reading.confidence) / 100.0)
            .label(label);
        f.render_widget(gauge, *row);
    }
}

fn draw_dispatch_panel(f: &mut Frame, area: Rect, session: &Session) {
    let state = session.dispatch_state();
    let config = session.config();

    let lines = match (&state.target, state.eta_secs) {
        (Some(target), Some(eta)) if state.active => {
            let name = config.gate(target).map(|g| g.name.as_str()).unwrap_or(target.as_str());
            let status = state.car_status.map(|s| s.as_str().to_string()).unwrap_or_default();
            vec![
                Line::from(vec![
                    Span::styled("● ", Style::default().fg(Color::Green)),
                    Span::styled(name.to_string(), Style::default().add_modifier(Modifier::BOLD)),
                ]),
                Line::from(format!("ETA:     {}s", eta)),
                Line::from(format!("Status:  {}", status)),
                Line::from(Span::styled(
                    state.dispatch_id.map(|id| id.to_string()).unwrap_or_default(),
                    Style::default().fg(Color::DarkGray),
                )),
            ]
        }
        _ => vec![Line::from(Span::styled(
            "No car dispatched",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let panel = Paragraph::new(lines).block(
        Block::default()
            .title(" Dispatch ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );

    f.render_widget(panel, area);
}

fn draw_log_panel(f: &mut Frame, area: Rect, session: &Session) {
    let items: Vec<ListItem> = session
        .log()
        .iter()
        .map(|e| {
            let (icon, color) = match e.kind {
                ActivityKind::SimulationStarted => ("▶", Color::Green),
                ActivityKind::SimulationStopped => ("■", Color::Red),
                ActivityKind::DirectionChanged { .. } => ("↻", Color::Cyan),
                ActivityKind::DispatchTriggered { .. } => ("✓", Color::Yellow),
                ActivityKind::DispatchRedirected { .. } => ("↔", Color::Magenta),
            };
            ListItem::new(Line::from(vec![
                Span::styled(e.at.format("%H:%M:%S ").to_string(), Style::default().fg(Color::DarkGray)),
                Span::styled(icon, Style::default().fg(color)),
                Span::raw(format!(" {}", e.message)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Activity ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );

    f.render_widget(list, area);
}
