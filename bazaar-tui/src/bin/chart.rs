//! Live terminal chart over the `.dat` series a running `bazaarbot` writes.
//!
//! ## Usage
//!
//! ```bash
//! bazaar-chart --chart-dir ./chart-data --fps 4
//! ```
//!
//! ## Keyboard controls
//!
//! - `q` or `Ctrl-C` -- quit
//! - `1`-`6` -- focus a single commodity (`0` returns to the full grid)

use anyhow::Result;
use bazaar_core::chart;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const COMMODITIES: &[&str] = &["food", "fertilizer", "wood", "ore", "metal", "tools"];

#[derive(Parser, Debug)]
#[command(about = "Live chart of a running bazaarbot simulation")]
struct Args {
    /// Directory bazaarbot is writing its per-commodity `.dat` series to.
    #[arg(long, default_value = "./chart-data")]
    chart_dir: PathBuf,

    /// Redraw/refresh rate, in frames per second.
    #[arg(long, default_value_t = 4)]
    fps: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &args);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {err:?}");
    }
    Ok(())
}

struct App {
    focus: Option<usize>,
    series: Vec<Vec<(f64, f64)>>,
}

impl App {
    fn new() -> Self {
        Self {
            focus: None,
            series: vec![Vec::new(); COMMODITIES.len()],
        }
    }

    fn refresh(&mut self, dir: &PathBuf) {
        for (i, commodity) in COMMODITIES.iter().enumerate() {
            let points = chart::read_series(dir, commodity).unwrap_or_default();
            self.series[i] = points
                .iter()
                .map(|p| (p.timestamp_ms as f64, p.value))
                .collect();
        }
    }
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, args: &Args) -> Result<()> {
    let mut app = App::new();
    let tick_rate = Duration::from_millis(1000 / args.fps.max(1) as u64);
    let mut last_tick = Instant::now();
    app.refresh(&args.chart_dir);

    loop {
        terminal.draw(|f| ui(f, &app))?;

        let timeout = tick_rate.checked_sub(last_tick.elapsed()).unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('0') => app.focus = None,
                    KeyCode::Char(c) if c.is_ascii_digit() => {
                        let n = c.to_digit(10).unwrap() as usize;
                        if n >= 1 && n <= COMMODITIES.len() {
                            app.focus = Some(n - 1);
                        }
                    }
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.refresh(&args.chart_dir);
            last_tick = Instant::now();
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    match app.focus {
        Some(i) => render_single(f, f.area(), i, app),
        None => render_grid(f, app),
    }
}

fn render_grid(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(33); 3])
        .split(f.area());
    for (row_idx, row) in rows.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(*row);
        for (col_idx, area) in cols.iter().enumerate() {
            let idx = row_idx * 2 + col_idx;
            if idx < COMMODITIES.len() {
                render_single(f, *area, idx, app);
            }
        }
    }
}

fn render_single(f: &mut Frame, area: Rect, idx: usize, app: &App) {
    let commodity = COMMODITIES[idx];
    let data = &app.series[idx];

    let (x_min, x_max) = bounds(data.iter().map(|(x, _)| *x));
    let (y_min, y_max) = bounds(data.iter().map(|(_, y)| *y));

    let dataset = Dataset::default()
        .name(commodity)
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(data);

    let chart = Chart::new(vec![dataset])
        .block(Block::default().title(commodity).borders(Borders::ALL))
        .x_axis(Axis::default().bounds([x_min, x_max]).labels(vec![Span::raw("")]))
        .y_axis(
            Axis::default()
                .bounds([y_min, y_max])
                .labels(vec![Span::raw(format!("{y_min:.1}")), Span::raw(format!("{y_max:.1}"))]),
        );

    f.render_widget(chart, area);
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    let mut any = false;
    for v in values {
        any = true;
        min = min.min(v);
        max = max.max(v);
    }
    if !any {
        return (0.0, 1.0);
    }
    if (max - min).abs() < f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }
    (min, max)
}
