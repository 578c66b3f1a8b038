use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

use warming_atlas::{
    format_delta, AnomalyAtlas, AtlasConfig, InfoPanel, MapInstance, MapOptions, PlaybackState,
    RenderTarget, MAX_YEAR, MIN_YEAR,
};

/// Event poll timeout while playback is stopped
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Longest number-field entry ("2015")
const MAX_INPUT_LEN: usize = 4;

// ============================================================================
// RENDER TARGET
// ============================================================================

/// Keeps the latest frame + info payload until the next draw
#[derive(Default)]
pub struct TerminalTarget {
    pub frame: Option<warming_atlas::Frame>,
    pub info: Option<InfoPanel>,
}

impl RenderTarget for TerminalTarget {
    fn paint(&mut self, frame: &warming_atlas::Frame) {
        self.frame = Some(frame.clone());
    }

    fn show_info(&mut self, info: Option<&InfoPanel>) {
        self.info = info.cloned();
    }
}

// ============================================================================
// APP
// ============================================================================

pub struct App {
    pub map: MapInstance,
    pub target: Rc<RefCell<TerminalTarget>>,
    pub state: TableState,
    /// Digits typed but not yet committed to the number field
    pub input: String,
}

impl App {
    pub fn new(atlas: AnomalyAtlas, config: &AtlasConfig) -> Result<Self> {
        let target = Rc::new(RefCell::new(TerminalTarget::default()));
        let map = MapInstance::new(Rc::new(atlas), target.clone(), MapOptions::from(config))?;

        let mut state = TableState::default();
        if !map.atlas().features().is_empty() {
            state.select(Some(0));
        }

        Ok(App {
            map,
            target,
            state,
            input: String::new(),
        })
    }

    pub fn next(&mut self) {
        let len = self.map.atlas().features().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.map.atlas().features().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Enter commits typed digits; with nothing typed it toggles the row
    pub fn enter(&mut self) {
        if !self.input.is_empty() {
            self.map.number_field().input(&self.input);
            self.input.clear();
            return;
        }

        let id = self
            .state
            .selected()
            .and_then(|i| self.map.atlas().features().get(i))
            .map(|resolved| resolved.feature.id.clone());

        if let Some(id) = id {
            self.map.click(&id);
        }
    }

    pub fn escape(&mut self) {
        if self.input.is_empty() {
            self.map.selection().clear();
        } else {
            self.input.clear();
        }
    }

    /// Returns false when the app should quit
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        let step = if key.modifiers.contains(KeyModifiers::SHIFT) { 10 } else { 1 };

        match key.code {
            KeyCode::Char('q') => return false,
            KeyCode::Esc => self.escape(),
            KeyCode::Enter => self.enter(),
            KeyCode::Char(' ') => {
                self.map.playback().toggle(now);
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.input.len() < MAX_INPUT_LEN {
                    self.input.push(c);
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.map.slider().nudge(-step);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.map.slider().nudge(step);
            }
            KeyCode::F(n @ 1..=9) => {
                self.map.presets().press(n as usize - 1);
            }
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::Home => self.state.select(Some(0)),
            KeyCode::End => {
                let len = self.map.atlas().features().len();
                if len > 0 {
                    self.state.select(Some(len - 1));
                }
            }
            _ => {}
        }
        true
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        app.map.poll(Instant::now());
        terminal.draw(|f| ui(f, app))?;

        // Wake up for the next playback deadline even without input
        let timeout = app
            .map
            .playback()
            .time_until_next(Instant::now())
            .unwrap_or(IDLE_POLL);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(key, Instant::now()) {
                    return Ok(());
                }
            }
        }
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Timeline
            Constraint::Length(3), // Number field + presets
            Constraint::Min(0),    // Feature table + info
            Constraint::Length(3), // Legend
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_timeline(f, chunks[0], app);
    render_controls(f, chunks[1], app);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(65), // Features
            Constraint::Percentage(35), // Info panel
        ])
        .split(chunks[2]);

    render_table(f, content_chunks[0], app);
    render_info_panel(f, content_chunks[1], app);
    render_legend(f, chunks[3], app);
    render_status_bar(f, chunks[4], app);
}

fn rgb(color: warming_atlas::Color) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

fn render_timeline(f: &mut Frame, area: Rect, app: &App) {
    let slider = app.map.slider();

    let (title_color, state_label) = match app.map.playback().state() {
        PlaybackState::Playing => (Color::Green, "▶ playing"),
        PlaybackState::Stopped => (Color::DarkGray, "⏸ stopped"),
    };

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(Span::styled(
                    format!(" {} – {}  {} ", MIN_YEAR, MAX_YEAR, state_label),
                    Style::default().fg(title_color),
                )),
        )
        .gauge_style(Style::default().fg(Color::Yellow).bg(Color::Black))
        .ratio(slider.ratio().clamp(0.0, 1.0))
        .label(Span::styled(
            slider.position().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));

    f.render_widget(gauge, area);
}

fn render_controls(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(0)])
        .split(area);

    // Number field: typed digits while editing, otherwise the cursor's text
    let (text, style) = if app.input.is_empty() {
        (app.map.number_field().text(), Style::default().fg(Color::White))
    } else {
        (
            format!("{}_", app.input),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )
    };

    let field = Paragraph::new(Line::from(Span::styled(text, style)))
        .block(Block::default().borders(Borders::ALL).title(" Year "));
    f.render_widget(field, chunks[0]);

    let presets = app.map.presets();
    let mut spans = vec![];
    for (i, year) in presets.presets().iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }

        let style = if presets.active() == Some(i) {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        spans.push(Span::styled(format!("F{} {}", i + 1, year), style));
    }

    let buttons = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" Presets "));
    f.render_widget(buttons, chunks[1]);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["", "Feature", "Entity", "Δ vs 1900"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let target = app.target.borrow();
    let styles = target
        .frame
        .as_ref()
        .map(|frame| frame.features.as_slice())
        .unwrap_or_default();

    let rows = styles.iter().map(|style| {
        let text = if style.opacity < 1.0 {
            Style::default().fg(Color::DarkGray)
        } else if style.stroke_width > warming_atlas::render::STROKE_WIDTH {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };

        let cells = vec![
            Cell::from("██").style(Style::default().fg(rgb(style.fill))),
            Cell::from(style.id.clone()).style(text),
            Cell::from(truncate(&style.canonical, 32)).style(text),
            Cell::from(format_delta(style.delta)).style(text),
        ];

        Row::new(cells).height(1)
    });

    let year = target.frame.as_ref().map(|frame| frame.year).unwrap_or(MIN_YEAR);

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(10),
            Constraint::Length(34),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Countries · {} ", year)),
    )
    .highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_info_panel(f: &mut Frame, area: Rect, app: &App) {
    let target = app.target.borrow();

    let lines = match &target.info {
        Some(info) => {
            let delta_color = match info.delta {
                Some(_) => rgb(app.map.atlas().scale().color_or_no_data(info.delta)),
                None => Color::DarkGray,
            };
            vec![
                Line::from(Span::styled(
                    info.name.clone(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(vec![
                    Span::styled("Year:  ", Style::default().fg(Color::Yellow)),
                    Span::raw(info.year.to_string()),
                ]),
                Line::from(vec![
                    Span::styled("Delta: ", Style::default().fg(Color::Yellow)),
                    Span::styled(
                        info.delta_text.clone(),
                        Style::default().fg(delta_color).add_modifier(Modifier::BOLD),
                    ),
                ]),
            ]
        }
        None => vec![Line::from(Span::styled(
            "Select a country (Enter)",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Info "),
    );

    f.render_widget(panel, area);
}

fn render_legend(f: &mut Frame, area: Rect, app: &App) {
    let scale = app.map.atlas().scale();
    let [low, high] = scale.domain();

    let mut spans = vec![Span::raw(format!("{:+.2}°C ", low))];
    for stop in scale.legend(11) {
        spans.push(Span::styled("███", Style::default().fg(rgb(stop.color))));
    }
    spans.push(Span::raw(format!(" {:+.2}°C   ", high)));
    spans.push(Span::styled("███", Style::default().fg(rgb(scale.no_data_color()))));
    spans.push(Span::raw(" no data"));

    let legend = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" Legend "));

    f.render_widget(legend, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.map.atlas().features().len();
    let report = app.map.atlas().report();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    if !report.is_complete() {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("{} unmatched", report.unmatched.len()),
            Style::default().fg(Color::Red),
        ));
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("←/→", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Year | "));
    status_spans.push(Span::styled("0-9 Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Jump | "));
    status_spans.push(Span::styled("F1-F4", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Presets | "));
    status_spans.push(Span::styled("Space", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Play | "));
    status_spans.push(Span::styled("↑/↓ Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Select | "));
    status_spans.push(Span::styled("Esc", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Clear | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Quit"));

    let status = Paragraph::new(Line::from(status_spans))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warming_atlas::{GeoFeature, TemperatureRecord};

    fn app() -> App {
        let records = vec![
            TemperatureRecord::new("United States", 1900, Some(10.0)),
            TemperatureRecord::new("United States", 2000, Some(11.5)),
            TemperatureRecord::new("France", 1900, Some(10.0)),
        ];
        let features = vec![
            GeoFeature::new("USA", "United States of America"),
            GeoFeature::new("FRA", "France"),
        ];
        let atlas = AnomalyAtlas::build(features, &records).unwrap();
        App::new(atlas, &AtlasConfig::default()).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE), Instant::now())
    }

    #[test]
    fn test_digits_then_enter_commit_year() {
        let mut app = app();

        for c in "2000".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        assert_eq!(app.map.cursor().get(), 1900);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.map.cursor().get(), 2000);
        assert!(app.input.is_empty());
        assert_eq!(app.target.borrow().frame.as_ref().unwrap().year, 2000);
    }

    #[test]
    fn test_enter_selects_row_and_escape_clears() {
        let mut app = app();

        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('0'));
        press(&mut app, KeyCode::Char('0'));
        press(&mut app, KeyCode::Char('0'));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);

        let info = app.target.borrow().info.clone().unwrap();
        assert_eq!(info.name, "United States");
        assert_eq!(info.delta_text, "+1.50°C");

        press(&mut app, KeyCode::Esc);
        assert!(app.target.borrow().info.is_none());
    }

    #[test]
    fn test_arrows_presets_and_playback() {
        let mut app = app();

        press(&mut app, KeyCode::Right);
        assert_eq!(app.map.cursor().get(), 1901);

        press(&mut app, KeyCode::F(3));
        assert_eq!(app.map.cursor().get(), 2000);

        press(&mut app, KeyCode::Char(' '));
        assert!(app.map.playback().is_playing());

        press(&mut app, KeyCode::Left);
        assert!(!app.map.playback().is_playing());
        assert_eq!(app.map.cursor().get(), 1999);
    }

    #[test]
    fn test_quit_key() {
        let mut app = app();
        assert!(press(&mut app, KeyCode::Down));
        assert!(!press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("France", 10), "France");
        assert_eq!(truncate("Congo (Democratic Republic Of The)", 10), "Congo (...");
    }
}
