use anyhow::{Context, Result};
use clap::Parser;
use maze_chase_core::{
    Cell, SimConfig, SimEvent, World,
    entity::{FixedKind, Hsv},
    map::{CellKind, parse_map},
};
use rand::{SeedableRng, rngs::StdRng};
use ratatui::{
    crossterm::{
        self,
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    collections::{HashMap, VecDeque},
    fs::File,
    io::{self, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Messages kept in the event log panel.
const EVENT_LOG_LEN: usize = 4;

#[derive(Parser, Debug)]
#[command(version, about = "Top-down terminal driver for the maze chase simulation", long_about = None)]
struct Args {
    /// Seed for map generation, spawning and wandering
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON file overriding any subset of the simulation parameters
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Text map to play instead of a generated one
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Write logs to this file (the terminal is taken by the UI)
    #[arg(short, long, value_name = "LOG_FILE")]
    log: Option<PathBuf>,

    /// Simulation ticks per second
    #[arg(long, default_value_t = 30)]
    tick_rate: u32,
}

struct App {
    /// The core simulation world.
    world: World,
    /// Recent notable events, newest last.
    messages: VecDeque<String>,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let config = match &args.config {
            Some(path) => load_config(path)?,
            None => SimConfig::default(),
        };
        let seed = args.seed.unwrap_or_else(rand::random);
        let rng = StdRng::seed_from_u64(seed);
        info!(seed, "starting session");

        let world = match &args.map {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading map file {}", path.display()))?;
                let grid = parse_map(&text)?;
                let mut world = World::from_grid(config, grid, rng)?;
                world.ensure_population();
                world
            }
            None => World::initialize(config, rng)?,
        };

        Ok(App {
            world,
            messages: VecDeque::with_capacity(EVENT_LOG_LEN),
            should_quit: false,
        })
    }

    /// Advances the simulation and records what happened.
    fn tick(&mut self, dt: f32) {
        for event in self.world.tick(dt) {
            let message = match event {
                SimEvent::PlayerStopped => "Bumped into a wall".to_string(),
                SimEvent::EnemyCaptured { enemy } => format!("Caught by enemy {enemy}! -10"),
                SimEvent::CapsuleCollected { .. } => "Energy capsule +5".to_string(),
                SimEvent::PathUnreachable { .. } | SimEvent::EnemyWandered { .. } => continue,
            };
            self.push_message(message);
        }
    }

    fn push_message(&mut self, message: String) {
        if self.messages.len() == EVENT_LOG_LEN {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    fn handle_key(&mut self, code: KeyCode) {
        let heading_step = self.world.config().heading_step;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Left => self.world.steer(heading_step),
            KeyCode::Right => self.world.steer(-heading_step),
            KeyCode::Char(' ') => self.world.toggle_moving(),
            KeyCode::Char('w') | KeyCode::Char('W') => {
                let step = self.world.config().nudge_step;
                self.world.nudge_forward(step);
            }
            KeyCode::Char('e') | KeyCode::Char('E') => self.world.refill_energy(),
            KeyCode::Char('r') | KeyCode::Char('R') => match self.world.regenerate() {
                Ok(report) if report.is_satisfied() => self.push_message("New maze".to_string()),
                Ok(report) => {
                    self.push_message(format!("New maze, short of {:?}", report.shortfalls))
                }
                Err(error) => self.push_message(format!("Regeneration failed: {error}")),
            },
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    if let Some(path) = &args.log {
        init_tracing(path)?;
    }

    // Build the world before touching the terminal so errors print normally
    let mut app = App::new(&args)?;

    let mut terminal = setup_terminal()?;
    let tick_rate = Duration::from_secs(1) / args.tick_rate.max(1);
    let result = run_app(&mut terminal, &mut app, tick_rate);
    restore_terminal(&mut terminal)?;
    result
}

fn load_config(path: &Path) -> Result<SimConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
}

fn init_tracing(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop: draw, poll input until the next tick is due, then
/// advance the simulation by the real elapsed time.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            app.tick(elapsed.as_secs_f32());
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Area for the map
            Constraint::Length(6), // Area for status and events
            Constraint::Length(2), // Area for help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], &app.world);
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new(
        "←/→ turn  space start/stop  w step  e refill  r new maze  q quit",
    )
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let player = app.world.player();
    let energy_ratio = f64::from(player.energy / app.world.config().energy_cap).clamp(0.0, 1.0);
    let status = vec![
        Line::from(format!("Score: {}", player.score)),
        Line::from(format!(
            "Moving: {}  Heading: {:.0}°",
            if player.moving { "ON" } else { "OFF" },
            player.heading
        )),
        Line::from(format!(
            "Enemies: {}  Capsules: {}",
            app.world.enemies().len(),
            app.world.capsules().len()
        )),
    ];
    let status_block = Block::default().borders(Borders::ALL).title("Player");
    let inner = status_block.inner(columns[0]);
    frame.render_widget(status_block, columns[0]);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(inner);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Yellow))
        .ratio(energy_ratio)
        .label(format!("Energy {:.0}", player.energy));
    frame.render_widget(gauge, rows[0]);
    frame.render_widget(Paragraph::new(status), rows[1]);

    let messages: Vec<ListItem> = app
        .messages
        .iter()
        .map(|message| ListItem::new(message.as_str()))
        .collect();
    let log = List::new(messages).block(Block::default().borders(Borders::ALL).title("Events"));
    frame.render_widget(log, columns[1]);
}

/// Renders the maze top-down, one character per cell.
fn render_map(frame: &mut Frame, area: Rect, world: &World) {
    let grid = world.grid();

    // Entities drawn over the terrain, later inserts win.
    let mut overlay: HashMap<Cell, Span> = HashMap::new();
    for capsule in world.capsules() {
        if let Some(cell) = capsule.position.cell() {
            overlay.insert(cell, Span::styled("*", Style::default().fg(Color::Yellow)));
        }
    }
    for enemy in world.enemies() {
        if let Some(cell) = enemy.position.cell() {
            overlay.insert(cell, Span::styled("e", Style::default().fg(hsv_color(enemy.color)).bold()));
        }
    }
    if let Some(cell) = world.player().cell() {
        let glyph = heading_glyph(world.player().heading);
        overlay.insert(cell, Span::styled(glyph, Style::default().fg(Color::Cyan).bold()));
    }
    let furniture: HashMap<Cell, FixedKind> = world
        .fixed_objects()
        .iter()
        .map(|object| (object.cell, object.kind))
        .collect();

    let mut lines: Vec<Line> = Vec::with_capacity(grid.height());
    for z in 0..grid.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(grid.width());
        for x in 0..grid.width() {
            let cell = Cell::new(x, z);
            if let Some(span) = overlay.get(&cell) {
                spans.push(span.clone());
                continue;
            }
            let kind = grid.kind_at(cell).unwrap_or_default();
            let (glyph, style) = match kind {
                CellKind::Empty | CellKind::PlayerSpawn => (" ", Style::default()),
                CellKind::WallHorizontal => ("─", Style::default().fg(Color::DarkGray)),
                CellKind::WallVertical => ("│", Style::default().fg(Color::DarkGray)),
                CellKind::Door => ("+", Style::default().fg(Color::LightRed)),
                CellKind::Window => ("=", Style::default().fg(Color::LightCyan)),
                CellKind::Fixed => {
                    let glyph = match furniture.get(&cell) {
                        Some(FixedKind::Chair) => "h",
                        Some(FixedKind::Table) => "T",
                        Some(FixedKind::Vase) | None => "v",
                    };
                    (glyph, Style::default().fg(Color::Rgb(153, 77, 51)))
                }
            };
            spans.push(Span::styled(glyph, style));
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Maze Chase").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

/// Arrow for the player's heading; 0° faces east, 90° faces up the screen.
fn heading_glyph(heading: f32) -> &'static str {
    match ((heading.rem_euclid(360.0) + 45.0) / 90.0) as u32 % 4 {
        0 => ">",
        1 => "^",
        2 => "<",
        _ => "v",
    }
}

fn hsv_color(hsv: Hsv) -> Color {
    let h = hsv.hue.rem_euclid(1.0) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let (s, v) = (hsv.saturation, hsv.value);
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);
    let (r, g, b) = match sector as u32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let byte = |channel: f32| (channel.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::Rgb(byte(r), byte(g), byte(b))
}
