use std::fs::File;
use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{backend::CrosstermBackend, prelude::*};
use simplelog::{Config, LevelFilter, WriteLogger};

mod api;
mod app;
mod session;
mod state;
mod ui;

use api::start_api_worker;
use app::App;
use session::{FileBackend, STATE_KEY, SessionStore};
use state::ViewState;

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal user grid over a paginated REST API")]
struct Args {
    /// Base URL of the users API
    #[arg(long, default_value = "http://localhost:5000")]
    url: String,

    /// Discard any persisted grid state and start from the defaults
    #[arg(long)]
    fresh: bool,

    /// Log file path
    #[arg(long, default_value = "user-grid.log")]
    log_file: String,
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = File::create(&args.log_file)
        .with_context(|| format!("failed to create log file {}", args.log_file))?;
    let _ = WriteLogger::init(LevelFilter::Debug, Config::default(), log_file);

    let backend = FileBackend::new()
        .unwrap_or_else(|| FileBackend::at(std::env::temp_dir().join("user-grid")));
    let mut session = SessionStore::new(Box::new(backend), STATE_KEY);
    if args.fresh {
        session.persist(&ViewState::initial());
    }

    // API worker channels
    let (req_tx, req_rx) = crossbeam_channel::unbounded::<api::ApiRequest>();
    let (resp_tx, resp_rx) = crossbeam_channel::unbounded::<api::ApiResponse>();

    let base_url = args.url.clone();
    std::thread::spawn(move || start_api_worker(base_url, req_rx, resp_tx));

    let mut terminal = setup_terminal()?;

    let mut app = App::new(session, req_tx, resp_rx);
    app.status =
        "arrows/hjkl move | PgUp/PgDn page | z page size | s sort | e edit | r reload | q quit"
            .into();

    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(100);

    let res = run_app(&mut terminal, &mut app, tick_rate, &mut last_tick);

    restore_terminal(terminal)?;
    if let Err(e) = res {
        eprintln!("Error: {e:?}");
    }
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tick_rate: Duration,
    last_tick: &mut Instant,
) -> Result<()> {
    // Redraw only when state changes or on tick
    let mut dirty = true;
    loop {
        // Drain API responses without blocking
        while let Ok(msg) = app.resp_rx.try_recv() {
            app.handle_api_response(msg);
            dirty = true;
        }

        // The view executes queued one-shot actions exactly once per queueing
        if app.run_pending_action() {
            dirty = true;
        }

        let tick_due = last_tick.elapsed() >= tick_rate;
        if dirty || tick_due {
            terminal.draw(|f| ui::draw(f, app))?;
            dirty = false;
            if tick_due {
                *last_tick = Instant::now();
            }
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_secs(0));

        if crossterm::event::poll(timeout)?
            && let Event::Key(key) = event::read()?
        {
            if app.edit.is_some() {
                handle_key_editing(app, key);
            } else {
                handle_key_normal(app, key);
            }
            dirty = true;
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key_normal(app: &mut App, key: crossterm::event::KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Up | KeyCode::Char('k') => app.move_cell_up(),
        KeyCode::Down | KeyCode::Char('j') => app.move_cell_down(),
        KeyCode::Left | KeyCode::Char('h') => app.move_cell_left(),
        KeyCode::Right | KeyCode::Char('l') => app.move_cell_right(),
        KeyCode::PageDown => app.next_page(),
        KeyCode::PageUp => app.prev_page(),
        KeyCode::Char('z') => app.cycle_page_size(),
        KeyCode::Char('s') => app.sort_on_selected_column(),
        KeyCode::Char('e') | KeyCode::Enter => app.open_edit(),
        KeyCode::Char('r') => app.reload(),
        _ => {}
    }
}

fn handle_key_editing(app: &mut App, key: crossterm::event::KeyEvent) {
    match key.code {
        KeyCode::Enter => app.save_edit(),
        KeyCode::Esc => app.cancel_edit(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.edit_switch_field(),
        KeyCode::Backspace => app.edit_backspace(),
        KeyCode::Delete => app.edit_delete(),
        KeyCode::Left => app.edit_left(),
        KeyCode::Right => app.edit_right(),
        KeyCode::Home => app.edit_home(),
        KeyCode::End => app.edit_end(),
        KeyCode::Char(c) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL) {
                app.edit_insert(c);
            }
        }
        _ => {}
    }
}
