mod middle;
mod shared;
mod tui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stepcode::engine::Engine;
use stepcode::evaluator::{EvalCommand, ProgramFileEvaluator, dispatch};
use stepcode::pipeline::{config, persistence};

use middle::Middle;
use shared::InputEvent;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// raw mode owns the terminal, so logs go to a file
fn init_logging(project_dir: &Path, filter: &str) -> anyhow::Result<()> {
    let path = persistence::log_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::options().create(true).append(true).open(&path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let project_dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let config = config::load_config(&project_dir);
    init_logging(&project_dir, &config.log_filter)?;
    info!(project = %project_dir.display(), "starting");

    let engine = match persistence::load_project(&project_dir) {
        Some(state) => state.into_engine(config.engine.clone()),
        None => Engine::new(config.engine.clone()),
    };
    let mut middle = Middle::new(engine, project_dir.clone());
    let mut program_out =
        ProgramFileEvaluator::start(persistence::program_file_path(&project_dir))?;

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    crossterm::execute!(std::io::stdout(), terminal::EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps
    let mut last_tick = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let ds = middle.display_state();
        tui_state.sync(&ds);

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds);
        })?;

        let events = tui::input::poll_input(tick_rate, &tui_state)?;
        for event in events {
            if event == InputEvent::Quit {
                // save before quitting
                middle.shutdown();
                dispatch(&mut program_out, EvalCommand::Stop).ok();
                info!("quit");
                return Ok(());
            }
            let cmds = middle.handle_input(event);
            send_all(&mut program_out, &mut middle, cmds);
        }

        while let Some(report) = program_out.poll_report() {
            middle.on_eval_report(report);
        }

        let elapsed = last_tick.elapsed().as_secs_f64();
        last_tick = Instant::now();
        let cmds = middle.tick(elapsed);
        send_all(&mut program_out, &mut middle, cmds);

        middle.autosave();
    }
}

fn send_all(
    program_out: &mut ProgramFileEvaluator,
    middle: &mut Middle,
    cmds: Vec<EvalCommand>,
) {
    for cmd in cmds {
        if let Err(e) = dispatch(program_out, cmd) {
            middle.on_eval_error(e);
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(std::io::stdout(), terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
