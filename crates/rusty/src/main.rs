use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::LevelFilter;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use rusty::{ui, App, Config};
use std::fs::{self, OpenOptions};
use std::{env, io, path::PathBuf, time::Duration};

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    let mut app = match App::new().await {
        Ok(app) => {
            log::info!("Application initialized");
            app
        }
        Err(e) => {
            eprintln!("Failed to start rusty: {:#}", e);
            return Err(e);
        }
    };

    // Optional file argument replaces today's transcript
    if let Some(arg) = env::args().nth(1) {
        let path = app.file_manager.resolve(&arg);
        match app.open_path(path).await {
            Ok(()) => {
                app.ui_state.set_info_message(format!("Opened {}", arg));
                log::info!("Loaded file from command line: {}", arg);
            }
            Err(e) => {
                log::error!("Failed to load file '{}': {}", arg, e);
                app.ui_state.set_error_message(e.to_string());
            }
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app).await;

    restore_terminal()?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("Application error: {:#}", err);
        eprintln!("rusty stopped with an error: {:#}", err);
    }

    Ok(())
}

/// Logs go to `<data dir>/rusty.log`; the terminal belongs to the UI.
fn init_logger() {
    let mut logger = env_logger::Builder::from_default_env();
    if env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
        logger.filter_module("rusty", LevelFilter::Debug);
        logger.filter_module("assistant", LevelFilter::Debug);
    }

    match open_log_file() {
        Ok(file) => {
            logger.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => eprintln!("Logging to stderr, log file unavailable: {}", e),
    }
    logger.init();
}

fn open_log_file() -> io::Result<fs::File> {
    let dir = Config::data_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no data directory"))?;
    fs::create_dir_all(&dir)?;
    let path: PathBuf = dir.join("rusty.log");
    OpenOptions::new().create(true).append(true).open(path)
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> Result<()> {
    let tick_rate = Duration::from_millis(app.config.tick_rate_ms);

    loop {
        app.tick();

        if let Err(e) = terminal.draw(|f| ui::draw(f, &mut app)) {
            log::error!("Terminal draw error: {}", e);
        }

        if app.should_quit() {
            log::info!("Application shutdown requested");
            break;
        }

        // Polling keeps request results flowing while no key is pressed
        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Err(e) = app.handle_key_event(key).await {
                        log::error!("Key event handling error: {}", e);
                        app.ui_state.set_error_message(e.to_string());
                    }
                }
                Event::Resize(width, height) => {
                    log::debug!("Terminal resized to {}x{}", width, height);
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Restore terminal to normal state
fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen)?;
    let _ = execute!(stdout, crossterm::cursor::Show);
    Ok(())
}
