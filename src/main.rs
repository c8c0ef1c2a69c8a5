//! rtop — an interactive, full-screen process and resource monitor.

mod actions;
mod app;
mod cli;
mod disk_table;
mod error;
mod fields;
mod function_bar;
mod incremental_input;
mod info_screen;
mod meter;
mod panel;
mod platform;
mod process;
mod process_table;
mod rich_string;
mod sampling;
mod screen_manager;
mod settings;
mod sort_filter;
mod ui;
mod user_table;

use std::io;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind};
use crossterm::execute;

use actions::KeyKind;
use app::App;
use cli::{Cli, CliError};
use error::AppError;
use fields::DEFAULT_FIELDS;
use panel::PanelKey;
use screen_manager::{classify_mouse, PanelEvent};

/// How long a single poll waits for input before ticking state anyway.
/// Independent of `settings.delay`: the scheduling clock inside `App`
/// decides whether a tick actually triggers a rescan.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let opts = match cli::resolve(cli) {
        Ok(opts) => opts,
        Err(CliError::ListColumns) => {
            for field in DEFAULT_FIELDS {
                println!("{}", field.header_label());
            }
            std::process::exit(0);
        }
        Err(CliError::Usage(msg)) => {
            eprintln!("rtop: {msg}");
            std::process::exit(-1);
        }
    };

    let mut app = match App::new(opts) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("rtop: {err}");
            std::process::exit(err.exit_code());
        }
    };

    let mouse_enabled = app.settings.use_mouse;
    if mouse_enabled {
        let _ = execute!(io::stdout(), EnableMouseCapture);
    }

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut app);
    ratatui::restore();

    if mouse_enabled {
        let _ = execute!(io::stdout(), DisableMouseCapture);
    }

    if let Err(err) = result {
        eprintln!("rtop: {err}");
        std::process::exit(AppError::TerminalInit(err).exit_code());
    }
}

fn run(terminal: &mut ratatui::DefaultTerminal, app: &mut App) -> io::Result<()> {
    while app.running {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key_event(app, key.code, key.modifiers),
                Event::Mouse(mouse) => handle_mouse_event(app, mouse),
                _ => {}
            }
        }

        app.tick();
    }
    Ok(())
}

fn handle_key_event(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if !app.info_stack.is_empty() {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => {
                app.info_stack.pop();
            }
            KeyCode::Down => {
                if let Some(screen) = app.info_stack.last_mut() {
                    screen.selected = (screen.selected + 1).min(screen.lines.len().saturating_sub(1));
                }
            }
            KeyCode::Up => {
                if let Some(screen) = app.info_stack.last_mut() {
                    screen.selected = screen.selected.saturating_sub(1);
                }
            }
            _ => {}
        }
        return;
    }

    if let Some(panel_key) = to_panel_key(code) {
        app.handle_panel_key(panel_key, 1);
        return;
    }

    let Some(key_kind) = to_key_kind(code, modifiers) else { return };
    app.handle_key(key_kind);
}

fn to_panel_key(code: KeyCode) -> Option<PanelKey> {
    Some(match code {
        KeyCode::Down => PanelKey::Down,
        KeyCode::Up => PanelKey::Up,
        KeyCode::Left => PanelKey::Left,
        KeyCode::Right => PanelKey::Right,
        KeyCode::PageUp => PanelKey::PageUp,
        KeyCode::PageDown => PanelKey::PageDown,
        KeyCode::Home => PanelKey::Home,
        KeyCode::End => PanelKey::End,
        _ => return None,
    })
}

fn to_key_kind(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyKind> {
    Some(match code {
        KeyCode::Char(' ') => KeyKind::Space,
        KeyCode::Char(c) if modifiers.contains(KeyModifiers::CONTROL) => KeyKind::Ctrl(c.to_ascii_uppercase()),
        KeyCode::Char(c) => KeyKind::Char(c),
        KeyCode::F(n) => KeyKind::Function(n),
        KeyCode::Esc => KeyKind::Esc,
        KeyCode::Backspace => KeyKind::Backspace,
        KeyCode::Enter => KeyKind::Enter,
        _ => return None,
    })
}

fn handle_mouse_event(app: &mut App, mouse: crossterm::event::MouseEvent) {
    if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
        return;
    }
    let has_header = true;
    let body_rows = app.panel.len().min(u16::MAX as usize) as u16;
    match classify_mouse(mouse.row, mouse.column, has_header, body_rows) {
        PanelEvent::BodyClick(row) => {
            app.panel.set_selected(row as usize);
        }
        PanelEvent::BarClick(col) => {
            if let Some(key) = app.function_bar.synthesize_event(col as usize, 8) {
                if let Ok(n) = u8::try_from(key) {
                    app.handle_key(KeyKind::Function(n));
                }
            }
        }
        PanelEvent::HeaderClick(_) => {}
    }
}
