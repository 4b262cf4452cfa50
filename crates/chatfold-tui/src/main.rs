mod app;
mod bridge;
mod events;
mod pulse;
mod terminal;
mod ui;

use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tokio::sync::mpsc::UnboundedSender;

use chatfold_session::render::SessionControl;
use chatfold_session::runtime_config::load_config;

use app::App;
use events::UiMessage;
use pulse::PulseScheduler;
use terminal::TerminalGuard;

#[derive(Parser, Debug)]
#[command(name = "chatfold-tui", about = "Folded live chat feed")]
struct Args {
    /// Path to the config file (defaults to the XDG location).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Transcript file to follow, overriding the configured path.
    #[arg(long)]
    feed: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(feed) = args.feed {
        config.feed.path = feed;
    }

    let (ui_tx, ui_rx) = mpsc::channel();
    let control_tx = bridge::start(config.clone(), ui_tx.clone());
    let pulses = PulseScheduler::start(ui_tx.clone());
    spawn_input_thread(ui_tx);

    let mut guard = TerminalGuard::new().context("failed to initialize terminal")?;
    let mut app = App::new(&config.render);

    let result = run_app(&mut guard, &mut app, &ui_rx, &pulses, &control_tx);

    guard.restore().context("failed to restore terminal")?;
    result
}

fn run_app(
    guard: &mut TerminalGuard,
    app: &mut App,
    ui_rx: &mpsc::Receiver<UiMessage>,
    pulses: &PulseScheduler,
    control_tx: &UnboundedSender<SessionControl>,
) -> Result<()> {
    let mut now = Instant::now();
    guard.terminal_mut().draw(|frame| ui::draw(frame, app, now))?;

    while let Ok(message) = ui_rx.recv() {
        now = Instant::now();
        match message {
            UiMessage::Input(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => break,
                    KeyCode::Char(digit @ '1'..='9') => {
                        let slot = digit as usize - '1' as usize;
                        if let Some(key) = app.select_badge(slot) {
                            let _ = control_tx.send(SessionControl::ResetBadge { key });
                        }
                    }
                    _ => {}
                }
            }
            UiMessage::Input(_) => {}
            UiMessage::Render(command) => {
                if let Some(badge) = app.apply(command, now) {
                    pulses.schedule(badge, Duration::from_millis(app.pulse_ms));
                }
            }
            UiMessage::PulseExpired(badge) => app.expire_pulse(badge, now),
        }
        guard.terminal_mut().draw(|frame| ui::draw(frame, app, now))?;
    }

    Ok(())
}

/// Read terminal events on a dedicated thread; exits when the UI hangs up.
fn spawn_input_thread(ui_tx: Sender<UiMessage>) {
    thread::spawn(move || loop {
        match event::read() {
            Ok(event) => {
                if ui_tx.send(UiMessage::Input(event)).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

