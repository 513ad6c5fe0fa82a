pub mod app;
pub mod input;
pub mod ui;

use anyhow::Result;
use ratatui::{backend::CrosstermBackend, prelude::*};
use std::io::{self, Stdout};
use std::thread;
use std::time::Duration;

use crate::core::{
    bus::{Bus, LinkCommand},
    config::BrokerConfig,
    link,
};
use crate::tui::app::{App, LinkStatus};
use crate::tui::input::{map_dialog_key, map_key, Action, DialogAction};

pub fn start(cfg: BrokerConfig) -> Result<()> {
    log::info!("[TUI] flowdeck TUI starting...");

    // Channels between the UI loop and the broker link task.
    let (event_tx, event_rx) = flume::unbounded();
    let (cmd_tx, cmd_rx) = flume::unbounded();
    let bus = Bus::new(event_rx, cmd_tx);

    // The link runs its own single-threaded tokio runtime off the UI thread.
    let link_cfg = cfg.clone();
    let link_thread = thread::spawn(move || -> Result<()> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        rt.block_on(link::run(link_cfg, cmd_rx, event_tx))
    });

    // Setup terminal
    let mut stdout = io::stdout();
    crossterm::terminal::enable_raw_mode()?;
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(&mut stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, App::new(), &bus);

    // Restore terminal
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::LeaveAlternateScreen)?;
    crossterm::terminal::disable_raw_mode()?;

    // Intentional disconnect: the link exits without reconnecting.
    let _ = bus.cmd_tx.send(LinkCommand::Shutdown);
    match link_thread.join() {
        Ok(link_res) => link_res?,
        Err(_) => log::error!("[TUI] link thread panicked"),
    }

    res
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<&mut Stdout>>,
    mut app: App,
    bus: &Bus,
) -> Result<()> {
    loop {
        // Apply everything the link produced since the last pass.
        while let Ok(event) = bus.link_rx.try_recv() {
            app.apply_event(event);
        }

        terminal.draw(|f| ui::render_ui(f, &app))?;

        // Poll for input
        if crossterm::event::poll(Duration::from_millis(200))? {
            let evt = match crossterm::event::read() {
                Ok(e) => e,
                Err(e) => {
                    app.set_error(format!("input read error: {}", e));
                    continue;
                }
            };

            if let crossterm::event::Event::Key(key) = evt {
                // Only handle the initial key press event. Ignore Repeat and
                // Release so one physical press maps to one action.
                match key.kind {
                    crossterm::event::KeyEventKind::Press => {}
                    _ => continue,
                }

                if app.dialog.is_some() {
                    match map_dialog_key(key) {
                        DialogAction::Submit => {
                            if let Some(name) = app.submit_dialog() {
                                bus.cmd_tx.send(LinkCommand::CreateFlow(name))?;
                            }
                        }
                        DialogAction::Cancel => app.cancel_dialog(),
                        DialogAction::Backspace => app.dialog_backspace(),
                        DialogAction::Input(c) => {
                            // Filtered input: disallowed characters are dropped.
                            app.dialog_input_char(c);
                        }
                        DialogAction::None => {}
                    }
                    continue;
                }

                match map_key(key) {
                    Action::Quit => break,
                    Action::PrevTab => app.prev(),
                    Action::NextTab => app.next(),
                    Action::Activate => {
                        // The [+] tab never activates; it opens the dialog.
                        if app.on_new_flow_tab() {
                            app.open_dialog();
                        }
                    }
                    Action::DeleteFlow => {
                        if let Some(id) = app.request_delete() {
                            bus.cmd_tx.send(LinkCommand::DeleteFlow(id))?;
                        }
                    }
                    Action::Retry => {
                        bus.cmd_tx.send(LinkCommand::Retry)?;
                        app.link = LinkStatus::Connecting;
                        app.clear_error();
                    }
                    Action::ClearError => app.clear_error(),
                    Action::None => {}
                }
            }
        }
    }

    terminal.clear()?;
    Ok(())
}
