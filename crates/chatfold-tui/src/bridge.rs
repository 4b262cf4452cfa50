//! Runs the session pipeline on a background runtime and bridges its
//! channels to the UI thread.

use std::sync::mpsc::Sender;
use std::thread;

use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use chatfold_core::Config;
use chatfold_session::feed::start_feed_watcher;
use chatfold_session::render::SessionControl;
use chatfold_session::session;

use crate::events::UiMessage;

/// Start the feed watcher and session loop; returns the control handle the
/// UI uses to deliver badge resets.
pub fn start(config: Config, ui_tx: Sender<UiMessage>) -> UnboundedSender<SessionControl> {
    let (control_tx, control_rx) = unbounded_channel();
    let (render_tx, mut render_rx) = unbounded_channel();

    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(_) => return,
        };
        runtime.block_on(async move {
            let feed_rx = start_feed_watcher(config.feed.clone());

            // Forward render commands into the UI's event channel; ends when
            // either side hangs up.
            let forward = tokio::spawn(async move {
                while let Some(command) = render_rx.recv().await {
                    if ui_tx.send(UiMessage::Render(command)).is_err() {
                        break;
                    }
                }
            });

            session::run(config, feed_rx, control_rx, render_tx).await;
            let _ = forward.await;
        });
    });

    control_tx
}
