//! Render-command sinks and user-initiated control messages.

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::info;

use chatfold_core::{log_snippet, NormalizedKey, RenderCommand};

/// Messages flowing from the rendering side back into the session.
#[derive(Debug, Clone)]
pub enum SessionControl {
    /// A badge was activated; reset the entry for the key it captured at
    /// creation time.
    ResetBadge { key: NormalizedKey },
}

/// Consume render commands and log them: the headless renderer.
pub fn spawn_log_renderer(mut commands: UnboundedReceiver<RenderCommand>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            match command {
                RenderCommand::ShowMessage { node, view, .. } => {
                    info!(
                        node = node.raw(),
                        text = %log_snippet(&view.text),
                        "show message"
                    );
                }
                RenderCommand::FoldMessage {
                    node,
                    primary,
                    count,
                    ..
                } => {
                    info!(
                        node = node.raw(),
                        primary = primary.raw(),
                        count,
                        "fold duplicate"
                    );
                }
                RenderCommand::HideBadge { badge } => {
                    info!(badge = badge.raw(), "hide badge");
                }
            }
        }
    })
}
