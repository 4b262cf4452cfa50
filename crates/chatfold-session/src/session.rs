//! Ordered ingest loop translating feed items into render commands.

use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, trace};

use chatfold_core::{
    log_snippet, Config, DedupIndex, IngestOutcome, MessageView, RenderCommand,
};

use crate::extract::TextCache;
use crate::feed::{FeedBatch, FeedItem};
use crate::render::SessionControl;

/// Per-session mutable state: the index plus collaborator bookkeeping.
///
/// All mutation happens on one task, strictly in feed order; the decision
/// for message N depends on the index state left by message N-1.
pub struct Session {
    index: DedupIndex,
    texts: TextCache,
    render_tx: UnboundedSender<RenderCommand>,
    last_observed_ms: i64,
}

impl Session {
    pub fn new(config: &Config, render_tx: UnboundedSender<RenderCommand>) -> Self {
        Self {
            index: DedupIndex::new(config.dedup.window_ms),
            texts: TextCache::new(),
            render_tx,
            last_observed_ms: i64::MIN,
        }
    }

    /// Process one appended batch, strictly in feed order.
    pub fn handle_batch(&mut self, batch: FeedBatch) {
        for item in batch {
            self.handle_item(item);
        }
    }

    fn handle_item(&mut self, item: FeedItem) {
        let text = self.texts.capture(item.node, &item.text);
        let now_ms = self.clamp_monotonic(item.observed_at_ms);
        match self.index.ingest(&text, item.node, now_ms) {
            IngestOutcome::Promote { node, badge, key } => {
                debug!(
                    node = node.raw(),
                    key = %log_snippet(key.as_str()),
                    "new primary"
                );
                let view = MessageView {
                    author: item.author,
                    text,
                    received_at_unix_ms: now_ms,
                };
                let _ = self.render_tx.send(RenderCommand::ShowMessage {
                    node,
                    badge,
                    key,
                    view,
                });
            }
            IngestOutcome::Suppress {
                node,
                primary,
                badge,
                count,
            } => {
                debug!(
                    node = node.raw(),
                    primary = primary.raw(),
                    count,
                    "folded duplicate"
                );
                let _ = self.render_tx.send(RenderCommand::FoldMessage {
                    node,
                    primary,
                    badge,
                    count,
                });
            }
            IngestOutcome::Ignore => {
                trace!(node = item.node.raw(), "ignored blank message");
            }
        }
    }

    /// Badge activation from the renderer. Absent keys are a no-op; the
    /// badge may already belong to an overwritten entry.
    pub fn handle_control(&mut self, control: SessionControl) {
        match control {
            SessionControl::ResetBadge { key } => {
                if let Some(badge) = self.index.reset(&key) {
                    info!(key = %log_snippet(key.as_str()), "badge reset");
                    let _ = self.render_tx.send(RenderCommand::HideBadge { badge });
                }
            }
        }
    }

    /// Optional hardening sweep; lapsed entries are dead weight only.
    pub fn prune(&mut self, now_ms: i64) {
        let removed = self.index.prune_stale(now_ms);
        if removed > 0 {
            debug!(removed, "pruned lapsed entries");
        }
    }

    pub fn active_entries(&self) -> usize {
        self.index.len()
    }

    // Feed timestamps come from another process's wall clock and may carry
    // small skew; the index assumes non-decreasing time, so floor each item
    // at the last one processed.
    fn clamp_monotonic(&mut self, observed_ms: i64) -> i64 {
        if observed_ms < self.last_observed_ms {
            debug!(
                observed_ms,
                floor = self.last_observed_ms,
                "clamping out-of-order timestamp"
            );
            return self.last_observed_ms;
        }
        self.last_observed_ms = observed_ms;
        observed_ms
    }
}

/// Drive a session until the feed closes.
pub async fn run(
    config: Config,
    mut feed_rx: UnboundedReceiver<FeedBatch>,
    mut control_rx: UnboundedReceiver<SessionControl>,
    render_tx: UnboundedSender<RenderCommand>,
) {
    let prune_interval_ms = config.dedup.prune_interval_ms;
    let mut session = Session::new(&config, render_tx);
    let mut prune_tick = prune_interval_ms
        .map(|ms| tokio::time::interval(Duration::from_millis(ms.max(1))));

    loop {
        tokio::select! {
            batch = feed_rx.recv() => match batch {
                Some(batch) => session.handle_batch(batch),
                None => break,
            },
            Some(control) = control_rx.recv() => session.handle_control(control),
            _ = next_tick(&mut prune_tick) => {
                session.prune(chrono::Utc::now().timestamp_millis());
            }
        }
    }
}

async fn next_tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatfold_core::NodeHandle;
    use tokio::sync::mpsc::unbounded_channel;

    fn item(node: u64, text: &str, at_ms: i64) -> FeedItem {
        FeedItem {
            node: NodeHandle::new(node),
            text: text.to_string(),
            author: None,
            observed_at_ms: at_ms,
        }
    }

    fn session() -> (Session, UnboundedReceiver<RenderCommand>) {
        let (render_tx, render_rx) = unbounded_channel();
        (Session::new(&Config::default(), render_tx), render_rx)
    }

    #[test]
    fn batch_items_are_processed_in_feed_order() {
        let (mut session, mut render_rx) = session();
        session.handle_batch(vec![
            item(1, "spam", 0),
            item(2, "spam", 10),
            item(3, "other", 20),
        ]);

        let first = render_rx.try_recv().expect("show for first item");
        assert!(matches!(first, RenderCommand::ShowMessage { node, .. } if node.raw() == 1));

        let second = render_rx.try_recv().expect("fold for duplicate");
        let RenderCommand::FoldMessage { node, primary, count, .. } = second else {
            panic!("expected fold, got {second:?}");
        };
        assert_eq!(node.raw(), 2);
        assert_eq!(primary.raw(), 1);
        assert_eq!(count, 2);

        let third = render_rx.try_recv().expect("show for distinct key");
        assert!(matches!(third, RenderCommand::ShowMessage { node, .. } if node.raw() == 3));
    }

    #[test]
    fn blank_messages_emit_nothing() {
        let (mut session, mut render_rx) = session();
        session.handle_batch(vec![item(1, "", 0), item(2, "   ", 1)]);
        assert!(render_rx.try_recv().is_err());
        assert_eq!(session.active_entries(), 0);
    }

    #[test]
    fn reset_hides_the_badge_and_reopens_the_key() {
        let (mut session, mut render_rx) = session();
        session.handle_batch(vec![item(1, "hi", 0)]);
        let RenderCommand::ShowMessage { key, badge, .. } = render_rx.try_recv().unwrap() else {
            panic!("expected show");
        };

        session.handle_control(SessionControl::ResetBadge { key });
        let RenderCommand::HideBadge { badge: hidden } = render_rx.try_recv().unwrap() else {
            panic!("expected hide badge");
        };
        assert_eq!(hidden, badge);

        // The very next repeat promotes instead of merging.
        session.handle_batch(vec![item(2, "hi", 1)]);
        assert!(matches!(
            render_rx.try_recv().unwrap(),
            RenderCommand::ShowMessage { node, .. } if node.raw() == 2
        ));
    }

    #[test]
    fn resetting_a_stale_badge_key_is_silent() {
        let (mut session, mut render_rx) = session();
        session.handle_batch(vec![item(1, "hi", 0)]);
        let RenderCommand::ShowMessage { key, .. } = render_rx.try_recv().unwrap() else {
            panic!("expected show");
        };
        session.handle_control(SessionControl::ResetBadge { key: key.clone() });
        let _ = render_rx.try_recv().unwrap();

        // Second reset targets a key with no active entry.
        session.handle_control(SessionControl::ResetBadge { key });
        assert!(render_rx.try_recv().is_err());
    }

    #[test]
    fn out_of_order_timestamps_are_clamped() {
        let (mut session, mut render_rx) = session();
        session.handle_batch(vec![item(1, "hi", 10_000), item(2, "hi", 9_000)]);
        let _ = render_rx.try_recv().unwrap();
        let RenderCommand::FoldMessage { count, .. } = render_rx.try_recv().unwrap() else {
            panic!("expected fold");
        };
        assert_eq!(count, 2);
    }

    #[test]
    fn prune_drops_lapsed_entries() {
        let (mut session, _render_rx) = session();
        session.handle_batch(vec![item(1, "hi", 0)]);
        assert_eq!(session.active_entries(), 1);
        session.prune(60_000);
        assert_eq!(session.active_entries(), 0);
    }
}
