//! UI state for the folded chat view.

use std::time::Instant;

use chatfold_core::{
    BadgeHandle, MessageView, NodeHandle, NormalizedKey, RenderCommand, RenderConfig,
};

/// Counter badge attached to a primary row.
pub struct Badge {
    pub handle: BadgeHandle,
    // Captured at creation; this is what a reset targets.
    pub key: NormalizedKey,
    pub count: u32,
    // Hidden until the first duplicate lands (count >= 2).
    pub visible: bool,
    // Cosmetic highlight deadline; never consulted by the session.
    pub pulse_until: Option<Instant>,
}

impl Badge {
    pub fn pulsing(&self, now: Instant) -> bool {
        self.pulse_until.map(|until| now < until).unwrap_or(false)
    }
}

/// One feed row. Suppressed rows stay recorded but are never drawn; a reset
/// does not resurrect them.
pub struct Row {
    pub node: NodeHandle,
    pub view: Option<MessageView>,
    pub badge: Option<Badge>,
    pub hidden: bool,
}

pub struct App {
    pub rows: Vec<Row>,
    pub max_rows: usize,
    pub pulse_ms: u64,
    /// Total duplicates folded away this session.
    pub folded_total: u64,
}

impl App {
    pub fn new(render: &RenderConfig) -> Self {
        Self {
            rows: Vec::new(),
            max_rows: render.max_rows.max(1),
            pulse_ms: render.pulse_ms,
            folded_total: 0,
        }
    }

    /// Apply one render command. Returns the badge whose pulse just started,
    /// so the caller can schedule the expiry notification.
    pub fn apply(&mut self, command: RenderCommand, now: Instant) -> Option<BadgeHandle> {
        match command {
            RenderCommand::ShowMessage {
                node,
                badge,
                key,
                view,
            } => {
                self.push_row(Row {
                    node,
                    view: Some(view),
                    badge: Some(Badge {
                        handle: badge,
                        key,
                        count: 1,
                        visible: false,
                        pulse_until: None,
                    }),
                    hidden: false,
                });
                None
            }
            RenderCommand::FoldMessage {
                node, badge, count, ..
            } => {
                // The duplicate is hidden, not removed.
                self.push_row(Row {
                    node,
                    view: None,
                    badge: None,
                    hidden: true,
                });
                self.folded_total += 1;
                let pulse_ms = self.pulse_ms;
                let target = self.badge_mut(badge)?;
                target.count = count;
                target.visible = true;
                target.pulse_until =
                    Some(now + std::time::Duration::from_millis(pulse_ms));
                Some(badge)
            }
            RenderCommand::HideBadge { badge } => {
                if let Some(target) = self.badge_mut(badge) {
                    target.visible = false;
                    target.pulse_until = None;
                }
                None
            }
        }
    }

    /// Clear a badge's highlight once its deadline has passed.
    pub fn expire_pulse(&mut self, badge: BadgeHandle, now: Instant) {
        if let Some(target) = self.badge_mut(badge) {
            if !target.pulsing(now) {
                target.pulse_until = None;
            }
        }
    }

    /// Visible badges, newest first, as numbered activation targets.
    pub fn selectable_badges(&self) -> Vec<&Badge> {
        self.rows
            .iter()
            .rev()
            .filter(|row| !row.hidden)
            .filter_map(|row| row.badge.as_ref())
            .filter(|badge| badge.visible)
            .take(9)
            .collect()
    }

    /// Key for the nth numbered badge, if any.
    pub fn select_badge(&self, index: usize) -> Option<NormalizedKey> {
        self.selectable_badges()
            .get(index)
            .map(|badge| badge.key.clone())
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|row| !row.hidden)
    }

    fn push_row(&mut self, row: Row) {
        self.rows.push(row);
        // Bound memory on long sessions by trimming the oldest rows.
        if self.rows.len() > self.max_rows {
            let excess = self.rows.len() - self.max_rows;
            self.rows.drain(0..excess);
        }
    }

    fn badge_mut(&mut self, handle: BadgeHandle) -> Option<&mut Badge> {
        self.rows
            .iter_mut()
            .filter_map(|row| row.badge.as_mut())
            .find(|badge| badge.handle == handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn show(node: u64, badge: u64, text: &str) -> RenderCommand {
        RenderCommand::ShowMessage {
            node: NodeHandle::new(node),
            badge: BadgeHandle::new(badge),
            key: chatfold_core::normalize(text),
            view: MessageView {
                author: None,
                text: text.to_string(),
                received_at_unix_ms: 0,
            },
        }
    }

    fn fold(node: u64, primary: u64, badge: u64, count: u32) -> RenderCommand {
        RenderCommand::FoldMessage {
            node: NodeHandle::new(node),
            primary: NodeHandle::new(primary),
            badge: BadgeHandle::new(badge),
            count,
        }
    }

    fn app() -> App {
        App::new(&RenderConfig::default())
    }

    #[test]
    fn show_creates_a_row_with_a_hidden_badge() {
        let mut app = app();
        app.apply(show(1, 1, "hi"), Instant::now());
        assert_eq!(app.visible_rows().count(), 1);
        let badge = app.rows[0].badge.as_ref().unwrap();
        assert_eq!(badge.count, 1);
        assert!(!badge.visible);
        assert!(app.selectable_badges().is_empty());
    }

    #[test]
    fn fold_hides_the_duplicate_and_reveals_the_badge() {
        let mut app = app();
        let now = Instant::now();
        app.apply(show(1, 1, "hi"), now);
        let pulsed = app.apply(fold(2, 1, 1, 2), now);
        assert_eq!(pulsed, Some(BadgeHandle::new(1)));

        // The duplicate row exists but is not drawn.
        assert_eq!(app.rows.len(), 2);
        assert_eq!(app.visible_rows().count(), 1);
        let badge = app.rows[0].badge.as_ref().unwrap();
        assert_eq!(badge.count, 2);
        assert!(badge.visible);
        assert!(badge.pulsing(now));
        assert_eq!(app.folded_total, 1);
    }

    #[test]
    fn hide_badge_clears_visibility_and_pulse() {
        let mut app = app();
        let now = Instant::now();
        app.apply(show(1, 1, "hi"), now);
        app.apply(fold(2, 1, 1, 2), now);
        app.apply(RenderCommand::HideBadge { badge: BadgeHandle::new(1) }, now);
        let badge = app.rows[0].badge.as_ref().unwrap();
        assert!(!badge.visible);
        assert!(!badge.pulsing(now));
    }

    #[test]
    fn pulse_expiry_only_clears_past_deadlines() {
        let mut app = app();
        let now = Instant::now();
        app.apply(show(1, 1, "hi"), now);
        app.apply(fold(2, 1, 1, 2), now);

        // Still inside the pulse window: nothing to clear.
        app.expire_pulse(BadgeHandle::new(1), now);
        assert!(app.rows[0].badge.as_ref().unwrap().pulsing(now));

        let later = now + Duration::from_millis(500);
        app.expire_pulse(BadgeHandle::new(1), later);
        assert!(app.rows[0].badge.as_ref().unwrap().pulse_until.is_none());
    }

    #[test]
    fn badge_selection_is_newest_first() {
        let mut app = app();
        let now = Instant::now();
        app.apply(show(1, 1, "hi"), now);
        app.apply(show(2, 2, "bye"), now);
        app.apply(fold(3, 1, 1, 2), now);
        app.apply(fold(4, 2, 2, 2), now);

        let selected = app.select_badge(0).expect("newest badge");
        assert_eq!(selected, chatfold_core::normalize("bye"));
        let second = app.select_badge(1).expect("older badge");
        assert_eq!(second, chatfold_core::normalize("hi"));
        assert!(app.select_badge(2).is_none());
    }

    #[test]
    fn rows_are_bounded_by_the_configured_cap() {
        let mut app = App::new(&RenderConfig {
            pulse_ms: 180,
            max_rows: 3,
        });
        let now = Instant::now();
        for n in 0..5 {
            app.apply(show(n, n + 1, &format!("m{n}")), now);
        }
        assert_eq!(app.rows.len(), 3);
        assert_eq!(app.rows[0].node, NodeHandle::new(2));
    }
}
