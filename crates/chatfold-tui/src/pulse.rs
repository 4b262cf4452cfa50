//! Single timer thread for badge pulse expiry.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use chatfold_core::BadgeHandle;

use crate::events::UiMessage;

/// Fans every pulse deadline through one timer thread, so a burst of folds
/// costs queue entries rather than threads.
pub struct PulseScheduler {
    deadlines: Sender<(Instant, u64)>,
}

impl PulseScheduler {
    pub fn start(ui_tx: Sender<UiMessage>) -> Self {
        let (deadlines, rx) = mpsc::channel();
        thread::spawn(move || run(rx, ui_tx));
        Self { deadlines }
    }

    /// Queue a `PulseExpired` notification for `badge` after `delay`.
    pub fn schedule(&self, badge: BadgeHandle, delay: Duration) {
        let _ = self.deadlines.send((Instant::now() + delay, badge.raw()));
    }
}

fn run(rx: Receiver<(Instant, u64)>, ui_tx: Sender<UiMessage>) {
    // Min-heap of deadlines; sleep only until the earliest one.
    let mut pending: BinaryHeap<Reverse<(Instant, u64)>> = BinaryHeap::new();
    loop {
        let now = Instant::now();
        match pending.peek().copied() {
            Some(Reverse((at, badge))) if at <= now => {
                pending.pop();
                let expired = UiMessage::PulseExpired(BadgeHandle::new(badge));
                if ui_tx.send(expired).is_err() {
                    return;
                }
            }
            Some(Reverse((at, _))) => match rx.recv_timeout(at - now) {
                Ok(deadline) => pending.push(Reverse(deadline)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            },
            None => match rx.recv() {
                Ok(deadline) => pending.push(Reverse(deadline)),
                Err(_) => return,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiries_fire_in_deadline_order() {
        let (ui_tx, ui_rx) = mpsc::channel();
        let scheduler = PulseScheduler::start(ui_tx);
        // Scheduled out of order; delivery follows the deadlines.
        scheduler.schedule(BadgeHandle::new(2), Duration::from_millis(60));
        scheduler.schedule(BadgeHandle::new(1), Duration::from_millis(5));

        let first = ui_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(first, UiMessage::PulseExpired(b) if b == BadgeHandle::new(1)));
        let second = ui_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(second, UiMessage::PulseExpired(b) if b == BadgeHandle::new(2)));
    }

    #[test]
    fn scheduler_thread_exits_when_the_ui_hangs_up() {
        let (ui_tx, ui_rx) = mpsc::channel();
        let scheduler = PulseScheduler::start(ui_tx);
        drop(ui_rx);
        scheduler.schedule(BadgeHandle::new(1), Duration::from_millis(1));
        // The send side outliving the thread is fine; schedule must not panic.
        thread::sleep(Duration::from_millis(20));
        scheduler.schedule(BadgeHandle::new(2), Duration::from_millis(1));
    }
}
