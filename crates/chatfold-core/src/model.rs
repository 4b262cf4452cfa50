//! Presentation handles and view types shared between the session and UIs.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedKey;

/// Opaque handle to a message's presentation node.
///
/// The core never dereferences or inspects it, only hands it back to the
/// rendering side, which keeps the index free of any UI dependency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Opaque handle to the counter badge attached to a primary node.
///
/// Allocated by the index when an entry opens; the rendering side owns the
/// visual it maps to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BadgeHandle(u64);

impl BadgeHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Lightweight message view for renderer consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub author: Option<String>,
    pub text: String,
    pub received_at_unix_ms: i64,
}

impl MessageView {
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.received_at_unix_ms).single()
    }
}

/// Side-effecting instructions emitted to the rendering collaborator.
///
/// The core only decides what should happen; presentation is entirely the
/// receiver's concern.
#[derive(Debug, Clone)]
pub enum RenderCommand {
    /// A new primary message becomes visible, carrying a badge that stays
    /// hidden until the first duplicate arrives. The key is captured here so
    /// badge activation can reset the right entry later.
    ShowMessage {
        node: NodeHandle,
        badge: BadgeHandle,
        key: NormalizedKey,
        view: MessageView,
    },
    /// An in-window duplicate was merged: hide `node` (do not remove it) and
    /// show `count` on the primary's badge.
    FoldMessage {
        node: NodeHandle,
        primary: NodeHandle,
        badge: BadgeHandle,
        count: u32,
    },
    /// The user reset a badge's entry; hide the badge.
    HideBadge { badge: BadgeHandle },
}
