//! First-observation text capture for feed nodes.

use std::collections::HashMap;

use chatfold_core::NodeHandle;

/// Caches each node's raw text verbatim at first observation.
///
/// Later deliveries of the same node return the cached copy, so downstream
/// mutation of the presentation (badge insertion on the primary row) can
/// never feed back into the text used for comparison.
///
/// Scoped to one session and discarded with it. Entries accumulate for the
/// session's lifetime, one per observed message, the same rate the transcript
/// itself grows at; they are never evicted because a re-delivered node must
/// always find its original capture.
#[derive(Debug, Default)]
pub struct TextCache {
    texts: HashMap<NodeHandle, String>,
}

impl TextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the node's captured text, capturing `raw` on first sight.
    pub fn capture(&mut self, node: NodeHandle, raw: &str) -> String {
        self.texts
            .entry(node)
            .or_insert_with(|| raw.to_string())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}
