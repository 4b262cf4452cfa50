//! Transcript feed attachment and tailing.
//!
//! The feed is a JSON-lines file that a chat capture process appends to.
//! Attachment polls on a fixed interval until the file exists, since capture
//! starts asynchronously; after that a filesystem watcher drives incremental
//! reads of appended lines, delivered downstream in append order.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{info, trace, warn};

use chatfold_core::{FeedConfig, NodeHandle};

/// One observed chat item, in feed order.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub node: NodeHandle,
    pub text: String,
    pub author: Option<String>,
    pub observed_at_ms: i64,
}

/// Items appended together, delivered as one ordered group.
pub type FeedBatch = Vec<FeedItem>;

#[derive(Debug, Deserialize)]
struct TranscriptLine {
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    ts_ms: Option<i64>,
}

/// Start observing the transcript on a dedicated thread.
///
/// The receiver yields batches until the thread dies; the thread itself
/// retries attachment indefinitely, so a transcript that appears minutes
/// into the session still gets picked up.
pub fn start_feed_watcher(config: FeedConfig) -> UnboundedReceiver<FeedBatch> {
    let (batch_tx, batch_rx) = unbounded_channel();
    thread::spawn(move || run_watcher(config, batch_tx));
    batch_rx
}

fn run_watcher(config: FeedConfig, batch_tx: UnboundedSender<FeedBatch>) {
    let retry = Duration::from_millis(config.attach_retry_ms.max(1));
    while !config.path.exists() {
        trace!(path = %config.path.display(), "transcript not present yet");
        thread::sleep(retry);
    }
    info!(path = %config.path.display(), "attached to transcript");

    let mut tail = match FeedTail::open(&config.path, config.replay_existing) {
        Ok(tail) => tail,
        Err(err) => {
            warn!(?err, "failed to open transcript");
            return;
        }
    };

    let (event_tx, event_rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = match RecommendedWatcher::new(
        move |res| {
            let _ = event_tx.send(res);
        },
        notify::Config::default(),
    ) {
        Ok(watcher) => watcher,
        Err(err) => {
            warn!(?err, "failed to create feed watcher");
            return;
        }
    };

    let watch_dir = config
        .path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    if let Err(err) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        warn!(?err, "failed to watch transcript directory");
        return;
    }

    // The watch must be in place before the initial drain: a line appended
    // while draining still raises an event, and the offset tail turns the
    // resulting extra read into a no-op. Draining first would leave appends
    // landing in the gap with no event to deliver them.
    if !deliver(&mut tail, &batch_tx) {
        return;
    }

    while let Ok(event) = event_rx.recv() {
        if event.is_err() {
            continue;
        }
        if !deliver(&mut tail, &batch_tx) {
            return;
        }
    }
}

fn deliver(tail: &mut FeedTail, batch_tx: &UnboundedSender<FeedBatch>) -> bool {
    match tail.read_appended() {
        Ok(batch) if batch.is_empty() => true,
        Ok(batch) => batch_tx.send(batch).is_ok(),
        Err(err) => {
            warn!(?err, "transcript read failed");
            true
        }
    }
}

/// Byte-offset tail over the transcript file.
struct FeedTail {
    path: PathBuf,
    offset: u64,
    // Partial trailing line still waiting for its newline.
    carry: Vec<u8>,
    next_node: u64,
}

impl FeedTail {
    fn open(path: &Path, replay_existing: bool) -> io::Result<Self> {
        let offset = if replay_existing {
            0
        } else {
            std::fs::metadata(path)?.len()
        };
        Ok(Self {
            path: path.to_path_buf(),
            offset,
            carry: Vec::new(),
            next_node: 0,
        })
    }

    fn read_appended(&mut self) -> io::Result<FeedBatch> {
        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        if len < self.offset {
            // Truncated or rotated; start over from the top.
            self.offset = 0;
            self.carry.clear();
        }
        file.seek(SeekFrom::Start(self.offset))?;
        let mut appended = Vec::new();
        file.read_to_end(&mut appended)?;
        self.offset += appended.len() as u64;

        let mut items = Vec::new();
        for line in drain_lines(&mut self.carry, &appended) {
            if let Some(item) = parse_transcript_line(&line, &mut self.next_node) {
                items.push(item);
            }
        }
        Ok(items)
    }
}

/// Split appended bytes into complete lines, carrying any partial tail over
/// to the next read so a line split across two writes stays intact.
fn drain_lines(carry: &mut Vec<u8>, appended: &[u8]) -> Vec<String> {
    let mut data = std::mem::take(carry);
    data.extend_from_slice(appended);

    let mut lines = Vec::new();
    let mut start = 0;
    while let Some(pos) = data[start..].iter().position(|byte| *byte == b'\n') {
        let line = &data[start..start + pos];
        start += pos + 1;
        match std::str::from_utf8(line) {
            Ok(line) => lines.push(line.to_string()),
            Err(_) => trace!("skipping non-utf8 transcript line"),
        }
    }
    *carry = data[start..].to_vec();
    lines
}

/// Parse one transcript line into a feed item.
///
/// Lines that do not match the message shape are skipped silently, never
/// fatal: foreign event kinds, malformed JSON, and missing text all degrade
/// to "not a message". Node handles are assigned only to accepted lines.
fn parse_transcript_line(line: &str, next_node: &mut u64) -> Option<FeedItem> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let parsed: TranscriptLine = match serde_json::from_str(line) {
        Ok(parsed) => parsed,
        Err(err) => {
            trace!(%err, "skipping malformed transcript line");
            return None;
        }
    };
    if parsed.kind != "message" {
        return None;
    }
    let text = parsed.text?;

    let node = NodeHandle::new(*next_node);
    *next_node += 1;
    Some(FeedItem {
        node,
        text,
        author: parsed.author,
        observed_at_ms: parsed
            .ts_ms
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_lines_parse_in_order() {
        let mut next = 0;
        let first = parse_transcript_line(
            r#"{"kind":"message","text":"hi","author":"ana","ts_ms":100}"#,
            &mut next,
        )
        .expect("message line");
        let second =
            parse_transcript_line(r#"{"kind":"message","text":"yo","ts_ms":200}"#, &mut next)
                .expect("message line");
        assert_eq!(first.node, NodeHandle::new(0));
        assert_eq!(first.text, "hi");
        assert_eq!(first.author.as_deref(), Some("ana"));
        assert_eq!(first.observed_at_ms, 100);
        assert_eq!(second.node, NodeHandle::new(1));
        assert_eq!(second.author, None);
    }

    #[test]
    fn foreign_and_malformed_lines_are_skipped() {
        let mut next = 0;
        assert!(parse_transcript_line(r#"{"kind":"system","text":"joined"}"#, &mut next).is_none());
        assert!(parse_transcript_line("not json at all", &mut next).is_none());
        assert!(parse_transcript_line(r#"{"kind":"message"}"#, &mut next).is_none());
        assert!(parse_transcript_line("", &mut next).is_none());
        // Skipped lines consume no node handles.
        assert_eq!(next, 0);
    }

    #[test]
    fn missing_timestamp_is_stamped_at_observation() {
        let mut next = 0;
        let before = chrono::Utc::now().timestamp_millis();
        let item = parse_transcript_line(r#"{"kind":"message","text":"hi"}"#, &mut next).unwrap();
        let after = chrono::Utc::now().timestamp_millis();
        assert!(item.observed_at_ms >= before && item.observed_at_ms <= after);
    }

    fn temp_transcript(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("chatfold-feed-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn offset_tail_delivers_each_line_exactly_once() {
        let path = temp_transcript(
            "tail-once.jsonl",
            "{\"kind\":\"message\",\"text\":\"a\",\"ts_ms\":1}\n",
        );
        let mut tail = FeedTail::open(&path, true).unwrap();
        assert_eq!(tail.read_appended().unwrap().len(), 1);
        // Re-reading at the same offset yields nothing new.
        assert!(tail.read_appended().unwrap().is_empty());

        use std::io::Write as _;
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{\"kind\":\"message\",\"text\":\"b\",\"ts_ms\":2}}").unwrap();
        let batch = tail.read_appended().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].text, "b");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn truncation_restarts_from_the_top_with_a_clean_carry() {
        // One complete line plus a dangling partial that lands in the carry.
        let path = temp_transcript(
            "tail-truncate.jsonl",
            "{\"kind\":\"message\",\"text\":\"one\",\"ts_ms\":1}\n{\"kind\":\"mess",
        );
        let mut tail = FeedTail::open(&path, true).unwrap();
        let batch = tail.read_appended().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].text, "one");

        // Rotation: the file shrinks below the tracked offset. The tail must
        // restart at zero and drop the stale carry, or the fresh line would
        // be glued onto the abandoned partial.
        std::fs::write(&path, "{\"kind\":\"message\",\"text\":\"fresh\",\"ts_ms\":2}\n").unwrap();
        let batch = tail.read_appended().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].text, "fresh");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn partial_lines_carry_over_between_reads() {
        let mut carry = Vec::new();
        let lines = drain_lines(&mut carry, b"first\nsec");
        assert_eq!(lines, vec!["first".to_string()]);
        assert_eq!(carry, b"sec");

        let lines = drain_lines(&mut carry, b"ond\nthird\n");
        assert_eq!(lines, vec!["second".to_string(), "third".to_string()]);
        assert!(carry.is_empty());
    }
}
