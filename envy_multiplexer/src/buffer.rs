//! Bounded, thread-safe line store backing each pane.
//!
//! The buffer is shared between the controller (which reads snapshots and
//! appends built-in output) and the stream pumps of a running process. All
//! access goes through one mutex, and nothing under it performs I/O.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Maximum number of lines retained per pane.
pub const MAX_OUTPUT_LINES: usize = 1000;

/// Origin of a line, used by the renderer to pick a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Standard output of a child process.
    Stdout,
    /// Standard error of a child process.
    Stderr,
    /// Echo of a submitted command or stdin line.
    Echo,
    /// Neutral informational output of a built-in.
    Info,
    /// Successful built-in outcome.
    Success,
    /// Failure reported by the multiplexer itself.
    Error,
    /// Separators, banners and other de-emphasized text.
    Muted,
}

/// A single line of pane output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// Where the line came from.
    pub kind: LineKind,
    /// Line text without its terminator.
    pub text: String,
}

impl OutputLine {
    /// Create a line of the given kind.
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }
}

/// Shared handle to a pane's output.
///
/// Cloning the handle shares the underlying storage and the pending-redraw
/// flag.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    inner: Arc<Mutex<VecDeque<OutputLine>>>,
    pending: Arc<AtomicBool>,
    capacity: usize,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputBuffer {
    /// Create an empty buffer holding at most [`MAX_OUTPUT_LINES`] lines.
    pub fn new() -> Self {
        Self::with_capacity(MAX_OUTPUT_LINES)
    }

    /// Create an empty buffer with a custom bound.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            pending: Arc::default(),
            capacity,
        }
    }

    /// Maximum number of retained lines.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a line, evicting the oldest lines once over capacity.
    pub fn append(&self, line: OutputLine) {
        let mut lines = self.inner.lock();
        lines.push_back(line);
        while lines.len() > self.capacity {
            lines.pop_front();
        }
    }

    /// Flag that new output awaits a redraw.
    ///
    /// Returns `true` only for the call that raised the flag, so writers post
    /// at most one notification until [`take_pending`] clears it.
    ///
    /// [`take_pending`]: Self::take_pending
    pub fn mark_pending(&self) -> bool {
        !self.pending.swap(true, Ordering::AcqRel)
    }

    /// Clear the pending-redraw flag, returning whether it was set.
    pub fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Append a line of the given kind.
    pub fn push(&self, kind: LineKind, text: impl Into<String>) {
        self.append(OutputLine::new(kind, text));
    }

    /// Remove every line.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of lines currently retained.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the buffer holds no lines.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// All line texts joined with `\n`.
    pub fn snapshot(&self) -> String {
        let lines = self.inner.lock();
        let mut out = String::with_capacity(lines.iter().map(|l| l.text.len() + 1).sum());
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&line.text);
        }
        out
    }

    /// Copy of every retained line, oldest first.
    pub fn lines(&self) -> Vec<OutputLine> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Copy of at most `count` lines ending `offset` lines above the newest.
    pub fn window(&self, count: usize, offset: usize) -> Vec<OutputLine> {
        let lines = self.inner.lock();
        let end = lines.len().saturating_sub(offset);
        let start = end.saturating_sub(count);
        lines.range(start..end).cloned().collect()
    }

    /// Text of the newest line, if any.
    pub fn last_text(&self) -> Option<String> {
        self.inner.lock().back().map(|l| l.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn append_keeps_order() {
        let buf = OutputBuffer::new();
        buf.push(LineKind::Stdout, "a");
        buf.push(LineKind::Stderr, "b");
        assert_eq!(buf.snapshot(), "a\nb");
        assert_eq!(buf.lines()[1].kind, LineKind::Stderr);
    }

    #[test]
    fn eviction_keeps_most_recent() {
        let buf = OutputBuffer::new();
        for i in 1..=1500 {
            buf.push(LineKind::Stdout, i.to_string());
        }
        let lines = buf.lines();
        assert_eq!(lines.len(), MAX_OUTPUT_LINES);
        assert_eq!(lines[0].text, "501");
        assert_eq!(lines[999].text, "1500");
    }

    #[test]
    fn clones_share_storage() {
        let buf = OutputBuffer::new();
        let other = buf.clone();
        other.push(LineKind::Info, "shared");
        assert_eq!(buf.last_text().as_deref(), Some("shared"));
        buf.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn window_respects_offset() {
        let buf = OutputBuffer::with_capacity(10);
        for i in 0..10 {
            buf.push(LineKind::Stdout, i.to_string());
        }
        let texts: Vec<_> = buf.window(3, 2).into_iter().map(|l| l.text).collect();
        assert_eq!(texts, ["5", "6", "7"]);
        assert!(buf.window(3, 50).is_empty());
    }

    #[test]
    fn pending_flag_is_raised_once() {
        let buf = OutputBuffer::new();
        let other = buf.clone();
        assert!(!buf.take_pending());
        assert!(buf.mark_pending());
        assert!(!other.mark_pending());
        assert!(other.take_pending());
        assert!(!buf.take_pending());
        assert!(buf.mark_pending());
    }

    #[test]
    fn empty_snapshot() {
        assert_eq!(OutputBuffer::new().snapshot(), "");
    }

    #[test]
    fn concurrent_appends_are_never_torn() {
        const LINE: &str = "0123456789abcdef0123456789abcdef";
        let buf = OutputBuffer::with_capacity(64);

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let buf = buf.clone();
                thread::spawn(move || {
                    for _ in 0..2000 {
                        buf.push(LineKind::Stdout, LINE);
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            let snapshot = buf.snapshot();
            if snapshot.is_empty() {
                continue;
            }
            assert!(snapshot.split('\n').all(|line| line == LINE));
            assert!(buf.len() <= 64);
        }

        for w in writers {
            w.join().unwrap();
        }
        assert_eq!(buf.len(), 64);
    }
}
