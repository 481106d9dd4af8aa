//! Reassemble NMEA sentences from an unbounded serial byte stream.
//!
//! Responsibilities:
//! - Buffer raw bytes until a `\r\n` terminator arrives
//! - Cut the sentence starting at the first `$` before that terminator
//! - Skip corrupt lead-in (a terminator with no `$` before it)
//! - Cap the unterminated tail and resync when it runs over
//!
//! The framer is pure: `feed(chunk)` maps (state, chunk) to
//! (state, sentences), so any chunking of a well-formed stream produces the
//! same sentences as feeding it in one piece.

use crate::types::{Sentence, START_MARKER, TERMINATOR};

/// Default cap on unterminated buffered bytes. NMEA sentences are at most
/// 82 characters, so this leaves room for dozens of queued sentences.
pub const DEFAULT_MAX_BUFFERED: usize = 4096;

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Counters for bytes the framer threw away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Sentences extracted.
    pub sentences: u64,
    /// Bytes dropped by lead-in skips and overflow resyncs.
    pub discarded_bytes: u64,
    /// Terminators reached with no start marker before them.
    pub resyncs: u64,
    /// Times the buffer hit its cap without a terminator.
    pub overflows: u64,
}

// ---------------------------------------------------------------------------
// SentenceFramer
// ---------------------------------------------------------------------------

/// Streaming sentence framer over a front-truncated byte buffer.
///
/// `buf[open..]` is the unterminated tail; everything before it is complete
/// sentences (or skippable lead-in) waiting for `next_sentence`.
#[derive(Debug, Clone)]
pub struct SentenceFramer {
    buf: Vec<u8>,
    open: usize,
    max_buffered: usize,
    stats: FramerStats,
}

impl SentenceFramer {
    pub fn new(max_buffered: usize) -> Self {
        SentenceFramer {
            buf: Vec::with_capacity(256),
            open: 0,
            max_buffered: max_buffered.max(TERMINATOR.len() + 1),
            stats: FramerStats::default(),
        }
    }

    /// Append raw bytes.
    ///
    /// The cap is checked after every byte, so where a chunk boundary falls
    /// never changes which bytes are dropped.
    pub fn push(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.buf.push(b);
            if self.buf.len() - self.open >= TERMINATOR.len() && self.buf.ends_with(TERMINATOR) {
                self.open = self.buf.len();
            } else if self.buf.len() - self.open > self.max_buffered {
                self.enforce_cap();
            }
        }
    }

    /// Extract the next complete sentence, or `None` if none is buffered.
    ///
    /// Loop until `None` after every `push`.
    pub fn next_sentence(&mut self) -> Option<Sentence> {
        loop {
            let end = find_terminator(&self.buf[..self.open])?;
            let consumed = end + TERMINATOR.len();

            match self.buf[..end].iter().position(|&b| b == START_MARKER) {
                Some(start) => {
                    let text = String::from_utf8_lossy(&self.buf[start..end]).into_owned();
                    self.stats.discarded_bytes += start as u64;
                    self.consume(consumed);
                    self.stats.sentences += 1;
                    return Some(Sentence::new(text));
                }
                None => {
                    // Corrupt lead-in: skip through the terminator and keep looking
                    self.stats.resyncs += 1;
                    self.stats.discarded_bytes += consumed as u64;
                    self.consume(consumed);
                }
            }
        }
    }

    /// Push a chunk and drain every sentence it completes.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Sentence> {
        self.push(bytes);
        let mut out = Vec::new();
        while let Some(sentence) = self.next_sentence() {
            out.push(sentence);
        }
        out
    }

    /// Bytes currently buffered (one partial sentence at most, once drained).
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    fn consume(&mut self, n: usize) {
        self.buf.drain(..n);
        self.open -= n;
    }

    /// Drop-and-resync on the unterminated tail, which is exactly one byte
    /// over the cap: keep from its last `$` if that fits, else clear it.
    fn enforce_cap(&mut self) {
        self.stats.overflows += 1;
        let tail = &self.buf[self.open..];

        let keep_from = match tail.iter().rposition(|&b| b == START_MARKER) {
            Some(pos) if tail.len() - pos <= self.max_buffered => pos,
            _ => tail.len(),
        };
        // A trailing '\r' may be the first half of a split terminator
        let keep_from = if keep_from == tail.len() && tail.last() == Some(&b'\r') {
            keep_from - 1
        } else {
            keep_from
        };

        self.stats.discarded_bytes += keep_from as u64;
        self.buf.drain(self.open..self.open + keep_from);
    }
}

impl Default for SentenceFramer {
    fn default() -> Self {
        SentenceFramer::new(DEFAULT_MAX_BUFFERED)
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATOR.len()).position(|w| w == TERMINATOR)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
