//! Windowed input reader
//!
//!     The scanner never sees the whole input. It sees a sequence of windows, each one a
//!     normalized slice of text tagged with its absolute start offset. Consecutive windows
//!     overlap by the safety margin, so a match that begins near the end of one window can
//!     still be completed by looking at the next one.
//!
//! Normalization
//!
//!     Every window is cut right before the last line terminator read so far, the
//!     terminator travels with the next window. CRLF pairs and lone CRs become a single
//!     `\n`. The last window always ends with `\n`; if the input doesn't provide one it is
//!     synthesized and flagged, so the output writer can leave it out.
//!
//!     Optionally the leading whitespace common to all non-blank lines of the first window
//!     is stripped from every line, and trailing blanks are trimmed.
//!
//! Prefetching
//!
//!     For streaming sources a worker reads and builds windows ahead of the scanner and
//!     hands them over a bounded channel. The scanner blocks only when the channel is empty.
//!
//!     Positions are absolute byte offsets into the normalized text.

use super::error::ScanError;
use super::options::ReaderOptions;
use crossbeam_channel::{Receiver, Sender};
use std::io::{self, Read};
use std::sync::Arc;
use tracing::{trace, warn};

/// One immutable slice of normalized input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputWindow {
    text: String,
    start: usize,
    line_ends: Vec<usize>,
    is_last: bool,
    synthesized_newline: bool,
}

impl InputWindow {
    fn new(text: String, start: usize, is_last: bool, synthesized_newline: bool) -> Self {
        let line_ends = text
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| start + i)
            .collect();

        Self {
            text,
            start,
            line_ends,
            is_last,
            synthesized_newline,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// Absolute position just past the last byte of the window.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    pub fn is_last(&self) -> bool {
        self.is_last
    }

    /// Sorted absolute positions of every `\n` in the window.
    pub fn line_ends(&self) -> &[usize] {
        &self.line_ends
    }

    /// True when the final `\n` was added by the reader rather than read from the input.
    pub fn has_synthesized_newline(&self) -> bool {
        self.synthesized_newline
    }

    pub fn contains(&self, pos: usize) -> bool {
        self.start <= pos && pos < self.end()
    }

    pub fn relative(&self, pos: usize) -> usize {
        pos.saturating_sub(self.start).min(self.text.len())
    }

    pub fn char_at(&self, pos: usize) -> Option<char> {
        if !self.contains(pos) {
            return None;
        }
        self.text.get(pos - self.start..)?.chars().next()
    }

    pub fn char_before(&self, pos: usize) -> Option<char> {
        if pos <= self.start || pos > self.end() {
            return None;
        }
        self.text.get(..pos - self.start)?.chars().next_back()
    }

    pub fn is_newline_at(&self, pos: usize) -> bool {
        self.contains(pos) && self.text.as_bytes()[pos - self.start] == b'\n'
    }

    /// Position of the character following the one at `pos`.
    pub fn next_pos(&self, pos: usize) -> usize {
        pos + self.char_at(pos).map_or(1, char::len_utf8)
    }

    /// Position of the character preceding `pos`, never before the window start.
    pub fn prev_pos(&self, pos: usize) -> usize {
        match self.char_before(pos) {
            Some(c) => pos - c.len_utf8(),
            None => pos.saturating_sub(1).max(self.start),
        }
    }

    /// Moves `pos` by `delta` characters, clamped to the window.
    pub fn offset_chars(&self, pos: usize, delta: i32) -> usize {
        let mut pos = pos.clamp(self.start, self.end());
        if delta >= 0 {
            for _ in 0..delta {
                if pos >= self.end() {
                    break;
                }
                pos = self.next_pos(pos);
            }
        } else {
            for _ in 0..delta.unsigned_abs() {
                if pos <= self.start {
                    break;
                }
                pos = self.prev_pos(pos);
            }
        }
        pos
    }

    /// Moves `pos` back by `count` characters, `None` if the window start comes first.
    pub fn back_chars(&self, pos: usize, count: u32) -> Option<usize> {
        let mut pos = pos.clamp(self.start, self.end());
        for _ in 0..count {
            if pos <= self.start {
                return None;
            }
            pos = self.prev_pos(pos);
        }
        Some(pos)
    }

    /// Text between two absolute positions, empty if they fall outside the window.
    pub fn slice(&self, from: usize, to: usize) -> &str {
        let from = self.relative(from);
        let to = self.relative(to);
        if from >= to {
            return "";
        }
        self.text.get(from..to).unwrap_or("")
    }
}

/// Turns raw bytes into windows.
#[derive(Debug)]
pub(crate) struct WindowBuilder {
    options: ReaderOptions,
    pending: Vec<u8>,
    carry: String,
    next_start: usize,
    indent_to_skip: Option<usize>,
}

impl WindowBuilder {
    pub(crate) fn new(options: ReaderOptions) -> Self {
        Self {
            options,
            pending: Vec::new(),
            carry: String::new(),
            next_start: 0,
            indent_to_skip: None,
        }
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Builds the next window out of everything read so far, up to the last line end.
    pub(crate) fn build(&mut self, is_last: bool) -> Result<InputWindow, ScanError> {
        let synthesized_newline =
            is_last && !matches!(self.pending.last(), Some(b'\n' | b'\r'));
        if synthesized_newline {
            self.pending.push(b'\n');
        }

        let stop = self
            .pending
            .iter()
            .rposition(|b| *b == b'\n' || *b == b'\r')
            .ok_or(ScanError::NoLineEnd {
                read: self.pending.len(),
                position: self.next_start + self.carry.len(),
            })?;

        if self.indent_to_skip.is_none() {
            self.indent_to_skip = Some(if self.options.strip_indentation {
                measure_common_indent(&self.pending[..stop])
            } else {
                0
            });
        }

        let normalized = self.normalize(stop);
        let decoded = match String::from_utf8(normalized) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    position = self.next_start + self.carry.len(),
                    "input is not valid UTF-8, replacing invalid sequences"
                );
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };

        let mut text = std::mem::take(&mut self.carry);
        text.push_str(&decoded);
        if is_last {
            text.push('\n');
            self.pending.clear();
        } else {
            self.pending.drain(..stop);
        }

        let start = self.next_start;
        let mut cut = text.len().saturating_sub(self.options.safety_margin);
        while !text.is_char_boundary(cut) {
            cut += 1;
        }
        self.carry = text[cut..].to_string();
        self.next_start = start + cut;

        trace!(start, len = text.len(), is_last, "built input window");
        Ok(InputWindow::new(text, start, is_last, synthesized_newline))
    }

    fn normalize(&self, stop: usize) -> Vec<u8> {
        let buf = &self.pending;
        let skip = self.indent_to_skip.unwrap_or(0);
        let mut out = Vec::with_capacity(stop);
        let mut idx = 0;

        while idx < stop {
            match buf[idx] {
                b'\r' if buf.get(idx + 1) == Some(&b'\n') => {
                    idx += 1;
                }
                b'\r' | b'\n' => {
                    out.push(b'\n');
                    idx += 1;
                }
                _ => {
                    let line_end = buf[idx..stop]
                        .iter()
                        .position(|b| *b == b'\n' || *b == b'\r')
                        .map_or(stop, |p| idx + p);

                    let mut first = idx;
                    while first < line_end && first - idx < skip {
                        first += 1;
                    }

                    let mut last = line_end;
                    if self.options.trim_trailing_whitespace {
                        while last > first && matches!(buf[last - 1], b' ' | b'\t') {
                            last -= 1;
                        }
                    }

                    out.extend_from_slice(&buf[first..last]);
                    idx = line_end;
                }
            }
        }

        out
    }
}

/// Length of the whitespace prefix shared by all non-blank lines.
fn measure_common_indent(bytes: &[u8]) -> usize {
    let mut common: Option<&[u8]> = None;

    for line in bytes.split(|b| *b == b'\n' || *b == b'\r') {
        let indent_len = line
            .iter()
            .position(|b| *b != b' ' && *b != b'\t')
            .unwrap_or(line.len());
        if indent_len == line.len() {
            continue;
        }

        let indent = &line[..indent_len];
        common = Some(match common {
            None => indent,
            Some(prev) => {
                let shared = prev
                    .iter()
                    .zip(indent)
                    .take_while(|(a, b)| a == b)
                    .count();
                &prev[..shared]
            }
        });

        if common.is_some_and(|c| c.is_empty()) {
            return 0;
        }
    }

    common.map_or(0, <[u8]>::len)
}

/// Reads until `buf` is full or the source is exhausted.
fn read_chunk<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

/// Prefetch worker body: reads windows until the input is exhausted or the consumer leaves.
pub(crate) fn produce_windows<R: Read>(
    mut input: R,
    options: ReaderOptions,
    windows: Sender<Result<InputWindow, ScanError>>,
) {
    let window_size = options.window_size.max(1);
    let mut builder = WindowBuilder::new(options);
    let mut buf = vec![0u8; window_size];

    loop {
        let read = match read_chunk(&mut input, &mut buf) {
            Ok(n) => n,
            Err(err) => {
                let _ = windows.send(Err(err.into()));
                return;
            }
        };

        builder.push(&buf[..read]);
        let is_last = read < window_size;
        let window = builder.build(is_last);
        let failed = window.is_err();

        if windows.send(window).is_err() || is_last || failed {
            return;
        }
    }
}

/// The scanner's view of the input: the current window plus a cursor.
#[derive(Debug)]
pub struct WindowedReader {
    current: Arc<InputWindow>,
    incoming: Option<Receiver<Result<InputWindow, ScanError>>>,
    position: usize,
    safety_margin: usize,
}

impl WindowedReader {
    /// A reader over a complete string: a single, final window.
    pub fn from_str(input: &str, options: &ReaderOptions) -> Result<Self, ScanError> {
        let mut builder = WindowBuilder::new(options.clone());
        builder.push(input.as_bytes());
        let window = builder.build(true)?;

        Ok(Self {
            current: Arc::new(window),
            incoming: None,
            position: 0,
            safety_margin: options.safety_margin,
        })
    }

    /// A reader fed by a prefetch worker. Blocks until the first window is ready.
    pub(crate) fn from_channel(
        incoming: Receiver<Result<InputWindow, ScanError>>,
        options: &ReaderOptions,
    ) -> Result<Self, ScanError> {
        let first = incoming
            .recv()
            .map_err(|_| ScanError::WindowQueueExhausted)??;

        Ok(Self {
            current: Arc::new(first),
            incoming: Some(incoming),
            position: 0,
            safety_margin: options.safety_margin,
        })
    }

    pub fn window(&self) -> &Arc<InputWindow> {
        &self.current
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor, switching to the following window(s) once the cursor gets within
    /// half the safety margin of the current window's end. Returns the windows loaded.
    pub fn set_position(&mut self, pos: usize) -> Result<Vec<Arc<InputWindow>>, ScanError> {
        let mut loaded = Vec::new();

        loop {
            let window = &self.current;
            if pos < window.start() || pos > window.end() {
                return Err(ScanError::PositionOutOfWindow {
                    pos,
                    start: window.start(),
                    end: window.end(),
                });
            }

            if window.is_last() || window.end() - pos > self.safety_margin / 2 {
                break;
            }

            let next = self.advance()?;
            loaded.push(next);
        }

        self.position = pos;
        Ok(loaded)
    }

    fn advance(&mut self) -> Result<Arc<InputWindow>, ScanError> {
        let incoming = self
            .incoming
            .as_ref()
            .ok_or(ScanError::WindowQueueExhausted)?;

        let next = incoming
            .recv()
            .map_err(|_| ScanError::WindowQueueExhausted)??;

        self.current = Arc::new(next);
        Ok(Arc::clone(&self.current))
    }
}
