//! Output formatters
//!
//!     The scanner never produces text itself. It drives a [`Formatter`] with three calls,
//!     strictly in document order: write a run of text (never containing a line end), write
//!     a line end, and switch the highlight mode for whatever is written next. The
//!     formatter starts out in [`HighlightMode::Normal`].
//!
//!     Three formatters ship with the crate:
//!
//!         RecordingFormatter      keeps everything in memory, for tests and token dumps
//!         HtmlFormatter           a `<pre>` block with one `<span>` per highlighted run
//!         PlainFormatter          the text alone

use super::mode::{HighlightMode, ModeChange};
use serde::Serialize;
use std::io::{self, Write};

/// Receives highlighted output.
pub trait Formatter {
    fn write_text(&mut self, text: &str) -> io::Result<()>;

    fn write_newline(&mut self) -> io::Result<()>;

    fn change_mode(&mut self, mode: HighlightMode) -> io::Result<()>;

    /// Called once after the last write of a successful scan.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One call received by a [`RecordingFormatter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FormatterEvent {
    Text { text: String },
    Newline,
    Mode { mode: HighlightMode },
}

/// A run of output text in a single mode. Positions are byte offsets into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub mode: HighlightMode,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingFormatter {
    events: Vec<FormatterEvent>,
    text: String,
    changes: Vec<ModeChange>,
    finished: bool,
}

impl RecordingFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[FormatterEvent] {
        &self.events
    }

    /// Everything written so far, line ends included.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Mode switches, positioned at the output offset they took effect.
    pub fn mode_changes(&self) -> &[ModeChange] {
        &self.changes
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn mode_at(&self, pos: usize) -> HighlightMode {
        self.changes
            .iter()
            .take_while(|change| change.pos <= pos)
            .last()
            .map_or(HighlightMode::Normal, |change| change.mode)
    }

    /// The output cut into runs of equal mode, empty runs left out.
    pub fn spans(&self) -> Vec<Span> {
        let mut spans: Vec<Span> = Vec::new();
        let mut start = 0;
        let mut mode = HighlightMode::Normal;

        for change in &self.changes {
            if change.pos > start {
                spans.push(Span {
                    start,
                    end: change.pos,
                    mode,
                });
            }
            start = change.pos;
            mode = change.mode;
        }
        if self.text.len() > start {
            spans.push(Span {
                start,
                end: self.text.len(),
                mode,
            });
        }

        spans.dedup_by(|next, prev| {
            if prev.mode == next.mode && prev.end == next.start {
                prev.end = next.end;
                true
            } else {
                false
            }
        });
        spans
    }

    /// Text of every run in `mode`.
    pub fn texts_in(&self, mode: HighlightMode) -> Vec<&str> {
        self.spans()
            .into_iter()
            .filter(|span| span.mode == mode)
            .filter_map(|span| self.text.get(span.start..span.end))
            .collect()
    }
}

impl Formatter for RecordingFormatter {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.text.push_str(text);
        self.events.push(FormatterEvent::Text {
            text: text.to_string(),
        });
        Ok(())
    }

    fn write_newline(&mut self) -> io::Result<()> {
        self.text.push('\n');
        self.events.push(FormatterEvent::Newline);
        Ok(())
    }

    fn change_mode(&mut self, mode: HighlightMode) -> io::Result<()> {
        let pos = self.text.len();
        match self.changes.last_mut() {
            Some(last) if last.pos == pos => last.mode = mode,
            _ => self.changes.push(ModeChange::new(pos, mode)),
        }
        self.events.push(FormatterEvent::Mode { mode });
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Writes a `<pre>` block, one `<span class="...">` per run of non-normal text.
#[derive(Debug)]
pub struct HtmlFormatter<W: Write> {
    out: W,
    syntax_id: Option<String>,
    line_numbers: bool,
    started: bool,
    at_line_start: bool,
    line: usize,
    mode: HighlightMode,
    span_open: bool,
}

impl<W: Write> HtmlFormatter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            syntax_id: None,
            line_numbers: false,
            started: false,
            at_line_start: true,
            line: 0,
            mode: HighlightMode::Normal,
            span_open: false,
        }
    }

    /// Adds the syntax id as a second class of the `<pre>` element.
    pub fn with_syntax_id(mut self, id: impl Into<String>) -> Self {
        self.syntax_id = Some(id.into());
        self
    }

    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn start(&mut self) -> io::Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        match &self.syntax_id {
            Some(id) => write!(self.out, "<pre class=\"vimscan {}\">", escape_html(id)),
            None => write!(self.out, "<pre class=\"vimscan\">"),
        }
    }

    fn close_span(&mut self) -> io::Result<()> {
        if self.span_open {
            self.span_open = false;
            self.out.write_all(b"</span>")?;
        }
        Ok(())
    }

    fn begin_line(&mut self) -> io::Result<()> {
        self.start()?;
        if self.at_line_start {
            self.at_line_start = false;
            self.line += 1;
            if self.line_numbers {
                self.close_span()?;
                write!(self.out, "<span class=\"line-number\">{:>4} </span>", self.line)?;
            }
        }
        Ok(())
    }
}

impl<W: Write> Formatter for HtmlFormatter<W> {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.begin_line()?;
        if !self.span_open && self.mode != HighlightMode::Normal {
            write!(self.out, "<span class=\"{}\">", self.mode.css_class())?;
            self.span_open = true;
        }
        self.out.write_all(escape_html(text).as_bytes())
    }

    fn write_newline(&mut self) -> io::Result<()> {
        self.begin_line()?;
        self.out.write_all(b"\n")?;
        self.at_line_start = true;
        Ok(())
    }

    fn change_mode(&mut self, mode: HighlightMode) -> io::Result<()> {
        if mode != self.mode {
            self.close_span()?;
            self.mode = mode;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.start()?;
        self.close_span()?;
        self.out.write_all(b"</pre>\n")?;
        self.out.flush()
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Writes the text and drops all highlighting.
#[derive(Debug)]
pub struct PlainFormatter<W: Write> {
    out: W,
}

impl<W: Write> PlainFormatter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Formatter for PlainFormatter<W> {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())
    }

    fn write_newline(&mut self) -> io::Result<()> {
        self.out.write_all(b"\n")
    }

    fn change_mode(&mut self, _mode: HighlightMode) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive<F: Formatter>(f: &mut F) {
        f.write_text("if").unwrap();
        f.change_mode(HighlightMode::String).unwrap();
        f.write_text("\"a<b\"").unwrap();
        f.change_mode(HighlightMode::Normal).unwrap();
        f.write_newline().unwrap();
        f.write_text("x").unwrap();
        f.finish().unwrap();
    }

    #[test]
    fn recording_tracks_spans_and_modes() {
        let mut f = RecordingFormatter::new();
        drive(&mut f);
        assert_eq!(f.text(), "if\"a<b\"\nx");
        assert!(f.is_finished());
        assert_eq!(f.mode_at(0), HighlightMode::Normal);
        assert_eq!(f.mode_at(3), HighlightMode::String);
        assert_eq!(f.texts_in(HighlightMode::String), vec!["\"a<b\""]);
        assert_eq!(
            f.spans(),
            vec![
                Span { start: 0, end: 2, mode: HighlightMode::Normal },
                Span { start: 2, end: 7, mode: HighlightMode::String },
                Span { start: 7, end: 9, mode: HighlightMode::Normal },
            ]
        );
    }

    #[test]
    fn html_escapes_and_wraps_runs() {
        let mut f = HtmlFormatter::new(Vec::new());
        drive(&mut f);
        let html = String::from_utf8(f.into_inner()).unwrap();
        assert_eq!(
            html,
            "<pre class=\"vimscan\">if<span class=\"string\">&quot;a&lt;b&quot;</span>\nx</pre>\n"
        );
    }

    #[test]
    fn html_line_numbers() {
        let mut f = HtmlFormatter::new(Vec::new())
            .with_syntax_id("c")
            .with_line_numbers(true);
        drive(&mut f);
        let html = String::from_utf8(f.into_inner()).unwrap();
        assert!(html.starts_with("<pre class=\"vimscan c\"><span class=\"line-number\">   1 </span>if"));
        assert!(html.contains("\n<span class=\"line-number\">   2 </span>x"));
    }

    #[test]
    fn plain_keeps_only_text() {
        let mut f = PlainFormatter::new(Vec::new());
        drive(&mut f);
        assert_eq!(f.into_inner(), b"if\"a<b\"\nx");
    }
}
