//! Output writer
//!
//!     The scanner produces batches of [`ModeChange`] tokens. The writer merges them with the
//!     input windows it is handed and drives the formatter: text between two tokens is
//!     written in the mode of the first one, split at line ends.
//!
//!     Tokens are only ever written forwards. A token positioned before text that has
//!     already been written is moved up to the write position; tokens at or past the end of
//!     the real input are dropped once the last window is known. The line end the reader
//!     may have synthesized at the very end is never written.
//!
//!     The writer runs inline on the scanner's thread or on a worker of its own, fed through
//!     a bounded channel (see [`Outbox`]).

use super::error::ScanError;
use super::formatter::Formatter;
use super::mode::{HighlightMode, ModeChange};
use super::reader::InputWindow;
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

/// What the scanner sends to the writer.
#[derive(Debug)]
pub(crate) enum WriterMessage {
    Window(Arc<InputWindow>),
    Modes {
        modes: Vec<ModeChange>,
        /// Text before this position is final and can be written.
        flush_to: usize,
        is_final: bool,
    },
}

pub(crate) struct OutputWriter<'f, F: Formatter + ?Sized> {
    formatter: &'f mut F,
    windows: VecDeque<Arc<InputWindow>>,
    pos_written: usize,
    mode: HighlightMode,
    output_end: Option<usize>,
}

impl<'f, F: Formatter + ?Sized> OutputWriter<'f, F> {
    pub(crate) fn new(formatter: &'f mut F) -> Self {
        Self {
            formatter,
            windows: VecDeque::new(),
            pos_written: 0,
            mode: HighlightMode::Normal,
            output_end: None,
        }
    }

    pub(crate) fn handle(&mut self, message: WriterMessage) -> Result<(), ScanError> {
        match message {
            WriterMessage::Window(window) => {
                self.add_window(window);
                Ok(())
            }
            WriterMessage::Modes {
                modes,
                flush_to,
                is_final,
            } => self.write_modes(modes, flush_to, is_final),
        }
    }

    fn add_window(&mut self, window: Arc<InputWindow>) {
        if window.is_last() {
            let synthesized = usize::from(window.has_synthesized_newline());
            self.output_end = Some(window.end() - synthesized);
        }
        self.windows.push_back(window);
    }

    fn write_modes(
        &mut self,
        modes: Vec<ModeChange>,
        flush_to: usize,
        is_final: bool,
    ) -> Result<(), ScanError> {
        trace!(tokens = modes.len(), flush_to, is_final, "writing highlight modes");

        for change in modes {
            let pos = change.pos.max(self.pos_written);
            if self.output_end.is_some_and(|end| pos >= end) {
                continue;
            }
            self.write_text_until(pos)?;
            if change.mode != self.mode {
                self.formatter.change_mode(change.mode)?;
                self.mode = change.mode;
            }
        }

        if is_final {
            let end = self.output_end.ok_or(ScanError::WindowQueueExhausted)?;
            self.write_text_until(end)?;
            self.formatter.finish()?;
        } else {
            let to = self.output_end.map_or(flush_to, |end| flush_to.min(end));
            self.write_text_until(to)?;
        }
        Ok(())
    }

    fn write_text_until(&mut self, pos: usize) -> Result<(), ScanError> {
        while self.pos_written < pos {
            let window = self
                .windows
                .front()
                .ok_or(ScanError::WindowQueueExhausted)?;

            if self.pos_written >= window.end() {
                if self.windows.len() == 1 {
                    return Err(ScanError::PositionOutOfWindow {
                        pos: self.pos_written,
                        start: window.start(),
                        end: window.end(),
                    });
                }
                self.windows.pop_front();
                continue;
            }
            if self.pos_written < window.start() {
                return Err(ScanError::PositionOutOfWindow {
                    pos: self.pos_written,
                    start: window.start(),
                    end: window.end(),
                });
            }

            let to = pos.min(window.end());
            let window = Arc::clone(window);
            self.emit(window.slice(self.pos_written, to))?;
            self.pos_written = to;
        }
        Ok(())
    }

    fn emit(&mut self, text: &str) -> Result<(), ScanError> {
        for (idx, line) in text.split('\n').enumerate() {
            if idx > 0 {
                self.formatter.write_newline()?;
            }
            if !line.is_empty() {
                self.formatter.write_text(line)?;
            }
        }
        Ok(())
    }
}

/// Writer worker body: applies messages until the scanner hangs up.
pub(crate) fn drain<F: Formatter + ?Sized>(
    messages: Receiver<WriterMessage>,
    formatter: &mut F,
) -> Result<(), ScanError> {
    let mut writer = OutputWriter::new(formatter);
    for message in messages {
        writer.handle(message)?;
    }
    Ok(())
}

/// Where the scanner puts its output: straight into a writer, or onto the writer
/// worker's queue.
pub(crate) enum Outbox<'f, F: Formatter + ?Sized> {
    Inline(OutputWriter<'f, F>),
    Queued(Sender<WriterMessage>),
}

impl<F: Formatter + ?Sized> Outbox<'_, F> {
    pub(crate) fn send(&mut self, message: WriterMessage) -> Result<(), ScanError> {
        match self {
            Outbox::Inline(writer) => writer.handle(message),
            Outbox::Queued(queue) => queue
                .send(message)
                .map_err(|_| ScanError::WorkerPanicked("output writer")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlighting::formatter::{FormatterEvent, RecordingFormatter};
    use crate::highlighting::options::ReaderOptions;
    use crate::highlighting::reader::WindowedReader;

    fn window(text: &str) -> Arc<InputWindow> {
        Arc::clone(
            WindowedReader::from_str(text, &ReaderOptions::default())
                .unwrap()
                .window(),
        )
    }

    fn modes(list: &[(usize, HighlightMode)]) -> Vec<ModeChange> {
        list.iter().map(|(pos, mode)| ModeChange::new(*pos, *mode)).collect()
    }

    #[test]
    fn writes_text_between_tokens() {
        let mut formatter = RecordingFormatter::new();
        let mut writer = OutputWriter::new(&mut formatter);
        writer.handle(WriterMessage::Window(window("int x;\nx"))).unwrap();
        writer
            .handle(WriterMessage::Modes {
                modes: modes(&[
                    (0, HighlightMode::Normal),
                    (0, HighlightMode::Type),
                    (3, HighlightMode::Normal),
                    (9, HighlightMode::Comment),
                ]),
                flush_to: usize::MAX,
                is_final: true,
            })
            .unwrap();

        assert!(formatter.is_finished());
        assert_eq!(formatter.text(), "int x;\nx");
        assert_eq!(
            formatter.events(),
            &[
                FormatterEvent::Mode { mode: HighlightMode::Type },
                FormatterEvent::Text { text: "int".into() },
                FormatterEvent::Mode { mode: HighlightMode::Normal },
                FormatterEvent::Text { text: " x;".into() },
                FormatterEvent::Newline,
                FormatterEvent::Text { text: "x".into() },
            ]
        );
    }

    #[test]
    fn late_tokens_move_up_to_the_write_position() {
        let mut formatter = RecordingFormatter::new();
        let mut writer = OutputWriter::new(&mut formatter);
        writer.handle(WriterMessage::Window(window("abcdef\n"))).unwrap();
        writer
            .handle(WriterMessage::Modes {
                modes: Vec::new(),
                flush_to: 4,
                is_final: false,
            })
            .unwrap();
        writer
            .handle(WriterMessage::Modes {
                modes: modes(&[(2, HighlightMode::String)]),
                flush_to: usize::MAX,
                is_final: true,
            })
            .unwrap();

        assert_eq!(formatter.text(), "abcdef\n");
        assert_eq!(formatter.mode_at(3), HighlightMode::Normal);
        assert_eq!(formatter.mode_at(4), HighlightMode::String);
    }

    #[test]
    fn non_final_batches_stop_at_the_last_token() {
        let mut formatter = RecordingFormatter::new();
        let mut writer = OutputWriter::new(&mut formatter);
        writer.handle(WriterMessage::Window(window("abc"))).unwrap();
        writer
            .handle(WriterMessage::Modes {
                modes: modes(&[(1, HighlightMode::Number)]),
                flush_to: 0,
                is_final: false,
            })
            .unwrap();
        assert_eq!(formatter.text(), "a");
        assert_eq!(formatter.mode_changes(), &[ModeChange::new(1, HighlightMode::Number)]);
        assert!(!formatter.is_finished());
    }

    #[test]
    fn queued_writer_drains_on_hang_up() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let mut outbox: Outbox<'_, RecordingFormatter> = Outbox::Queued(tx);
        outbox.send(WriterMessage::Window(window("a b"))).unwrap();
        outbox
            .send(WriterMessage::Modes {
                modes: modes(&[(2, HighlightMode::Keyword)]),
                flush_to: usize::MAX,
                is_final: true,
            })
            .unwrap();
        drop(outbox);

        let mut formatter = RecordingFormatter::new();
        drain(rx, &mut formatter).unwrap();
        assert_eq!(formatter.text(), "a b");
        assert_eq!(formatter.texts_in(HighlightMode::Keyword), vec!["b"]);
    }
}
