//! The scanner
//!
//!     A scanner walks the input one position at a time against a finished
//!     [`SyntaxDefinition`], keeping a stack of open scopes. At every position it tries, in
//!     order: to end the open regions, to match a keyword, and to start a match or region
//!     from the top scope's active item set. Highlight mode changes are collected as
//!     [`ModeChange`] tokens and handed to the output writer in batches.
//!
//! Positions
//!
//!     `advance_to` is where the next round starts looking for keywords and match starts.
//!     The cursor trails it while the walk checks every position in between for region ends
//!     bounded by `keepend`. Matching only ever goes backwards once: when a `nextgroup`
//!     lookahead expires without a hit, scanning resumes where the lookahead began.
//!
//! Threads
//!
//!     Streaming scans read ahead on a prefetch worker and may write on a writer worker.
//!     Both are scoped threads that end with the scan. String scans run on the calling
//!     thread only.

use super::definition::SyntaxDefinition;
use super::error::ScanError;
use super::formatter::Formatter;
use super::item::{ItemKind, SyntaxItem};
use super::item_set::Candidate;
use super::mode::{HighlightMode, ModeChange};
use super::options::ScanOptions;
use super::pattern::MatchEvent;
use super::reader::{produce_windows, InputWindow, WindowedReader};
use super::scope::Scope;
use super::writer::{drain, Outbox, OutputWriter, WriterMessage};
use std::io::Read;
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Token batches waiting for the writer worker.
const WRITER_QUEUE_DEPTH: usize = 4;

pub struct Scanner {
    definition: Arc<SyntaxDefinition>,
    options: ScanOptions,
    scopes: Vec<Scope>,
    modes: Vec<ModeChange>,
    /// Best match or region start found so far that begins after the cursor.
    pending: Option<Candidate>,
    cursor: usize,
    /// Matches and regions may not start before this position.
    pos_match_from: usize,
    /// Earliest end among the scopes that bound their children.
    pos_after_keepend: usize,
    word: String,
}

impl Scanner {
    pub fn new(definition: Arc<SyntaxDefinition>) -> Self {
        Self::with_options(definition, ScanOptions::default())
    }

    pub fn with_options(definition: Arc<SyntaxDefinition>, options: ScanOptions) -> Self {
        Self {
            definition,
            options,
            scopes: Vec::with_capacity(8),
            modes: Vec::with_capacity(64),
            pending: None,
            cursor: 0,
            pos_match_from: 0,
            pos_after_keepend: usize::MAX,
            word: String::new(),
        }
    }

    pub fn definition(&self) -> &Arc<SyntaxDefinition> {
        &self.definition
    }

    pub fn syntax_id(&self) -> &str {
        self.definition.id()
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Clears all per-scan state. Every scan starts with a reset, so this only matters for
    /// releasing memory between scans.
    pub fn reset(&mut self) {
        self.scopes.clear();
        self.modes.clear();
        self.pending = None;
        self.cursor = 0;
        self.pos_match_from = 0;
        self.pos_after_keepend = usize::MAX;
        self.word.clear();
    }

    /// Highlights a complete string on the calling thread.
    pub fn scan_str<F: Formatter + ?Sized>(
        &mut self,
        input: &str,
        formatter: &mut F,
    ) -> Result<(), ScanError> {
        self.options.reader.validate()?;
        let reader = WindowedReader::from_str(input, &self.options.reader)?;
        let mut outbox = Outbox::Inline(OutputWriter::new(formatter));
        self.run(reader, &mut outbox)
    }

    /// Highlights a byte stream. Input is read ahead on a prefetch worker; output is
    /// written on a worker of its own when the writer options ask for it.
    pub fn scan<R, F>(&mut self, input: R, formatter: &mut F) -> Result<(), ScanError>
    where
        R: Read + Send,
        F: Formatter + Send + ?Sized,
    {
        self.options.reader.validate()?;
        let reader_options = self.options.reader.clone();
        let asynchronous = self.options.writer.asynchronous;

        thread::scope(|s| {
            let (window_tx, window_rx) =
                crossbeam_channel::bounded(reader_options.prefetch_depth.max(1));
            let prefetch_options = reader_options.clone();
            let prefetch = s.spawn(move || produce_windows(input, prefetch_options, window_tx));

            let scanned = if asynchronous {
                let (token_tx, token_rx) = crossbeam_channel::bounded(WRITER_QUEUE_DEPTH);
                let writer = s.spawn(move || drain(token_rx, formatter));

                let mut outbox: Outbox<'_, F> = Outbox::Queued(token_tx);
                let scanned = WindowedReader::from_channel(window_rx, &reader_options)
                    .and_then(|reader| self.run(reader, &mut outbox));
                drop(outbox);

                let written = writer
                    .join()
                    .map_err(|_| ScanError::WorkerPanicked("output writer"))?;
                written.and(scanned)
            } else {
                let mut outbox = Outbox::Inline(OutputWriter::new(formatter));
                WindowedReader::from_channel(window_rx, &reader_options)
                    .and_then(|reader| self.run(reader, &mut outbox))
            };

            prefetch
                .join()
                .map_err(|_| ScanError::WorkerPanicked("input prefetch"))?;
            scanned
        })
    }

    fn run<F: Formatter + ?Sized>(
        &mut self,
        mut reader: WindowedReader,
        out: &mut Outbox<'_, F>,
    ) -> Result<(), ScanError> {
        self.reset();
        debug!(syntax = self.definition.id(), "scan started");

        out.send(WriterMessage::Window(Arc::clone(reader.window())))?;
        self.scopes
            .push(Scope::background(self.definition.background_set()));
        self.build_highlight_modes(0);

        let mut advance_to = 0;
        loop {
            advance_to = advance_to.min(self.pos_after_keepend);

            let window = Arc::clone(reader.window());
            if window.is_last() && advance_to >= window.end() {
                break;
            }

            // The only rewind: an expired nextgroup lookahead hands its text back to the
            // regular items.
            if self.top().is_next_group() && self.top().pos_after <= advance_to {
                advance_to = self.top().pos_start.max(window.start());
                self.cursor = window.prev_pos(advance_to);
                self.pop_scope(&window, advance_to);
            }

            while self.scopes.len() > 1 && self.should_pop(&window, advance_to) {
                self.pop_scope(&window, advance_to);
            }

            if self.modes.len() >= self.options.writer.flush_threshold {
                self.enqueue_modes(&window, out, false)?;
            }

            let top = self.top();
            if top.is_region() || top.is_within_keep_end {
                if self.advance_while_trying_to_end_region(&window, &mut advance_to) {
                    continue;
                }
            } else {
                self.cursor = advance_to;
            }

            self.follow_cursor(&mut reader, out)?;
            let window = Arc::clone(reader.window());
            let pos = self.cursor;

            if let Some(after) = self.try_keyword(&window, pos) {
                advance_to = after;
                continue;
            }
            if let Some(start) = self.try_matches_and_regions(&window, pos) {
                advance_to = start;
                continue;
            }
            advance_to = window.next_pos(pos);
        }

        let window = Arc::clone(reader.window());
        self.enqueue_modes(&window, out, true)
    }

    fn top(&self) -> &Scope {
        &self.scopes[self.scopes.len() - 1]
    }

    fn should_pop(&self, window: &InputWindow, advance_to: usize) -> bool {
        let top = self.top();
        top.pos_after <= advance_to
            || (top.one_line && window.is_newline_at(advance_to))
            || self.pos_after_keepend <= advance_to
    }

    /// Keeps the reader's window around the cursor, forwarding new windows to the writer.
    fn follow_cursor<F: Formatter + ?Sized>(
        &mut self,
        reader: &mut WindowedReader,
        out: &mut Outbox<'_, F>,
    ) -> Result<(), ScanError> {
        let pos = self.cursor.min(reader.window().end());
        let loaded = reader.set_position(pos)?;
        if loaded.is_empty() {
            return Ok(());
        }

        for window in loaded {
            out.send(WriterMessage::Window(window))?;
        }
        let window = Arc::clone(reader.window());
        self.enqueue_modes(&window, out, false)
    }

    /// Sends the collected tokens to the writer. Unless this is the final batch, tokens
    /// close to the cursor stay behind: a match found later may still replace them.
    fn enqueue_modes<F: Formatter + ?Sized>(
        &mut self,
        window: &InputWindow,
        out: &mut Outbox<'_, F>,
        is_final: bool,
    ) -> Result<(), ScanError> {
        let mut modes = std::mem::take(&mut self.modes);

        let flush_to = if is_final {
            usize::MAX
        } else {
            let holdback = self.options.writer.flush_holdback.min(i32::MAX as usize) as i32;
            let cutoff = window.offset_chars(self.cursor, -holdback);
            let keep_from = modes.partition_point(|change| change.pos <= cutoff);
            self.modes = modes.split_off(keep_from);
            cutoff
        };

        out.send(WriterMessage::Modes {
            modes,
            flush_to,
            is_final,
        })
    }

    fn trim_modes_at_and_after(&mut self, pos: usize) {
        let keep = self.modes.partition_point(|change| change.pos < pos);
        self.modes.truncate(keep);
    }

    fn send_mode(&mut self, mode: HighlightMode, pos: usize) {
        self.trim_modes_at_and_after(pos);
        self.modes.push(ModeChange::new(pos, mode));
    }

    /// Rebuilds the tokens from `pos` on out of the scope stack: each visible scope
    /// covering the position contributes its mode up to its highlight end, where the
    /// enclosing scope takes over.
    fn build_highlight_modes(&mut self, pos: usize) {
        self.trim_modes_at_and_after(pos);

        let mut at = pos;
        for scope in self.scopes.iter().rev() {
            if scope.transparent {
                continue;
            }
            if scope.pos_highlight_start <= at && at < scope.pos_after_highlight {
                self.modes.push(ModeChange::new(at, scope.mode));
                if scope.pos_after_highlight == usize::MAX {
                    break;
                }
                at = scope.pos_after_highlight;
            }
        }
    }

    fn advance_while_trying_to_end_region(
        &mut self,
        window: &InputWindow,
        advance_to: &mut usize,
    ) -> bool {
        let mut pos = if self.top().is_within_keep_end {
            window.next_pos(self.cursor).max(window.start())
        } else {
            *advance_to
        };

        while pos <= *advance_to {
            self.cursor = pos;
            let mut changed = false;
            let top_idx = self.scopes.len() - 1;

            for idx in (1..=top_idx).rev() {
                if !self.scopes[idx].is_within_keep_end && idx != top_idx {
                    break;
                }

                if self.scopes[idx].is_region() && self.try_ending(window, idx) {
                    let scope = &self.scopes[idx];
                    let (after, matched_at) = (scope.pos_after, scope.pos_matched_at);
                    let (matchgroup_end, keep_end) = (scope.matchgroup_end, scope.keep_end);

                    if matchgroup_end || after <= *advance_to {
                        *advance_to = after;
                        changed = true;
                    }
                    // A region that starts and ends on the same character would be
                    // matched again forever.
                    if after == matched_at {
                        *advance_to = window.next_pos(after);
                        changed = true;
                    }
                    if keep_end {
                        self.pos_after_keepend = self.pos_after_keepend.min(after);
                    }
                }

                if self.scopes[idx].extend {
                    break;
                }
            }

            if changed {
                return true;
            }
            pos = window.next_pos(pos);
        }

        false
    }

    /// Probes skip and end patterns of the region at `idx` at the cursor. A skip moves the
    /// position end probing resumes from; an end fixes the region's extent.
    fn try_ending(&mut self, window: &InputWindow, idx: usize) -> bool {
        let definition = Arc::clone(&self.definition);
        let cursor = self.cursor;

        let scope = &self.scopes[idx];
        let Some(region) = scope.item().and_then(|id| definition.item(id).as_region()) else {
            return false;
        };
        if cursor < scope.pos_end_probe_from || scope.end_is_known() {
            return false;
        }

        for (i, skip) in region.skips().iter().enumerate() {
            let hit = skip.probe(window, cursor, MatchEvent::RegionSkip, scope.resolved.skip(i));
            if let Some(hit) = hit {
                let mut after = hit.pos_after_match;
                if window.is_newline_at(after) {
                    after += 1;
                }
                self.scopes[idx].pos_end_probe_from = after;
                return false;
            }
        }

        for (i, end) in region.ends().iter().enumerate() {
            let resolved = self.scopes[idx].resolved.end(i);
            let Some(hit) = end.probe(window, cursor, MatchEvent::RegionEnd, resolved) else {
                continue;
            };

            let matchgroup = end.highlight_mode();
            let after = hit.pos_after_match;
            let highlight_end = hit.pos_after_highlight.unwrap_or(after);
            let region_end = hit
                .pos_after_region
                .or(matchgroup.map(|_| hit.pos_match_start));

            let scope = &mut self.scopes[idx];
            scope.pos_after = after;
            scope.pos_after_highlight = match (matchgroup, region_end) {
                (Some(_), Some(region_end)) => region_end,
                _ => highlight_end,
            };
            scope.eat_newline = end.eats_newline();

            if let (Some(mode), Some(region_end)) = (matchgroup, region_end) {
                if region_end < highlight_end {
                    self.send_mode(mode, region_end);
                }
            }
            if highlight_end < after {
                self.build_highlight_modes(highlight_end);
            }
            return true;
        }

        false
    }

    fn try_keyword(&mut self, window: &InputWindow, pos: usize) -> Option<usize> {
        let definition = Arc::clone(&self.definition);
        let active = definition.set(self.top().active);
        if !active.has_keywords() {
            return None;
        }

        let first = window.char_at(pos)?;
        if !definition.is_keyword_char(first) {
            return None;
        }
        if window
            .char_before(pos)
            .is_some_and(|c| definition.is_keyword_char(c))
        {
            return None;
        }

        self.word.clear();
        let mut after = pos;
        while let Some(c) = window.char_at(after) {
            if !definition.is_keyword_char(c) {
                break;
            }
            self.word.push(c);
            after += c.len_utf8();
        }

        let id = definition.find_keyword(&self.word, active)?;
        self.do_keyword_match(window, definition.item(id), pos, after);
        self.pending = None;
        Some(after)
    }

    fn do_keyword_match(&mut self, window: &InputWindow, keyword: &SyntaxItem, start: usize, after: usize) {
        if !keyword.is_transparent() {
            self.send_mode(keyword.mode(), start);
            self.build_highlight_modes(after);
        }

        if self.top().is_next_group() {
            self.pop_scope(window, after);
        } else if let Some(top) = self.scopes.last_mut() {
            top.try_clear_stale_end(after);
        }

        self.start_next_group(window, keyword, after);
    }

    fn try_matches_and_regions(&mut self, window: &InputWindow, pos: usize) -> Option<usize> {
        let definition = Arc::clone(&self.definition);

        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.result.pos_match_start < pos)
        {
            self.pending = None;
        }

        let top = self.top();
        let active = definition.set(top.active);
        let (top_item, top_matched_at) = (top.item(), top.pos_matched_at);

        if pos >= self.pos_match_from && active.has_matches_or_regions() {
            let mut from = 0;
            while let Some(candidate) =
                active.try_match_or_region_start(definition.items(), window, pos, from)
            {
                from = candidate.index + 1;

                // An item may contain itself, but not start again where it just started.
                if top_item == Some(candidate.item) && pos == top_matched_at {
                    continue;
                }
                let result = &candidate.result;
                if definition.item(candidate.item).is_match() && result.pos_after_match == pos {
                    continue;
                }

                let better = match &self.pending {
                    None => true,
                    Some(pending) => {
                        result.pos_match_start < pending.result.pos_match_start
                            || (result.pos_match_start == pending.result.pos_match_start
                                && pending.item < candidate.item)
                    }
                };
                if better {
                    let starts_here = result.pos_match_start <= pos;
                    self.pending = Some(candidate);
                    if starts_here {
                        break;
                    }
                }
            }
        }

        let ready = self
            .pending
            .as_ref()
            .is_some_and(|p| p.result.pos_match_start <= pos);
        if !ready {
            return None;
        }

        let candidate = self.pending.take()?;
        self.start_scope(candidate);
        Some(self.top().pos_start)
    }

    fn start_scope(&mut self, candidate: Candidate) {
        let definition = Arc::clone(&self.definition);
        let item = definition.item(candidate.item);
        let result = candidate.result;

        let mut scope = Scope::for_item(item, self.top().active);
        scope.pos_matched_at = result.pos_matched_at;

        match item.kind() {
            ItemKind::Keyword(_) => {}
            ItemKind::Match(pattern) => {
                scope.pos_start = result.pos_match_start;
                scope.pos_after = result.pos_after_match;
                scope.pos_highlight_start = result.pos_highlight_start.unwrap_or(result.pos_match_start);
                scope.pos_after_highlight = result.pos_after_highlight.unwrap_or(result.pos_after_match);
                scope.eat_newline = pattern.eats_newline();
                self.push_scope(scope, false);
            }
            ItemKind::Region(region) => {
                let Some(pattern) = region.starts().get(candidate.pattern) else {
                    return;
                };
                let matchgroup = pattern.highlight_mode();
                let after = result.pos_after_match;
                let highlight_start = result.pos_highlight_start.unwrap_or(result.pos_match_start);
                let region_start = result.pos_region_start.unwrap_or(if matchgroup.is_some() {
                    after
                } else {
                    result.pos_match_start
                });

                if let Some(mode) = matchgroup {
                    if highlight_start < region_start {
                        self.send_mode(mode, highlight_start);
                    }
                    scope.pos_start = region_start;
                    scope.pos_highlight_start = region_start;
                    scope.pos_end_probe_from = region_start;
                } else {
                    scope.pos_start = result.pos_match_start;
                    scope.pos_highlight_start = highlight_start;
                    scope.pos_end_probe_from = after;
                }
                scope.eat_newline = pattern.eats_newline();
                scope.resolved = region.resolve(&result.external_captures);
                self.push_scope(scope, matchgroup.is_some());
            }
        }
    }

    fn push_scope(&mut self, scope: Scope, start_has_matchgroup: bool) {
        let (prev_extend, prev_keep_end) = {
            let top = self.top();
            (top.extend, top.is_within_keep_end)
        };

        if self.top().is_next_group() {
            self.scopes.pop();
        }
        self.scopes.push(scope);

        let top_idx = self.scopes.len() - 1;
        let top = &mut self.scopes[top_idx];
        top.extend |= prev_extend && !prev_keep_end;
        if top.is_match() {
            top.limits_children = !top.extend;
            top.is_within_keep_end |= top.limits_children;
        }
        top.is_within_keep_end |= !top.extend && prev_keep_end;

        if top.is_match() && top.limits_children {
            self.pos_after_keepend = self.pos_after_keepend.min(top.pos_after);
        }

        let top = &self.scopes[top_idx];
        if !top.transparent || top.matchgroup_end || start_has_matchgroup {
            let pos = top.pos_highlight_start;
            self.build_highlight_modes(pos);
        }
    }

    fn pop_scope(&mut self, window: &InputWindow, pos: usize) {
        if self.scopes.len() <= 1 {
            return;
        }
        let Some(old) = self.scopes.pop() else {
            return;
        };
        self.pending = None;

        if old.is_next_group() {
            return;
        }

        if let Some(top) = self.scopes.last_mut() {
            top.try_clear_stale_end(pos);
        }

        if old.limits_children {
            self.compute_pos_after_keepend(pos);
        }

        if window.is_newline_at(pos) {
            self.pos_match_from = pos + 1;
            if old.eat_newline {
                let region = self
                    .scopes
                    .iter_mut()
                    .rev()
                    .find(|s| s.is_region() && !s.keep_end);
                if let Some(region) = region {
                    region.pos_end_probe_from = pos + 1;
                }
            }
        }

        if old.is_region() && (!old.transparent || old.matchgroup_end) {
            self.build_highlight_modes(pos);
        }

        if let Some(id) = old.item() {
            let definition = Arc::clone(&self.definition);
            self.start_next_group(window, definition.item(id), pos);
        }
    }

    /// Recomputes the keepend watermark after a bounding scope closed. Ends found before
    /// `pos` by keepend regions were overrun by an `extend` item and are looked for again.
    fn compute_pos_after_keepend(&mut self, pos: usize) {
        self.pos_after_keepend = usize::MAX;

        for scope in self.scopes.iter_mut().skip(1).rev() {
            if scope.limits_children {
                if scope.is_region() && scope.pos_after < pos {
                    scope.forget_end();
                }
                self.pos_after_keepend = self.pos_after_keepend.min(scope.pos_after);
            }
            if scope.extend {
                break;
            }
        }
    }

    /// Opens a lookahead scope in which only the items named by `item`'s `nextgroup` may
    /// match, after skipping the blanks and line ends the item allows.
    fn start_next_group(&mut self, window: &InputWindow, item: &SyntaxItem, pos: usize) {
        let Some(set) = item.next_group() else {
            return;
        };
        let options = item.options();

        let mut p = pos;
        let mut crossed_line = false;
        while let Some(c) = window.char_at(p) {
            match c {
                ' ' | '\t' if options.skip_white => {}
                '\n' if options.skip_nl || options.skip_empty => {
                    let empty_line = window.char_before(p) == Some('\n');
                    if crossed_line && empty_line && !options.skip_empty {
                        break;
                    }
                    crossed_line = true;
                }
                _ => break,
            }
            p = window.next_pos(p);
        }

        let scope = Scope::next_group(set, pos, window.next_pos(p), self.top());
        self.scopes.push(scope);
    }
}
