use ratatui::style::Style;

#[derive(Debug, Clone)]
struct CachedLine<S> {
    styles: Vec<Style>,
    state: S,
}

/// Per-line highlight results plus the parser state at the end of each
/// line, so highlighting can resume from any cached line.
#[derive(Debug, Clone)]
pub struct SyntaxCache<S> {
    lines: Vec<Option<CachedLine<S>>>,
}

impl<S: Clone + PartialEq> SyntaxCache<S> {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn mark_line_dirty(&mut self, line: usize) {
        if let Some(entry) = self.lines.get_mut(line) {
            *entry = None;
        }
    }

    pub fn mark_range_dirty(&mut self, start: usize, end: usize) {
        for line in start..=end.min(self.lines.len().saturating_sub(1)) {
            self.mark_line_dirty(line);
        }
    }

    /// Drops `line` and everything after it; used when lines shift.
    pub fn mark_from(&mut self, line: usize) {
        self.lines.truncate(line);
    }

    pub fn mark_all_dirty(&mut self) {
        self.lines.clear();
    }

    pub fn is_line_cached(&self, line: usize) -> bool {
        matches!(self.lines.get(line), Some(Some(_)))
    }

    pub fn get_cached_style(&self, line: usize, col: usize) -> Option<Style> {
        self.lines
            .get(line)?
            .as_ref()?
            .styles
            .get(col)
            .copied()
    }

    pub fn line_styles(&self, line: usize) -> Option<&[Style]> {
        self.lines
            .get(line)?
            .as_ref()
            .map(|cached| cached.styles.as_slice())
    }

    pub fn end_state(&self, line: usize) -> Option<&S> {
        self.lines.get(line)?.as_ref().map(|cached| &cached.state)
    }

    /// Stores a result. Returns true when the end state differs from the
    /// previously cached one, meaning the following lines are stale.
    pub fn cache_line(&mut self, line: usize, styles: Vec<Style>, state: S) -> bool {
        if self.lines.len() <= line {
            self.lines.resize(line + 1, None);
        }
        let changed = self.end_state(line) != Some(&state);
        self.lines[line] = Some(CachedLine { styles, state });
        changed
    }

    /// First line up to `last` that needs highlighting.
    pub fn first_dirty(&self, last: usize) -> Option<usize> {
        (0..=last).find(|&line| !self.is_line_cached(line))
    }
}

impl<S: Clone + PartialEq> Default for SyntaxCache<S> {
    fn default() -> Self {
        Self::new()
    }
}
