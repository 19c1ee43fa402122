use anyhow::{anyhow, Result};
use mdcore::fence::{FenceLine, FenceTracker};
use ratatui::style::{Color, Modifier, Style};
use syntect::highlighting::{
    FontStyle, HighlightIterator, HighlightState, Highlighter as ThemeHighlighter,
    Style as SynStyle, Theme, ThemeSet,
};
use syntect::parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet};

use crate::syntax_cache::SyntaxCache;

const FALLBACK_THEME: &str = "base16-ocean.dark";

/// How the current buffer is highlighted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// Markdown prose with fenced blocks highlighted by their own grammar.
    Markdown,
    /// A single grammar, by syntax name.
    Source(String),
    Plain,
}

/// Grammar state of one highlighting pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarState {
    parse: ParseState,
    highlight: HighlightState,
}

/// Parser state at the end of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineState {
    outer: GrammarState,
    fence: FenceTracker,
    inner: Option<GrammarState>,
}

pub type HighlightCache = SyntaxCache<LineState>;

pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme: Theme,
    kind: DocumentKind,
}

impl Highlighter {
    pub fn new(theme_name: &str) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        let theme = Self::pick_theme(&theme_set, theme_name);

        Self {
            syntax_set,
            theme_set,
            theme,
            kind: DocumentKind::Markdown,
        }
    }

    fn pick_theme(theme_set: &ThemeSet, theme_name: &str) -> Theme {
        theme_set
            .themes
            .get(theme_name)
            .or_else(|| {
                log::warn!("Unknown syntax theme '{}', using {}", theme_name, FALLBACK_THEME);
                theme_set.themes.get(FALLBACK_THEME)
            })
            .cloned()
            .unwrap_or_default()
    }

    /// Switches to a bundled theme. Unlike startup, unknown names are an
    /// error and keep the current theme.
    pub fn set_theme(&mut self, theme_name: &str) -> Result<()> {
        let theme = self.theme_set.themes.get(theme_name).ok_or_else(|| {
            anyhow!(
                "Unknown theme '{}'. Available: {}",
                theme_name,
                self.theme_names().join(", ")
            )
        })?;
        self.theme = theme.clone();
        log::info!("Syntax theme set to {}", theme_name);
        Ok(())
    }

    pub fn theme_names(&self) -> Vec<&str> {
        self.theme_set.themes.keys().map(String::as_str).collect()
    }

    pub fn kind(&self) -> &DocumentKind {
        &self.kind
    }

    /// Chooses the grammar from the file name, or from the content for
    /// untitled buffers.
    pub fn detect(&mut self, file_name: Option<&str>, content: &str) -> &DocumentKind {
        self.kind = match file_name {
            Some(name) => self.kind_for_filename(name),
            None if mdcore::first_language(content).is_some() => DocumentKind::Markdown,
            None => DocumentKind::Plain,
        };
        log::debug!("Highlighting as {:?}", self.kind);
        &self.kind
    }

    fn kind_for_filename(&self, file_name: &str) -> DocumentKind {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".md") || lower.ends_with(".markdown") {
            return DocumentKind::Markdown;
        }

        let extension = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match self.syntax_set.find_syntax_by_extension(extension) {
            Some(syntax) if syntax.name != "Plain Text" => DocumentKind::Source(syntax.name.clone()),
            _ => DocumentKind::Plain,
        }
    }

    fn outer_syntax(&self) -> &SyntaxReference {
        let found = match &self.kind {
            DocumentKind::Markdown => self.syntax_set.find_syntax_by_name("Markdown"),
            DocumentKind::Source(name) => self.syntax_set.find_syntax_by_name(name),
            DocumentKind::Plain => None,
        };
        found.unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
    }

    fn grammar_state(&self, syntax: &SyntaxReference) -> GrammarState {
        let highlighter = ThemeHighlighter::new(&self.theme);
        GrammarState {
            parse: ParseState::new(syntax),
            highlight: HighlightState::new(&highlighter, ScopeStack::new()),
        }
    }

    pub fn initial_state(&self) -> LineState {
        LineState {
            outer: self.grammar_state(self.outer_syntax()),
            fence: FenceTracker::new(),
            inner: None,
        }
    }

    /// Highlights one line (without its line break) starting from `state`.
    /// Returns one style per char and the state after the line.
    pub fn highlight_line(&self, line: &str, state: &LineState) -> (Vec<Style>, LineState) {
        let mut next = state.clone();

        if self.kind != DocumentKind::Markdown {
            let styles = self.run_grammar(&mut next.outer, line);
            return (styles, next);
        }

        let styles = match next.fence.feed(line) {
            FenceLine::Text => self.run_grammar(&mut next.outer, line),
            FenceLine::Open(language) => {
                next.inner = language
                    .and_then(|lang| self.syntax_set.find_syntax_by_token(&lang))
                    .map(|syntax| self.grammar_state(syntax));
                fence_styles(line)
            }
            FenceLine::Code(_) => match next.inner.as_mut() {
                Some(inner) => self.run_grammar(inner, line),
                None => vec![Style::default(); line.chars().count()],
            },
            FenceLine::Close => {
                next.inner = None;
                fence_styles(line)
            }
        };

        (styles, next)
    }

    fn run_grammar(&self, grammar: &mut GrammarState, line: &str) -> Vec<Style> {
        let char_count = line.chars().count();
        let with_newline = format!("{}\n", line);

        let ops = match grammar.parse.parse_line(&with_newline, &self.syntax_set) {
            Ok(ops) => ops,
            Err(e) => {
                log::debug!("Syntax parse error: {}", e);
                return vec![Style::default(); char_count];
            }
        };

        let highlighter = ThemeHighlighter::new(&self.theme);
        let mut styles = Vec::with_capacity(char_count);
        for (style, text) in
            HighlightIterator::new(&mut grammar.highlight, &ops, &with_newline, &highlighter)
        {
            let converted = syn_style_to_ratatui(style);
            styles.extend(text.chars().filter(|&c| c != '\n').map(|_| converted));
        }

        styles.resize(char_count, Style::default());
        styles
    }

    /// Brings the cache up to date for lines `0..=last_visible`, resuming
    /// from the first dirty line. `line_at` returns buffer lines without
    /// line breaks.
    pub fn refresh<F>(&self, cache: &mut HighlightCache, last_visible: usize, line_at: F)
    where
        F: Fn(usize) -> Option<String>,
    {
        let mut next = cache.first_dirty(last_visible);

        while let Some(line) = next {
            let Some(text) = line_at(line) else {
                break;
            };

            let state = match line {
                0 => self.initial_state(),
                _ => match cache.end_state(line - 1) {
                    Some(state) => state.clone(),
                    None => self.initial_state(),
                },
            };

            let (styles, end_state) = self.highlight_line(&text, &state);
            let changed = cache.cache_line(line, styles, end_state);

            next = if line >= last_visible {
                if changed {
                    // Lines below the viewport were highlighted from the old state
                    cache.mark_from(line + 1);
                }
                None
            } else if changed {
                // The following lines start from a different state
                cache.mark_line_dirty(line + 1);
                Some(line + 1)
            } else {
                cache.first_dirty(last_visible)
            };
        }
    }
}

fn fence_styles(line: &str) -> Vec<Style> {
    vec![Style::default().fg(Color::DarkGray); line.chars().count()]
}

fn syn_style_to_ratatui(style: SynStyle) -> Style {
    let fg = style.foreground;
    let mut converted = Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b));
    if style.font_style.contains(FontStyle::BOLD) {
        converted = converted.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        converted = converted.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        converted = converted.add_modifier(Modifier::UNDERLINED);
    }
    converted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_detect_kind() {
        let mut highlighter = Highlighter::new("base16-ocean.dark");
        assert_eq!(highlighter.detect(Some("notes.MD"), ""), &DocumentKind::Markdown);
        assert_eq!(
            highlighter.detect(Some("main.rs"), ""),
            &DocumentKind::Source("Rust".to_string())
        );
        assert_eq!(highlighter.detect(Some("data.unknownext"), ""), &DocumentKind::Plain);
        assert_eq!(
            highlighter.detect(None, "text\n```python\nx = 1\n```"),
            &DocumentKind::Markdown
        );
        assert_eq!(highlighter.detect(None, "just words"), &DocumentKind::Plain);
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let highlighter = Highlighter::new("no-such-theme");
        let state = highlighter.initial_state();
        let (styles, _) = highlighter.highlight_line("# Title", &state);
        assert_eq!(styles.len(), 7);
    }

    #[test]
    fn test_set_theme() {
        let mut highlighter = Highlighter::new("base16-ocean.dark");
        assert!(highlighter.theme_names().contains(&"InspiredGitHub"));

        let state = highlighter.initial_state();
        let (dark, _) = highlighter.highlight_line("# Title", &state);
        highlighter.set_theme("InspiredGitHub").unwrap();
        let state = highlighter.initial_state();
        let (light, _) = highlighter.highlight_line("# Title", &state);
        assert_ne!(dark, light);

        let err = highlighter.set_theme("nope").unwrap_err();
        assert!(err.to_string().starts_with("Unknown theme 'nope'"));
    }

    #[test]
    fn test_one_style_per_char() {
        let mut highlighter = Highlighter::new("base16-ocean.dark");
        highlighter.detect(Some("main.rs"), "");
        let state = highlighter.initial_state();
        let line = "let s = \"日本\";";
        let (styles, _) = highlighter.highlight_line(line, &state);
        assert_eq!(styles.len(), line.chars().count());
    }

    #[test]
    fn test_fence_lines_are_dim_and_code_uses_inner_grammar() {
        let highlighter = Highlighter::new("base16-ocean.dark");
        let doc = lines("Intro\n```rust\nfn main() {}\n```\nOutro");

        let mut state = highlighter.initial_state();
        let mut all = Vec::new();
        for line in &doc {
            let (styles, next) = highlighter.highlight_line(line, &state);
            all.push(styles);
            state = next;
        }

        let dim = Style::default().fg(Color::DarkGray);
        assert!(all[1].iter().all(|s| *s == dim));
        assert!(all[3].iter().all(|s| *s == dim));
        // "fn" keyword and "main" identifier differ under the Rust grammar
        assert_ne!(all[2][0], all[2][3]);
        assert!(state.inner.is_none());
        assert!(!state.fence.is_inside());
    }

    #[test]
    fn test_refresh_fills_cache_up_to_last_visible() {
        let highlighter = Highlighter::new("base16-ocean.dark");
        let doc = lines("a\nb\n```\nc\n```\nd");
        let mut cache = HighlightCache::new();

        highlighter.refresh(&mut cache, 3, |i| doc.get(i).cloned());
        for line in 0..=3 {
            assert!(cache.is_line_cached(line));
        }
        assert!(!cache.is_line_cached(4));

        highlighter.refresh(&mut cache, 10, |i| doc.get(i).cloned());
        assert!(cache.is_line_cached(5));
        assert!(!cache.is_line_cached(6));
    }

    #[test]
    fn test_refresh_propagates_state_changes() {
        let highlighter = Highlighter::new("base16-ocean.dark");
        let mut doc = lines("text\nmore\nend");
        let mut cache = HighlightCache::new();
        highlighter.refresh(&mut cache, 2, |i| doc.get(i).cloned());
        let before = cache.end_state(2).cloned();

        // Opening a fence on line 0 changes the state of every later line
        doc[0] = "```".to_string();
        cache.mark_line_dirty(0);
        highlighter.refresh(&mut cache, 2, |i| doc.get(i).cloned());

        let after = cache.end_state(2).cloned();
        assert_ne!(before, after);
        assert!(after.unwrap().fence.is_inside());
    }

    #[test]
    fn test_state_change_at_viewport_end_invalidates_lines_below() {
        let highlighter = Highlighter::new("base16-ocean.dark");
        let mut doc = lines("a\nb\nc\nd\ne\nf\ng\nh");
        let mut cache = HighlightCache::new();
        highlighter.refresh(&mut cache, 7, |i| doc.get(i).cloned());
        assert!(!cache.end_state(7).unwrap().fence.is_inside());

        // Edit at the top while only the first lines are visible
        doc[0] = "```".to_string();
        cache.mark_line_dirty(0);
        highlighter.refresh(&mut cache, 2, |i| doc.get(i).cloned());
        assert!(!cache.is_line_cached(3));

        // Scrolling down resumes from the new state
        highlighter.refresh(&mut cache, 7, |i| doc.get(i).cloned());
        assert!(cache.end_state(7).unwrap().fence.is_inside());
    }
}
