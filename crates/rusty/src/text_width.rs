//! Display width helpers for the editor pane and status lines.
//!
//! Buffer columns count chars; the terminal needs cells. Tabs expand to the
//! next tab stop and East Asian wide chars take two cells.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Cells occupied by `c` when drawn starting at display column `col`.
pub fn char_width(c: char, col: usize, tab_size: usize) -> usize {
    match c {
        '\t' => {
            let tab_size = tab_size.max(1);
            tab_size - (col % tab_size)
        }
        c if c.is_control() => 0,
        c => c.width().unwrap_or(1),
    }
}

/// Display column of char index `char_col` in `line`.
pub fn display_col(line: &str, char_col: usize, tab_size: usize) -> usize {
    line.chars()
        .take(char_col)
        .fold(0, |col, c| col + char_width(c, col, tab_size))
}

/// Display width of a string without tabs, measured per grapheme cluster.
pub fn str_width(text: &str) -> usize {
    text.graphemes(true)
        .map(|g| {
            if g.chars().all(char::is_control) {
                0
            } else {
                UnicodeWidthStr::width(g)
            }
        })
        .sum()
}

/// Longest prefix of `text` fitting in `max_width` cells.
pub fn truncate_to_width(text: &str, max_width: usize) -> &str {
    let mut width = 0;
    for (idx, grapheme) in text.grapheme_indices(true) {
        let w = str_width(grapheme);
        if width + w > max_width {
            return &text[..idx];
        }
        width += w;
    }
    text
}

/// Pads `text` with spaces on the right up to `width` cells.
pub fn pad_to_width(text: &str, width: usize) -> String {
    let text = truncate_to_width(text, width);
    let mut padded = text.to_string();
    padded.push_str(&" ".repeat(width - str_width(text)));
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_width() {
        assert_eq!(char_width('a', 0, 4), 1);
        assert_eq!(char_width('日', 0, 4), 2);
        assert_eq!(char_width('\t', 0, 4), 4);
        assert_eq!(char_width('\t', 3, 4), 1);
        assert_eq!(char_width('\u{7}', 0, 4), 0);
    }

    #[test]
    fn test_display_col_with_tabs_and_wide_chars() {
        assert_eq!(display_col("ab\tc", 3, 4), 4);
        assert_eq!(display_col("日本語", 2, 4), 4);
        assert_eq!(display_col("x", 5, 4), 1);
    }

    #[test]
    fn test_str_width_graphemes() {
        assert_eq!(str_width("Hello"), 5);
        assert_eq!(str_width("こんにちは"), 10);
        assert_eq!(str_width("e\u{301}"), 1);
        assert_eq!(str_width(""), 0);
    }

    #[test]
    fn test_truncate_and_pad() {
        assert_eq!(truncate_to_width("日本語", 5), "日本");
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(pad_to_width("日本語", 5), "日本 ");
        assert_eq!(pad_to_width("ab", 4), "ab  ");
    }
}
