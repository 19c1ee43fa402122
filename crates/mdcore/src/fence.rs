use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FENCE_OPEN: Regex =
        Regex::new(r"^ {0,3}(`{3,}|~{3,})(.*)$").expect("Invalid FENCE_OPEN regex pattern");
}

/// An opening code fence such as ```` ```rust ````.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence {
    pub marker: char,
    pub len: usize,
    pub info: String,
}

impl Fence {
    /// Lower-cased first word of the info string.
    pub fn language(&self) -> Option<String> {
        self.info
            .split_whitespace()
            .next()
            .map(|word| word.trim_matches(|c: char| c == '{' || c == '}' || c == '.'))
            .filter(|word| !word.is_empty())
            .map(|word| word.to_lowercase())
    }

    pub fn closes(&self, line: &str) -> bool {
        let line = trim_line_break(line);
        let indent = line.len() - line.trim_start_matches(' ').len();
        if indent > 3 {
            return false;
        }
        let rest = &line[indent..];
        let run = rest.chars().take_while(|&c| c == self.marker).count();
        run >= self.len && rest[run * self.marker.len_utf8()..].trim().is_empty()
    }
}

pub fn parse_open(line: &str) -> Option<Fence> {
    let line = trim_line_break(line);
    let captures = FENCE_OPEN.captures(line)?;
    let run = captures.get(1)?.as_str();
    let info = captures.get(2).map(|m| m.as_str().trim()).unwrap_or("");
    let marker = run.chars().next()?;

    // Backtick fences cannot carry backticks in their info string
    if marker == '`' && info.contains('`') {
        return None;
    }

    Some(Fence {
        marker,
        len: run.chars().count(),
        info: info.to_string(),
    })
}

/// Classification of a single line relative to fenced blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenceLine {
    Text,
    Open(Option<String>),
    Code(Option<String>),
    Close,
}

/// Line-by-line fence state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FenceTracker {
    open: Option<Fence>,
}

impl FenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_inside(&self) -> bool {
        self.open.is_some()
    }

    pub fn feed(&mut self, line: &str) -> FenceLine {
        match &self.open {
            Some(fence) => {
                if fence.closes(line) {
                    self.open = None;
                    FenceLine::Close
                } else {
                    FenceLine::Code(fence.language())
                }
            }
            None => match parse_open(line) {
                Some(fence) => {
                    let language = fence.language();
                    self.open = Some(fence);
                    FenceLine::Open(language)
                }
                None => FenceLine::Text,
            },
        }
    }
}

/// A fenced code block. `start_line` is the opening fence and `end_line`
/// the closing fence (or the last line when the block is unterminated).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

pub fn code_blocks(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut tracker = FenceTracker::new();
    let mut current: Option<(Option<String>, usize, Vec<&str>)> = None;
    let mut last_line = 0;

    for (index, line) in text.lines().enumerate() {
        last_line = index;
        match tracker.feed(line) {
            FenceLine::Open(language) => current = Some((language, index, Vec::new())),
            FenceLine::Code(_) => {
                if let Some((_, _, lines)) = current.as_mut() {
                    lines.push(line);
                }
            }
            FenceLine::Close => {
                if let Some((language, start_line, lines)) = current.take() {
                    blocks.push(CodeBlock {
                        language,
                        start_line,
                        end_line: index,
                        content: lines.join("\n"),
                    });
                }
            }
            FenceLine::Text => {}
        }
    }

    if let Some((language, start_line, lines)) = current {
        blocks.push(CodeBlock {
            language,
            start_line,
            end_line: last_line,
            content: lines.join("\n"),
        });
    }

    blocks
}

pub fn first_language(text: &str) -> Option<String> {
    code_blocks(text).into_iter().find_map(|block| block.language)
}

fn trim_line_break(line: &str) -> &str {
    line.trim_end_matches(|c: char| c == '\n' || c == '\r')
}
