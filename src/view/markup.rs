//! Note markup and the inline source shown in the editor.
//!
//! The editor source marks `**bold**`, `*italic*` and `__underline__`; a
//! backslash keeps the next character literal. Stored notes use `<b>`, `<i>`
//! and `<u>` with `<br>` line breaks.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<[^>]*>").expect("valid markup regex")
});
static BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6])>").expect("valid break regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineMark {
    Bold,
    Italic,
    Underline,
}

impl InlineMark {
    pub fn delimiter(self) -> &'static str {
        match self {
            InlineMark::Bold => "**",
            InlineMark::Italic => "*",
            InlineMark::Underline => "__",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            InlineMark::Bold => "b",
            InlineMark::Italic => "i",
            InlineMark::Underline => "u",
        }
    }

    fn from_tag(name: &str) -> Option<Self> {
        match name {
            "b" | "strong" => Some(InlineMark::Bold),
            "i" | "em" => Some(InlineMark::Italic),
            "u" | "ins" => Some(InlineMark::Underline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl InlineStyle {
    fn has(&self, mark: InlineMark) -> bool {
        match mark {
            InlineMark::Bold => self.bold,
            InlineMark::Italic => self.italic,
            InlineMark::Underline => self.underline,
        }
    }

    fn set(&mut self, mark: InlineMark, on: bool) {
        match mark {
            InlineMark::Bold => self.bold = on,
            InlineMark::Italic => self.italic = on,
            InlineMark::Underline => self.underline = on,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub text: String,
    pub style: InlineStyle,
}

enum Token<'a> {
    Text(&'a str),
    Break,
    Open(InlineMark),
    Close(InlineMark),
}

/// Splits markup into text and the tags this crate understands.
fn tokens(markup: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut last = 0;
    for tag in TAG_RE.find_iter(markup) {
        if tag.start() > last {
            out.push(Token::Text(&markup[last..tag.start()]));
        }
        last = tag.end();
        if BREAK_RE.is_match(tag.as_str()) {
            out.push(Token::Break);
            continue;
        }
        let inner = tag.as_str().trim_start_matches('<');
        let (closing, inner) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let name: String = inner
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if let Some(mark) = InlineMark::from_tag(&name) {
            out.push(if closing {
                Token::Close(mark)
            } else {
                Token::Open(mark)
            });
        }
    }
    if last < markup.len() {
        out.push(Token::Text(&markup[last..]));
    }
    out
}

/// Visible text of rich-text markup, with tags removed and entities decoded.
pub fn plain_text(markup: &str) -> String {
    let with_breaks = BREAK_RE.replace_all(markup, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, "");
    decode_entities(&stripped)
}

/// Display lines of styled runs; tags other than bold, italic and underline
/// are dropped.
pub fn styled_lines(markup: &str) -> Vec<Vec<StyledRun>> {
    let mut lines: Vec<Vec<StyledRun>> = vec![Vec::new()];
    let mut style = InlineStyle::default();
    for token in tokens(markup) {
        match token {
            Token::Text(raw) => {
                for (i, part) in decode_entities(raw).split('\n').enumerate() {
                    if i > 0 {
                        lines.push(Vec::new());
                    }
                    if part.is_empty() {
                        continue;
                    }
                    let Some(line) = lines.last_mut() else {
                        continue;
                    };
                    match line.last_mut() {
                        Some(run) if run.style == style => run.text.push_str(part),
                        _ => line.push(StyledRun {
                            text: part.to_string(),
                            style,
                        }),
                    }
                }
            }
            Token::Break => lines.push(Vec::new()),
            Token::Open(mark) => style.set(mark, true),
            Token::Close(mark) => style.set(mark, false),
        }
    }
    lines
}

/// Editor source for stored markup.
pub fn source_from_markup(markup: &str) -> String {
    let mut out = String::new();
    let mut style = InlineStyle::default();
    for token in tokens(markup) {
        match token {
            Token::Text(raw) => escape_source(&mut out, &decode_entities(raw)),
            Token::Break => out.push('\n'),
            Token::Open(mark) if !style.has(mark) => {
                style.set(mark, true);
                out.push_str(mark.delimiter());
            }
            Token::Close(mark) if style.has(mark) => {
                style.set(mark, false);
                out.push_str(mark.delimiter());
            }
            Token::Open(_) | Token::Close(_) => {}
        }
    }
    out
}

/// Markup for editor source. Marks left open run to the end of the note.
pub fn markup_from_source(source: &str) -> String {
    let mut out = String::new();
    let mut open: Vec<InlineMark> = Vec::new();
    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => push_escaped(&mut out, chars.next().unwrap_or('\\')),
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                toggle(&mut out, &mut open, InlineMark::Bold);
            }
            '*' => toggle(&mut out, &mut open, InlineMark::Italic),
            '_' if chars.peek() == Some(&'_') => {
                chars.next();
                toggle(&mut out, &mut open, InlineMark::Underline);
            }
            other => push_escaped(&mut out, other),
        }
    }
    for mark in open.iter().rev() {
        close_tag(&mut out, *mark);
    }
    out
}

/// Closes `mark` if open, reopening anything nested inside it, so the
/// markup stays well nested.
fn toggle(out: &mut String, open: &mut Vec<InlineMark>, mark: InlineMark) {
    let Some(pos) = open.iter().position(|m| *m == mark) else {
        out.push('<');
        out.push_str(mark.tag());
        out.push('>');
        open.push(mark);
        return;
    };
    let nested: Vec<InlineMark> = open.drain(pos..).skip(1).collect();
    for inner in nested.iter().rev() {
        close_tag(out, *inner);
    }
    close_tag(out, mark);
    for inner in nested {
        out.push('<');
        out.push_str(inner.tag());
        out.push('>');
        open.push(inner);
    }
}

fn close_tag(out: &mut String, mark: InlineMark) {
    out.push_str("</");
    out.push_str(mark.tag());
    out.push('>');
}

fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\n' => out.push_str("<br>"),
        other => out.push(other),
    }
}

/// Backslash-escapes characters that would read as marks. A lone `_` inside
/// a word stays as is.
fn escape_source(out: &mut String, text: &str) {
    let chars: Vec<char> = text.chars().collect();
    for (i, &ch) in chars.iter().enumerate() {
        let escape = match ch {
            '*' | '\\' => true,
            '_' => {
                i == 0
                    || i + 1 == chars.len()
                    || chars[i - 1] == '_'
                    || chars[i + 1] == '_'
            }
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(ch);
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
