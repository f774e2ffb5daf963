use unicode_segmentation::UnicodeSegmentation;

/// Single-field text input with a byte cursor kept on grapheme boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    cursor: usize,
    multiline: bool,
}

impl TextBuffer {
    pub fn single_line(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.len();
        Self {
            text,
            cursor,
            multiline: false,
        }
    }

    pub fn multi_line(text: impl Into<String>) -> Self {
        Self {
            multiline: true,
            ..Self::single_line(text)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    /// (line, column) of the cursor, column counted in graphemes.
    pub fn cursor_position(&self) -> (usize, usize) {
        let before = &self.text[..self.cursor];
        let line = before.matches('\n').count();
        let start = line_start(&self.text, self.cursor);
        (line, self.text[start..self.cursor].graphemes(true).count())
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' && !self.multiline {
            return;
        }
        self.text.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    /// Inserts `delimiter` twice with the cursor between the copies.
    pub fn insert_pair(&mut self, delimiter: &str) {
        self.text.insert_str(self.cursor, delimiter);
        self.cursor += delimiter.len();
        self.text.insert_str(self.cursor, delimiter);
    }

    pub fn insert_newline(&mut self) -> bool {
        if !self.multiline {
            return false;
        }
        self.insert_char('\n');
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.text, self.cursor);
        self.text.drain(prev..self.cursor);
        self.cursor = prev;
        true
    }

    pub fn delete(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.text, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.text.drain(self.cursor..next);
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.text, self.cursor);
        true
    }

    pub fn move_right(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.text, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.cursor = next;
        true
    }

    pub fn move_home(&mut self) {
        self.cursor = line_start(&self.text, self.cursor);
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text[self.cursor..]
            .find('\n')
            .map(|idx| self.cursor + idx)
            .unwrap_or(self.text.len());
    }

    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[..cursor]
        .grapheme_indices(true)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .graphemes(true)
        .next()
        .map(|grapheme| cursor + grapheme.len())
        .unwrap_or(text.len())
}

fn line_start(text: &str, cursor: usize) -> usize {
    text[..cursor].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backspace_removes_whole_graphemes() {
        let mut buffer = TextBuffer::single_line("ok👍🏽");
        assert!(buffer.backspace());
        assert_eq!(buffer.as_str(), "ok");
        assert!(buffer.move_left());
        buffer.insert_char('!');
        assert_eq!(buffer.as_str(), "o!k");
    }

    #[test]
    fn single_line_rejects_newlines() {
        let mut title = TextBuffer::single_line("title");
        assert!(!title.insert_newline());
        title.insert_char('\n');
        assert_eq!(title.as_str(), "title");

        let mut body = TextBuffer::multi_line("one");
        assert!(body.insert_newline());
        body.insert_char('t');
        assert_eq!(body.as_str(), "one\nt");
        assert_eq!(body.cursor_position(), (1, 1));
        body.move_home();
        assert_eq!(body.cursor_position(), (1, 0));
    }
}
