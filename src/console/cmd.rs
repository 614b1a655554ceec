//! Command text: the bounded command buffer and the tokenizer

use log::warn;
use thiserror::Error;

/// Characters that always form a token of their own.
const SINGLE_CHAR_TOKENS: [char; 6] = ['{', '}', '(', ')', '\'', ':'];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("command buffer overflow ({requested} bytes requested, {free} free)")]
pub struct BufferOverflow {
    pub requested: usize,
    pub free: usize,
}

/// Pending script text. Bounded; text that does not fit is dropped whole.
#[derive(Debug, Clone)]
pub struct CommandBuffer {
    text: String,
    capacity: usize,
    wait: bool,
}

impl CommandBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
            wait: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.wait = false;
    }

    fn check_fits(&self, len: usize, caller: &str) -> Result<(), BufferOverflow> {
        // One byte stays free, as with a NUL-terminated buffer
        if self.text.len() + len >= self.capacity {
            warn!("{}: overflow", caller);
            return Err(BufferOverflow {
                requested: len,
                free: self.capacity.saturating_sub(self.text.len() + 1),
            });
        }
        Ok(())
    }

    /// Append text at the end.
    pub fn add_text(&mut self, text: &str) -> Result<(), BufferOverflow> {
        self.check_fits(text.len(), "Cbuf_AddText")?;
        self.text.push_str(text);
        Ok(())
    }

    /// Insert text ahead of everything still pending.
    pub fn insert_text(&mut self, text: &str) -> Result<(), BufferOverflow> {
        self.check_fits(text.len(), "Cbuf_InsertText")?;
        self.text.insert_str(0, text);
        Ok(())
    }

    /// Stop executing for the rest of this frame.
    pub fn set_wait(&mut self) {
        self.wait = true;
    }

    /// Clear the wait flag, returning whether it was set.
    pub fn take_wait(&mut self) -> bool {
        std::mem::take(&mut self.wait)
    }

    /// Remove and return the next command line.
    ///
    /// Lines end at a newline or at a semicolon outside quotes.
    pub fn next_line(&mut self) -> Option<String> {
        if self.text.is_empty() {
            return None;
        }

        let mut in_quotes = false;
        let mut escaped = false;
        let mut end = self.text.len();
        for (i, c) in self.text.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' if in_quotes => escaped = true,
                '"' => in_quotes = !in_quotes,
                ';' if !in_quotes => {
                    end = i;
                    break;
                }
                '\n' => {
                    end = i;
                    break;
                }
                _ => {}
            }
        }

        let line = self.text[..end].to_string();
        let consumed = (end + 1).min(self.text.len());
        self.text.drain(..consumed);
        Some(line)
    }
}

fn is_blank(c: char) -> bool {
    c <= ' ' && c != '\n'
}

/// Parse one token off the front of `text`.
///
/// Skips blanks and `//` comments but never crosses a newline. Returns the
/// token and the remaining text, or `None` when the line has no more tokens.
pub fn parse_token(text: &str) -> Option<(String, &str)> {
    let mut rest = text;
    loop {
        rest = rest.trim_start_matches(is_blank);
        match rest.strip_prefix("//") {
            Some(comment) => rest = &comment[comment.find('\n').unwrap_or(comment.len())..],
            None => break,
        }
    }

    let first = rest.chars().next()?;
    if first == '\n' {
        return None;
    }

    if first == '"' {
        let body = &rest[1..];
        let mut token = String::new();
        let mut chars = body.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => return Some((token, &body[i + 1..])),
                '\\' => match chars.peek() {
                    Some(&(_, escaped @ ('"' | '\\'))) => {
                        token.push(escaped);
                        chars.next();
                    }
                    _ => token.push('\\'),
                },
                _ => token.push(c),
            }
        }
        // Unterminated quote runs to the end of the text
        return Some((token, ""));
    }

    if SINGLE_CHAR_TOKENS.contains(&first) {
        return Some((first.to_string(), &rest[first.len_utf8()..]));
    }

    let end = rest
        .char_indices()
        .skip(1)
        .find(|&(_, c)| c <= ' ' || SINGLE_CHAR_TOKENS.contains(&c))
        .map_or(rest.len(), |(i, _)| i);
    Some((rest[..end].to_string(), &rest[end..]))
}

/// One tokenized command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    argv: Vec<String>,
    args: String,
}

impl Args {
    /// Tokenize up to the first newline, keeping at most `max_args` tokens.
    pub fn tokenize(text: &str, max_args: usize) -> Self {
        let mut parsed = Self::default();
        let mut rest = text;
        let mut count = 0;
        loop {
            rest = rest.trim_start_matches(is_blank);
            if rest.is_empty() || rest.starts_with('\n') {
                break;
            }
            if count == 1 {
                let line = rest.split('\n').next().unwrap_or_default();
                parsed.args = line.trim_end().to_string();
            }
            let Some((token, next)) = parse_token(rest) else {
                break;
            };
            if parsed.argv.len() < max_args {
                parsed.argv.push(token);
            }
            count += 1;
            rest = next;
        }
        parsed
    }

    pub fn argc(&self) -> usize {
        self.argv.len()
    }

    /// The `i`th token, or an empty string past the end.
    pub fn argv(&self, i: usize) -> &str {
        self.argv.get(i).map_or("", String::as_str)
    }

    /// Everything after the command name, as typed.
    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn tokens(&self) -> &[String] {
        &self.argv
    }

    /// Position (1..argc) of a case-insensitive match for `parm`.
    pub fn check_parm(&self, parm: &str) -> Option<usize> {
        self.argv
            .iter()
            .skip(1)
            .position(|arg| arg.eq_ignore_ascii_case(parm))
            .map(|i| i + 1)
    }
}
