//! Peekable view over the source text.
//!
//! There is no separate token stream: the parser pulls characters straight
//! from the cursor. `peek` skips whitespace between tokens, while `adjacent`
//! looks at the very next character so that literals and identifiers stay
//! contiguous.

/// Cursor over a borrowed source string.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
  source: &'a str,
  pos: usize,
}

impl<'a> Cursor<'a> {
  pub fn new(source: &'a str) -> Self {
    Self { source, pos: 0 }
  }

  /// Skip whitespace and return the next character without consuming it.
  /// `None` is the end-of-input terminator.
  pub fn peek(&mut self) -> Option<char> {
    while let Some(c) = self.adjacent()
      && c.is_ascii_whitespace()
    {
      self.pos += 1;
    }
    self.adjacent()
  }

  /// Return the character at the current position, whitespace included.
  pub fn adjacent(&self) -> Option<char> {
    self.source[self.pos..].chars().next()
  }

  /// Consume the current character. Callers peek first; at end of input
  /// this returns `None` and leaves the position untouched.
  pub fn consume(&mut self) -> Option<char> {
    let c = self.adjacent()?;
    self.pos += c.len_utf8();
    Some(c)
  }

  /// Consume the next non-whitespace character if it equals `expected`.
  pub fn eat(&mut self, expected: char) -> bool {
    if self.peek() == Some(expected) {
      self.consume();
      return true;
    }
    false
  }

  /// Byte offset of the next unread character.
  pub fn position(&self) -> usize {
    self.pos
  }

  pub fn source(&self) -> &'a str {
    self.source
  }

  /// Unread input, left for collaborators to judge.
  pub fn remaining(&self) -> &'a str {
    &self.source[self.pos..]
  }

  pub fn is_at_end(&self) -> bool {
    self.pos >= self.source.len()
  }
}
