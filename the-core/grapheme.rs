//! Grapheme cluster boundaries over plain text node contents.
//!
//! Text nodes are short, so the whole string is handed to the cursor as a
//! single chunk and no chunk/context negotiation is ever needed.

use unicode_segmentation::GraphemeCursor;

use crate::text::{
  byte_to_char,
  char_len,
  char_to_byte,
};

#[must_use]
pub fn nth_prev_grapheme_boundary(text: &str, char_idx: usize, n: usize) -> usize {
  let mut byte_idx = char_to_byte(text, char_idx.min(char_len(text)));
  let mut gc = GraphemeCursor::new(byte_idx, text.len(), true);

  for _ in 0..n {
    match gc.prev_boundary(text, 0) {
      Ok(Some(idx)) => byte_idx = idx,
      Ok(None) | Err(_) => return 0,
    }
  }

  byte_to_char(text, byte_idx)
}

#[must_use]
pub fn nth_next_grapheme_boundary(text: &str, char_idx: usize, n: usize) -> usize {
  let len = char_len(text);
  let mut byte_idx = char_to_byte(text, char_idx.min(len));
  let mut gc = GraphemeCursor::new(byte_idx, text.len(), true);

  for _ in 0..n {
    match gc.next_boundary(text, 0) {
      Ok(Some(idx)) => byte_idx = idx,
      Ok(None) | Err(_) => return len,
    }
  }

  byte_to_char(text, byte_idx)
}

/// Finds the next grapheme boundary after the given char position.
#[must_use]
#[inline(always)]
pub fn next_grapheme_boundary(text: &str, char_idx: usize) -> usize {
  nth_next_grapheme_boundary(text, char_idx, 1)
}

/// Finds the previous grapheme boundary before the given char position.
#[must_use]
#[inline(always)]
pub fn prev_grapheme_boundary(text: &str, char_idx: usize) -> usize {
  nth_prev_grapheme_boundary(text, char_idx, 1)
}

/// Returns the passed char index if it's already a grapheme boundary,
/// or the next grapheme boundary char index if not.
#[must_use]
pub fn ensure_grapheme_boundary_next(text: &str, char_idx: usize) -> usize {
  let char_idx = char_idx.min(char_len(text));

  if char_idx == 0 {
    char_idx
  } else {
    next_grapheme_boundary(text, char_idx - 1)
  }
}

/// Returns the passed char index if it's already a grapheme boundary,
/// or the prev grapheme boundary char index if not.
#[must_use]
pub fn ensure_grapheme_boundary_prev(text: &str, char_idx: usize) -> usize {
  let len = char_len(text);
  let char_idx = char_idx.min(len);

  if char_idx == len {
    char_idx
  } else {
    prev_grapheme_boundary(text, char_idx + 1)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_grapheme_boundaries_combining() {
    // "a\u{0301}" (a + combining acute) is one grapheme cluster of 2 chars
    let text = "a\u{0301}b";

    assert_eq!(next_grapheme_boundary(text, 0), 2);
    assert_eq!(nth_next_grapheme_boundary(text, 0, 2), 3);

    assert_eq!(prev_grapheme_boundary(text, 3), 2);
    assert_eq!(nth_prev_grapheme_boundary(text, 3, 2), 0);

    assert_eq!(ensure_grapheme_boundary_next(text, 1), 2);
    assert_eq!(ensure_grapheme_boundary_prev(text, 1), 0);
  }

  #[test]
  fn test_grapheme_boundaries_crlf() {
    let text = "x\r\ny";

    assert_eq!(next_grapheme_boundary(text, 1), 3);
    assert_eq!(prev_grapheme_boundary(text, 4), 3);
    assert_eq!(nth_prev_grapheme_boundary(text, 4, 2), 1);
  }

  #[test]
  fn boundaries_saturate_at_edges() {
    assert_eq!(prev_grapheme_boundary("abc", 0), 0);
    assert_eq!(next_grapheme_boundary("abc", 3), 3);
    assert_eq!(next_grapheme_boundary("", 0), 0);
  }
}
