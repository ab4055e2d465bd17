//! Char-offset helpers for text node contents.
//!
//! All offsets in the document model count Unicode scalar values, never
//! bytes, so every splice goes through these conversions.

use crate::Tendril;

#[inline]
pub fn char_len(text: &str) -> usize {
  text.chars().count()
}

/// Byte index of the char at `char_idx`, clamped to the end of `text`.
pub fn char_to_byte(text: &str, char_idx: usize) -> usize {
  text
    .char_indices()
    .nth(char_idx)
    .map(|(idx, _)| idx)
    .unwrap_or(text.len())
}

/// Char index of the byte at `byte_idx`. `byte_idx` must be a char boundary.
pub fn byte_to_char(text: &str, byte_idx: usize) -> usize {
  text[..byte_idx.min(text.len())].chars().count()
}

/// Slice `text` by char offsets, clamping both ends.
pub fn slice(text: &str, start: usize, end: usize) -> &str {
  let end = end.max(start);
  let from = char_to_byte(text, start);
  let to = char_to_byte(text, end);
  &text[from..to]
}

/// Splices `insert` into `text` at char `offset`.
pub fn insert(text: &mut Tendril, offset: usize, insert: &str) {
  if insert.is_empty() {
    return;
  }
  let at = char_to_byte(text, offset);
  text.insert_str(at, insert);
}

/// Removes `len` chars from `text` starting at char `offset`, returning them.
pub fn remove(text: &mut Tendril, offset: usize, len: usize) -> Tendril {
  let from = char_to_byte(text, offset);
  let to = char_to_byte(text, offset + len);
  let removed = Tendril::from(&text[from..to]);
  text.replace_range(from..to, "");
  removed
}

/// Returns `text[..start] + replacement + text[end..]` with char offsets.
pub fn splice(text: &str, start: usize, end: usize, replacement: &str) -> String {
  let from = char_to_byte(text, start);
  let to = char_to_byte(text, end.max(start));
  let mut out = String::with_capacity(text.len() - (to - from) + replacement.len());
  out.push_str(&text[..from]);
  out.push_str(replacement);
  out.push_str(&text[to..]);
  out
}
