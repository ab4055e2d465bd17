//! Character classification used by word-wise movement and deletion.

use crate::text::{
  byte_to_char,
  char_to_byte,
};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CharCategory {
  Whitespace,
  Eol,
  Word,
  Punctuation,
  Unknown,
}

pub fn categorize_char(ch: char) -> CharCategory {
  match ch {
    c if char_is_line_ending(c) => CharCategory::Eol,
    c if c.is_whitespace() => CharCategory::Whitespace,
    c if char_is_word(c) => CharCategory::Word,
    c if char_is_punctuation(c) => CharCategory::Punctuation,
    _ => CharCategory::Unknown,
  }
}

#[inline]
pub fn char_is_line_ending(ch: char) -> bool {
  matches!(
    ch,
    '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
  )
}

#[inline]
pub fn char_is_whitespace(ch: char) -> bool {
  match ch {
      '\u{0009}' | // Character Tabulation
      '\u{0020}' | // Space
      '\u{00A0}' | // No-break Space
      '\u{180E}' | // Mongolian Vowel Separator
      '\u{202F}' | // Narrow No-break Space
      '\u{205F}' | // Medium Mathematical Space
      '\u{3000}' | // Ideographic Space
      '\u{FEFF}'   // Zero Width No-break Space
      => true,

      // En Quad through Zero Width Space.
      ch if ('\u{2000}' ..= '\u{200B}').contains(&ch) => true,

      _ => false,
    }
}

#[inline]
pub fn char_is_punctuation(ch: char) -> bool {
  use unicode_general_category::{
    GeneralCategory,
    get_general_category,
  };

  matches!(
    get_general_category(ch),
    GeneralCategory::OtherPunctuation
      | GeneralCategory::OpenPunctuation
      | GeneralCategory::ClosePunctuation
      | GeneralCategory::InitialPunctuation
      | GeneralCategory::FinalPunctuation
      | GeneralCategory::ConnectorPunctuation
      | GeneralCategory::DashPunctuation
      | GeneralCategory::MathSymbol
      | GeneralCategory::CurrencySymbol
      | GeneralCategory::ModifierSymbol
  )
}

#[inline]
pub fn char_is_word(ch: char) -> bool {
  ch.is_alphanumeric() || ch == '_'
}

/// Char offset of the start of the word that ends at or before `offset`.
///
/// Whitespace directly before `offset` is skipped first, then one run of
/// same-category characters is consumed. Returns `offset` when it is already 0.
pub fn word_start_before(text: &str, offset: usize) -> usize {
  let end = char_to_byte(text, offset);
  let mut iter = text[..end].char_indices().rev().peekable();

  while let Some((_, ch)) = iter.peek() {
    if categorize_char(*ch) == CharCategory::Whitespace {
      iter.next();
    } else {
      break;
    }
  }

  let Some(&(mut start, first)) = iter.peek() else {
    return 0;
  };
  let category = categorize_char(first);
  for (idx, ch) in iter {
    if categorize_char(ch) != category {
      break;
    }
    start = idx;
  }

  byte_to_char(text, start)
}

/// Char offset of the end of the word that starts at or after `offset`.
pub fn word_end_after(text: &str, offset: usize) -> usize {
  let start = char_to_byte(text, offset);
  let mut iter = text[start..].char_indices().peekable();

  while let Some((_, ch)) = iter.peek() {
    if categorize_char(*ch) == CharCategory::Whitespace {
      iter.next();
    } else {
      break;
    }
  }

  let Some(&(_, first)) = iter.peek() else {
    return byte_to_char(text, text.len());
  };
  let category = categorize_char(first);
  let mut end = text.len() - start;
  for (idx, ch) in iter {
    if categorize_char(ch) != category {
      end = idx;
      break;
    }
  }

  byte_to_char(text, start + end)
}
