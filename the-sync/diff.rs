//! Pending text diffs.
//!
//! A pending diff is a substitution the platform already made natively but
//! the document has not seen yet. Offsets of a [`StringDiff`] are chars of
//! the text node *before* the substitution; points reported by the platform
//! afterwards are in native coordinates, with the pending diff applied.

use the_core::text::{
  char_len,
  slice,
  splice,
};
use the_doc::{
  Editor,
  Operation,
  Path,
  Point,
  Range,
};

/// Replace chars `start..end` with `text`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StringDiff {
  pub start: usize,
  pub end:   usize,
  pub text:  String,
}

impl StringDiff {
  pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
    Self {
      start,
      end,
      text: text.into(),
    }
  }

  #[inline]
  pub fn text_len(&self) -> usize {
    char_len(&self.text)
  }

  pub fn apply(&self, text: &str) -> String {
    splice(text, self.start, self.end, &self.text)
  }
}

/// Applies `diffs` in order, each against the result of the previous one.
pub fn apply_string_diffs<'a>(
  text: &str,
  diffs: impl IntoIterator<Item = &'a StringDiff>,
) -> String {
  diffs
    .into_iter()
    .fold(text.to_string(), |text, diff| diff.apply(&text))
}

/// Trims the common prefix and suffix of the replaced and inserted text.
/// Returns `None` when nothing is left to change.
pub fn normalize_string_diff(target: &str, diff: &StringDiff) -> Option<StringDiff> {
  let removed: Vec<char> = slice(target, diff.start, diff.end).chars().collect();
  let inserted: Vec<char> = diff.text.chars().collect();

  let prefix = removed
    .iter()
    .zip(&inserted)
    .take_while(|(a, b)| a == b)
    .count();
  let max = (removed.len() - prefix).min(inserted.len() - prefix);
  let suffix = removed
    .iter()
    .rev()
    .zip(inserted.iter().rev())
    .take(max)
    .take_while(|(a, b)| a == b)
    .count();

  let normalized = StringDiff {
    start: diff.start + prefix,
    end:   diff.end.saturating_sub(suffix).max(diff.start + prefix),
    text:  inserted[prefix..inserted.len() - suffix].iter().collect(),
  };
  if normalized.start == normalized.end && normalized.text.is_empty() {
    return None;
  }
  Some(normalized)
}

/// Combines `a` followed by `b` (whose offsets are relative to the text
/// after `a`) into one diff against `target`. Returns `None` when the two
/// cancel out.
pub fn merge_string_diffs(target: &str, a: &StringDiff, b: &StringDiff) -> Option<StringDiff> {
  let a_len = a.text_len();
  let b_len = b.text_len();
  let a_inserted_end = a.start + a_len;

  let start = a.start.min(b.start);
  let overlap = a_inserted_end.min(b.end).saturating_sub(b.start);
  let applied = apply_string_diffs(target, [a, b]);
  let tail = if a_inserted_end > b.start { b_len } else { 0 };
  let slice_end = (b.start + b_len).max((a_inserted_end + tail).saturating_sub(overlap));
  let text = slice(&applied, start, slice_end).to_string();
  let end = a.end.max((b.end + a.end).saturating_sub(a.start + a_len));

  normalize_string_diff(target, &StringDiff { start, end, text })
}

/// A pending diff on one text node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextDiff {
  pub id:   u64,
  pub path: Path,
  pub diff: StringDiff,
}

impl TextDiff {
  /// The document range the diff replaces.
  pub fn target_range(&self) -> Range {
    Range::new(
      Point::new(self.path.clone(), self.diff.start),
      Point::new(self.path.clone(), self.diff.end),
    )
  }

  /// Follows the diff through an operation applied to the document while
  /// it was pending. Returns `None` once its text node is gone.
  pub fn transform(&self, op: &Operation) -> Option<TextDiff> {
    let diff = &self.diff;
    let with = |path: Path, start: usize, end: usize| {
      Some(TextDiff {
        id:   self.id,
        path,
        diff: StringDiff::new(start, end, diff.text.clone()),
      })
    };

    match op {
      Operation::InsertText { path, offset, text } if *path == self.path => {
        let len = char_len(text);
        if *offset >= diff.end {
          Some(self.clone())
        } else if *offset <= diff.start {
          with(self.path.clone(), diff.start + len, diff.end + len)
        } else {
          with(self.path.clone(), diff.start, diff.end + len)
        }
      },
      Operation::RemoveText { path, offset, text } if *path == self.path => {
        let len = char_len(text);
        if *offset >= diff.end {
          Some(self.clone())
        } else if offset + len <= diff.start {
          with(self.path.clone(), diff.start - len, diff.end - len)
        } else {
          with(self.path.clone(), diff.start, diff.end.saturating_sub(len))
        }
      },
      Operation::SplitNode { path, position, .. } if *path == self.path => {
        if *position >= diff.end {
          Some(self.clone())
        } else if *position > diff.start {
          with(self.path.clone(), diff.start, diff.end.min(*position))
        } else {
          let path = self.path.transform_with(op, Some(the_doc::Affinity::Forward))?;
          with(path, diff.start - position, diff.end - position)
        }
      },
      Operation::SplitNode { .. } => {
        let path = self.path.transform_with(op, Some(the_doc::Affinity::Backward))?;
        with(path, diff.start, diff.end)
      },
      Operation::MergeNode { path, position, .. } if *path == self.path => {
        let path = self.path.transform(op)?;
        with(path, diff.start + position, diff.end + position)
      },
      _ => {
        let path = self.path.transform(op)?;
        with(path, diff.start, diff.end)
      },
    }
  }
}

/// Moves a native point through `op`. Points inside or after a pending
/// diff on their text are mapped to document coordinates first, so the
/// diff's own offsets shift them and nothing else.
pub fn transform_pending_point(diffs: &[TextDiff], point: &Point, op: &Operation) -> Option<Point> {
  let backward = Some(the_doc::Affinity::Backward);
  let Some(pending) = diffs.iter().find(|d| d.path == point.path) else {
    return point.transform_with(op, backward);
  };
  let diff = &pending.diff;
  if point.offset <= diff.start {
    return point.transform_with(op, backward);
  }

  let inserted = diff.text_len();
  if point.offset <= diff.start + inserted {
    let anchor = Point::new(point.path.clone(), diff.start);
    let moved = anchor.transform_with(op, backward)?;
    return Some(Point::new(moved.path, moved.offset + point.offset - diff.start));
  }

  let anchor = Point::new(
    point.path.clone(),
    point.offset - inserted + diff.end - diff.start,
  );
  let moved = anchor.transform_with(op, backward)?;
  if let Operation::SplitNode { path, position, .. } = op {
    if *path == point.path && anchor.offset < *position && diff.start < *position {
      return Some(moved);
    }
  }
  Some(Point::new(
    moved.path,
    (moved.offset + inserted + diff.start).saturating_sub(diff.end),
  ))
}

pub fn transform_pending_range(diffs: &[TextDiff], range: &Range, op: &Operation) -> Option<Range> {
  let anchor = transform_pending_point(diffs, &range.anchor, op)?;
  if range.is_collapsed() {
    return Some(Range::collapsed(anchor));
  }
  let focus = transform_pending_point(diffs, &range.focus, op)?;
  Some(Range::new(anchor, focus))
}

/// Checks that the document now shows what the diff promised. A diff that
/// inserted at the very end of its text may have landed at the start of the
/// next text instead (a marked insertion creates a new node).
pub fn verify_diff_state(editor: &Editor, diff: &TextDiff) -> bool {
  let Some(leaf) = editor.leaf(&diff.path) else {
    return false;
  };
  let StringDiff { start, text, .. } = &diff.diff;
  let len = char_len(text);
  if *start != leaf.len() || text.is_empty() {
    return slice(&leaf.text, *start, start + len) == text.as_str();
  }

  let Some(next) = diff.path.next() else {
    return false;
  };
  editor
    .leaf(&next)
    .is_some_and(|next| next.text.starts_with(text.as_str()))
}

/// Native offsets past the end of a text continue into the following texts
/// of the same block.
pub fn normalize_point(editor: &Editor, point: &Point) -> Option<Point> {
  let mut path = point.path.clone();
  let mut offset = point.offset;
  let mut len = editor.leaf(&path)?.len();
  let block = editor.above_block(&path)?;

  while offset > len {
    let next = editor.next_text(&path)?;
    if !block.is_ancestor(&next) {
      return None;
    }
    offset -= len;
    len = editor.leaf(&next)?.len();
    path = next;
  }
  Some(Point::new(path, offset))
}

pub fn normalize_range(editor: &Editor, range: &Range) -> Option<Range> {
  let anchor = normalize_point(editor, &range.anchor)?;
  if range.is_collapsed() {
    return Some(Range::collapsed(anchor));
  }
  let focus = normalize_point(editor, &range.focus)?;
  Some(Range::new(anchor, focus))
}
