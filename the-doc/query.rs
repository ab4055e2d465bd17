//! Read-only questions about the document.

use std::cmp::Ordering;

use the_core::{
  chars::{
    word_end_after,
    word_start_before,
  },
  grapheme::{
    next_grapheme_boundary,
    prev_grapheme_boundary,
  },
  node::{
    Node,
    Properties,
    Text,
  },
  path::Path,
  point::Point,
  range::Range,
};

use crate::{
  editor::Editor,
  tree::NodeId,
};

/// Distance units for cursor movement and deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Unit {
  #[default]
  Character,
  Word,
  /// Without layout information a line is the whole block.
  Line,
  Block,
}

impl Editor {
  pub fn node(&self, path: &Path) -> Option<Node> {
    let id = self.tree().get(path)?;
    self.tree().to_node(id)
  }

  pub fn has_path(&self, path: &Path) -> bool {
    self.tree().get(path).is_some()
  }

  pub fn leaf(&self, path: &Path) -> Option<&Text> {
    self.tree().get(path).and_then(|id| self.tree().text(id))
  }

  /// The concatenated text under `path`.
  pub fn string(&self, path: &Path) -> String {
    let tree = self.tree();
    let Some(id) = tree.get(path) else {
      return String::new();
    };
    tree
      .texts_under(id)
      .into_iter()
      .filter_map(|(_, text)| tree.text(text).map(|t| t.text.as_str()))
      .collect()
  }

  /// The first text at or under `path`.
  pub fn first(&self, path: &Path) -> Option<(Path, NodeId)> {
    let id = self.tree().get(path)?;
    self.tree().texts_under(id).into_iter().next()
  }

  pub fn last(&self, path: &Path) -> Option<(Path, NodeId)> {
    let id = self.tree().get(path)?;
    self.tree().texts_under(id).pop()
  }

  pub fn start(&self, path: &Path) -> Option<Point> {
    self.first(path).map(|(path, _)| Point::new(path, 0))
  }

  pub fn end(&self, path: &Path) -> Option<Point> {
    let (path, id) = self.last(path)?;
    let len = self.tree().text(id)?.len();
    Some(Point::new(path, len))
  }

  /// The range spanning the whole node at `path`.
  pub fn range(&self, path: &Path) -> Option<Range> {
    Some(Range::new(self.start(path)?, self.end(path)?))
  }

  /// Non-root elements are blocks.
  pub fn is_block(&self, path: &Path) -> bool {
    !path.is_root() && self.tree().get(path).is_some_and(|id| self.tree().is_element(id))
  }

  /// The lowest block at or above `path`.
  pub fn above_block(&self, path: &Path) -> Option<Path> {
    path
      .levels()
      .into_iter()
      .rev()
      .find(|level| self.is_block(level))
  }

  pub fn previous_text(&self, path: &Path) -> Option<Path> {
    self
      .tree()
      .texts()
      .into_iter()
      .rev()
      .find(|(text, _)| text.is_before(path))
      .map(|(text, _)| text)
  }

  pub fn next_text(&self, path: &Path) -> Option<Path> {
    self
      .tree()
      .texts()
      .into_iter()
      .find(|(text, _)| text.is_after(path))
      .map(|(text, _)| text)
  }

  /// Whether `point` addresses a text and an offset inside it.
  pub fn is_valid_point(&self, point: &Point) -> bool {
    self
      .leaf(&point.path)
      .is_some_and(|text| point.offset <= text.len())
  }

  pub fn is_valid_range(&self, range: &Range) -> bool {
    self.is_valid_point(&range.anchor) && self.is_valid_point(&range.focus)
  }

  /// The position one `unit` before `point`, or `None` at the start of the
  /// document. Stepping back from the start of a block lands on the end of
  /// the previous block.
  pub fn before(&self, point: &Point, unit: Unit) -> Option<Point> {
    let block = self.block_texts(&point.path)?;
    let offset = block.offset_of(point)?;

    if offset == 0 {
      let first = block.texts.first().map(|(path, _)| path)?;
      let prev = self.previous_text(first)?;
      let len = self.leaf(&prev)?.len();
      return Some(Point::new(prev, len));
    }

    let target = match unit {
      Unit::Character => prev_grapheme_boundary(&block.string, offset),
      Unit::Word => word_start_before(&block.string, offset),
      Unit::Line | Unit::Block => 0,
    };
    block.point_at(target, true)
  }

  /// The position one `unit` after `point`, or `None` at the end of the
  /// document.
  pub fn after(&self, point: &Point, unit: Unit) -> Option<Point> {
    let block = self.block_texts(&point.path)?;
    let offset = block.offset_of(point)?;
    let len = block.len();

    if offset >= len {
      let last = block.texts.last().map(|(path, _)| path)?;
      let next = self.next_text(last)?;
      return Some(Point::new(next, 0));
    }

    let target = match unit {
      Unit::Character => next_grapheme_boundary(&block.string, offset),
      Unit::Word => word_end_after(&block.string, offset),
      Unit::Line | Unit::Block => len,
    };
    block.point_at(target, false)
  }

  /// The formatting the next inserted character would get: pending marks if
  /// any, otherwise the marks of the text at the selection start.
  pub fn marks(&self) -> Option<Properties> {
    if let Some(marks) = self.pending_marks() {
      return Some(marks.clone());
    }
    let selection = self.selection()?;
    let start = selection.start();
    self.leaf(&start.path).map(|text| text.marks.clone())
  }

  /// The texts of the block containing `path`, in order, flattened into one
  /// string for unit arithmetic.
  pub(crate) fn block_texts(&self, path: &Path) -> Option<BlockTexts> {
    let block = self.above_block(path).unwrap_or_else(Path::root);
    let tree = self.tree();
    let id = tree.get(&block)?;
    let mut texts = Vec::new();
    let mut string = String::new();
    for (path, text) in tree.texts_under(id) {
      let text = tree.text(text)?;
      string.push_str(&text.text);
      texts.push((path, text.len()));
    }
    Some(BlockTexts { texts, string })
  }
}

/// One block's texts with their lengths, so that points and flat offsets
/// can be converted both ways.
#[derive(Debug, Clone)]
pub(crate) struct BlockTexts {
  pub(crate) texts:  Vec<(Path, usize)>,
  pub(crate) string: String,
}

impl BlockTexts {
  pub(crate) fn len(&self) -> usize {
    self.texts.iter().map(|(_, len)| len).sum()
  }

  /// Flat offset of `point` inside the block.
  pub(crate) fn offset_of(&self, point: &Point) -> Option<usize> {
    let mut offset = 0;
    for (path, len) in &self.texts {
      if *path == point.path {
        return Some(offset + point.offset.min(*len));
      }
      offset += len;
    }
    None
  }

  /// The point at flat `offset`. On a boundary between two texts
  /// `prefer_end` picks the end of the earlier one.
  pub(crate) fn point_at(&self, offset: usize, prefer_end: bool) -> Option<Point> {
    let mut start = 0;
    let last = self.texts.len().checked_sub(1)?;
    for (i, (path, len)) in self.texts.iter().enumerate() {
      let end = start + len;
      let inside = match offset.cmp(&end) {
        Ordering::Less => true,
        Ordering::Equal => prefer_end || i == last,
        Ordering::Greater => false,
      };
      if inside && offset >= start {
        return Some(Point::new(path.clone(), offset - start));
      }
      start = end;
    }
    let (path, len) = &self.texts[last];
    Some(Point::new(path.clone(), *len))
  }
}

#[cfg(test)]
mod tests {
  use the_core::node::Element;

  use super::*;

  fn editor() -> Editor {
    Editor::new([
      Element::new("paragraph")
        .with_children([
          Node::text("Hello "),
          Text::new("big").with_mark("bold", true).into(),
          Node::text(" world"),
        ])
        .into(),
      Element::new("paragraph")
        .with_children([Node::text("Bar")])
        .into(),
    ])
  }

  #[test]
  fn edges_and_strings() {
    let editor = editor();
    assert_eq!(editor.string(&Path::from([0])), "Hello big world");
    assert_eq!(editor.start(&Path::from([0])), Some(Point::new([0, 0], 0)));
    assert_eq!(editor.end(&Path::from([0])), Some(Point::new([0, 2], 6)));
    assert_eq!(
      editor.range(&Path::root()),
      Some(Range::new(Point::new([0, 0], 0), Point::new([1, 0], 3)))
    );
    assert_eq!(editor.above_block(&Path::from([0, 1])), Some(Path::from([0])));
    assert!(editor.is_block(&Path::from([1])));
    assert!(!editor.is_block(&Path::from([1, 0])));
  }

  #[test]
  fn neighbouring_texts() {
    let editor = editor();
    assert_eq!(editor.previous_text(&Path::from([1, 0])), Some(Path::from([0, 2])));
    assert_eq!(editor.next_text(&Path::from([0, 2])), Some(Path::from([1, 0])));
    assert_eq!(editor.next_text(&Path::from([1])), None);
    assert_eq!(editor.previous_text(&Path::from([0, 0])), None);
  }

  #[test]
  fn before_steps_across_text_boundaries() {
    let editor = editor();
    assert_eq!(
      editor.before(&Point::new([0, 1], 0), Unit::Character),
      Some(Point::new([0, 0], 5))
    );
    assert_eq!(
      editor.before(&Point::new([0, 2], 6), Unit::Word),
      Some(Point::new([0, 2], 1))
    );
    assert_eq!(
      editor.before(&Point::new([1, 0], 0), Unit::Character),
      Some(Point::new([0, 2], 6))
    );
    assert_eq!(
      editor.before(&Point::new([0, 2], 3), Unit::Line),
      Some(Point::new([0, 0], 0))
    );
    assert_eq!(editor.before(&Point::new([0, 0], 0), Unit::Character), None);
  }

  #[test]
  fn after_steps_forward() {
    let editor = editor();
    assert_eq!(
      editor.after(&Point::new([0, 0], 6), Unit::Word),
      Some(Point::new([0, 2], 0))
    );
    assert_eq!(
      editor.after(&Point::new([0, 2], 6), Unit::Character),
      Some(Point::new([1, 0], 0))
    );
    assert_eq!(editor.after(&Point::new([1, 0], 3), Unit::Character), None);
  }

  #[test]
  fn marks_follow_selection() {
    let editor = editor().with_selection(Range::collapsed(Point::new([0, 1], 1)));
    let marks = editor.marks().unwrap();
    assert_eq!(marks.get("bold"), Some(&serde_json::json!(true)));
  }
}
