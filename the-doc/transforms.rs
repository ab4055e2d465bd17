//! Editing commands.
//!
//! Every command here is a composition of primitive operations issued
//! through [`Editor::apply`]. Commands that issue more than one operation
//! run with normalization suspended and normalize once at the end.

use serde_json::Value;
use the_core::{
  Tendril,
  node::{
    Element,
    Node,
    Properties,
    Text,
  },
  operation::Operation,
  path::Path,
  point::{
    Affinity,
    Point,
  },
  range::{
    Range,
    RangeAffinity,
  },
  text::{
    char_len,
    slice,
  },
};

use crate::{
  apply::{
    OperationError,
    Result,
  },
  editor::Editor,
  query::Unit,
  tree::NodeId,
};

/// Which end of the selection a command works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
  Anchor,
  Focus,
  Start,
  End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
  #[default]
  Forward,
  Backward,
}

impl Editor {
  pub fn select(&mut self, range: Range) -> Result<()> {
    if self.selection() == Some(&range) {
      return Ok(());
    }
    self.apply(Operation::SetSelection {
      old: self.selection().cloned(),
      new: Some(range),
    })
  }

  pub fn deselect(&mut self) -> Result<()> {
    if self.selection().is_none() {
      return Ok(());
    }
    self.apply(Operation::SetSelection {
      old: self.selection().cloned(),
      new: None,
    })
  }

  /// Moves one end of the selection, or places a caret when there is none.
  pub fn set_selection_point(&mut self, point: Point, edge: Edge) -> Result<()> {
    let Some(mut range) = self.selection().cloned() else {
      return self.select(Range::collapsed(point));
    };
    let backward = range.is_backward();
    match (edge, backward) {
      (Edge::Anchor, _) | (Edge::Start, false) | (Edge::End, true) => range.anchor = point,
      (Edge::Focus, _) | (Edge::Start, true) | (Edge::End, false) => range.focus = point,
    }
    self.select(range)
  }

  pub fn collapse(&mut self, edge: Edge) -> Result<()> {
    let Some(range) = self.selection() else {
      return Ok(());
    };
    let point = match edge {
      Edge::Anchor => range.anchor.clone(),
      Edge::Focus => range.focus.clone(),
      Edge::Start => range.start().clone(),
      Edge::End => range.end().clone(),
    };
    self.select(Range::collapsed(point))
  }

  /// Inserts `text` at the selection, replacing it when expanded. Pending
  /// marks that differ from the surrounding text produce a new text node.
  pub fn insert_text(&mut self, text: &str) -> Result<()> {
    let marks = self.pending_marks().cloned();
    self.without_normalizing(|editor| {
      let Some(selection) = editor.selection().cloned() else {
        return Ok(());
      };
      if selection.is_expanded() {
        editor.delete_fragment(Direction::Forward)?;
      }
      let Some(point) = editor.selection().map(|s| s.anchor.clone()) else {
        return Ok(());
      };
      if text.is_empty() {
        return Ok(());
      }

      let leaf_marks = editor.leaf(&point.path).map(|t| t.marks.clone());
      match marks {
        Some(marks) if Some(&marks) != leaf_marks.as_ref() => {
          editor.insert_marked_text(&point, text, marks)?;
        },
        _ => {
          editor.apply(Operation::InsertText {
            path:   point.path.clone(),
            offset: point.offset,
            text:   Tendril::from(text),
          })?;
        },
      }
      editor.set_pending_marks(None);
      Ok(())
    })
  }

  fn insert_marked_text(&mut self, point: &Point, text: &str, marks: Properties) -> Result<()> {
    let leaf = self
      .leaf(&point.path)
      .cloned()
      .ok_or_else(|| OperationError::ExpectedText(point.path.clone()))?;
    let index = point.path.last().unwrap_or_default();
    let parent = point
      .path
      .parent()
      .ok_or(OperationError::RootMutation("insert text into"))?;

    let at = if point.offset == 0 {
      parent.child(index)
    } else {
      if point.offset < leaf.len() {
        self.apply(Operation::SplitNode {
          path:       point.path.clone(),
          position:   point.offset,
          properties: leaf.marks.clone(),
        })?;
      }
      parent.child(index + 1)
    };

    self.apply(Operation::InsertNode {
      path: at.clone(),
      node: Text {
        text: text.into(),
        marks,
      }
      .into(),
    })?;
    self.select(Range::collapsed(Point::new(at, char_len(text))))
  }

  /// Deletes the selected content and collapses the selection.
  pub fn delete_fragment(&mut self, direction: Direction) -> Result<()> {
    let Some(selection) = self.selection().cloned() else {
      return Ok(());
    };
    if selection.is_collapsed() {
      return Ok(());
    }
    tracing::trace!(?direction, "delete fragment");
    self.without_normalizing(|editor| {
      if let Some(point) = editor.delete_range(&selection)? {
        editor.select(Range::collapsed(point))?;
      }
      Ok(())
    })
  }

  pub fn delete_backward(&mut self, unit: Unit) -> Result<()> {
    self.delete_by(unit, Direction::Backward)
  }

  pub fn delete_forward(&mut self, unit: Unit) -> Result<()> {
    self.delete_by(unit, Direction::Forward)
  }

  fn delete_by(&mut self, unit: Unit, direction: Direction) -> Result<()> {
    let Some(selection) = self.selection().cloned() else {
      return Ok(());
    };
    if selection.is_expanded() {
      return self.delete_fragment(direction);
    }

    let point = selection.anchor;
    let target = match direction {
      Direction::Backward => self.before(&point, unit),
      Direction::Forward => self.after(&point, unit),
    };
    let Some(target) = target else {
      return Ok(());
    };

    self.without_normalizing(|editor| {
      if let Some(point) = editor.delete_range(&Range::new(target, point))? {
        editor.select(Range::collapsed(point))?;
      }
      Ok(())
    })
  }

  /// Removes everything inside `range`, joining the blocks at both ends.
  /// Returns where the range collapsed to. Does not touch the selection
  /// beyond transforming it.
  pub fn delete_range(&mut self, range: &Range) -> Result<Option<Point>> {
    let (start, end) = range.edges();
    let (start, end) = (start.clone(), end.clone());
    if start == end {
      return Ok(Some(start));
    }

    self.without_normalizing(|editor| {
      if start.path == end.path {
        let leaf = editor
          .leaf(&start.path)
          .ok_or_else(|| OperationError::ExpectedText(start.path.clone()))?;
        let removed = slice(&leaf.text, start.offset, end.offset).into();
        editor.apply(Operation::RemoveText {
          path:   start.path.clone(),
          offset: start.offset,
          text:   removed,
        })?;
        return Ok(Some(start));
      }

      let start_block = editor.above_block(&start.path);
      let end_block = editor.above_block(&end.path);
      let start_ref = editor.refs_mut().point(start.clone(), Some(Affinity::Backward));
      let end_ref = editor.refs_mut().point(end.clone(), Some(Affinity::Forward));
      let start_block_ref = start_block.map(|p| editor.refs_mut().path(p, None));
      let end_block_ref = end_block.map(|p| editor.refs_mut().path(p, None));

      // Whole nodes strictly between the two ends, highest first, removed
      // back to front so earlier paths stay valid.
      let tree = editor.tree();
      let mut between: Vec<Path> = Vec::new();
      for (path, _) in tree.descendants(tree.root()) {
        let inside = path.is_after(&start.path) && path.is_before(&end.path);
        if inside && !between.iter().any(|outer| outer.is_ancestor(&path)) {
          between.push(path);
        }
      }
      for path in between.into_iter().rev() {
        let node = editor
          .node(&path)
          .ok_or_else(|| OperationError::PathNotFound(path.clone()))?;
        editor.apply(Operation::RemoveNode { path, node })?;
      }

      if let Some(end) = editor.refs().point_current(end_ref).cloned() {
        if end.offset > 0 {
          let removed = editor
            .leaf(&end.path)
            .map(|t| Tendril::from(slice(&t.text, 0, end.offset)))
            .unwrap_or_default();
          editor.apply(Operation::RemoveText {
            path: end.path.clone(),
            offset: 0,
            text: removed,
          })?;
        }
      }

      if let Some(start) = editor.refs().point_current(start_ref).cloned() {
        let tail = editor
          .leaf(&start.path)
          .map(|t| Tendril::from(slice(&t.text, start.offset, t.len())))
          .unwrap_or_default();
        if !tail.is_empty() {
          editor.apply(Operation::RemoveText {
            path:   start.path.clone(),
            offset: start.offset,
            text:   tail,
          })?;
        }
      }

      let start_block = start_block_ref.and_then(|r| editor.refs_mut().unref_path(r));
      let end_block = end_block_ref.and_then(|r| editor.refs_mut().unref_path(r));
      if let (Some(start_block), Some(end_block)) = (start_block, end_block) {
        if start_block != end_block {
          editor.join_blocks(&start_block, &end_block)?;
        }
      }

      let start = editor.refs_mut().unref_point(start_ref);
      let end = editor.refs_mut().unref_point(end_ref);
      Ok(start.or(end))
    })
  }

  /// Moves the content of `end` to the end of `start` and drops `end`.
  fn join_blocks(&mut self, start: &Path, end: &Path) -> Result<()> {
    let start_len = self.tree().children(self.tree().resolve(start)?).len();

    if start.next().as_ref() == Some(end) {
      let id = self.tree().resolve(end)?;
      let properties = self.tree().properties(id).cloned().unwrap_or_default();
      return self.apply(Operation::MergeNode {
        path: end.clone(),
        position: start_len,
        properties,
      });
    }

    let end_ref = self.refs_mut().path(end.clone(), None);
    let start_id = self.tree().resolve(start)?;
    loop {
      let Some(end) = self.refs().path_current(end_ref).cloned() else {
        break;
      };
      let end_id = self.tree().resolve(&end)?;
      if self.tree().children(end_id).is_empty() {
        let node = self
          .node(&end)
          .ok_or_else(|| OperationError::PathNotFound(end.clone()))?;
        self.apply(Operation::RemoveNode { path: end, node })?;
        break;
      }
      let start = self
        .tree()
        .path_of(start_id)
        .ok_or_else(|| OperationError::PathNotFound(start.clone()))?;
      let len = self.tree().children(start_id).len();
      self.apply(Operation::MoveNode {
        path:     end.child(0),
        new_path: start.child(len),
      })?;
    }
    self.refs_mut().unref_path(end_ref);
    Ok(())
  }

  /// Splits the block at the selection, moving the caret into the new block.
  pub fn insert_break(&mut self) -> Result<()> {
    self.without_normalizing(|editor| {
      if editor.selection().is_some_and(Range::is_expanded) {
        editor.delete_fragment(Direction::Forward)?;
      }
      let Some(point) = editor.selection().map(|s| s.anchor.clone()) else {
        return Ok(());
      };
      let Some(block) = editor.above_block(&point.path) else {
        return Ok(());
      };

      let marks = editor
        .leaf(&point.path)
        .map(|t| t.marks.clone())
        .unwrap_or_default();
      editor.apply(Operation::SplitNode {
        path:       point.path.clone(),
        position:   point.offset,
        properties: marks,
      })?;

      // Split every ancestor up to and including the block right after the
      // child that now holds the tail.
      let Some(mut tail) = point.path.next() else {
        return Ok(());
      };
      while let Some(current) = tail.parent() {
        if !block.is_common(&current) {
          break;
        }
        let id = editor.tree().resolve(&current)?;
        let properties = editor.tree().properties(id).cloned().unwrap_or_default();
        editor.apply(Operation::SplitNode {
          path: current.clone(),
          position: tail.last().unwrap_or_default(),
          properties,
        })?;
        if current == block {
          break;
        }
        match current.next() {
          Some(next) => tail = next,
          None => break,
        }
      }
      Ok(())
    })
  }

  pub fn insert_soft_break(&mut self) -> Result<()> {
    self.insert_text("\n")
  }

  /// Inserts `nodes` at `at`, or after the selected block when `at` is
  /// `None`, in which case the caret moves to the end of the last one.
  pub fn insert_nodes(&mut self, nodes: Vec<Node>, at: Option<Path>) -> Result<()> {
    let explicit = at.is_some();
    let at = match at {
      Some(at) => at,
      None => {
        let block = self
          .selection()
          .and_then(|s| self.above_block(&s.anchor.path))
          .and_then(|block| block.first().map(|&top| Path::from([top + 1])));
        block.unwrap_or_else(|| Path::from([self.tree().children(self.tree().root()).len()]))
      },
    };
    let (Some(parent), Some(index)) = (at.parent(), at.last()) else {
      return Err(OperationError::RootMutation("insert at"));
    };

    self.without_normalizing(|editor| {
      let mut last = None;
      for (i, node) in nodes.into_iter().enumerate() {
        let path = parent.child(index + i);
        editor.apply(Operation::InsertNode {
          path: path.clone(),
          node,
        })?;
        last = Some(path);
      }
      if !explicit && editor.selection().is_some() {
        if let Some(end) = last.and_then(|path| editor.end(&path)) {
          editor.select(Range::collapsed(end))?;
        }
      }
      Ok(())
    })
  }

  pub fn remove_nodes(&mut self, at: &Path) -> Result<()> {
    let node = self
      .node(at)
      .ok_or_else(|| OperationError::PathNotFound(at.clone()))?;
    self.without_normalizing(|editor| {
      editor.apply(Operation::RemoveNode {
        path: at.clone(),
        node,
      })
    })
  }

  /// Sets properties on the node at `at`, recording the old values.
  pub fn set_nodes(&mut self, at: &Path, props: Properties) -> Result<()> {
    let id = self.tree().resolve(at)?;
    let current = self.tree().properties(id).cloned().unwrap_or_default();
    let mut properties = Properties::new();
    let mut new_properties = Properties::new();
    for (key, value) in props {
      match current.get(&key) {
        Some(old) if *old == value => continue,
        Some(old) => {
          properties.insert(key.clone(), old.clone());
        },
        None => {},
      }
      new_properties.insert(key, value);
    }
    if new_properties.is_empty() {
      return Ok(());
    }
    self.without_normalizing(|editor| {
      editor.apply(Operation::SetNode {
        path: at.clone(),
        properties,
        new_properties,
      })
    })
  }

  pub fn unset_nodes(&mut self, at: &Path, keys: &[&str]) -> Result<()> {
    let id = self.tree().resolve(at)?;
    let current = self.tree().properties(id).cloned().unwrap_or_default();
    let mut properties = Properties::new();
    let mut new_properties = Properties::new();
    for key in keys {
      if let Some(old) = current.get(*key) {
        properties.insert((*key).to_string(), old.clone());
        new_properties.insert((*key).to_string(), Value::Null);
      }
    }
    if new_properties.is_empty() {
      return Ok(());
    }
    self.without_normalizing(|editor| {
      editor.apply(Operation::SetNode {
        path: at.clone(),
        properties,
        new_properties,
      })
    })
  }

  /// Merges the node at `at` into its previous sibling.
  pub fn merge_nodes(&mut self, at: &Path) -> Result<()> {
    let prev_path = at
      .previous()
      .ok_or_else(|| OperationError::NoPreviousSibling(at.clone()))?;
    let tree = self.tree();
    let prev = tree.resolve(&prev_path)?;
    let id = tree.resolve(at)?;
    let position = match tree.text(prev) {
      Some(text) => text.len(),
      None => tree.children(prev).len(),
    };
    let properties = tree.properties(id).cloned().unwrap_or_default();
    self.without_normalizing(|editor| {
      editor.apply(Operation::MergeNode {
        path: at.clone(),
        position,
        properties,
      })
    })
  }

  pub fn move_nodes(&mut self, at: &Path, to: &Path) -> Result<()> {
    self.without_normalizing(|editor| {
      editor.apply(Operation::MoveNode {
        path:     at.clone(),
        new_path: to.clone(),
      })
    })
  }

  /// Splits the node at `at` at `position`; the new sibling inherits the
  /// node's properties.
  pub fn split_nodes(&mut self, at: &Path, position: usize) -> Result<()> {
    let id = self.tree().resolve(at)?;
    let properties = self.tree().properties(id).cloned().unwrap_or_default();
    self.without_normalizing(|editor| {
      editor.apply(Operation::SplitNode {
        path: at.clone(),
        position,
        properties,
      })
    })
  }

  /// Wraps `count` siblings starting at `at` in `element`.
  pub fn wrap_nodes(&mut self, element: Element, at: &Path, count: usize) -> Result<()> {
    let wrapper = Element {
      children:   Vec::new(),
      properties: element.properties,
    };
    self.without_normalizing(|editor| {
      editor.apply(Operation::InsertNode {
        path: at.clone(),
        node: wrapper.into(),
      })?;
      let Some(source) = at.next() else {
        return Ok(());
      };
      for i in 0..count {
        editor.apply(Operation::MoveNode {
          path:     source.clone(),
          new_path: at.child(i),
        })?;
      }
      Ok(())
    })
  }

  /// Replaces the element at `at` with its children.
  pub fn unwrap_nodes(&mut self, at: &Path) -> Result<()> {
    let id = self.tree().resolve(at)?;
    if !self.tree().is_element(id) || at.is_root() {
      return Err(OperationError::ExpectedElement(at.clone()));
    }
    let count = self.tree().children(id).len();
    let (Some(parent), Some(index)) = (at.parent(), at.last()) else {
      return Err(OperationError::RootMutation("unwrap"));
    };
    self.without_normalizing(|editor| {
      for i in 0..count {
        let wrapper = parent.child(index + i);
        editor.apply(Operation::MoveNode {
          path:     wrapper.child(0),
          new_path: wrapper,
        })?;
      }
      let wrapper = parent.child(index + count);
      let node = editor
        .node(&wrapper)
        .ok_or_else(|| OperationError::PathNotFound(wrapper.clone()))?;
      editor.apply(Operation::RemoveNode {
        path: wrapper,
        node,
      })
    })
  }

  /// Adds a mark to the selected text, or to the pending marks when the
  /// selection is collapsed.
  pub fn add_mark(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
    self.change_mark(key, Some(value.into()))
  }

  pub fn remove_mark(&mut self, key: &str) -> Result<()> {
    self.change_mark(key, None)
  }

  pub fn toggle_mark(&mut self, key: &str) -> Result<()> {
    let active = self
      .marks()
      .and_then(|marks| marks.get(key).cloned())
      .is_some_and(|value| value == Value::Bool(true));
    if active {
      self.remove_mark(key)
    } else {
      self.add_mark(key, true)
    }
  }

  fn change_mark(&mut self, key: &str, value: Option<Value>) -> Result<()> {
    let Some(selection) = self.selection().cloned() else {
      return Ok(());
    };

    if selection.is_collapsed() {
      let mut marks = self.marks().unwrap_or_default();
      match value {
        Some(value) => marks.insert(key.to_string(), value),
        None => marks.remove(key),
      };
      self.set_pending_marks(Some(marks));
      return Ok(());
    }

    let range_ref = self
      .refs_mut()
      .range(selection.clone(), RangeAffinity::Inward);
    let result = self.without_normalizing(|editor| editor.mark_range(&selection, key, value));
    let restored = self.refs_mut().unref_range(range_ref);
    result?;
    if let Some(range) = restored {
      self.select(range)?;
    }
    Ok(())
  }

  /// Splits the texts at the range edges and sets `key` on every text fully
  /// inside the range.
  fn mark_range(&mut self, range: &Range, key: &str, value: Option<Value>) -> Result<()> {
    let (start, end) = range.edges();
    let (start, end) = (start.clone(), end.clone());
    let start_id = self.tree().resolve(&start.path)?;
    let end_id = self.tree().resolve(&end.path)?;
    let same = start_id == end_id;

    let end_len = self.text_len(end_id);
    if end.offset > 0 && end.offset < end_len {
      self.split_text(&end.path, end.offset)?;
    }

    let mut first = start_id;
    let mut skip_first = false;
    let start_len = self.text_len(start_id);
    if start.offset > 0 && start.offset < start_len {
      self.split_text(&start.path, start.offset)?;
      let tail = start
        .path
        .next()
        .ok_or_else(|| OperationError::PathNotFound(start.path.clone()))?;
      first = self.tree().resolve(&tail)?;
    } else if start.offset > 0 {
      skip_first = true;
    }
    let last = if same { first } else { end_id };
    let skip_last = !same && end.offset == 0;

    let texts = self.tree().texts();
    let (Some(from), Some(to)) = (
      texts.iter().position(|(_, id)| *id == first),
      texts.iter().position(|(_, id)| *id == last),
    ) else {
      return Ok(());
    };
    let from = from + usize::from(skip_first);
    let Some(to) = to.checked_sub(usize::from(skip_last)) else {
      return Ok(());
    };

    for (path, id) in texts.iter().take(to + 1).skip(from) {
      let old = self
        .tree()
        .properties(*id)
        .and_then(|marks| marks.get(key).cloned());
      if old == value {
        continue;
      }
      let mut properties = Properties::new();
      if let Some(old) = old {
        properties.insert(key.to_string(), old);
      }
      let mut new_properties = Properties::new();
      new_properties.insert(key.to_string(), value.clone().unwrap_or(Value::Null));
      self.apply(Operation::SetNode {
        path: path.clone(),
        properties,
        new_properties,
      })?;
    }
    Ok(())
  }

  fn text_len(&self, id: NodeId) -> usize {
    self.tree().text(id).map(Text::len).unwrap_or(0)
  }

  fn split_text(&mut self, path: &Path, position: usize) -> Result<()> {
    let marks = self
      .leaf(path)
      .map(|t| t.marks.clone())
      .unwrap_or_default();
    self.apply(Operation::SplitNode {
      path: path.clone(),
      position,
      properties: marks,
    })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn paragraph(texts: &[&str]) -> Node {
    Element::new("paragraph")
      .with_children(texts.iter().map(|t| Node::text(t)))
      .into()
  }

  fn blocks(editor: &Editor) -> Vec<Vec<String>> {
    editor
      .children()
      .iter()
      .map(|block| block.children().iter().map(Node::string).collect())
      .collect()
  }

  fn caret(path: &[usize], offset: usize) -> Range {
    Range::collapsed(Point::new(path, offset))
  }

  #[test]
  fn insert_text_at_caret() {
    let mut editor = Editor::new([paragraph(&["Hello"])]).with_selection(caret(&[0, 0], 5));
    editor.insert_text(" world").unwrap();
    assert_eq!(blocks(&editor), vec![vec!["Hello world"]]);
    assert_eq!(editor.selection(), Some(&caret(&[0, 0], 11)));
  }

  #[test]
  fn insert_text_replaces_expanded_selection() {
    let mut editor = Editor::new([paragraph(&["Hello world"])]).with_selection(Range::new(
      Point::new([0, 0], 6),
      Point::new([0, 0], 11),
    ));
    editor.insert_text("there").unwrap();
    assert_eq!(blocks(&editor), vec![vec!["Hello there"]]);
    assert_eq!(editor.selection(), Some(&caret(&[0, 0], 11)));
  }

  #[test]
  fn insert_text_with_pending_marks_makes_a_new_leaf() {
    let mut editor = Editor::new([paragraph(&["Hello"])]).with_selection(caret(&[0, 0], 2));
    editor.add_mark("bold", true).unwrap();
    editor.insert_text("X").unwrap();

    assert_eq!(blocks(&editor), vec![vec!["He", "X", "llo"]]);
    assert_eq!(
      editor.leaf(&Path::from([0, 1])).unwrap().marks.get("bold"),
      Some(&json!(true))
    );
    assert_eq!(editor.selection(), Some(&caret(&[0, 1], 1)));
    assert!(editor.pending_marks().is_none());
  }

  #[test]
  fn delete_backward_character_and_word() {
    let mut editor =
      Editor::new([paragraph(&["Hello world"])]).with_selection(caret(&[0, 0], 11));
    editor.delete_backward(Unit::Character).unwrap();
    assert_eq!(blocks(&editor), vec![vec!["Hello worl"]]);
    editor.delete_backward(Unit::Word).unwrap();
    assert_eq!(blocks(&editor), vec![vec!["Hello "]]);
    assert_eq!(editor.selection(), Some(&caret(&[0, 0], 6)));
  }

  #[test]
  fn delete_backward_at_block_start_joins_blocks() {
    let mut editor = Editor::new([paragraph(&["Foo"]), paragraph(&["Bar"])])
      .with_selection(caret(&[1, 0], 0));
    editor.delete_backward(Unit::Character).unwrap();
    assert_eq!(blocks(&editor), vec![vec!["FooBar"]]);
    assert_eq!(editor.selection(), Some(&caret(&[0, 0], 3)));
  }

  #[test]
  fn delete_forward_at_document_end_is_noop() {
    let mut editor = Editor::new([paragraph(&["ab"])]).with_selection(caret(&[0, 0], 2));
    editor.delete_forward(Unit::Character).unwrap();
    assert_eq!(blocks(&editor), vec![vec!["ab"]]);
  }

  #[test]
  fn delete_fragment_across_blocks() {
    let mut editor = Editor::new([
      paragraph(&["Hello"]),
      paragraph(&["middle"]),
      paragraph(&["world"]),
    ])
    .with_selection(Range::new(Point::new([0, 0], 2), Point::new([2, 0], 3)));
    editor.delete_fragment(Direction::Forward).unwrap();
    assert_eq!(blocks(&editor), vec![vec!["Held"]]);
    assert_eq!(editor.selection(), Some(&caret(&[0, 0], 2)));
  }

  #[test]
  fn insert_break_splits_block() {
    let mut editor =
      Editor::new([paragraph(&["Hello world"])]).with_selection(caret(&[0, 0], 5));
    editor.insert_break().unwrap();
    assert_eq!(blocks(&editor), vec![vec!["Hello"], vec![" world"]]);
    assert_eq!(editor.selection(), Some(&caret(&[1, 0], 0)));
    assert_eq!(
      editor.node(&Path::from([1])).unwrap().properties().get("type"),
      Some(&json!("paragraph"))
    );
  }

  #[test]
  fn insert_break_at_end_leaves_empty_block() {
    let mut editor = Editor::new([paragraph(&["Hi"])]).with_selection(caret(&[0, 0], 2));
    editor.insert_break().unwrap();
    assert_eq!(blocks(&editor), vec![vec!["Hi"], vec![""]]);
    assert_eq!(editor.selection(), Some(&caret(&[1, 0], 0)));
  }

  #[test]
  fn soft_break_inserts_newline() {
    let mut editor = Editor::new([paragraph(&["ab"])]).with_selection(caret(&[0, 0], 1));
    editor.insert_soft_break().unwrap();
    assert_eq!(blocks(&editor), vec![vec!["a\nb"]]);
  }

  #[test]
  fn add_mark_over_range_splits_texts() {
    let mut editor = Editor::new([paragraph(&["Hello world"])])
      .with_selection(Range::new(Point::new([0, 0], 6), Point::new([0, 0], 11)));
    editor.add_mark("bold", true).unwrap();
    assert_eq!(blocks(&editor), vec![vec!["Hello ", "world"]]);
    assert_eq!(
      editor.selection(),
      Some(&Range::new(Point::new([0, 1], 0), Point::new([0, 1], 5)))
    );

    editor.toggle_mark("bold").unwrap();
    assert_eq!(blocks(&editor), vec![vec!["Hello world"]]);
  }

  #[test]
  fn mark_in_the_middle_of_a_text() {
    let mut editor = Editor::new([paragraph(&["abcde"])])
      .with_selection(Range::new(Point::new([0, 0], 1), Point::new([0, 0], 3)));
    editor.add_mark("italic", true).unwrap();
    assert_eq!(blocks(&editor), vec![vec!["a", "bc", "de"]]);
    assert!(editor.leaf(&Path::from([0, 1])).unwrap().marks.contains_key("italic"));
    assert!(!editor.leaf(&Path::from([0, 2])).unwrap().marks.contains_key("italic"));
  }

  #[test]
  fn set_and_unset_nodes() {
    let mut editor = Editor::new([paragraph(&["x"])]);
    let mut props = Properties::new();
    props.insert("align".into(), json!("center"));
    editor.set_nodes(&Path::from([0]), props).unwrap();
    let op = editor.operations().last().unwrap().clone();
    assert_eq!(op.kind().as_str(), "set_node");

    editor.unset_nodes(&Path::from([0]), &["align"]).unwrap();
    let node = editor.node(&Path::from([0])).unwrap();
    assert!(!node.properties().contains_key("align"));
  }

  #[test]
  fn wrap_and_unwrap_round_trip() {
    let mut editor = Editor::new([paragraph(&["a"]), paragraph(&["b"]), paragraph(&["c"])]);
    editor
      .wrap_nodes(Element::new("quote"), &Path::from([0]), 2)
      .unwrap();
    let quote = editor.node(&Path::from([0])).unwrap();
    assert_eq!(quote.children().len(), 2);
    assert_eq!(editor.string(&Path::from([0])), "ab");
    assert_eq!(editor.string(&Path::from([1])), "c");

    editor.unwrap_nodes(&Path::from([0])).unwrap();
    assert_eq!(blocks(&editor), vec![vec!["a"], vec!["b"], vec!["c"]]);
    assert!(editor.tree().validate().is_ok());
  }

  #[test]
  fn insert_nodes_after_selected_block() {
    let mut editor =
      Editor::new([paragraph(&["a"]), paragraph(&["c"])]).with_selection(caret(&[0, 0], 1));
    editor.insert_nodes(vec![paragraph(&["b"])], None).unwrap();
    assert_eq!(blocks(&editor), vec![vec!["a"], vec!["b"], vec!["c"]]);
    assert_eq!(editor.selection(), Some(&caret(&[1, 0], 1)));
  }

  #[test]
  fn merge_and_split_nodes() {
    let mut editor = Editor::new([paragraph(&["Foo"]), paragraph(&["Bar"])]);
    editor.merge_nodes(&Path::from([1])).unwrap();
    assert_eq!(blocks(&editor), vec![vec!["FooBar"]]);
    editor.split_nodes(&Path::from([0]), 0).unwrap();
    assert_eq!(editor.children().len(), 2);
  }

  #[test]
  fn select_and_collapse() {
    let mut editor = Editor::new([paragraph(&["Hello"])]);
    editor.set_selection_point(Point::new([0, 0], 1), Edge::Anchor).unwrap();
    editor.set_selection_point(Point::new([0, 0], 4), Edge::Focus).unwrap();
    assert!(editor.selection().unwrap().is_expanded());
    editor.collapse(Edge::Start).unwrap();
    assert_eq!(editor.selection(), Some(&caret(&[0, 0], 1)));
    editor.deselect().unwrap();
    assert_eq!(editor.selection(), None);
  }
}
