//! Keeping the tree in canonical shape.
//!
//! Every applied operation marks the paths it may have left unnormalized.
//! [`Editor::normalize`] pops those paths and fixes one problem at a time
//! until nothing is dirty:
//!
//! - a non-root element without children gets an empty text,
//! - adjacent texts with equal marks are merged,
//! - an empty text next to a differently marked text is removed.
//!
//! Raw [`Editor::apply`] never normalizes; commands do it once at the end.
//! Single operations from outside a command go through
//! [`Editor::apply_normalized`].

use the_core::{
  node::Node,
  operation::Operation,
  path::Path,
};

use crate::{
  apply::Result,
  editor::Editor,
};

/// How many fixes each initially dirty path may trigger before we assume
/// the rules are fighting each other.
const ITERATIONS_PER_PATH: usize = 42;

/// Paths `op` may have left unnormalized, in post-operation coordinates.
pub(crate) fn dirty_paths(op: &Operation) -> Vec<Path> {
  match op {
    Operation::InsertText { path, .. }
    | Operation::RemoveText { path, .. }
    | Operation::SetNode { path, .. } => path.levels(),

    Operation::InsertNode { path, node } => {
      let mut paths = path.levels();
      collect_descendants(node, path, &mut paths);
      paths
    },

    Operation::MergeNode { path, .. } => {
      let mut paths = path.ancestors();
      paths.extend(path.previous());
      paths
    },

    Operation::MoveNode { path, new_path } => {
      if path == new_path {
        return Vec::new();
      }
      let mut paths: Vec<Path> = path
        .ancestors()
        .into_iter()
        .filter_map(|ancestor| ancestor.transform(op))
        .collect();
      let new_ancestors: Vec<Path> = new_path
        .ancestors()
        .into_iter()
        .filter_map(|ancestor| ancestor.transform(op))
        .collect();
      if let (Some(parent), Some(index)) = (new_ancestors.last(), new_path.last()) {
        let landed = parent.child(index);
        paths.extend(new_ancestors.iter().cloned());
        paths.push(landed);
      }
      paths
    },

    Operation::RemoveNode { path, .. } => path.ancestors(),

    Operation::SplitNode { path, .. } => {
      let mut paths = path.levels();
      paths.extend(path.next());
      paths
    },

    Operation::SetSelection { .. } => Vec::new(),
  }
}

fn collect_descendants(node: &Node, path: &Path, out: &mut Vec<Path>) {
  for (index, child) in node.children().iter().enumerate() {
    let child_path = path.child(index);
    collect_descendants(child, &child_path, out);
    out.push(child_path);
  }
}

impl Editor {
  /// Fixes every dirty path. Does nothing while normalization is suspended
  /// by [`Editor::without_normalizing`].
  pub fn normalize(&mut self) -> Result<()> {
    if !self.is_normalizing() {
      return Ok(());
    }

    let budget = self.dirty_len().max(1) * ITERATIONS_PER_PATH;
    let mut fixes = 0;
    while let Some(path) = self.take_dirty_path() {
      if self.normalize_node(&path)? {
        fixes += 1;
        if fixes > budget {
          tracing::warn!(fixes, "normalization did not settle, giving up");
          break;
        }
      }
    }
    Ok(())
  }

  /// Applies `op`, then normalizes every path it left dirty. Inside
  /// [`Editor::without_normalizing`] this is the same as a raw apply.
  pub fn apply_normalized(&mut self, op: Operation) -> Result<()> {
    self.apply(op)?;
    self.normalize()
  }

  /// Marks the whole document dirty and normalizes it.
  pub fn normalize_all(&mut self) -> Result<()> {
    let paths: Vec<Path> = self
      .tree()
      .descendants(self.tree().root())
      .into_iter()
      .map(|(path, _)| path)
      .collect();
    self.mark_dirty(Path::root());
    for path in paths {
      self.mark_dirty(path);
    }
    self.normalize()
  }

  /// Runs `f` with normalization suspended, then normalizes once.
  pub fn without_normalizing<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
    let was = self.is_normalizing();
    self.set_normalizing(false);
    let result = f(self);
    self.set_normalizing(was);
    let value = result?;
    self.normalize()?;
    Ok(value)
  }

  /// Applies at most one fix to the element at `path`. Returns whether the
  /// tree changed.
  fn normalize_node(&mut self, path: &Path) -> Result<bool> {
    let tree = self.tree();
    let Some(id) = tree.get(path) else {
      return Ok(false);
    };
    if !tree.is_element(id) {
      return Ok(false);
    }
    let children = tree.children(id).to_vec();

    if children.is_empty() {
      if path.is_root() {
        return Ok(false);
      }
      tracing::trace!(%path, "normalize: filling empty element");
      self.apply(Operation::InsertNode {
        path: path.child(0),
        node: Node::text(""),
      })?;
      return Ok(true);
    }

    for (n, pair) in children.windows(2).enumerate() {
      let tree = self.tree();
      let (Some(prev), Some(current)) = (tree.text(pair[0]), tree.text(pair[1])) else {
        continue;
      };
      let at = path.child(n + 1);

      let op = if prev.equals_marks(current) {
        Operation::MergeNode {
          path:       at,
          position:   prev.len(),
          properties: current.marks.clone(),
        }
      } else if prev.is_empty() {
        Operation::RemoveNode {
          path: path.child(n),
          node: prev.clone().into(),
        }
      } else if current.is_empty() {
        Operation::RemoveNode {
          path: at,
          node: current.clone().into(),
        }
      } else {
        continue;
      };

      tracing::trace!(%path, kind = %op.kind(), "normalize: fixing texts");
      self.apply(op)?;
      return Ok(true);
    }

    Ok(false)
  }
}

#[cfg(test)]
mod tests {
  use the_core::{
    node::{
      Element,
      Properties,
      Text,
    },
    point::Point,
    range::Range,
  };

  use super::*;

  fn texts(editor: &Editor, block: usize) -> Vec<String> {
    editor
      .node(&Path::from([block]))
      .map(|node| {
        node
          .children()
          .iter()
          .map(|child| child.string())
          .collect()
      })
      .unwrap_or_default()
  }

  #[test]
  fn merge_of_blocks_then_normalize_joins_texts() {
    let mut editor = Editor::new([
      Element::new("paragraph").with_children([Node::text("Foo")]).into(),
      Element::new("paragraph").with_children([Node::text("Bar")]).into(),
    ])
    .with_selection(Range::collapsed(Point::new([1, 0], 2)));

    editor
      .apply(Operation::MergeNode {
        path:       Path::from([1]),
        position:   1,
        properties: Properties::new(),
      })
      .unwrap();
    assert_eq!(texts(&editor, 0), vec!["Foo", "Bar"]);

    editor.normalize().unwrap();
    assert_eq!(texts(&editor, 0), vec!["FooBar"]);
    assert_eq!(
      editor.selection(),
      Some(&Range::collapsed(Point::new([0, 0], 5)))
    );
  }

  #[test]
  fn empty_element_gets_a_text() {
    let mut editor = Editor::new([Element::new("paragraph").with_children([Node::text("x")]).into()]);
    editor
      .apply(Operation::InsertNode {
        path: Path::from([1]),
        node: Element::new("paragraph").into(),
      })
      .unwrap();
    editor.normalize().unwrap();
    assert_eq!(texts(&editor, 1), vec![""]);
  }

  #[test]
  fn empty_text_beside_marked_text_is_removed() {
    let block = Element::new("paragraph").with_children([
      Node::text("plain"),
      Node::text(""),
      Text::new("bold").with_mark("bold", true).into(),
    ]);
    let mut editor = Editor::new([block.into()]);
    editor.normalize_all().unwrap();
    assert_eq!(texts(&editor, 0), vec!["plain", "bold"]);
  }

  #[test]
  fn without_normalizing_defers_until_the_end() {
    let mut editor = Editor::new([Element::new("paragraph").with_children([Node::text("ab")]).into()]);
    editor
      .without_normalizing(|editor| {
        editor.apply(Operation::SplitNode {
          path:       Path::from([0, 0]),
          position:   1,
          properties: Properties::new(),
        })?;
        editor.normalize()?;
        assert_eq!(texts(editor, 0), vec!["a", "b"]);
        Ok(())
      })
      .unwrap();
    assert_eq!(texts(&editor, 0), vec!["ab"]);
  }

  #[test]
  fn dirty_paths_for_split_cover_both_halves() {
    let op = Operation::SplitNode {
      path:       Path::from([0, 1]),
      position:   2,
      properties: Properties::new(),
    };
    assert_eq!(dirty_paths(&op), vec![
      Path::root(),
      Path::from([0]),
      Path::from([0, 1]),
      Path::from([0, 2]),
    ]);
  }
}
