//! The editor: a document tree plus selection, refs and change listeners.
//!
//! [`Editor::apply`] is the only way to mutate the document. Each call is
//! one atomic step: the tree is mutated (or the operation is rejected with
//! nothing changed), the selection and all refs are transformed through the
//! same operation, and the operation is appended to the current batch.
//! [`Editor::flush_change`] hands the batch to change listeners.

use std::fmt;

use serde::Serialize;
use the_core::{
  node::{
    Node,
    Properties,
  },
  operation::Operation,
  path::Path,
  point::Point,
  range::Range,
};

use crate::{
  apply::{
    Result,
    apply_to_tree,
  },
  normalize,
  refs::Refs,
  tree::NodeTree,
};

/// The operations applied since the previous notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Change {
  pub operations: Vec<Operation>,
}

impl Change {
  /// True when the batch only moved the selection.
  pub fn is_selection_only(&self) -> bool {
    !self.operations.is_empty() && self.operations.iter().all(Operation::is_selection_only)
  }

  pub fn is_content_change(&self) -> bool {
    self.operations.iter().any(|op| !op.is_selection_only())
  }
}

pub type ChangeListener = Box<dyn FnMut(&Change)>;

pub struct Editor {
  tree:        NodeTree,
  selection:   Option<Range>,
  marks:       Option<Properties>,
  operations:  Vec<Operation>,
  flushed:     usize,
  refs:        Refs,
  dirty:       Vec<Path>,
  normalizing: bool,
  listeners:   Vec<ChangeListener>,
}

impl fmt::Debug for Editor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Editor")
      .field("tree", &self.tree)
      .field("selection", &self.selection)
      .field("marks", &self.marks)
      .field("operations", &self.operations)
      .field("refs", &self.refs.len())
      .field("listeners", &self.listeners.len())
      .finish()
  }
}

impl Default for Editor {
  fn default() -> Self {
    Self::new([])
  }
}

impl Editor {
  pub fn new(children: impl IntoIterator<Item = Node>) -> Self {
    Self {
      tree:        NodeTree::new(children),
      selection:   None,
      marks:       None,
      operations:  Vec::new(),
      flushed:     0,
      refs:        Refs::default(),
      dirty:       Vec::new(),
      normalizing: true,
      listeners:   Vec::new(),
    }
  }

  #[must_use]
  pub fn with_selection(mut self, selection: Range) -> Self {
    self.selection = Some(selection);
    self
  }

  #[inline]
  pub fn tree(&self) -> &NodeTree {
    &self.tree
  }

  /// The top-level blocks as node values.
  pub fn children(&self) -> Vec<Node> {
    self.tree.children_nodes()
  }

  #[inline]
  pub fn selection(&self) -> Option<&Range> {
    self.selection.as_ref()
  }

  /// Formatting queued for the next inserted text.
  #[inline]
  pub fn pending_marks(&self) -> Option<&Properties> {
    self.marks.as_ref()
  }

  pub fn set_pending_marks(&mut self, marks: Option<Properties>) {
    self.marks = marks;
  }

  #[inline]
  pub fn refs(&self) -> &Refs {
    &self.refs
  }

  #[inline]
  pub fn refs_mut(&mut self) -> &mut Refs {
    &mut self.refs
  }

  /// Applies one operation.
  pub fn apply(&mut self, op: Operation) -> Result<()> {
    apply_to_tree(&mut self.tree, &op)?;

    match &op {
      Operation::SetSelection { new, .. } => {
        self.selection = new.clone();
        self.marks = None;
      },
      _ => {
        self.update_dirty_paths(&op);
        self.transform_selection(&op);
      },
    }
    self.refs.transform(&op);

    tracing::trace!(kind = %op.kind(), path = ?op.path(), "applied operation");
    self.operations.push(op);
    Ok(())
  }

  /// Operations applied since the last [`Editor::flush_change`].
  #[inline]
  pub fn operations(&self) -> &[Operation] {
    &self.operations
  }

  /// Total number of operations ever applied.
  #[inline]
  pub fn op_count(&self) -> usize {
    self.flushed + self.operations.len()
  }

  /// Operations applied after the editor had seen `count` operations.
  /// Anything already handed to listeners is no longer available.
  pub fn operations_since(&self, count: usize) -> &[Operation] {
    if count < self.flushed {
      tracing::warn!(
        count,
        flushed = self.flushed,
        "operations requested past a flushed batch"
      );
    }
    let start = count.saturating_sub(self.flushed).min(self.operations.len());
    &self.operations[start..]
  }

  pub fn on_change(&mut self, listener: impl FnMut(&Change) + 'static) {
    self.listeners.push(Box::new(listener));
  }

  /// Notifies listeners about the current batch and starts a new one.
  /// Returns `None` when nothing was applied.
  pub fn flush_change(&mut self) -> Option<Change> {
    if self.operations.is_empty() {
      return None;
    }
    let operations = std::mem::take(&mut self.operations);
    self.flushed += operations.len();
    let change = Change { operations };
    for listener in &mut self.listeners {
      listener(&change);
    }
    Some(change)
  }

  pub(crate) fn is_normalizing(&self) -> bool {
    self.normalizing
  }

  pub(crate) fn set_normalizing(&mut self, normalizing: bool) {
    self.normalizing = normalizing;
  }

  pub(crate) fn take_dirty_path(&mut self) -> Option<Path> {
    self.dirty.pop()
  }

  pub(crate) fn dirty_len(&self) -> usize {
    self.dirty.len()
  }

  pub(crate) fn mark_dirty(&mut self, path: Path) {
    if !self.dirty.contains(&path) {
      self.dirty.push(path);
    }
  }

  fn update_dirty_paths(&mut self, op: &Operation) {
    let previous = std::mem::take(&mut self.dirty);
    for path in previous
      .into_iter()
      .filter_map(|path| path.transform(op))
      .chain(normalize::dirty_paths(op))
    {
      self.mark_dirty(path);
    }
  }

  fn transform_selection(&mut self, op: &Operation) {
    let Some(selection) = self.selection.take() else {
      return;
    };

    let anchor = self.transform_point(&selection.anchor, op);
    let focus = self.transform_point(&selection.focus, op);
    self.selection = match (anchor, focus) {
      (Some(anchor), Some(focus)) => Some(Range { anchor, focus }),
      _ => {
        tracing::debug!(kind = %op.kind(), "selection no longer resolves, deselecting");
        None
      },
    };
  }

  fn transform_point(&self, point: &Point, op: &Operation) -> Option<Point> {
    if let Some(point) = point.transform(op) {
      return Some(point);
    }
    match op {
      Operation::RemoveNode { path, .. } => self.resolve_removed(path),
      _ => None,
    }
  }

  /// Picks the text a point should land on once the node at `removed` (which
  /// contained it) is gone: the nearest previous text, unless the next one is
  /// the closer relative of the removed node.
  fn resolve_removed(&self, removed: &Path) -> Option<Point> {
    let texts = self.tree.texts();
    let split = texts.partition_point(|(path, _)| path.is_before(removed));
    let prev = split.checked_sub(1).and_then(|i| texts.get(i));
    let next = texts.get(split);

    let prefer_next = match (prev, next) {
      (Some((prev, _)), Some((next, _))) => {
        if next == removed {
          !next.has_previous()
        } else {
          prev.common(removed).len() < next.common(removed).len()
        }
      },
      _ => false,
    };

    match (prev, next) {
      (Some((path, id)), _) if !prefer_next => {
        let len = self.tree.text(*id).map(|t| t.len()).unwrap_or(0);
        Some(Point::new(path.clone(), len))
      },
      (_, Some((path, _))) => Some(Point::new(path.clone(), 0)),
      _ => None,
    }
  }
}
