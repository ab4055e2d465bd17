//! Translating between native selection coordinates and document points.
//!
//! A native point is a rendered handle plus an offset. On a text or leaf
//! handle the offset counts chars into that text; on an element handle it
//! is a child boundary, as in a DOM selection anchored on an element.
//!
//! Text offsets are not clamped: while diffs are pending the native text is
//! longer than the document text, and `diff::normalize_point` resolves
//! those overhanging offsets once the caller knows which coordinates apply.

use std::hash::Hash;

use the_doc::{
  NodeId,
  NodeTree,
  Point,
  Range,
};

use crate::handles::{
  HandleMap,
  HandleTarget,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativePoint<H> {
  pub handle: H,
  pub offset: usize,
}

impl<H> NativePoint<H> {
  pub fn new(handle: H, offset: usize) -> Self {
    Self { handle, offset }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeRange<H> {
  pub anchor: NativePoint<H>,
  pub focus:  NativePoint<H>,
}

impl<H: Copy + PartialEq> NativeRange<H> {
  pub fn new(anchor: NativePoint<H>, focus: NativePoint<H>) -> Self {
    Self { anchor, focus }
  }

  pub fn collapsed(point: NativePoint<H>) -> Self {
    Self {
      anchor: point,
      focus:  point,
    }
  }

  #[inline]
  pub fn is_collapsed(&self) -> bool {
    self.anchor == self.focus
  }
}

/// The platform side of the editable area.
pub trait NativeSurface<H> {
  /// The current native selection, if the platform has one.
  fn selection(&self) -> Option<NativeRange<H>>;

  /// Replaces the native selection; `None` removes every range.
  fn set_selection(&mut self, range: Option<NativeRange<H>>);

  fn has_focus(&self) -> bool;

  /// Re-renders everything from the document, discarding native mutations
  /// the document does not know about.
  fn force_render(&mut self) {}
}

/// Resolves a native point to a document point. Returns `None` for handles
/// that are not part of the editable content.
pub fn to_logical_point<H: Copy + Eq + Hash>(
  tree: &NodeTree,
  handles: &HandleMap<H>,
  point: &NativePoint<H>,
) -> Option<Point> {
  match handles.target_for(point.handle)? {
    HandleTarget::Leaf { text, offset } if tree.is_text(text) => {
      Some(Point::new(tree.path_of(text)?, offset + point.offset))
    },
    HandleTarget::Leaf { .. } => None,
    HandleTarget::Node(id) if tree.is_text(id) => Some(Point::new(tree.path_of(id)?, point.offset)),
    HandleTarget::Node(id) => element_boundary(tree, id, point.offset),
  }
}

/// A boundary before child `index` of an element is the start of that
/// child's first text; past the last child it is the end of the last text.
fn element_boundary(tree: &NodeTree, id: NodeId, index: usize) -> Option<Point> {
  let children = tree.children(id);
  if let Some(&child) = children.get(index) {
    let (path, _) = tree.texts_under(child).into_iter().next()?;
    return Some(Point::new(path, 0));
  }
  let (path, text) = tree.texts_under(*children.last()?).pop()?;
  let len = tree.text(text)?.len();
  Some(Point::new(path, len))
}

pub fn to_logical_range<H: Copy + Eq + Hash>(
  tree: &NodeTree,
  handles: &HandleMap<H>,
  range: &NativeRange<H>,
) -> Option<Range> {
  let anchor = to_logical_point(tree, handles, &range.anchor)?;
  let focus = if range.focus == range.anchor {
    anchor.clone()
  } else {
    to_logical_point(tree, handles, &range.focus)?
  };
  Some(Range::new(anchor, focus))
}

/// Places a document point on the leaf that renders it. On a boundary
/// between two leaves the earlier leaf wins.
pub fn to_native_point<H: Copy + Eq + Hash>(
  tree: &NodeTree,
  handles: &HandleMap<H>,
  point: &Point,
) -> Option<NativePoint<H>> {
  let id = tree.get(&point.path)?;
  let len = tree.text(id)?.len();
  let offset = point.offset.min(len);

  let leaves = handles.leaves_of(id);
  if !leaves.is_empty() {
    let (start, handle) = leaves
      .iter()
      .enumerate()
      .find(|(i, (start, _))| {
        let end = leaves.get(i + 1).map_or(len, |(next, _)| *next);
        *start <= offset && offset <= end
      })
      .map(|(_, leaf)| *leaf)
      .or_else(|| leaves.last().copied())?;
    return Some(NativePoint::new(handle, offset.saturating_sub(start)));
  }

  handles
    .handle_for(id)
    .map(|handle| NativePoint::new(handle, offset))
}

/// Converts both ends separately, so a backward range stays backward.
pub fn to_native_range<H: Copy + Eq + Hash>(
  tree: &NodeTree,
  handles: &HandleMap<H>,
  range: &Range,
) -> Option<NativeRange<H>> {
  Some(NativeRange::new(
    to_native_point(tree, handles, &range.anchor)?,
    to_native_point(tree, handles, &range.focus)?,
  ))
}

#[cfg(test)]
mod tests {
  use the_doc::{
    Editor,
    Element,
    Node,
    Text,
  };

  use super::*;

  /// One paragraph, "Hello " plus a bold "world" rendered as two leaves.
  fn fixture() -> (Editor, HandleMap<u32>) {
    let editor = Editor::new([Element::new("paragraph")
      .with_children([
        Node::text("Hello "),
        Text::new("world").with_mark("bold", true).into(),
      ])
      .into()]);
    let tree = editor.tree();
    let mut handles = HandleMap::new();
    handles.register(tree.get(&[0]).unwrap(), 1);
    handles.register(tree.get(&[0, 0]).unwrap(), 2);
    let world = tree.get(&[0, 1]).unwrap();
    handles.register(world, 3);
    handles.register_leaf(30, world, 0);
    handles.register_leaf(31, world, 3);
    (editor, handles)
  }

  #[test]
  fn leaf_offsets_are_rebased_onto_the_text() {
    let (editor, handles) = fixture();
    let tree = editor.tree();
    assert_eq!(
      to_logical_point(tree, &handles, &NativePoint::new(31, 1)),
      Some(Point::new([0, 1], 4))
    );
    assert_eq!(
      to_logical_point(tree, &handles, &NativePoint::new(2, 8)),
      Some(Point::new([0, 0], 8))
    );
  }

  #[test]
  fn element_boundaries_resolve_to_texts() {
    let (editor, handles) = fixture();
    let tree = editor.tree();
    assert_eq!(
      to_logical_point(tree, &handles, &NativePoint::new(1, 1)),
      Some(Point::new([0, 1], 0))
    );
    assert_eq!(
      to_logical_point(tree, &handles, &NativePoint::new(1, 2)),
      Some(Point::new([0, 1], 5))
    );
  }

  #[test]
  fn unknown_handles_do_not_resolve() {
    let (editor, handles) = fixture();
    let range = NativeRange::new(NativePoint::new(2, 0), NativePoint::new(99, 0));
    assert_eq!(to_logical_range(editor.tree(), &handles, &range), None);
  }

  #[test]
  fn native_points_pick_the_covering_leaf() {
    let (editor, handles) = fixture();
    let tree = editor.tree();
    assert_eq!(
      to_native_point(tree, &handles, &Point::new([0, 1], 3)),
      Some(NativePoint::new(30, 3))
    );
    assert_eq!(
      to_native_point(tree, &handles, &Point::new([0, 1], 4)),
      Some(NativePoint::new(31, 1))
    );
    assert_eq!(
      to_native_point(tree, &handles, &Point::new([0, 0], 2)),
      Some(NativePoint::new(2, 2))
    );
  }

  #[test]
  fn backward_ranges_stay_backward() {
    let (editor, handles) = fixture();
    let tree = editor.tree();
    let range = Range::new(Point::new([0, 1], 2), Point::new([0, 0], 1));
    let native = to_native_range(tree, &handles, &range).unwrap();
    assert_eq!(native.anchor, NativePoint::new(30, 2));
    assert_eq!(native.focus, NativePoint::new(2, 1));
    assert_eq!(to_logical_range(tree, &handles, &native), Some(range));
  }
}
