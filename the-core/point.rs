//! Cursor positions inside text nodes.

use std::{
  cmp::Ordering,
  fmt,
};

use serde::{
  Deserialize,
  Serialize,
};

use crate::{
  operation::Operation,
  path::Path,
  text::char_len,
};

/// Which side of an insertion or split boundary a position sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affinity {
  Forward,
  Backward,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
  pub path:   Path,
  pub offset: usize,
}

impl Point {
  pub fn new(path: impl Into<Path>, offset: usize) -> Self {
    Self {
      path: path.into(),
      offset,
    }
  }

  /// Document order: by path first, then by offset.
  pub fn compare(&self, other: &Point) -> Ordering {
    match self.path.compare(&other.path) {
      Ordering::Equal => self.offset.cmp(&other.offset),
      ordering => ordering,
    }
  }

  #[inline]
  pub fn is_before(&self, other: &Point) -> bool {
    self.compare(other) == Ordering::Less
  }

  #[inline]
  pub fn is_after(&self, other: &Point) -> bool {
    self.compare(other) == Ordering::Greater
  }

  /// Transform with forward affinity.
  pub fn transform(&self, op: &Operation) -> Option<Point> {
    self.transform_with(op, Some(Affinity::Forward))
  }

  /// Computes where this point sits after `op` has been applied, or `None`
  /// when its text node is gone or the point is ambiguous.
  pub fn transform_with(&self, op: &Operation, affinity: Option<Affinity>) -> Option<Point> {
    let mut path = self.path.clone();
    let mut offset = self.offset;

    match op {
      Operation::InsertNode { .. } | Operation::MoveNode { .. } => {
        path = self.path.transform_with(op, affinity)?;
      },

      Operation::InsertText {
        path: at,
        offset: at_offset,
        text,
      } => {
        if *at == self.path
          && (*at_offset < offset || (*at_offset == offset && affinity == Some(Affinity::Forward)))
        {
          offset += char_len(text);
        }
      },

      Operation::MergeNode {
        path: at, position, ..
      } => {
        if *at == self.path {
          offset += position;
        }
        path = self.path.transform_with(op, affinity)?;
      },

      Operation::RemoveText {
        path: at,
        offset: at_offset,
        text,
      } => {
        if *at == self.path && *at_offset <= offset {
          offset -= (offset - at_offset).min(char_len(text));
        }
      },

      Operation::RemoveNode { path: at, .. } => {
        if *at == self.path || at.is_ancestor(&self.path) {
          return None;
        }
        path = self.path.transform_with(op, affinity)?;
      },

      Operation::SplitNode {
        path: at, position, ..
      } => {
        if *at == self.path {
          if *position == offset && affinity.is_none() {
            return None;
          }
          if *position < offset || (*position == offset && affinity == Some(Affinity::Forward)) {
            offset -= position;
            path = self.path.next()?;
          }
        } else {
          path = self.path.transform_with(op, affinity)?;
        }
      },

      Operation::SetNode { .. } | Operation::SetSelection { .. } => {},
    }

    Some(Point { path, offset })
  }
}

impl fmt::Display for Point {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.path, self.offset)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::Properties;

  #[test]
  fn insert_text_shifts_points_at_or_after_offset() {
    let op = Operation::InsertText {
      path:   Path::from([0, 0]),
      offset: 5,
      text:   " world".into(),
    };
    let caret = Point::new([0, 0], 5);
    assert_eq!(caret.transform(&op), Some(Point::new([0, 0], 11)));
    assert_eq!(
      caret.transform_with(&op, Some(Affinity::Backward)),
      Some(Point::new([0, 0], 5))
    );
    assert_eq!(
      Point::new([0, 0], 2).transform(&op),
      Some(Point::new([0, 0], 2))
    );
    assert_eq!(
      Point::new([0, 1], 7).transform(&op),
      Some(Point::new([0, 1], 7))
    );
  }

  #[test]
  fn remove_text_saturates_at_removal_start() {
    let op = Operation::RemoveText {
      path:   Path::from([0, 0]),
      offset: 2,
      text:   "llo".into(),
    };
    assert_eq!(
      Point::new([0, 0], 4).transform(&op),
      Some(Point::new([0, 0], 2))
    );
    assert_eq!(
      Point::new([0, 0], 8).transform(&op),
      Some(Point::new([0, 0], 5))
    );
    assert_eq!(
      Point::new([0, 0], 1).transform(&op),
      Some(Point::new([0, 0], 1))
    );
  }

  #[test]
  fn split_node_moves_tail_offsets() {
    let op = Operation::SplitNode {
      path:       Path::from([0, 0]),
      position:   5,
      properties: Properties::new(),
    };
    assert_eq!(
      Point::new([0, 0], 7).transform(&op),
      Some(Point::new([0, 1], 2))
    );
    assert_eq!(
      Point::new([0, 0], 3).transform(&op),
      Some(Point::new([0, 0], 3))
    );
    assert_eq!(
      Point::new([0, 0], 5).transform(&op),
      Some(Point::new([0, 1], 0))
    );
    assert_eq!(
      Point::new([0, 0], 5).transform_with(&op, Some(Affinity::Backward)),
      Some(Point::new([0, 0], 5))
    );
    assert_eq!(Point::new([0, 0], 5).transform_with(&op, None), None);
  }

  #[test]
  fn merge_node_adds_previous_length() {
    let op = Operation::MergeNode {
      path:       Path::from([0, 1]),
      position:   3,
      properties: Properties::new(),
    };
    assert_eq!(
      Point::new([0, 1], 2).transform(&op),
      Some(Point::new([0, 0], 5))
    );
  }

  #[test]
  fn compare_orders_by_path_then_offset() {
    assert_eq!(
      Point::new([0, 0], 4).compare(&Point::new([0, 1], 0)),
      Ordering::Less
    );
    assert_eq!(
      Point::new([0, 1], 4).compare(&Point::new([0, 1], 2)),
      Ordering::Greater
    );
    assert!(Point::new([1, 0], 0).is_after(&Point::new([0, 3], 9)));
  }
}
