//! Anchor/focus selections over the document.
//!
//! A [`Range`] is direction aware: `anchor` is where the selection started
//! and `focus` is where it currently ends. When the focus comes before the
//! anchor in document order the range is backward. A collapsed range is a
//! caret.

use std::cmp::Ordering;

use serde::{
  Deserialize,
  Serialize,
};

use crate::{
  operation::Operation,
  path::Path,
  point::{
    Affinity,
    Point,
  },
};

/// How the two ends of a range react to boundary-touching edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RangeAffinity {
  Forward,
  Backward,
  /// Both ends shrink toward the inside of the range.
  #[default]
  Inward,
  /// Both ends grow away from the inside of the range.
  Outward,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
  pub anchor: Point,
  pub focus:  Point,
}

impl Range {
  pub fn new(anchor: Point, focus: Point) -> Self {
    Self { anchor, focus }
  }

  pub fn collapsed(point: Point) -> Self {
    Self {
      anchor: point.clone(),
      focus:  point,
    }
  }

  /// `(start, end)` in document order.
  pub fn edges(&self) -> (&Point, &Point) {
    if self.is_backward() {
      (&self.focus, &self.anchor)
    } else {
      (&self.anchor, &self.focus)
    }
  }

  #[inline]
  pub fn start(&self) -> &Point {
    self.edges().0
  }

  #[inline]
  pub fn end(&self) -> &Point {
    self.edges().1
  }

  #[inline]
  pub fn is_backward(&self) -> bool {
    self.anchor.is_after(&self.focus)
  }

  #[inline]
  pub fn is_forward(&self) -> bool {
    !self.is_backward()
  }

  #[inline]
  pub fn is_collapsed(&self) -> bool {
    self.anchor == self.focus
  }

  #[inline]
  pub fn is_expanded(&self) -> bool {
    !self.is_collapsed()
  }

  pub fn points(&self) -> [&Point; 2] {
    [&self.anchor, &self.focus]
  }

  /// Whether `point` lies within the range, edges included.
  pub fn includes_point(&self, point: &Point) -> bool {
    let (start, end) = self.edges();
    point.compare(start) != Ordering::Less && point.compare(end) != Ordering::Greater
  }

  /// Whether the node at `path` overlaps the range.
  pub fn includes_path(&self, path: &Path) -> bool {
    let (start, end) = self.edges();
    path.compare(&start.path) != Ordering::Less && path.compare(&end.path) != Ordering::Greater
  }

  /// The overlap of two ranges, or `None` if they are disjoint.
  pub fn intersection(&self, other: &Range) -> Option<Range> {
    let (s1, e1) = self.edges();
    let (s2, e2) = other.edges();
    let start = if s1.is_before(s2) { s2 } else { s1 };
    let end = if e1.is_before(e2) { e1 } else { e2 };

    if end.is_before(start) {
      None
    } else {
      Some(Range::new(start.clone(), end.clone()))
    }
  }

  /// Same range with anchor and focus swapped.
  #[must_use]
  pub fn reversed(&self) -> Range {
    Range::new(self.focus.clone(), self.anchor.clone())
  }

  pub fn transform(&self, op: &Operation) -> Option<Range> {
    self.transform_with(op, RangeAffinity::Inward)
  }

  /// Transforms both ends through `op`. Returns `None` if either end no
  /// longer resolves.
  pub fn transform_with(&self, op: &Operation, affinity: RangeAffinity) -> Option<Range> {
    let forward = self.is_forward();
    let collapsed = self.is_collapsed();

    let (anchor_affinity, focus_affinity) = match affinity {
      RangeAffinity::Inward if forward => {
        (
          Affinity::Forward,
          if collapsed {
            Affinity::Forward
          } else {
            Affinity::Backward
          },
        )
      },
      RangeAffinity::Inward => {
        (
          Affinity::Backward,
          if collapsed {
            Affinity::Backward
          } else {
            Affinity::Forward
          },
        )
      },
      RangeAffinity::Outward if forward => (Affinity::Backward, Affinity::Forward),
      RangeAffinity::Outward => (Affinity::Forward, Affinity::Backward),
      RangeAffinity::Forward => (Affinity::Forward, Affinity::Forward),
      RangeAffinity::Backward => (Affinity::Backward, Affinity::Backward),
    };

    let anchor = self.anchor.transform_with(op, Some(anchor_affinity))?;
    let focus = self.focus.transform_with(op, Some(focus_affinity))?;
    Some(Range { anchor, focus })
  }
}

impl From<Point> for Range {
  fn from(point: Point) -> Self {
    Range::collapsed(point)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn range(a: (&[usize], usize), f: (&[usize], usize)) -> Range {
    Range::new(Point::new(a.0, a.1), Point::new(f.0, f.1))
  }

  #[test]
  fn direction_and_edges() {
    let forward = range((&[0, 0], 1), (&[0, 2], 0));
    let backward = forward.reversed();

    assert!(forward.is_forward());
    assert!(backward.is_backward());
    assert_eq!(backward.start(), &Point::new([0, 0], 1));
    assert_eq!(forward.edges(), backward.edges());
    assert!(Range::collapsed(Point::new([0, 0], 3)).is_collapsed());
  }

  #[test]
  fn includes_and_intersection() {
    let r = range((&[0, 0], 2), (&[2, 0], 1));
    assert!(r.includes_point(&Point::new([1, 0], 0)));
    assert!(!r.includes_point(&Point::new([2, 0], 2)));
    assert!(r.includes_path(&Path::from([1])));
    assert!(r.includes_path(&Path::from([2])));
    assert!(!r.includes_path(&Path::from([3, 0])));

    let other = range((&[1, 0], 0), (&[3, 0], 0));
    assert_eq!(
      r.intersection(&other),
      Some(range((&[1, 0], 0), (&[2, 0], 1)))
    );
    let disjoint = range((&[4, 0], 0), (&[5, 0], 0));
    assert_eq!(r.intersection(&disjoint), None);
  }

  #[test]
  fn inward_affinity_shrinks_expanded_range() {
    let r = range((&[0, 0], 2), (&[0, 0], 4));
    let op = Operation::InsertText {
      path:   Path::from([0, 0]),
      offset: 4,
      text:   "xx".into(),
    };
    // the focus sits on the insertion point and stays put
    assert_eq!(r.transform(&op), Some(range((&[0, 0], 2), (&[0, 0], 4))));
    assert_eq!(
      r.transform_with(&op, RangeAffinity::Outward),
      Some(range((&[0, 0], 2), (&[0, 0], 6)))
    );
  }

  #[test]
  fn collapsed_range_moves_with_insertion() {
    let caret = Range::collapsed(Point::new([0, 0], 5));
    let op = Operation::InsertText {
      path:   Path::from([0, 0]),
      offset: 5,
      text:   " world".into(),
    };
    assert_eq!(
      caret.transform(&op),
      Some(Range::collapsed(Point::new([0, 0], 11)))
    );
  }

}
