//! Locations that follow the document as it changes.
//!
//! A ref is registered with the editor and transformed through every
//! operation applied afterwards. Commands that issue several operations use
//! refs to keep track of where they are; once a ref's location is destroyed
//! (its node was removed) it stays `None`.

use slotmap::SlotMap;
use the_core::{
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
};

slotmap::new_key_type! {
    pub struct RefKey;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathRef(RefKey);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointRef(RefKey);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeRef(RefKey);

#[derive(Debug, Clone)]
enum Tracked {
  Path {
    current:  Option<Path>,
    affinity: Option<Affinity>,
  },
  Point {
    current:  Option<Point>,
    affinity: Option<Affinity>,
  },
  Range {
    current:  Option<Range>,
    affinity: RangeAffinity,
  },
}

#[derive(Debug, Clone, Default)]
pub struct Refs {
  slots: SlotMap<RefKey, Tracked>,
}

impl Refs {
  pub fn path(&mut self, path: Path, affinity: Option<Affinity>) -> PathRef {
    PathRef(self.slots.insert(Tracked::Path {
      current: Some(path),
      affinity,
    }))
  }

  pub fn point(&mut self, point: Point, affinity: Option<Affinity>) -> PointRef {
    PointRef(self.slots.insert(Tracked::Point {
      current: Some(point),
      affinity,
    }))
  }

  pub fn range(&mut self, range: Range, affinity: RangeAffinity) -> RangeRef {
    RangeRef(self.slots.insert(Tracked::Range {
      current: Some(range),
      affinity,
    }))
  }

  pub fn path_current(&self, r: PathRef) -> Option<&Path> {
    match self.slots.get(r.0)? {
      Tracked::Path { current, .. } => current.as_ref(),
      _ => None,
    }
  }

  pub fn point_current(&self, r: PointRef) -> Option<&Point> {
    match self.slots.get(r.0)? {
      Tracked::Point { current, .. } => current.as_ref(),
      _ => None,
    }
  }

  pub fn range_current(&self, r: RangeRef) -> Option<&Range> {
    match self.slots.get(r.0)? {
      Tracked::Range { current, .. } => current.as_ref(),
      _ => None,
    }
  }

  /// Stops tracking and returns the final location.
  pub fn unref_path(&mut self, r: PathRef) -> Option<Path> {
    match self.slots.remove(r.0)? {
      Tracked::Path { current, .. } => current,
      _ => None,
    }
  }

  pub fn unref_point(&mut self, r: PointRef) -> Option<Point> {
    match self.slots.remove(r.0)? {
      Tracked::Point { current, .. } => current,
      _ => None,
    }
  }

  pub fn unref_range(&mut self, r: RangeRef) -> Option<Range> {
    match self.slots.remove(r.0)? {
      Tracked::Range { current, .. } => current,
      _ => None,
    }
  }

  /// Number of live refs.
  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }

  pub(crate) fn transform(&mut self, op: &Operation) {
    if op.is_selection_only() {
      return;
    }
    for tracked in self.slots.values_mut() {
      match tracked {
        Tracked::Path { current, affinity } => {
          *current = current.take().and_then(|p| p.transform_with(op, *affinity));
        },
        Tracked::Point { current, affinity } => {
          *current = current.take().and_then(|p| p.transform_with(op, *affinity));
        },
        Tracked::Range { current, affinity } => {
          *current = current.take().and_then(|r| r.transform_with(op, *affinity));
        },
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use the_core::node::Properties;

  use super::*;

  #[test]
  fn refs_follow_operations() {
    let mut refs = Refs::default();
    let path = refs.path(Path::from([1]), Some(Affinity::Forward));
    let point = refs.point(Point::new([0, 0], 7), Some(Affinity::Forward));

    refs.transform(&Operation::SplitNode {
      path:       Path::from([0, 0]),
      position:   5,
      properties: Properties::new(),
    });
    assert_eq!(refs.point_current(point), Some(&Point::new([0, 1], 2)));
    assert_eq!(refs.path_current(path), Some(&Path::from([1])));

    refs.transform(&Operation::RemoveNode {
      path: Path::from([1]),
      node: the_core::node::Node::text(""),
    });
    assert_eq!(refs.unref_path(path), None);
    assert_eq!(refs.len(), 1);
    assert_eq!(refs.unref_point(point), Some(Point::new([0, 1], 2)));
    assert!(refs.is_empty());
  }

  #[test]
  fn range_ref_shrinks_inward() {
    let mut refs = Refs::default();
    let range = refs.range(
      Range::new(Point::new([0, 0], 2), Point::new([0, 0], 4)),
      RangeAffinity::Inward,
    );
    refs.transform(&Operation::InsertText {
      path:   Path::from([0, 0]),
      offset: 2,
      text:   "ab".into(),
    });
    assert_eq!(
      refs.unref_range(range),
      Some(Range::new(Point::new([0, 0], 4), Point::new([0, 0], 6)))
    );
  }
}
