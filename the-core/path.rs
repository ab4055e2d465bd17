//! Structural addresses into the node tree.
//!
//! A [`Path`] is the list of child indices walked from the root to reach a
//! node. The empty path is the root itself.
//!
//! ```text
//! root
//! ├── [0] paragraph
//! │   ├── [0, 0] "Hello"
//! │   └── [0, 1] " world"
//! └── [1] paragraph
//!     └── [1, 0] "Bar"
//! ```
//!
//! # Ordering
//!
//! [`Path::compare`] orders paths in document order, but treats an ancestor
//! and its descendants as equal (neither comes "before" the other). Because
//! that relation is not a total order `Path` deliberately does not implement
//! [`Ord`].
//!
//! # Transforms
//!
//! [`Path::transform`] answers "where does this path point after `op` was
//! applied?". It returns `None` when the node the path referred to no longer
//! exists (it was removed, or it sat exactly on a split boundary without an
//! affinity).

use std::{
  cmp::Ordering,
  fmt,
  ops::Deref,
};

use serde::{
  Deserialize,
  Serialize,
};
use smallvec::SmallVec;

use crate::{
  operation::Operation,
  point::Affinity,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(SmallVec<[usize; 8]>);

impl Path {
  #[inline]
  pub fn root() -> Self {
    Self(SmallVec::new())
  }

  pub fn new(indices: impl IntoIterator<Item = usize>) -> Self {
    Self(indices.into_iter().collect())
  }

  #[inline]
  pub fn as_slice(&self) -> &[usize] {
    &self.0
  }

  #[inline]
  pub fn is_root(&self) -> bool {
    self.0.is_empty()
  }

  /// Index of the node inside its parent. `None` for the root.
  #[inline]
  pub fn last(&self) -> Option<usize> {
    self.0.last().copied()
  }

  #[must_use]
  pub fn child(&self, index: usize) -> Self {
    let mut path = self.clone();
    path.0.push(index);
    path
  }

  pub fn push(&mut self, index: usize) {
    self.0.push(index);
  }

  pub fn pop(&mut self) -> Option<usize> {
    self.0.pop()
  }

  pub fn parent(&self) -> Option<Self> {
    if self.is_root() {
      return None;
    }
    Some(Self(self.0[..self.0.len() - 1].into()))
  }

  /// Path of the next sibling. `None` for the root.
  pub fn next(&self) -> Option<Self> {
    let last = self.last()?;
    let mut path = self.clone();
    *path.0.last_mut()? = last + 1;
    Some(path)
  }

  /// Path of the previous sibling. `None` for the root or a first child.
  pub fn previous(&self) -> Option<Self> {
    let last = self.last()?.checked_sub(1)?;
    let mut path = self.clone();
    *path.0.last_mut()? = last;
    Some(path)
  }

  #[inline]
  pub fn has_previous(&self) -> bool {
    self.last().is_some_and(|last| last > 0)
  }

  /// All ancestors from the root down to the parent.
  pub fn ancestors(&self) -> Vec<Path> {
    (0..self.0.len())
      .map(|depth| Self(self.0[..depth].into()))
      .collect()
  }

  /// Ancestors plus the path itself, root first.
  pub fn levels(&self) -> Vec<Path> {
    (0..=self.0.len())
      .map(|depth| Self(self.0[..depth].into()))
      .collect()
  }

  /// The deepest path that is an ancestor-or-self of both.
  pub fn common(&self, other: &Path) -> Path {
    Self(
      self
        .0
        .iter()
        .zip(other.0.iter())
        .take_while(|(a, b)| a == b)
        .map(|(a, _)| *a)
        .collect(),
    )
  }

  /// Document order comparison; ancestors compare equal to descendants.
  pub fn compare(&self, other: &Path) -> Ordering {
    for (a, b) in self.0.iter().zip(other.0.iter()) {
      match a.cmp(b) {
        Ordering::Equal => {},
        ordering => return ordering,
      }
    }
    Ordering::Equal
  }

  #[inline]
  pub fn is_before(&self, other: &Path) -> bool {
    self.compare(other) == Ordering::Less
  }

  #[inline]
  pub fn is_after(&self, other: &Path) -> bool {
    self.compare(other) == Ordering::Greater
  }

  /// True when `other` has a node at this path's depth that is a later
  /// sibling of this path (or a later sibling's descendant).
  pub fn ends_before(&self, other: &Path) -> bool {
    let Some(i) = self.0.len().checked_sub(1) else {
      return false;
    };
    let Some(&bv) = other.0.get(i) else {
      return false;
    };
    self.0[..i] == other.0[..i] && self.0[i] < bv
  }

  pub fn ends_after(&self, other: &Path) -> bool {
    let Some(i) = self.0.len().checked_sub(1) else {
      return false;
    };
    let Some(&bv) = other.0.get(i) else {
      return false;
    };
    self.0[..i] == other.0[..i] && self.0[i] > bv
  }

  pub fn ends_at(&self, other: &Path) -> bool {
    let Some(i) = self.0.len().checked_sub(1) else {
      return false;
    };
    let Some(&bv) = other.0.get(i) else {
      return false;
    };
    self.0[..i] == other.0[..i] && self.0[i] == bv
  }

  #[inline]
  pub fn is_ancestor(&self, other: &Path) -> bool {
    self.0.len() < other.0.len() && self.compare(other) == Ordering::Equal
  }

  #[inline]
  pub fn is_descendant(&self, other: &Path) -> bool {
    other.is_ancestor(self)
  }

  #[inline]
  pub fn is_child(&self, other: &Path) -> bool {
    self.0.len() == other.0.len() + 1 && self.compare(other) == Ordering::Equal
  }

  #[inline]
  pub fn is_parent(&self, other: &Path) -> bool {
    other.is_child(self)
  }

  /// Ancestor-or-self.
  #[inline]
  pub fn is_common(&self, other: &Path) -> bool {
    self.0.len() <= other.0.len() && self.compare(other) == Ordering::Equal
  }

  pub fn is_sibling(&self, other: &Path) -> bool {
    if self.0.len() != other.0.len() || self.is_root() {
      return false;
    }
    let i = self.0.len() - 1;
    self.0[..i] == other.0[..i] && self.0[i] != other.0[i]
  }

  /// The part of this path below `ancestor`.
  pub fn relative(&self, ancestor: &Path) -> Option<Path> {
    if !ancestor.is_common(self) {
      return None;
    }
    Some(Self(self.0[ancestor.0.len()..].into()))
  }

  /// Transform with forward affinity.
  pub fn transform(&self, op: &Operation) -> Option<Path> {
    self.transform_with(op, Some(Affinity::Forward))
  }

  /// Computes where this path points after `op` has been applied.
  ///
  /// `affinity` only matters for a split of the node this path points at:
  /// `Forward` follows the tail into the new sibling, `Backward` stays on the
  /// head, and `None` makes the path ambiguous.
  pub fn transform_with(&self, op: &Operation, affinity: Option<Affinity>) -> Option<Path> {
    if self.is_root() {
      return Some(self.clone());
    }

    let mut p = self.clone();

    match op {
      Operation::InsertNode { path: op, .. } => {
        if op.is_root() {
          return Some(p);
        }
        if op == self || op.ends_before(self) || op.is_ancestor(self) {
          p.bump(op.len() - 1);
        }
      },

      Operation::RemoveNode { path: op, .. } => {
        if op == self || op.is_ancestor(self) {
          return None;
        }
        if op.ends_before(self) {
          p.drop_one(op.len() - 1);
        }
      },

      Operation::MergeNode {
        path: op, position, ..
      } => {
        if op.is_root() {
          return Some(p);
        }
        if op == self || op.ends_before(self) {
          p.drop_one(op.len() - 1);
        } else if op.is_ancestor(self) {
          p.drop_one(op.len() - 1);
          p.0[op.len()] += position;
        }
      },

      Operation::SplitNode {
        path: op, position, ..
      } => {
        if op.is_root() {
          return Some(p);
        }
        if op == self {
          match affinity {
            Some(Affinity::Forward) => p.bump(op.len() - 1),
            Some(Affinity::Backward) => {},
            None => return None,
          }
        } else if op.ends_before(self) {
          p.bump(op.len() - 1);
        } else if op.is_ancestor(self) && self.0[op.len()] >= *position {
          p.bump(op.len() - 1);
          p.0[op.len()] -= position;
        }
      },

      Operation::MoveNode {
        path: op,
        new_path: onp,
      } => {
        if op == onp || op.is_root() || onp.is_root() {
          return Some(p);
        }

        if op.is_ancestor(self) || op == self {
          // The moved subtree lands where the destination points once the
          // source has been taken out of its parent.
          let mut copy = onp.clone();
          if op.ends_before(onp) && op.len() < onp.len() {
            copy.drop_one(op.len() - 1);
          }
          copy.0.extend_from_slice(&self.0[op.len()..]);
          return Some(copy);
        } else if op.is_sibling(onp) && (onp.is_ancestor(self) || onp == self) {
          if op.ends_before(self) {
            p.drop_one(op.len() - 1);
          } else {
            p.bump(op.len() - 1);
          }
        } else if onp.ends_before(self) || onp == self || onp.is_ancestor(self) {
          if op.ends_before(self) {
            p.drop_one(op.len() - 1);
          }
          p.bump(onp.len() - 1);
        } else if op.ends_before(self) {
          p.drop_one(op.len() - 1);
        }
      },

      Operation::SetNode { .. }
      | Operation::InsertText { .. }
      | Operation::RemoveText { .. }
      | Operation::SetSelection { .. } => {},
    }

    Some(p)
  }

  #[inline]
  fn bump(&mut self, depth: usize) {
    self.0[depth] += 1;
  }

  #[inline]
  fn drop_one(&mut self, depth: usize) {
    self.0[depth] = self.0[depth].saturating_sub(1);
  }
}

impl Deref for Path {
  type Target = [usize];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

impl From<Vec<usize>> for Path {
  fn from(value: Vec<usize>) -> Self {
    Self(value.into())
  }
}

impl From<&[usize]> for Path {
  fn from(value: &[usize]) -> Self {
    Self(value.into())
  }
}

impl<const N: usize> From<[usize; N]> for Path {
  fn from(value: [usize; N]) -> Self {
    Self::new(value)
  }
}

impl fmt::Display for Path {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[")?;
    for (i, index) in self.0.iter().enumerate() {
      if i > 0 {
        write!(f, ", ")?;
      }
      write!(f, "{index}")?;
    }
    write!(f, "]")
  }
}
