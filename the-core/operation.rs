//! Primitive document mutations.
//!
//! Every change to a document is expressed as one of the [`Operation`]
//! variants below. Each variant carries enough data to both apply and
//! invert itself, so a batch of operations can be replayed backwards.

use std::fmt;

use serde::{
  Deserialize,
  Serialize,
};

use crate::{
  Tendril,
  node::{
    Node,
    Properties,
  },
  path::Path,
  range::Range,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
  InsertNode {
    path: Path,
    node: Node,
  },
  RemoveNode {
    path: Path,
    node: Node,
  },
  /// Merges the node at `path` into its previous sibling. `position` is the
  /// previous sibling's length (chars for texts, children for elements)
  /// before the merge.
  MergeNode {
    path:       Path,
    position:   usize,
    properties: Properties,
  },
  /// Splits the node at `path` at `position`. The tail becomes a new next
  /// sibling carrying `properties`.
  SplitNode {
    path:       Path,
    position:   usize,
    properties: Properties,
  },
  /// `new_path` is where the node ends up once the move is done.
  MoveNode {
    path:     Path,
    new_path: Path,
  },
  SetNode {
    path:           Path,
    properties:     Properties,
    new_properties: Properties,
  },
  InsertText {
    path:   Path,
    offset: usize,
    text:   Tendril,
  },
  RemoveText {
    path:   Path,
    offset: usize,
    text:   Tendril,
  },
  SetSelection {
    old: Option<Range>,
    new: Option<Range>,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
  InsertNode,
  RemoveNode,
  MergeNode,
  SplitNode,
  MoveNode,
  SetNode,
  InsertText,
  RemoveText,
  SetSelection,
}

impl OperationKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::InsertNode => "insert_node",
      Self::RemoveNode => "remove_node",
      Self::MergeNode => "merge_node",
      Self::SplitNode => "split_node",
      Self::MoveNode => "move_node",
      Self::SetNode => "set_node",
      Self::InsertText => "insert_text",
      Self::RemoveText => "remove_text",
      Self::SetSelection => "set_selection",
    }
  }
}

impl fmt::Display for OperationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Operation {
  pub fn kind(&self) -> OperationKind {
    match self {
      Self::InsertNode { .. } => OperationKind::InsertNode,
      Self::RemoveNode { .. } => OperationKind::RemoveNode,
      Self::MergeNode { .. } => OperationKind::MergeNode,
      Self::SplitNode { .. } => OperationKind::SplitNode,
      Self::MoveNode { .. } => OperationKind::MoveNode,
      Self::SetNode { .. } => OperationKind::SetNode,
      Self::InsertText { .. } => OperationKind::InsertText,
      Self::RemoveText { .. } => OperationKind::RemoveText,
      Self::SetSelection { .. } => OperationKind::SetSelection,
    }
  }

  #[inline]
  pub fn is_selection_only(&self) -> bool {
    matches!(self, Self::SetSelection { .. })
  }

  #[inline]
  pub fn is_text_operation(&self) -> bool {
    matches!(self, Self::InsertText { .. } | Self::RemoveText { .. })
  }

  /// The path the operation targets. `None` for selection changes.
  pub fn path(&self) -> Option<&Path> {
    match self {
      Self::InsertNode { path, .. }
      | Self::RemoveNode { path, .. }
      | Self::MergeNode { path, .. }
      | Self::SplitNode { path, .. }
      | Self::MoveNode { path, .. }
      | Self::SetNode { path, .. }
      | Self::InsertText { path, .. }
      | Self::RemoveText { path, .. } => Some(path),
      Self::SetSelection { .. } => None,
    }
  }

  /// The operation that undoes this one.
  #[must_use]
  pub fn invert(&self) -> Operation {
    match self {
      Self::InsertNode { path, node } => {
        Self::RemoveNode {
          path: path.clone(),
          node: node.clone(),
        }
      },
      Self::RemoveNode { path, node } => {
        Self::InsertNode {
          path: path.clone(),
          node: node.clone(),
        }
      },
      Self::InsertText { path, offset, text } => {
        Self::RemoveText {
          path:   path.clone(),
          offset: *offset,
          text:   text.clone(),
        }
      },
      Self::RemoveText { path, offset, text } => {
        Self::InsertText {
          path:   path.clone(),
          offset: *offset,
          text:   text.clone(),
        }
      },
      Self::MergeNode {
        path,
        position,
        properties,
      } => {
        Self::SplitNode {
          path:       path.previous().unwrap_or_else(|| path.clone()),
          position:   *position,
          properties: properties.clone(),
        }
      },
      Self::SplitNode {
        path,
        position,
        properties,
      } => {
        Self::MergeNode {
          path:       path.next().unwrap_or_else(|| path.clone()),
          position:   *position,
          properties: properties.clone(),
        }
      },
      Self::MoveNode { path, new_path } => {
        if path == new_path {
          return self.clone();
        }
        if path.is_sibling(new_path) {
          return Self::MoveNode {
            path:     new_path.clone(),
            new_path: path.clone(),
          };
        }
        // The node now lives at the transformed source path; sending it to
        // where its old next sibling ended up puts it back in place.
        let inverse_path = path.transform(self).unwrap_or_else(|| new_path.clone());
        let inverse_new_path = path
          .next()
          .and_then(|next| next.transform(self))
          .unwrap_or_else(|| path.clone());
        Self::MoveNode {
          path:     inverse_path,
          new_path: inverse_new_path,
        }
      },
      Self::SetNode {
        path,
        properties,
        new_properties,
      } => {
        Self::SetNode {
          path:           path.clone(),
          properties:     new_properties.clone(),
          new_properties: properties.clone(),
        }
      },
      Self::SetSelection { old, new } => {
        Self::SetSelection {
          old: new.clone(),
          new: old.clone(),
        }
      },
    }
  }
}
