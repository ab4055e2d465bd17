//! Applying primitive operations to the tree.
//!
//! Every branch validates first and mutates second: when an operation is
//! rejected the tree is exactly as it was before the call. After a
//! structural change the association tables of every touched parent are
//! rewritten before returning.

use the_core::{
  node::{
    NodeError,
    Properties,
    Text,
    check_properties,
  },
  operation::Operation,
  path::Path,
  text::{
    self,
    char_len,
  },
};
use thiserror::Error;

use crate::tree::{
  Content,
  NodeId,
  NodeTree,
};

pub type Result<T> = std::result::Result<T, OperationError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationError {
  #[error("no node at path {0}")]
  PathNotFound(Path),
  #[error("cannot {0} the root node")]
  RootMutation(&'static str),
  #[error("`{0}` cannot be set as a property")]
  ReservedProperty(String),
  #[error("cannot merge node at {0} into a sibling of a different kind")]
  IncompatibleMerge(Path),
  #[error("cannot move node at {path} into itself at {new_path}")]
  InvalidMove { path: Path, new_path: Path },
  #[error("destination {path} is beyond the end of its parent ({len} children)")]
  DestinationOutOfRange { path: Path, len: usize },
  #[error("offset {offset} is out of range for node at {path} of length {len}")]
  OffsetOutOfRange {
    path:   Path,
    offset: usize,
    len:    usize,
  },
  #[error("expected a text node at {0}")]
  ExpectedText(Path),
  #[error("expected an element at {0}")]
  ExpectedElement(Path),
  #[error("node at {0} has no previous sibling to merge into")]
  NoPreviousSibling(Path),
  #[error("text at {path} does not contain {expected:?} at offset {offset}")]
  TextMismatch {
    path:     Path,
    offset:   usize,
    expected: String,
  },
}

/// Mutates `tree` according to `op`. Selection changes are not tree
/// mutations and pass through untouched.
pub(crate) fn apply_to_tree(tree: &mut NodeTree, op: &Operation) -> Result<()> {
  match op {
    Operation::InsertNode { path, node } => {
      let (parent, index) = parent_slot(tree, path, "insert into")?;
      let len = tree.children(parent).len();
      if index > len {
        return Err(OperationError::DestinationOutOfRange {
          path: path.clone(),
          len,
        });
      }
      check_reserved(node.properties())?;

      let id = tree.alloc(node.clone(), Some(parent));
      if let Some(children) = tree.children_mut(parent) {
        children.insert(index, id);
      }
      tree.reindex(parent);
    },

    Operation::RemoveNode { path, .. } => {
      let id = non_root(tree, path, "remove")?;
      let parent = tree
        .parent_of(id)
        .ok_or_else(|| OperationError::PathNotFound(path.clone()))?;
      let index = tree.index_of(id).unwrap_or_default();

      if let Some(children) = tree.children_mut(parent) {
        children.remove(index);
      }
      tree.free(id);
      tree.reindex(parent);
    },

    Operation::MergeNode { path, .. } => {
      let id = non_root(tree, path, "merge")?;
      let prev_path = path
        .previous()
        .ok_or_else(|| OperationError::NoPreviousSibling(path.clone()))?;
      let prev = tree.resolve(&prev_path)?;
      let parent = tree
        .parent_of(id)
        .ok_or_else(|| OperationError::PathNotFound(path.clone()))?;

      match (tree.content(prev), tree.content(id)) {
        (Some(Content::Text(_)), Some(Content::Text(_))) => {
          let tail = tree.text(id).map(|t| t.text.clone()).unwrap_or_default();
          if let Some(Content::Text(prev_text)) = tree.content_mut(prev) {
            prev_text.text.push_str(&tail);
          }
          detach(tree, parent, id);
          tree.free(id);
        },
        (Some(Content::Element { .. }), Some(Content::Element { .. })) => {
          let moved = tree.children(id).to_vec();
          if let Some(children) = tree.children_mut(prev) {
            children.extend(moved);
          }
          tree.reindex(prev);
          detach(tree, parent, id);
          tree.discard(id);
        },
        _ => return Err(OperationError::IncompatibleMerge(path.clone())),
      }
      tree.reindex(parent);
    },

    Operation::SplitNode {
      path,
      position,
      properties,
    } => {
      let id = non_root(tree, path, "split")?;
      check_reserved(properties)?;
      let parent = tree
        .parent_of(id)
        .ok_or_else(|| OperationError::PathNotFound(path.clone()))?;
      let index = tree.index_of(id).unwrap_or_default();

      let sibling = match tree.content(id) {
        Some(Content::Text(current)) => {
          let len = current.len();
          if *position > len {
            return Err(out_of_range(path, *position, len));
          }
          let mut head = current.text.clone();
          let tail = text::remove(&mut head, *position, len - position);
          if let Some(Content::Text(current)) = tree.content_mut(id) {
            current.text = head;
          }
          tree.alloc(
            Text {
              text:  tail,
              marks: properties.clone(),
            }
            .into(),
            Some(parent),
          )
        },
        Some(Content::Element { children, .. }) => {
          let len = children.len();
          if *position > len {
            return Err(out_of_range(path, *position, len));
          }
          let tail = tree
            .children_mut(id)
            .map(|children| children.split_off(*position))
            .unwrap_or_default();
          let sibling = tree.alloc(
            the_core::node::Element {
              children:   Vec::new(),
              properties: properties.clone(),
            }
            .into(),
            Some(parent),
          );
          tree.set_children(sibling, tail);
          sibling
        },
        None => return Err(OperationError::PathNotFound(path.clone())),
      };

      if let Some(children) = tree.children_mut(parent) {
        children.insert(index + 1, sibling);
      }
      tree.reindex(parent);
    },

    Operation::MoveNode { path, new_path } => {
      let id = non_root(tree, path, "move")?;
      if new_path.is_root() {
        return Err(OperationError::RootMutation("move onto"));
      }
      if path.is_ancestor(new_path) {
        return Err(OperationError::InvalidMove {
          path:     path.clone(),
          new_path: new_path.clone(),
        });
      }
      if path == new_path {
        return Ok(());
      }

      let dest_path = new_path
        .parent()
        .ok_or(OperationError::RootMutation("move onto"))?;
      let dest = tree.resolve(&dest_path)?;
      if !tree.is_element(dest) {
        return Err(OperationError::ExpectedElement(dest_path));
      }
      let source = tree
        .parent_of(id)
        .ok_or_else(|| OperationError::PathNotFound(path.clone()))?;

      // Where the node lands once it is out of its old parent.
      let landing = path
        .transform(op)
        .and_then(|p| p.last())
        .ok_or_else(|| OperationError::InvalidMove {
          path:     path.clone(),
          new_path: new_path.clone(),
        })?;
      let len = tree.children(dest).len() - usize::from(source == dest);
      if landing > len {
        return Err(OperationError::DestinationOutOfRange {
          path: new_path.clone(),
          len,
        });
      }

      detach(tree, source, id);
      tree.reindex(source);
      if let Some(children) = tree.children_mut(dest) {
        children.insert(landing, id);
      }
      tree.reindex(dest);
    },

    Operation::SetNode {
      path,
      properties,
      new_properties,
    } => {
      let id = non_root(tree, path, "set properties of")?;
      check_reserved(new_properties)?;

      if let Some(target) = match tree.content_mut(id) {
        Some(Content::Element {
          properties: props, ..
        }) => Some(props),
        Some(Content::Text(text)) => Some(&mut text.marks),
        None => None,
      } {
        for (key, value) in new_properties {
          if value.is_null() {
            target.remove(key);
          } else {
            target.insert(key.clone(), value.clone());
          }
        }
        for key in properties.keys() {
          if !new_properties.contains_key(key) {
            target.remove(key);
          }
        }
      }
    },

    Operation::InsertText {
      path,
      offset,
      text: inserted,
    } => {
      let (id, len) = text_slot(tree, path)?;
      if *offset > len {
        return Err(out_of_range(path, *offset, len));
      }
      if inserted.is_empty() {
        return Ok(());
      }
      if let Some(Content::Text(current)) = tree.content_mut(id) {
        text::insert(&mut current.text, *offset, inserted);
      }
    },

    Operation::RemoveText {
      path,
      offset,
      text: removed,
    } => {
      let (id, len) = text_slot(tree, path)?;
      let count = char_len(removed);
      if offset + count > len {
        return Err(out_of_range(path, offset + count, len));
      }
      if count == 0 {
        return Ok(());
      }
      let current = tree.text(id).map(|t| t.text.as_str()).unwrap_or_default();
      if text::slice(current, *offset, offset + count) != removed.as_str() {
        return Err(OperationError::TextMismatch {
          path:     path.clone(),
          offset:   *offset,
          expected: removed.to_string(),
        });
      }
      if let Some(Content::Text(current)) = tree.content_mut(id) {
        text::remove(&mut current.text, *offset, count);
      }
    },

    Operation::SetSelection { .. } => {},
  }

  debug_assert!(tree.validate().is_ok());
  Ok(())
}

fn non_root(tree: &NodeTree, path: &Path, verb: &'static str) -> Result<NodeId> {
  if path.is_root() {
    return Err(OperationError::RootMutation(verb));
  }
  tree.resolve(path)
}

/// The element that will own a node inserted at `path`, and the index.
fn parent_slot(tree: &NodeTree, path: &Path, verb: &'static str) -> Result<(NodeId, usize)> {
  let (Some(parent_path), Some(index)) = (path.parent(), path.last()) else {
    return Err(OperationError::RootMutation(verb));
  };
  let parent = tree.resolve(&parent_path)?;
  if !tree.is_element(parent) {
    return Err(OperationError::ExpectedElement(parent_path));
  }
  Ok((parent, index))
}

fn text_slot(tree: &NodeTree, path: &Path) -> Result<(NodeId, usize)> {
  let id = tree.resolve(path)?;
  let len = tree
    .text(id)
    .map(Text::len)
    .ok_or_else(|| OperationError::ExpectedText(path.clone()))?;
  Ok((id, len))
}

fn detach(tree: &mut NodeTree, parent: NodeId, id: NodeId) {
  if let Some(children) = tree.children_mut(parent) {
    children.retain(|&child| child != id);
  }
}

fn out_of_range(path: &Path, offset: usize, len: usize) -> OperationError {
  OperationError::OffsetOutOfRange {
    path: path.clone(),
    offset,
    len,
  }
}

fn check_reserved(properties: &Properties) -> Result<()> {
  check_properties(properties).map_err(|err| {
    match err {
      NodeError::ReservedKey(key) => OperationError::ReservedProperty(key),
      other => OperationError::ReservedProperty(other.to_string()),
    }
  })
}
