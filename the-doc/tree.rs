//! Arena storage for the document tree.
//!
//! Nodes live in a [`HopSlotMap`] and refer to their children by
//! [`NodeId`]. Next to its content every slot keeps two association-table
//! entries, its parent id and its index inside that parent, so the position
//! of any node is an O(depth) walk up instead of a search from the root.
//!
//! Only the applier mutates the tree, and it calls [`NodeTree::reindex`] for
//! every parent whose child list it touched before returning. Outside of the
//! applier the tables are therefore always exact; [`NodeTree::validate`]
//! checks that.

use std::collections::BTreeSet;

use slotmap::HopSlotMap;
use the_core::{
  node::{
    Element,
    Node,
    Properties,
    Text,
  },
  path::Path,
};
use thiserror::Error;

use crate::apply::{
  OperationError,
  Result,
};

slotmap::new_key_type! {
    /// Identity of a node, stable for as long as the node exists.
    pub struct NodeId;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
  Element {
    children:   Vec<NodeId>,
    properties: Properties,
  },
  Text(Text),
}

#[derive(Debug, Clone)]
struct Slot {
  parent:  Option<NodeId>,
  index:   usize,
  content: Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantError {
  #[error("root node is missing")]
  MissingRoot,
  #[error("root node has a parent")]
  RootHasParent,
  #[error("root node is not an element")]
  RootNotElement,
  #[error("child refers to a missing slot")]
  MissingNode,
  #[error("parent entry does not match the owning element")]
  ParentMismatch,
  #[error("index entry does not match the position in the parent")]
  IndexMismatch,
  #[error("node is reachable twice")]
  DuplicateVisit,
  #[error("slot is not reachable from the root")]
  UnreachableNode,
}

#[derive(Debug, Clone)]
pub struct NodeTree {
  root:  NodeId,
  nodes: HopSlotMap<NodeId, Slot>,
}

impl Default for NodeTree {
  fn default() -> Self {
    Self::new([])
  }
}

impl NodeTree {
  /// Builds a tree whose root holds `children`.
  pub fn new(children: impl IntoIterator<Item = Node>) -> Self {
    let mut nodes = HopSlotMap::with_key();
    let root = nodes.insert(Slot {
      parent:  None,
      index:   0,
      content: Content::Element {
        children:   Vec::new(),
        properties: Properties::new(),
      },
    });
    let mut tree = Self { root, nodes };
    let ids: Vec<NodeId> = children
      .into_iter()
      .map(|child| tree.alloc(child, Some(root)))
      .collect();
    tree.set_children(root, ids);
    debug_assert!(tree.validate().is_ok());
    tree
  }

  #[inline]
  pub fn root(&self) -> NodeId {
    self.root
  }

  /// Number of live nodes, root included.
  #[inline]
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  #[inline]
  pub fn contains(&self, id: NodeId) -> bool {
    self.nodes.contains_key(id)
  }

  pub fn content(&self, id: NodeId) -> Option<&Content> {
    self.nodes.get(id).map(|slot| &slot.content)
  }

  pub(crate) fn content_mut(&mut self, id: NodeId) -> Option<&mut Content> {
    self.nodes.get_mut(id).map(|slot| &mut slot.content)
  }

  pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
    self.nodes.get(id).and_then(|slot| slot.parent)
  }

  pub fn index_of(&self, id: NodeId) -> Option<usize> {
    let slot = self.nodes.get(id)?;
    slot.parent.map(|_| slot.index)
  }

  /// Child ids of an element. Empty for texts and missing ids.
  pub fn children(&self, id: NodeId) -> &[NodeId] {
    match self.content(id) {
      Some(Content::Element { children, .. }) => children,
      _ => &[],
    }
  }

  pub fn text(&self, id: NodeId) -> Option<&Text> {
    match self.content(id)? {
      Content::Text(text) => Some(text),
      Content::Element { .. } => None,
    }
  }

  /// Element properties or text marks.
  pub fn properties(&self, id: NodeId) -> Option<&Properties> {
    match self.content(id)? {
      Content::Element { properties, .. } => Some(properties),
      Content::Text(text) => Some(&text.marks),
    }
  }

  pub fn is_text(&self, id: NodeId) -> bool {
    matches!(self.content(id), Some(Content::Text(_)))
  }

  pub fn is_element(&self, id: NodeId) -> bool {
    matches!(self.content(id), Some(Content::Element { .. }))
  }

  /// Walks `path` down from the root.
  pub fn get(&self, path: &[usize]) -> Option<NodeId> {
    path
      .iter()
      .try_fold(self.root, |id, &index| self.children(id).get(index).copied())
  }

  pub fn resolve(&self, path: &Path) -> Result<NodeId> {
    self
      .get(path)
      .ok_or_else(|| OperationError::PathNotFound(path.clone()))
  }

  /// The current path of `id`, read off the association tables.
  pub fn path_of(&self, id: NodeId) -> Option<Path> {
    let mut indices = Vec::new();
    let mut current = id;
    loop {
      let slot = self.nodes.get(current)?;
      match slot.parent {
        Some(parent) => {
          indices.push(slot.index);
          current = parent;
        },
        None => break,
      }
    }
    if current != self.root {
      return None;
    }
    indices.reverse();
    Some(Path::from(indices))
  }

  /// Materializes the subtree under `id` as a node value.
  pub fn to_node(&self, id: NodeId) -> Option<Node> {
    Some(match self.content(id)? {
      Content::Text(text) => Node::Text(text.clone()),
      Content::Element {
        children,
        properties,
      } => {
        Node::Element(Element {
          children:   children.iter().filter_map(|&child| self.to_node(child)).collect(),
          properties: properties.clone(),
        })
      },
    })
  }

  /// The top-level blocks as node values.
  pub fn children_nodes(&self) -> Vec<Node> {
    self
      .children(self.root)
      .iter()
      .filter_map(|&child| self.to_node(child))
      .collect()
  }

  /// Every node below `id` in document order (pre-order), with paths.
  pub fn descendants(&self, id: NodeId) -> Vec<(Path, NodeId)> {
    let mut out = Vec::new();
    if let Some(path) = self.path_of(id) {
      self.collect(id, &mut path.clone(), &mut out, false);
    }
    out
  }

  /// Every text in the document in order.
  pub fn texts(&self) -> Vec<(Path, NodeId)> {
    self.texts_under(self.root)
  }

  pub fn texts_under(&self, id: NodeId) -> Vec<(Path, NodeId)> {
    let mut out = Vec::new();
    if self.is_text(id) {
      if let Some(path) = self.path_of(id) {
        out.push((path, id));
      }
      return out;
    }
    if let Some(path) = self.path_of(id) {
      self.collect(id, &mut path.clone(), &mut out, true);
    }
    out
  }

  fn collect(&self, id: NodeId, path: &mut Path, out: &mut Vec<(Path, NodeId)>, texts_only: bool) {
    for (index, &child) in self.children(id).iter().enumerate() {
      path.push(index);
      if !texts_only || self.is_text(child) {
        out.push((path.clone(), child));
      }
      self.collect(child, path, out, texts_only);
      path.pop();
    }
  }

  /// Allocates slots for `node` and its subtree.
  pub(crate) fn alloc(&mut self, node: Node, parent: Option<NodeId>) -> NodeId {
    match node {
      Node::Text(text) => {
        self.nodes.insert(Slot {
          parent,
          index: 0,
          content: Content::Text(text),
        })
      },
      Node::Element(Element {
        children,
        properties,
      }) => {
        let id = self.nodes.insert(Slot {
          parent,
          index: 0,
          content: Content::Element {
            children: Vec::new(),
            properties,
          },
        });
        let ids = children
          .into_iter()
          .map(|child| self.alloc(child, Some(id)))
          .collect();
        self.set_children(id, ids);
        id
      },
    }
  }

  /// Frees the subtree under `id`, returning it as a value. The parent's
  /// child list is the caller's business.
  pub(crate) fn free(&mut self, id: NodeId) -> Option<Node> {
    let slot = self.nodes.remove(id)?;
    Some(match slot.content {
      Content::Text(text) => Node::Text(text),
      Content::Element {
        children,
        properties,
      } => {
        Node::Element(Element {
          children: children
            .into_iter()
            .filter_map(|child| self.free(child))
            .collect(),
          properties,
        })
      },
    })
  }

  /// Drops a single slot whose children were already moved elsewhere.
  pub(crate) fn discard(&mut self, id: NodeId) {
    self.nodes.remove(id);
  }

  pub(crate) fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
    match self.content_mut(id)? {
      Content::Element { children, .. } => Some(children),
      Content::Text(_) => None,
    }
  }

  pub(crate) fn set_children(&mut self, id: NodeId, ids: Vec<NodeId>) {
    if let Some(children) = self.children_mut(id) {
      *children = ids;
    }
    self.reindex(id);
  }

  /// Rewrites the parent and index entries of every child of `parent`.
  pub(crate) fn reindex(&mut self, parent: NodeId) {
    let children = self.children(parent).to_vec();
    for (index, child) in children.into_iter().enumerate() {
      if let Some(slot) = self.nodes.get_mut(child) {
        slot.parent = Some(parent);
        slot.index = index;
      }
    }
  }

  /// Checks the association tables against the child lists.
  pub fn validate(&self) -> std::result::Result<(), InvariantError> {
    let Some(root) = self.nodes.get(self.root) else {
      return Err(InvariantError::MissingRoot);
    };
    if root.parent.is_some() {
      return Err(InvariantError::RootHasParent);
    }
    if !matches!(root.content, Content::Element { .. }) {
      return Err(InvariantError::RootNotElement);
    }

    let mut visited = BTreeSet::new();
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      if !visited.insert(id) {
        return Err(InvariantError::DuplicateVisit);
      }
      for (index, &child) in self.children(id).iter().enumerate() {
        let Some(slot) = self.nodes.get(child) else {
          return Err(InvariantError::MissingNode);
        };
        if slot.parent != Some(id) {
          return Err(InvariantError::ParentMismatch);
        }
        if slot.index != index {
          return Err(InvariantError::IndexMismatch);
        }
        stack.push(child);
      }
    }

    if visited.len() != self.nodes.len() {
      return Err(InvariantError::UnreachableNode);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn paragraph(texts: &[&str]) -> Node {
    Element::new("paragraph")
      .with_children(texts.iter().map(|t| Node::text(t)))
      .into()
  }

  #[test]
  fn resolves_paths_both_ways() {
    let tree = NodeTree::new([paragraph(&["Hello", " world"]), paragraph(&["Bar"])]);
    let id = tree.get(&[0, 1]).unwrap();
    assert_eq!(tree.text(id).unwrap().text, " world");
    assert_eq!(tree.path_of(id), Some(Path::from([0, 1])));
    assert_eq!(tree.index_of(id), Some(1));
    assert_eq!(tree.parent_of(id), tree.get(&[0]));
    assert_eq!(tree.index_of(tree.root()), None);
    assert!(tree.get(&[2]).is_none());
    assert_eq!(
      tree.resolve(&Path::from([0, 5])),
      Err(OperationError::PathNotFound(Path::from([0, 5])))
    );
    assert!(tree.validate().is_ok());
  }

  #[test]
  fn texts_and_descendants_in_document_order() {
    let tree = NodeTree::new([paragraph(&["a", "b"]), paragraph(&["c"])]);
    let texts: Vec<Path> = tree.texts().into_iter().map(|(p, _)| p).collect();
    assert_eq!(texts, vec![
      Path::from([0, 0]),
      Path::from([0, 1]),
      Path::from([1, 0])
    ]);
    let all: Vec<Path> = tree
      .descendants(tree.root())
      .into_iter()
      .map(|(p, _)| p)
      .collect();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0], Path::from([0]));
    assert_eq!(all[3], Path::from([1]));
  }

  #[test]
  fn round_trips_node_values() {
    let blocks = vec![paragraph(&["x"]), paragraph(&["y", "z"])];
    let tree = NodeTree::new(blocks.clone());
    assert_eq!(tree.children_nodes(), blocks);
    assert_eq!(tree.len(), 6);
  }

  #[test]
  fn free_drops_whole_subtree() {
    let mut tree = NodeTree::new([paragraph(&["x", "y"])]);
    let block = tree.get(&[0]).unwrap();
    let root = tree.root();
    if let Some(children) = tree.children_mut(root) {
      children.clear();
    }
    let node = tree.free(block).unwrap();
    tree.reindex(root);
    assert_eq!(node, paragraph(&["x", "y"]));
    assert_eq!(tree.len(), 1);
    assert!(tree.validate().is_ok());
  }

  #[test]
  fn validate_catches_stale_index() {
    let mut tree = NodeTree::new([paragraph(&["x"]), paragraph(&["y"])]);
    let root = tree.root();
    if let Some(children) = tree.children_mut(root) {
      children.swap(0, 1);
    }
    assert_eq!(tree.validate(), Err(InvariantError::IndexMismatch));
    tree.reindex(root);
    assert!(tree.validate().is_ok());
  }
}
