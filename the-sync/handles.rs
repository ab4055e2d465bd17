//! The association table between document nodes and rendered handles.
//!
//! The renderer registers a handle for every element and text it renders,
//! and a leaf handle (text node plus the leaf's start offset) for every
//! formatted run of a text. Entries are keyed by [`NodeId`], so they stay
//! valid through structural edits; only removed nodes need pruning, which
//! [`HandleMap::retain_live`] does after each batch.

use std::{
  collections::HashMap,
  hash::Hash,
};

use slotmap::SecondaryMap;
use the_doc::{
  NodeId,
  NodeTree,
};

/// What a rendered handle stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleTarget {
  Node(NodeId),
  /// A run of text starting at char `offset` of the text node.
  Leaf { text: NodeId, offset: usize },
}

impl HandleTarget {
  #[inline]
  pub fn node(self) -> NodeId {
    match self {
      Self::Node(id) => id,
      Self::Leaf { text, .. } => text,
    }
  }
}

#[derive(Debug, Clone)]
pub struct HandleMap<H> {
  nodes:   SecondaryMap<NodeId, H>,
  leaves:  SecondaryMap<NodeId, Vec<(usize, H)>>,
  targets: HashMap<H, HandleTarget>,
}

impl<H> Default for HandleMap<H> {
  fn default() -> Self {
    Self {
      nodes:   SecondaryMap::new(),
      leaves:  SecondaryMap::new(),
      targets: HashMap::new(),
    }
  }
}

impl<H: Copy + Eq + Hash> HandleMap<H> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Associates `handle` with the element or text `id`, replacing any
  /// previous handle of that node.
  pub fn register(&mut self, id: NodeId, handle: H) {
    match self.nodes.insert(id, handle) {
      Some(old) if old != handle => {
        self.targets.remove(&old);
      },
      _ => {},
    }
    self.targets.insert(handle, HandleTarget::Node(id));
  }

  /// Associates `handle` with the leaf of `text` that starts at `offset`.
  pub fn register_leaf(&mut self, handle: H, text: NodeId, offset: usize) {
    let Some(leaves) = self.leaves.entry(text).map(|entry| entry.or_default()) else {
      return;
    };
    if let Some(slot) = leaves.iter_mut().find(|(start, _)| *start == offset) {
      let old = std::mem::replace(&mut slot.1, handle);
      if old != handle {
        self.targets.remove(&old);
      }
    } else {
      leaves.push((offset, handle));
      leaves.sort_unstable_by_key(|(start, _)| *start);
    }
    self.targets.insert(handle, HandleTarget::Leaf { text, offset });
  }

  /// Forgets `handle`. Returns what it pointed at.
  pub fn deregister(&mut self, handle: H) -> Option<HandleTarget> {
    let target = self.targets.remove(&handle)?;
    match target {
      HandleTarget::Node(id) => {
        if self.nodes.get(id) == Some(&handle) {
          self.nodes.remove(id);
        }
      },
      HandleTarget::Leaf { text, .. } => {
        if let Some(leaves) = self.leaves.get_mut(text) {
          leaves.retain(|(_, h)| *h != handle);
          if leaves.is_empty() {
            self.leaves.remove(text);
          }
        }
      },
    }
    Some(target)
  }

  pub fn target_for(&self, handle: H) -> Option<HandleTarget> {
    self.targets.get(&handle).copied()
  }

  pub fn node_for(&self, handle: H) -> Option<NodeId> {
    self.target_for(handle).map(HandleTarget::node)
  }

  #[inline]
  pub fn contains(&self, handle: H) -> bool {
    self.targets.contains_key(&handle)
  }

  pub fn handle_for(&self, id: NodeId) -> Option<H> {
    self.nodes.get(id).copied()
  }

  /// Leaf handles of a text node, ordered by start offset.
  pub fn leaves_of(&self, text: NodeId) -> &[(usize, H)] {
    self.leaves.get(text).map(Vec::as_slice).unwrap_or_default()
  }

  /// Drops every entry whose node is no longer in `tree`.
  pub fn retain_live(&mut self, tree: &NodeTree) {
    let before = self.targets.len();
    self.nodes.retain(|id, _| tree.contains(id));
    self.leaves.retain(|id, _| tree.contains(id));
    self
      .targets
      .retain(|_, target| tree.contains(target.node()));
    let dropped = before - self.targets.len();
    if dropped > 0 {
      tracing::trace!(dropped, "pruned handles of removed nodes");
    }
  }

  pub fn len(&self) -> usize {
    self.targets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }

  pub fn clear(&mut self) {
    self.nodes.clear();
    self.leaves.clear();
    self.targets.clear();
  }
}

#[cfg(test)]
mod tests {
  use the_doc::{
    Editor,
    Element,
    Node,
    Operation,
    Path,
  };

  use super::*;

  fn editor() -> Editor {
    Editor::new([
      Element::new("paragraph")
        .with_children([Node::text("one")])
        .into(),
      Element::new("paragraph")
        .with_children([Node::text("two")])
        .into(),
    ])
  }

  #[test]
  fn register_and_lookup_both_ways() {
    let editor = editor();
    let tree = editor.tree();
    let block = tree.get(&[0]).unwrap();
    let text = tree.get(&[0, 0]).unwrap();

    let mut handles = HandleMap::new();
    handles.register(block, 1u32);
    handles.register(text, 2);
    handles.register_leaf(3, text, 0);

    assert_eq!(handles.node_for(1), Some(block));
    assert_eq!(handles.handle_for(text), Some(2));
    assert_eq!(handles.target_for(3), Some(HandleTarget::Leaf { text, offset: 0 }));
    assert_eq!(handles.leaves_of(text), &[(0, 3)]);

    handles.register(block, 4);
    assert!(!handles.contains(1));
    assert_eq!(handles.node_for(4), Some(block));

    assert_eq!(handles.deregister(3), Some(HandleTarget::Leaf { text, offset: 0 }));
    assert!(handles.leaves_of(text).is_empty());
  }

  #[test]
  fn removed_nodes_are_pruned() {
    let mut editor = editor();
    let second = editor.tree().get(&[1]).unwrap();
    let second_text = editor.tree().get(&[1, 0]).unwrap();
    let first = editor.tree().get(&[0]).unwrap();

    let mut handles = HandleMap::new();
    handles.register(first, 10u32);
    handles.register(second, 11);
    handles.register_leaf(12, second_text, 0);

    let node = editor.node(&Path::from([1])).unwrap();
    editor
      .apply(Operation::RemoveNode {
        path: Path::from([1]),
        node,
      })
      .unwrap();
    handles.retain_live(editor.tree());

    assert_eq!(handles.len(), 1);
    assert_eq!(handles.node_for(10), Some(first));
    assert_eq!(handles.node_for(11), None);
    assert_eq!(handles.node_for(12), None);
  }
}
