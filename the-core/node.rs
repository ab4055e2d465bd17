//! Document node values.
//!
//! The tree is made of two kinds of nodes. An [`Element`] owns an ordered
//! list of children plus arbitrary properties (`type`, `align`, ...). A
//! [`Text`] is always a leaf: a string plus formatting marks (`bold`,
//! `italic`, ...).
//!
//! On the wire both are flat JSON objects. Elements are recognised by their
//! `children` array and texts by their `text` string:
//!
//! ```json
//! { "type": "paragraph", "children": [{ "text": "Hello", "bold": true }] }
//! ```

use std::collections::BTreeMap;

use serde::{
  Deserialize,
  Serialize,
};
use serde_json::{
  Map,
  Value,
};
use thiserror::Error;

use crate::{
  Tendril,
  path::Path,
  text::char_len,
};

/// Property bag shared by elements (properties) and texts (marks).
pub type Properties = BTreeMap<String, Value>;

/// Keys that hold node content and can never be used as a property.
pub const RESERVED_KEYS: [&str; 2] = ["children", "text"];

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum NodeError {
  #[error("node must be an object, got {0}")]
  NotAnObject(String),
  #[error("node has neither a `children` array nor a `text` string")]
  UnknownShape,
  #[error("node has both `children` and `text`")]
  AmbiguousShape,
  #[error("`{0}` is reserved and cannot be used as a property")]
  ReservedKey(String),
}

pub type Result<T> = std::result::Result<T, NodeError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Node {
  Element(Element),
  Text(Text),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
  pub children:   Vec<Node>,
  pub properties: Properties,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Text {
  pub text:  Tendril,
  pub marks: Properties,
}

impl Element {
  /// An empty element with its `type` property set.
  pub fn new(kind: &str) -> Self {
    let mut properties = Properties::new();
    properties.insert("type".into(), Value::String(kind.into()));
    Self {
      children: Vec::new(),
      properties,
    }
  }

  #[must_use]
  pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
    self.children.extend(children);
    self
  }

  #[must_use]
  pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.properties.insert(key.into(), value.into());
    self
  }

  /// The `type` property, if it is a string.
  pub fn kind(&self) -> Option<&str> {
    self.properties.get("type").and_then(Value::as_str)
  }
}

impl Text {
  pub fn new(text: &str) -> Self {
    Self {
      text:  text.into(),
      marks: Properties::new(),
    }
  }

  #[must_use]
  pub fn with_mark(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.marks.insert(key.into(), value.into());
    self
  }

  /// Length in chars.
  #[inline]
  pub fn len(&self) -> usize {
    char_len(&self.text)
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }

  pub fn equals_marks(&self, other: &Text) -> bool {
    self.marks == other.marks
  }

  /// Splits this text into leaves at decoration boundaries.
  ///
  /// Each leaf carries the text's own marks with the properties of every
  /// decoration covering it layered on top. Collapsed decorations are
  /// ignored. The leaves always cover the whole text, in order, and there
  /// is at least one leaf even for an empty text.
  pub fn decorations(&self, decorations: &[Decoration]) -> Vec<Leaf> {
    let len = self.len();
    let mut bounds = vec![0, len];
    for deco in decorations.iter().filter(|deco| deco.start < deco.end) {
      bounds.push(deco.start.min(len));
      bounds.push(deco.end.min(len));
    }
    bounds.sort_unstable();
    bounds.dedup();

    if len == 0 {
      return vec![Leaf {
        text:   Tendril::new(),
        marks:  self.marks.clone(),
        offset: 0,
      }];
    }

    bounds
      .windows(2)
      .map(|w| {
        let (start, end) = (w[0], w[1]);
        let mut marks = self.marks.clone();
        for deco in decorations {
          if deco.start < deco.end && deco.start <= start && end <= deco.end {
            marks.extend(deco.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
          }
        }
        Leaf {
          text: crate::text::slice(&self.text, start, end).into(),
          marks,
          offset: start,
        }
      })
      .collect()
  }
}

/// A highlighted span inside one text node, in char offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoration {
  pub start:      usize,
  pub end:        usize,
  pub properties: Properties,
}

/// A formatted run of one text node after decorations were applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
  pub text:   Tendril,
  pub marks:  Properties,
  /// Char offset of the leaf inside its text node.
  pub offset: usize,
}

impl Node {
  pub fn text(text: &str) -> Self {
    Node::Text(Text::new(text))
  }

  #[inline]
  pub fn is_text(&self) -> bool {
    matches!(self, Node::Text(_))
  }

  #[inline]
  pub fn is_element(&self) -> bool {
    matches!(self, Node::Element(_))
  }

  pub fn as_text(&self) -> Option<&Text> {
    match self {
      Node::Text(text) => Some(text),
      Node::Element(_) => None,
    }
  }

  pub fn as_element(&self) -> Option<&Element> {
    match self {
      Node::Element(element) => Some(element),
      Node::Text(_) => None,
    }
  }

  /// Children of an element; empty for a text.
  pub fn children(&self) -> &[Node] {
    match self {
      Node::Element(element) => &element.children,
      Node::Text(_) => &[],
    }
  }

  /// Element properties or text marks.
  pub fn properties(&self) -> &Properties {
    match self {
      Node::Element(element) => &element.properties,
      Node::Text(text) => &text.marks,
    }
  }

  pub fn properties_mut(&mut self) -> &mut Properties {
    match self {
      Node::Element(element) => &mut element.properties,
      Node::Text(text) => &mut text.marks,
    }
  }

  /// The descendant at `path`, relative to this node.
  pub fn get(&self, path: &[usize]) -> Option<&Node> {
    path
      .iter()
      .try_fold(self, |node, &index| node.children().get(index))
  }

  pub fn get_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
    let mut node = self;
    for &index in path {
      node = match node {
        Node::Element(element) => element.children.get_mut(index)?,
        Node::Text(_) => return None,
      };
    }
    Some(node)
  }

  pub fn has(&self, path: &[usize]) -> bool {
    self.get(path).is_some()
  }

  /// The text at `path`, or `None` when the path is missing or an element.
  pub fn leaf(&self, path: &[usize]) -> Option<&Text> {
    self.get(path).and_then(Node::as_text)
  }

  /// Every text below this node in document order, with relative paths.
  pub fn texts(&self) -> Vec<(Path, &Text)> {
    let mut out = Vec::new();
    collect_texts(self, &mut Path::root(), &mut out);
    out
  }

  /// Concatenated text content.
  pub fn string(&self) -> String {
    match self {
      Node::Text(text) => text.text.to_string(),
      Node::Element(element) => element.children.iter().map(Node::string).collect(),
    }
  }
}

fn collect_texts<'a>(node: &'a Node, path: &mut Path, out: &mut Vec<(Path, &'a Text)>) {
  match node {
    Node::Text(text) => out.push((path.clone(), text)),
    Node::Element(element) => {
      for (index, child) in element.children.iter().enumerate() {
        path.push(index);
        collect_texts(child, path, out);
        path.pop();
      }
    },
  }
}

impl From<Element> for Node {
  fn from(element: Element) -> Self {
    Node::Element(element)
  }
}

impl From<Text> for Node {
  fn from(text: Text) -> Self {
    Node::Text(text)
  }
}

/// Rejects property bags that try to smuggle in content keys.
pub fn check_properties(properties: &Properties) -> Result<()> {
  match RESERVED_KEYS
    .iter()
    .find(|key| properties.contains_key(**key))
  {
    Some(key) => Err(NodeError::ReservedKey((*key).to_string())),
    None => Ok(()),
  }
}

impl TryFrom<Value> for Node {
  type Error = NodeError;

  fn try_from(value: Value) -> Result<Self> {
    let Value::Object(mut map) = value else {
      return Err(NodeError::NotAnObject(value.to_string()));
    };

    let children = map.remove("children");
    let text = map.remove("text");
    let properties: Properties = map.into_iter().collect();

    match (children, text) {
      (Some(Value::Array(children)), None) => {
        let children = children
          .into_iter()
          .map(Node::try_from)
          .collect::<Result<Vec<_>>>()?;
        Ok(Node::Element(Element {
          children,
          properties,
        }))
      },
      (None, Some(Value::String(text))) => {
        Ok(Node::Text(Text {
          text:  text.into(),
          marks: properties,
        }))
      },
      (Some(_), Some(_)) => Err(NodeError::AmbiguousShape),
      _ => Err(NodeError::UnknownShape),
    }
  }
}

impl From<Node> for Value {
  fn from(node: Node) -> Self {
    let mut map = Map::new();
    match node {
      Node::Element(element) => {
        map.extend(element.properties);
        map.insert(
          "children".into(),
          Value::Array(element.children.into_iter().map(Value::from).collect()),
        );
      },
      Node::Text(text) => {
        map.extend(text.marks);
        map.insert("text".into(), Value::String(text.text.into()));
      },
    }
    Value::Object(map)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn doc() -> Node {
    Element::new("editor")
      .with_children([
        Element::new("paragraph")
          .with_children([Node::text("Hello"), Text::new(" world").with_mark("bold", true).into()])
          .into(),
        Element::new("paragraph")
          .with_children([Node::text("Bar")])
          .into(),
      ])
      .into()
  }

  #[test]
  fn get_and_leaf_follow_paths() {
    let doc = doc();
    assert_eq!(doc.leaf(&[0, 1]).map(|t| t.text.as_str()), Some(" world"));
    assert!(doc.get(&[0]).is_some_and(Node::is_element));
    assert!(doc.leaf(&[0]).is_none());
    assert!(!doc.has(&[0, 2]));
    assert!(!doc.has(&[0, 0, 0]));
  }

  #[test]
  fn texts_are_in_document_order() {
    let doc = doc();
    let paths: Vec<Vec<usize>> = doc.texts().into_iter().map(|(p, _)| p.to_vec()).collect();
    assert_eq!(paths, vec![vec![0, 0], vec![0, 1], vec![1, 0]]);
    assert_eq!(doc.string(), "Hello worldBar");
  }

  #[test]
  fn json_round_trip_uses_flat_objects() {
    let value = json!({
      "type": "paragraph",
      "children": [{ "text": "Hi", "italic": true }]
    });
    let node: Node = serde_json::from_value(value.clone()).unwrap();
    let text = node.leaf(&[0]).unwrap();
    assert_eq!(text.marks.get("italic"), Some(&Value::Bool(true)));
    assert_eq!(serde_json::to_value(&node).unwrap(), value);
  }

  #[test]
  fn decoding_rejects_bad_shapes() {
    assert_eq!(
      Node::try_from(json!({ "type": "p" })),
      Err(NodeError::UnknownShape)
    );
    assert_eq!(
      Node::try_from(json!({ "text": "a", "children": [] })),
      Err(NodeError::AmbiguousShape)
    );
    assert!(matches!(
      Node::try_from(json!("text")),
      Err(NodeError::NotAnObject(_))
    ));
  }

  #[test]
  fn reserved_properties_are_rejected() {
    let mut props = Properties::new();
    props.insert("align".into(), json!("left"));
    assert!(check_properties(&props).is_ok());
    props.insert("text".into(), json!("x"));
    assert_eq!(
      check_properties(&props),
      Err(NodeError::ReservedKey("text".into()))
    );
  }

  #[test]
  fn decorations_split_into_leaves() {
    let text = Text::new("hello world").with_mark("bold", true);
    let mut highlight = Properties::new();
    highlight.insert("highlight".into(), json!(true));
    let leaves = text.decorations(&[Decoration {
      start:      6,
      end:        11,
      properties: highlight,
    }]);

    assert_eq!(leaves.len(), 2);
    assert_eq!(leaves[0].text, "hello ");
    assert_eq!(leaves[0].offset, 0);
    assert!(!leaves[0].marks.contains_key("highlight"));
    assert_eq!(leaves[1].text, "world");
    assert_eq!(leaves[1].offset, 6);
    assert_eq!(leaves[1].marks.get("highlight"), Some(&json!(true)));
    assert_eq!(leaves[1].marks.get("bold"), Some(&json!(true)));
  }

  #[test]
  fn empty_text_has_one_leaf() {
    let leaves = Text::new("").decorations(&[]);
    assert_eq!(leaves.len(), 1);
    assert!(leaves[0].text.is_empty());
  }
}
