//! Walking the document for a UI renderer.
//!
//! Every element and leaf is handed to the [`Renderer`] together with the
//! [`NodeId`] of the node it came from. Ids survive moves and splits of
//! their siblings, so a UI reconciles by key rather than by position.

use the_core::node::{
  Decoration,
  Leaf,
};
use the_doc::{
  NodeId,
  NodeTree,
  Path,
  Point,
  Properties,
  Range,
  Text,
};

/// A decorated range and the properties it layers onto the text below.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
  pub range:      Range,
  pub properties: Properties,
}

impl Highlight {
  pub fn new(range: Range, properties: Properties) -> Self {
    Self { range, properties }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementAttributes {
  pub key:  NodeId,
  pub path: Path,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafAttributes {
  pub key:    NodeId,
  pub path:   Path,
  /// Char offset of the leaf inside its text.
  pub offset: usize,
}

pub trait Renderer {
  type Output;

  fn render_element(
    &mut self,
    attributes: ElementAttributes,
    children: Vec<Self::Output>,
    properties: &Properties,
  ) -> Self::Output;

  fn render_leaf(&mut self, attributes: LeafAttributes, leaf: &Leaf, text: &Text) -> Self::Output;

  /// Extra highlighting for the node at `path`. Highlights returned for an
  /// element apply to every text below it.
  fn decorate(&self, _tree: &NodeTree, _id: NodeId, _path: &Path) -> Vec<Highlight> {
    Vec::new()
  }
}

/// Renders the top-level blocks.
pub fn render<R: Renderer>(tree: &NodeTree, renderer: &mut R) -> Vec<R::Output> {
  let mut out = Vec::new();
  for (index, &child) in tree.children(tree.root()).iter().enumerate() {
    render_node(tree, renderer, child, Path::from([index]), &[], &mut out);
  }
  out
}

fn render_node<R: Renderer>(
  tree: &NodeTree,
  renderer: &mut R,
  id: NodeId,
  path: Path,
  inherited: &[Highlight],
  out: &mut Vec<R::Output>,
) {
  let Some(range) = node_range(tree, id) else {
    return;
  };
  let mut highlights = renderer.decorate(tree, id, &path);
  highlights.extend(inherited.iter().cloned());
  highlights.retain(|highlight| highlight.range.intersection(&range).is_some());

  if let Some(text) = tree.text(id) {
    let decorations: Vec<Decoration> = highlights
      .iter()
      .filter_map(|highlight| {
        let overlap = highlight.range.intersection(&range)?;
        let (start, end) = overlap.edges();
        Some(Decoration {
          start:      start.offset,
          end:        end.offset,
          properties: highlight.properties.clone(),
        })
      })
      .collect();
    for leaf in text.decorations(&decorations) {
      let attributes = LeafAttributes {
        key:    id,
        path:   path.clone(),
        offset: leaf.offset,
      };
      out.push(renderer.render_leaf(attributes, &leaf, text));
    }
    return;
  }

  let mut children = Vec::new();
  for (index, &child) in tree.children(id).iter().enumerate() {
    render_node(tree, renderer, child, path.child(index), &highlights, &mut children);
  }
  let properties = tree.properties(id).cloned().unwrap_or_default();
  let attributes = ElementAttributes { key: id, path };
  out.push(renderer.render_element(attributes, children, &properties));
}

/// From the start of the first text below `id` to the end of the last.
fn node_range(tree: &NodeTree, id: NodeId) -> Option<Range> {
  let texts = tree.texts_under(id);
  let (first, _) = texts.first()?;
  let (last, last_id) = texts.last()?;
  let len = tree.text(*last_id)?.len();
  Some(Range::new(Point::new(first.clone(), 0), Point::new(last.clone(), len)))
}

#[cfg(test)]
mod tests {
  use the_doc::{
    Editor,
    Element,
    Node,
  };

  use super::*;

  /// Renders to a compact string: `<type>children</type>` and `[text|marks]`.
  struct Markup {
    search: Option<Range>,
  }

  impl Renderer for Markup {
    type Output = String;

    fn render_element(
      &mut self,
      _attributes: ElementAttributes,
      children: Vec<String>,
      properties: &Properties,
    ) -> String {
      let kind = properties
        .get("type")
        .and_then(|value| value.as_str())
        .unwrap_or("?");
      format!("<{kind}>{}</{kind}>", children.concat())
    }

    fn render_leaf(&mut self, _attributes: LeafAttributes, leaf: &Leaf, _text: &Text) -> String {
      let mut marks: Vec<&str> = leaf.marks.keys().map(String::as_str).collect();
      marks.sort_unstable();
      format!("[{}|{}]", leaf.text, marks.join(","))
    }

    fn decorate(&self, _tree: &NodeTree, _id: NodeId, path: &Path) -> Vec<Highlight> {
      match &self.search {
        Some(range) if path.len() == 1 => {
          let mut properties = Properties::new();
          properties.insert("match".into(), true.into());
          vec![Highlight::new(range.clone(), properties)]
        },
        _ => Vec::new(),
      }
    }
  }

  fn editor() -> Editor {
    Editor::new([
      Element::new("paragraph")
        .with_children([
          Node::text("Hello "),
          Text::new("world").with_mark("bold", true).into(),
        ])
        .into(),
      Element::new("quote")
        .with_children([Node::text("again")])
        .into(),
    ])
  }

  #[test]
  fn elements_wrap_their_leaves() {
    let editor = editor();
    let out = render(editor.tree(), &mut Markup { search: None });
    assert_eq!(out, vec![
      "<paragraph>[Hello |][world|bold]</paragraph>".to_string(),
      "<quote>[again|]</quote>".to_string(),
    ]);
  }

  #[test]
  fn block_highlights_split_leaves_across_texts() {
    let editor = editor();
    let search = Range::new(Point::new([0, 0], 4), Point::new([0, 1], 2));
    let out = render(editor.tree(), &mut Markup {
      search: Some(search),
    });
    assert_eq!(
      out[0],
      "<paragraph>[Hell|][o |match][wo|bold,match][rld|bold]</paragraph>"
    );
    assert_eq!(out[1], "<quote>[again|]</quote>");
  }

  #[test]
  fn keys_follow_nodes_across_moves() {
    use the_doc::Operation;

    struct Keys(Vec<NodeId>);
    impl Renderer for Keys {
      type Output = ();

      fn render_element(&mut self, attributes: ElementAttributes, _: Vec<()>, _: &Properties) {
        self.0.push(attributes.key);
      }

      fn render_leaf(&mut self, _: LeafAttributes, _: &Leaf, _: &Text) {}
    }

    let mut editor = editor();
    let mut before = Keys(Vec::new());
    render(editor.tree(), &mut before);

    editor
      .apply(Operation::MoveNode {
        path:     Path::from([0]),
        new_path: Path::from([1]),
      })
      .unwrap();
    let mut after = Keys(Vec::new());
    render(editor.tree(), &mut after);

    assert_eq!(after.0, vec![before.0[1], before.0[0]]);
  }
}
