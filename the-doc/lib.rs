//! The editable document: an arena node tree, the operation applier and the
//! editing commands built on top of it.

pub mod apply;
pub mod editor;
pub mod normalize;
pub mod query;
pub mod refs;
pub mod transforms;
pub mod tree;

pub use apply::{
  OperationError,
  Result,
};
pub use editor::{
  Change,
  Editor,
};
pub use query::Unit;
pub use refs::{
  PathRef,
  PointRef,
  RangeRef,
  Refs,
};
pub use the_core::{
  Tendril,
  node::{
    Element,
    Node,
    Properties,
    Text,
  },
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
pub use transforms::{
  Direction,
  Edge,
};
pub use tree::{
  NodeId,
  NodeTree,
};
