pub mod chars;
pub mod grapheme;
pub mod node;
pub mod operation;
pub mod path;
pub mod point;
pub mod range;
pub mod text;

use smartstring::{
  LazyCompact,
  SmartString,
};

/// Text storage for leaves. Most runs are short enough to stay inline.
pub type Tendril = SmartString<LazyCompact>;
