//! The bridge between the document and a platform's editable surface.
//!
//! Native selection changes, input notifications, composition events and
//! mutation records come in through [`Editable`]; document changes go back
//! out as native selection updates and re-render requests. All deferral runs
//! on the injected [`the_event::Timers`] clock.

pub mod config;
pub mod diff;
pub mod editable;
pub mod handles;
pub mod input;
pub mod mutation;
pub mod native;
pub mod render;
pub mod selection;

pub use config::{
  ConfigError,
  SyncConfig,
};
pub use diff::{
  StringDiff,
  TextDiff,
};
pub use editable::Editable;
pub use handles::{
  HandleMap,
  HandleTarget,
};
pub use input::{
  BeforeInput,
  EditAction,
  Flushed,
  Flushing,
  InputContext,
  InputManager,
  InputState,
  InputType,
};
pub use mutation::{
  MutationKind,
  MutationRecord,
  MutationWatcher,
};
pub use native::{
  NativePoint,
  NativeRange,
  NativeSurface,
};
pub use render::{
  Highlight,
  Renderer,
  render,
};
pub use selection::{
  NativeSelection,
  SelectionSync,
  SyncState,
};

/// Everything the bridge defers to a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
  /// Commit pending diffs after the user stopped typing.
  Flush,
  /// Make sure a scheduled action runs even without an input notification.
  Action,
  /// Leave composition once trailing composition events had time to land.
  CompositionEnd,
  /// Drop the flushing flag once the current event turn is over.
  FlushingReset,
  /// Trailing edge of the throttled native selection read.
  SelectionChange,
  /// A native selection read requested for the next turn.
  ScheduledSelectionChange,
  /// Release the guard held while writing the native selection.
  SelectionRelease,
}
