//! Keeping the native selection and the document selection in step.
//!
//! Native to logical: selection-change notifications are throttled, then
//! resolved through the handle table. Logical to native: after a change the
//! document selection is written back, with the synchronizer in
//! [`SyncState::Syncing`] so the notification that write triggers is not
//! read back as a user selection.

use std::{
  hash::Hash,
  time::Duration,
};

use the_doc::{
  Editor,
  NodeTree,
  Range,
};
use the_event::{
  Throttle,
  ThrottleDecision,
  Timers,
};

use crate::{
  TimerKind,
  config::SyncConfig,
  handles::HandleMap,
  native::{
    NativeRange,
    NativeSurface,
    to_logical_range,
    to_native_range,
  },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
  #[default]
  Idle,
  /// The native selection is being written; notifications are our own echo.
  Syncing,
}

/// What a native selection means for the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeSelection {
  Select(Range),
  /// Nothing selected, or the selection is outside the editable content.
  Deselect,
}

#[derive(Debug, Clone)]
pub struct SelectionSync {
  state:    SyncState,
  throttle: Throttle,
  dragging: bool,
  eager:    bool,
}

impl SelectionSync {
  pub fn new(config: &SyncConfig) -> Self {
    Self {
      state:    SyncState::Idle,
      throttle: Throttle::new(config.selection_throttle),
      dragging: false,
      eager:    config.eager_composition_sync,
    }
  }

  #[inline]
  pub fn state(&self) -> SyncState {
    self.state
  }

  pub fn set_dragging(&mut self, dragging: bool) {
    self.dragging = dragging;
  }

  /// Whether a native selection change should be read right now. While
  /// flushing, the echo of our own write is let through: the flush needs
  /// the native selection to restore the user's caret.
  pub fn accepts_native(&self, composing: bool, flushing: bool) -> bool {
    (self.eager || !composing)
      && (self.state == SyncState::Idle || flushing)
      && !self.dragging
  }

  /// Registers a native selection-change notification. Returns true when
  /// the caller should read the native selection now; otherwise a trailing
  /// read has been scheduled.
  pub fn notify(&mut self, timers: &mut Timers<TimerKind>) -> bool {
    match self.throttle.call(timers.now()) {
      ThrottleDecision::Invoke => true,
      ThrottleDecision::Defer(delay) => {
        timers.arm(TimerKind::SelectionChange, delay);
        false
      },
    }
  }

  /// Requests a native selection read on the next turn.
  pub fn schedule(&mut self, timers: &mut Timers<TimerKind>) {
    timers.arm(TimerKind::ScheduledSelectionChange, Duration::ZERO);
  }

  /// The trailing timer fired. Returns true when a read is due.
  pub fn fire(&mut self, now: Duration) -> bool {
    self.throttle.fire(now)
  }

  /// Drops every pending native selection read.
  pub fn cancel(&mut self, timers: &mut Timers<TimerKind>) {
    timers.cancel(TimerKind::ScheduledSelectionChange);
    timers.cancel(TimerKind::SelectionChange);
    self.throttle.cancel();
  }

  /// Takes every pending native selection read so the caller can run it
  /// immediately. Returns true if there was one.
  pub fn take_pending(&mut self, timers: &mut Timers<TimerKind>) -> bool {
    let scheduled = timers.cancel(TimerKind::ScheduledSelectionChange);
    let trailing = self.throttle.flush(timers.now());
    if trailing {
      timers.cancel(TimerKind::SelectionChange);
    }
    scheduled || trailing
  }

  pub fn release(&mut self) {
    if self.state == SyncState::Syncing {
      tracing::trace!("released native selection guard");
    }
    self.state = SyncState::Idle;
  }

  /// Interprets a native selection. Endpoints that do not resolve to
  /// registered content deselect.
  pub fn resolve<H: Copy + Eq + Hash>(
    &self,
    tree: &NodeTree,
    handles: &HandleMap<H>,
    native: Option<&NativeRange<H>>,
  ) -> NativeSelection {
    let Some(native) = native else {
      return NativeSelection::Deselect;
    };
    match to_logical_range(tree, handles, native) {
      Some(range) => NativeSelection::Select(range),
      None => {
        tracing::debug!("native selection is outside the editable content");
        NativeSelection::Deselect
      },
    }
  }

  /// Writes the document selection to the surface if the two disagree, or
  /// unconditionally with `force`. Returns true when the native selection
  /// was written.
  pub fn sync_native<S, H>(
    &mut self,
    editor: &Editor,
    handles: &HandleMap<H>,
    surface: &mut S,
    composing: bool,
    force: bool,
    timers: &mut Timers<TimerKind>,
  ) -> bool
  where
    S: NativeSurface<H>,
    H: Copy + Eq + Hash,
  {
    if composing && !self.eager {
      return false;
    }

    let native = surface.selection();
    let current = native
      .as_ref()
      .and_then(|native| to_logical_range(editor.tree(), handles, native));
    if !force && current.as_ref() == editor.selection() {
      return false;
    }

    let target = match editor.selection() {
      Some(range) => {
        let Some(target) = to_native_range(editor.tree(), handles, range) else {
          tracing::debug!(
            anchor = %range.anchor,
            focus = %range.focus,
            "selection has no rendered handles"
          );
          return false;
        };
        Some(target)
      },
      None if native.is_none() => return false,
      None => None,
    };

    tracing::trace!(deselect = target.is_none(), "sync native selection");
    self.state = SyncState::Syncing;
    surface.set_selection(target);
    timers.arm(TimerKind::SelectionRelease, Duration::ZERO);
    true
  }
}
