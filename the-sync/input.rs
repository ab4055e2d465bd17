//! Deferred input handling.
//!
//! Text the platform inserted natively is not applied to the document right
//! away. Each notification is stored as a pending [`TextDiff`] on its text
//! node, consecutive diffs on the same text coalesce, and the whole batch is
//! committed by [`InputManager::flush`] once the user pauses, changes
//! position, or an edit comes in that a plain substitution cannot express.
//! Those edits become a pending [`EditAction`] that runs after every pending
//! diff.
//!
//! Everything pending is kept in native coordinates and follows every
//! operation applied in the meantime; see [`InputManager::catch_up`].

use std::{
  fmt,
  hash::Hash,
  str::FromStr,
  time::Duration,
};

use the_core::{
  grapheme::{
    next_grapheme_boundary,
    prev_grapheme_boundary,
  },
  text::char_len,
};
use the_doc::{
  Direction,
  Editor,
  Operation,
  Path,
  Point,
  Properties,
  Range,
  RangeAffinity,
  Unit,
};
use the_event::Timers;
use thiserror::Error;

use crate::{
  TimerKind,
  config::SyncConfig,
  diff::{
    StringDiff,
    TextDiff,
    apply_string_diffs,
    merge_string_diffs,
    normalize_point,
    normalize_range,
    normalize_string_diff,
    transform_pending_point,
    transform_pending_range,
    verify_diff_state,
  },
  handles::HandleMap,
  mutation::MutationRecord,
  selection::SelectionSync,
};

/// A deferred editing command.
pub enum EditAction {
  DeleteFragment(Direction),
  DeleteBackward(Unit),
  DeleteForward(Unit),
  /// Removes the whole line around the caret.
  DeleteSoftLine,
  InsertBreak,
  InsertSoftBreak,
  InsertText(String),
  /// Inserts text containing newlines, one soft break per newline.
  InsertLines(String),
  Custom(Box<dyn FnOnce(&mut Editor) -> the_doc::Result<()>>),
}

impl fmt::Debug for EditAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::DeleteFragment(direction) => f.debug_tuple("DeleteFragment").field(direction).finish(),
      Self::DeleteBackward(unit) => f.debug_tuple("DeleteBackward").field(unit).finish(),
      Self::DeleteForward(unit) => f.debug_tuple("DeleteForward").field(unit).finish(),
      Self::DeleteSoftLine => f.write_str("DeleteSoftLine"),
      Self::InsertBreak => f.write_str("InsertBreak"),
      Self::InsertSoftBreak => f.write_str("InsertSoftBreak"),
      Self::InsertText(text) => f.debug_tuple("InsertText").field(text).finish(),
      Self::InsertLines(text) => f.debug_tuple("InsertLines").field(text).finish(),
      Self::Custom(_) => f.write_str("Custom(..)"),
    }
  }
}

impl EditAction {
  pub fn run(self, editor: &mut Editor) -> the_doc::Result<()> {
    match self {
      Self::DeleteFragment(direction) => editor.delete_fragment(direction),
      Self::DeleteBackward(unit) => editor.delete_backward(unit),
      Self::DeleteForward(unit) => editor.delete_forward(unit),
      Self::DeleteSoftLine => {
        editor.delete_backward(Unit::Line)?;
        editor.delete_forward(Unit::Line)
      },
      Self::InsertBreak => editor.insert_break(),
      Self::InsertSoftBreak => editor.insert_soft_break(),
      Self::InsertText(text) => editor.insert_text(&text),
      Self::InsertLines(text) => {
        let mut lines = text.split('\n').peekable();
        while let Some(line) = lines.next() {
          if !line.is_empty() {
            editor.insert_text(line)?;
          }
          if lines.peek().is_some() {
            editor.insert_soft_break()?;
          }
        }
        Ok(())
      },
      Self::Custom(run) => run(editor),
    }
  }
}

/// Where a pending action applies, in native coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
  Point(Point),
  Range(Range),
}

#[derive(Debug)]
struct PendingAction {
  action: EditAction,
  at:     Option<Target>,
}

/// Input types of a before-input notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputType {
  InsertText,
  InsertReplacementText,
  InsertLineBreak,
  InsertParagraph,
  InsertFromYank,
  InsertFromDrop,
  InsertFromPaste,
  InsertFromComposition,
  InsertCompositionText,
  DeleteCompositionText,
  DeleteByComposition,
  DeleteByCut,
  DeleteByDrag,
  DeleteContent,
  DeleteContentForward,
  DeleteContentBackward,
  DeleteEntireSoftLine,
  DeleteHardLineBackward,
  DeleteHardLineForward,
  DeleteSoftLineBackward,
  DeleteSoftLineForward,
  DeleteWordBackward,
  DeleteWordForward,
}

const INPUT_TYPES: [(&str, InputType); 23] = [
  ("insertText", InputType::InsertText),
  ("insertReplacementText", InputType::InsertReplacementText),
  ("insertLineBreak", InputType::InsertLineBreak),
  ("insertParagraph", InputType::InsertParagraph),
  ("insertFromYank", InputType::InsertFromYank),
  ("insertFromDrop", InputType::InsertFromDrop),
  ("insertFromPaste", InputType::InsertFromPaste),
  ("insertFromComposition", InputType::InsertFromComposition),
  ("insertCompositionText", InputType::InsertCompositionText),
  ("deleteCompositionText", InputType::DeleteCompositionText),
  ("deleteByComposition", InputType::DeleteByComposition),
  ("deleteByCut", InputType::DeleteByCut),
  ("deleteByDrag", InputType::DeleteByDrag),
  ("deleteContent", InputType::DeleteContent),
  ("deleteContentForward", InputType::DeleteContentForward),
  ("deleteContentBackward", InputType::DeleteContentBackward),
  ("deleteEntireSoftLine", InputType::DeleteEntireSoftLine),
  ("deleteHardLineBackward", InputType::DeleteHardLineBackward),
  ("deleteHardLineForward", InputType::DeleteHardLineForward),
  ("deleteSoftLineBackward", InputType::DeleteSoftLineBackward),
  ("deleteSoftLineForward", InputType::DeleteSoftLineForward),
  ("deleteWordBackward", InputType::DeleteWordBackward),
  ("deleteWordForward", InputType::DeleteWordForward),
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported input type `{0}`")]
pub struct UnknownInputType(pub String);

impl FromStr for InputType {
  type Err = UnknownInputType;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    INPUT_TYPES
      .iter()
      .find(|(name, _)| *name == s)
      .map(|(_, kind)| *kind)
      .ok_or_else(|| UnknownInputType(s.to_string()))
  }
}

impl InputType {
  pub fn as_str(self) -> &'static str {
    INPUT_TYPES
      .iter()
      .find(|(_, kind)| *kind == self)
      .map_or("", |(name, _)| name)
  }

  pub fn is_delete(self) -> bool {
    matches!(
      self,
      Self::DeleteByComposition
        | Self::DeleteByCut
        | Self::DeleteByDrag
        | Self::DeleteCompositionText
        | Self::DeleteContent
        | Self::DeleteContentBackward
        | Self::DeleteContentForward
        | Self::DeleteEntireSoftLine
        | Self::DeleteHardLineBackward
        | Self::DeleteHardLineForward
        | Self::DeleteSoftLineBackward
        | Self::DeleteSoftLineForward
        | Self::DeleteWordBackward
        | Self::DeleteWordForward
    )
  }

  pub fn is_backward(self) -> bool {
    matches!(
      self,
      Self::DeleteContentBackward
        | Self::DeleteHardLineBackward
        | Self::DeleteSoftLineBackward
        | Self::DeleteWordBackward
    )
  }
}

impl fmt::Display for InputType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A before-input notification with its target already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeforeInput {
  pub input_type:       InputType,
  pub data:             Option<String>,
  /// The affected range in native coordinates; the document selection
  /// when the platform gave none.
  pub target:           Option<Range>,
  /// Whether the platform's own target range was collapsed.
  pub native_collapsed: bool,
}

impl BeforeInput {
  pub fn new(input_type: InputType) -> Self {
    Self {
      input_type,
      data: None,
      target: None,
      native_collapsed: true,
    }
  }

  #[must_use]
  pub fn with_data(mut self, data: impl Into<String>) -> Self {
    self.data = Some(data.into());
    self
  }

  #[must_use]
  pub fn with_target(mut self, target: Range) -> Self {
    self.native_collapsed = target.is_collapsed();
    self.target = Some(target);
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flushing {
  #[default]
  No,
  Yes,
  /// A flush ran an action or gave up on a stale diff; the native state
  /// has to be read again rather than trusted.
  Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
  Idle,
  Composing,
  PendingDiffs,
  Flushing,
}

/// How a flush ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flushed {
  /// Nothing was pending; only the pending selection was applied.
  Nothing,
  /// A pending action ran.
  Action,
  /// Pending diffs were committed. When `read_selection` is set the caller
  /// reads the native selection before [`InputManager::finish_flush`].
  Diffs { read_selection: bool },
}

/// Repairs composition target ranges that some keyboards report one char
/// too far to the right after text was typed behind a mark placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum PositionHint {
  #[default]
  Off,
  /// The next plain insertion starts tracking.
  Armed,
  Tracking(StringDiff),
}

/// The pieces of the session an input handler touches.
pub struct InputContext<'a> {
  pub editor:    &'a mut Editor,
  pub timers:    &'a mut Timers<TimerKind>,
  pub selection: &'a mut SelectionSync,
}

#[derive(Debug)]
pub struct InputManager {
  flush_delay:     Duration,
  resolve_delay:   Duration,
  action_delay:    Duration,
  diffs:           Vec<TextDiff>,
  next_id:         u64,
  action:          Option<PendingAction>,
  selection:       Option<Range>,
  insertion_marks: Option<Option<Properties>>,
  user_marks:      Option<Option<Properties>>,
  flushing:        Flushing,
  composing:       bool,
  hint:            PositionHint,
  seen:            usize,
}

impl InputManager {
  pub fn new(config: &SyncConfig, editor: &Editor) -> Self {
    Self {
      flush_delay:     config.flush_delay,
      resolve_delay:   config.resolve_delay,
      action_delay:    config.action_delay,
      diffs:           Vec::new(),
      next_id:         0,
      action:          None,
      selection:       None,
      insertion_marks: None,
      user_marks:      None,
      flushing:        Flushing::No,
      composing:       false,
      hint:            PositionHint::Off,
      seen:            editor.op_count(),
    }
  }

  pub fn state(&self) -> InputState {
    if self.flushing != Flushing::No {
      InputState::Flushing
    } else if self.composing {
      InputState::Composing
    } else if self.has_pending_changes() {
      InputState::PendingDiffs
    } else {
      InputState::Idle
    }
  }

  #[inline]
  pub fn has_pending_diffs(&self) -> bool {
    !self.diffs.is_empty()
  }

  #[inline]
  pub fn has_pending_action(&self) -> bool {
    self.action.is_some()
  }

  #[inline]
  pub fn has_pending_changes(&self) -> bool {
    self.has_pending_diffs() || self.has_pending_action()
  }

  #[inline]
  pub fn is_flushing(&self) -> Flushing {
    self.flushing
  }

  #[inline]
  pub fn is_composing(&self) -> bool {
    self.composing
  }

  pub fn pending_diffs(&self) -> &[TextDiff] {
    &self.diffs
  }

  pub fn pending_selection(&self) -> Option<&Range> {
    self.selection.as_ref()
  }

  /// Marks for the text of the next committed diff, e.g. after toggling
  /// bold on a collapsed selection while a diff is pending.
  pub fn set_insertion_marks(&mut self, marks: Option<Properties>) {
    self.insertion_marks = Some(marks);
  }

  /// Follows every operation applied since the last call. Must run before
  /// the editor hands its batch to listeners.
  pub fn catch_up(&mut self, editor: &Editor) {
    for op in editor.operations_since(self.seen) {
      self.transform(op);
    }
    self.seen = editor.op_count();
  }

  fn transform(&mut self, op: &Operation) {
    if let Some(selection) = self.selection.take() {
      self.selection = transform_pending_range(&self.diffs, &selection, op);
    }

    let dropped = match self.action.as_mut() {
      Some(pending) => match pending.at.take() {
        Some(Target::Point(point)) => {
          pending.at = transform_pending_point(&self.diffs, &point, op).map(Target::Point);
          pending.at.is_none()
        },
        Some(Target::Range(range)) => {
          pending.at = transform_pending_range(&self.diffs, &range, op).map(Target::Range);
          pending.at.is_none()
        },
        None => false,
      },
      None => false,
    };
    if dropped {
      if let Some(pending) = self.action.take() {
        tracing::debug!(action = ?pending.action, "dropped action whose target was removed");
      }
    }

    self.diffs = self
      .diffs
      .iter()
      .filter_map(|diff| diff.transform(op))
      .collect();
  }

  /// Records a native substitution on the text at `path`, coalescing it
  /// with the diff already pending there.
  pub fn store_diff(&mut self, editor: &Editor, path: Path, diff: StringDiff) {
    self.catch_up(editor);
    let Some(target) = editor.leaf(&path).map(|text| text.text.to_string()) else {
      tracing::warn!(%path, "diff for a path that is not a text");
      return;
    };

    let Some(idx) = self.diffs.iter().position(|pending| pending.path == path) else {
      if let Some(diff) = normalize_string_diff(&target, &diff) {
        tracing::debug!(%path, ?diff, "store diff");
        self.diffs.push(TextDiff {
          id: self.next_id,
          path,
          diff,
        });
        self.next_id += 1;
      }
      return;
    };

    match merge_string_diffs(&target, &self.diffs[idx].diff, &diff) {
      Some(merged) => {
        tracing::debug!(%path, diff = ?merged, "merged diff");
        self.diffs[idx].diff = merged;
      },
      None => {
        tracing::debug!(%path, "diff cancelled out");
        self.diffs.remove(idx);
      },
    }
  }

  /// Defers `action` until after every pending diff. A previously pending
  /// action is flushed first.
  pub fn schedule_action(
    &mut self,
    cx: &mut InputContext<'_>,
    action: EditAction,
    at: Option<Target>,
  ) {
    self.catch_up(cx.editor);
    self.hint = PositionHint::Off;
    tracing::debug!(?action, ?at, "schedule action");

    self.selection = None;
    cx.selection.cancel(cx.timers);

    if self.has_pending_action() {
      self.flush(cx);
    }

    self.action = Some(PendingAction { action, at });
    cx.timers.arm(TimerKind::Action, self.action_delay);
  }

  /// Makes sure pending changes are committed on the next turn.
  pub fn schedule_flush(&mut self, timers: &mut Timers<TimerKind>) {
    if !self.has_pending_action() {
      timers.arm(TimerKind::Action, Duration::ZERO);
    }
  }

  /// Commits every pending diff, oldest first, then the pending action.
  ///
  /// A diff whose text does not show up in the document afterwards means
  /// the native and document state have diverged. The flush stops there:
  /// the remaining diffs and pending action are discarded along with the
  /// user marks and pending selection, the document selection goes back to
  /// where it was before the flush, and the native selection is rewritten
  /// from the document.
  pub fn flush(&mut self, cx: &mut InputContext<'_>) -> Flushed {
    cx.timers.cancel(TimerKind::Flush);
    cx.timers.cancel(TimerKind::Action);
    self.catch_up(cx.editor);

    if !self.has_pending_changes() {
      self.apply_pending_selection(cx.editor);
      return Flushed::Nothing;
    }

    if self.flushing == Flushing::No {
      self.flushing = Flushing::Yes;
      cx.timers.arm(TimerKind::FlushingReset, Duration::ZERO);
    }
    if self.has_pending_action() {
      self.flushing = Flushing::Action;
    }

    let selection_ref = cx
      .editor
      .selection()
      .cloned()
      .map(|selection| cx.editor.refs_mut().range(selection, RangeAffinity::Forward));
    self.user_marks = Some(cx.editor.pending_marks().cloned());

    tracing::debug!(
      diffs = self.diffs.len(),
      action = ?self.action.as_ref().map(|pending| &pending.action),
      "flush"
    );

    let read_selection = self.has_pending_diffs();
    while let Some(diff) = self.diffs.first().cloned() {
      let marks = self.insertion_marks.take();
      if matches!(marks, Some(Some(_))) && self.hint == PositionHint::Off {
        self.hint = PositionHint::Armed;
      }

      let applied = commit_diff(cx.editor, &diff, marks);
      self.catch_up(cx.editor);
      self.diffs.retain(|pending| pending.id != diff.id);

      let valid = match applied {
        Ok(()) => verify_diff_state(cx.editor, &diff),
        Err(err) => {
          tracing::warn!(%err, path = %diff.path, "failed to commit diff");
          false
        },
      };
      if !valid {
        tracing::debug!(
          path = %diff.path,
          diff = ?diff.diff,
          dropped = self.diffs.len(),
          "invalid diff state, aborting flush"
        );
        self.diffs.clear();
        self.action = None;
        self.user_marks = None;
        self.selection = None;
        self.hint = PositionHint::Off;
        self.flushing = Flushing::Action;
        cx.selection.cancel(cx.timers);

        let restored = selection_ref.and_then(|r| cx.editor.refs_mut().unref_range(r));
        match restored.and_then(|selection| normalize_range(cx.editor, &selection)) {
          Some(selection) => select(cx.editor, selection),
          None => {
            if let Err(err) = cx.editor.deselect() {
              tracing::warn!(%err, "failed to deselect");
            }
          },
        }
        self.catch_up(cx.editor);
        return Flushed::Diffs {
          read_selection: false,
        };
      }
    }

    let restored = selection_ref.and_then(|r| cx.editor.refs_mut().unref_range(r));
    if let Some(selection) = restored {
      if self.selection.is_none() && cx.editor.selection() != Some(&selection) {
        select(cx.editor, selection);
      }
    }
    self.catch_up(cx.editor);

    if let Some(pending) = self.action.take() {
      self.perform_action(cx.editor, pending);
      return Flushed::Action;
    }
    Flushed::Diffs { read_selection }
  }

  /// The tail of a diff flush, after the native selection was read back.
  pub fn finish_flush(&mut self, editor: &mut Editor) {
    self.apply_pending_selection(editor);
    if let Some(marks) = self.user_marks.take() {
      editor.set_pending_marks(marks);
    }
  }

  fn apply_pending_selection(&mut self, editor: &mut Editor) {
    self.catch_up(editor);
    let Some(pending) = self.selection.take() else {
      return;
    };
    let normalized = normalize_range(editor, &pending);
    tracing::debug!(?pending, ?normalized, "apply pending selection");
    if let Some(range) = normalized {
      if editor.selection() != Some(&range) {
        select(editor, range);
      }
    }
    self.catch_up(editor);
  }

  fn perform_action(&mut self, editor: &mut Editor, pending: PendingAction) {
    if let Some(at) = pending.at {
      let target = match at {
        Target::Point(point) => normalize_point(editor, &point).map(Range::collapsed),
        Target::Range(range) => normalize_range(editor, &range),
      };
      let Some(target) = target else {
        tracing::debug!(action = ?pending.action, "action target no longer resolves");
        return;
      };
      if editor.selection() != Some(&target) {
        select(editor, target);
      }
    }

    if let Err(err) = pending.action.run(editor) {
      tracing::warn!(%err, "pending action failed");
    }
    self.catch_up(editor);
  }

  /// Records the selection the user made while changes are pending. It is
  /// applied once they are committed; moving to another text commits after
  /// the flush delay.
  pub fn handle_user_select(&mut self, cx: &mut InputContext<'_>, range: Option<Range>) {
    self.catch_up(cx.editor);
    self.selection = range.clone();
    cx.timers.cancel(TimerKind::Flush);

    let Some(range) = range else {
      return;
    };
    let current = cx.editor.selection();
    let path_changed = current.is_none_or(|s| s.anchor.path != range.anchor.path);
    let parent_changed =
      current.is_none_or(|s| s.anchor.path.parent() != range.anchor.path.parent());

    let tracking = matches!(self.hint, PositionHint::Tracking(_));
    if (path_changed && tracking) || parent_changed {
      self.hint = PositionHint::Off;
    }
    if path_changed || self.has_pending_diffs() {
      cx.timers.arm(TimerKind::Flush, self.flush_delay);
    }
  }

  pub fn handle_composition_start(&mut self, timers: &mut Timers<TimerKind>) {
    tracing::debug!("composition start");
    self.composing = true;
    timers.cancel(TimerKind::CompositionEnd);
  }

  /// Composition ends for real once the resolve delay passed without a new
  /// composition starting.
  pub fn handle_composition_end(&mut self, timers: &mut Timers<TimerKind>) {
    timers.arm(TimerKind::CompositionEnd, self.resolve_delay);
  }

  /// The composition-end timer fired.
  pub fn end_composition(&mut self) {
    tracing::debug!("composition end");
    self.composing = false;
  }

  /// The flushing flag only lasts for the turn that set it.
  pub fn reset_flushing(&mut self) {
    self.flushing = Flushing::No;
  }

  /// Whether an input notification should commit right away: it completes
  /// a pending action, or nothing is pending that could still coalesce.
  pub fn wants_flush_on_input(&self) -> bool {
    self.has_pending_action() || !self.has_pending_diffs()
  }

  /// Whether a batch of mutation records needs a re-render. Mutations are
  /// expected while changes are pending; otherwise a mutation of rendered
  /// content means the platform edited on its own and the rendered tree
  /// must be restored from the document.
  pub fn handle_mutations<H: Copy + Eq + Hash>(
    &self,
    records: &[MutationRecord<H>],
    handles: &HandleMap<H>,
  ) -> bool {
    if self.has_pending_changes() {
      return false;
    }
    records.iter().any(|record| handles.contains(record.target))
  }

  /// Classifies a before-input notification into a stored diff or a
  /// scheduled action.
  pub fn handle_before_input(&mut self, cx: &mut InputContext<'_>, event: BeforeInput) {
    cx.timers.cancel(TimerKind::Flush);
    self.catch_up(cx.editor);

    let BeforeInput {
      input_type,
      data,
      target,
      native_collapsed,
    } = event;
    if self.hint != PositionHint::Off
      && !matches!(input_type, InputType::InsertText | InputType::InsertCompositionText)
    {
      self.hint = PositionHint::Off;
    }

    let Some(mut target) = target.or_else(|| cx.editor.selection().cloned()) else {
      tracing::trace!(%input_type, "input without a target");
      return;
    };

    let mut can_store = true;
    if input_type.is_delete() {
      if target.is_expanded() {
        let (start, end) = target.edges();
        let at_leaf_end = cx
          .editor
          .leaf(&start.path)
          .is_some_and(|leaf| leaf.len() == start.offset);
        if at_leaf_end
          && end.offset == 0
          && cx.editor.next_text(&start.path).as_ref() == Some(&end.path)
        {
          target = Range::collapsed(end.clone());
        }
      }

      let direction = if input_type.is_backward() {
        Direction::Backward
      } else {
        Direction::Forward
      };
      let (start, end) = target.edges();
      let Some(leaf) = cx.editor.leaf(&start.path).map(|leaf| leaf.text.to_string()) else {
        tracing::debug!(path = %start.path, "delete target is not a text");
        return;
      };
      let removal = StringDiff::new(start.offset, end.offset, "");
      let pending = self
        .diffs
        .iter()
        .find(|pending| pending.path == start.path)
        .map(|pending| &pending.diff);
      if apply_string_diffs(&leaf, pending.into_iter().chain([&removal])).is_empty() {
        // The text node would be left empty, which only normalization can
        // clean up.
        can_store = false;
      }

      if target.is_expanded() {
        if can_store && target.anchor.path == target.focus.path {
          let path = target.anchor.path.clone();
          let caret = Range::collapsed(Point::new(path.clone(), start.offset));
          self.handle_user_select(cx, Some(caret));
          self.store_diff(cx.editor, path, removal);
          return;
        }
        let at = Some(Target::Range(target.clone()));
        return self.schedule_action(cx, EditAction::DeleteFragment(direction), at);
      }
    }

    let at = Some(Target::Range(target.clone()));
    match input_type {
      InputType::DeleteByComposition | InputType::DeleteByCut | InputType::DeleteByDrag => {
        self.schedule_action(cx, EditAction::DeleteFragment(Direction::Forward), at);
      },
      InputType::DeleteContent | InputType::DeleteContentForward => {
        let anchor = &target.anchor;
        if can_store && target.is_collapsed() {
          if let Some(text) = self.native_text(cx.editor, &anchor.path) {
            if anchor.offset < char_len(&text) {
              let end = next_grapheme_boundary(&text, anchor.offset);
              let diff = StringDiff::new(anchor.offset, end, "");
              return self.store_diff(cx.editor, anchor.path.clone(), diff);
            }
          }
        }
        self.schedule_action(cx, EditAction::DeleteForward(Unit::Character), at);
      },
      InputType::DeleteContentBackward => {
        // A collapsed document target with an expanded native one usually
        // means a zero-width placeholder is being deleted.
        let anchor = &target.anchor;
        if can_store && native_collapsed && target.is_collapsed() && anchor.offset > 0 {
          if let Some(text) = self.native_text(cx.editor, &anchor.path) {
            let start = prev_grapheme_boundary(&text, anchor.offset);
            let diff = StringDiff::new(start, anchor.offset, "");
            return self.store_diff(cx.editor, anchor.path.clone(), diff);
          }
        }
        self.schedule_action(cx, EditAction::DeleteBackward(Unit::Character), at);
      },
      InputType::DeleteEntireSoftLine => self.schedule_action(cx, EditAction::DeleteSoftLine, at),
      InputType::DeleteHardLineBackward => {
        self.schedule_action(cx, EditAction::DeleteBackward(Unit::Block), at);
      },
      InputType::DeleteSoftLineBackward => {
        self.schedule_action(cx, EditAction::DeleteBackward(Unit::Line), at);
      },
      InputType::DeleteHardLineForward => {
        self.schedule_action(cx, EditAction::DeleteForward(Unit::Block), at);
      },
      InputType::DeleteSoftLineForward => {
        self.schedule_action(cx, EditAction::DeleteForward(Unit::Line), at);
      },
      InputType::DeleteWordBackward => {
        self.schedule_action(cx, EditAction::DeleteBackward(Unit::Word), at);
      },
      InputType::DeleteWordForward => {
        self.schedule_action(cx, EditAction::DeleteForward(Unit::Word), at);
      },
      InputType::InsertLineBreak => self.schedule_action(cx, EditAction::InsertSoftBreak, at),
      InputType::InsertParagraph => self.schedule_action(cx, EditAction::InsertBreak, at),
      InputType::InsertCompositionText
      | InputType::DeleteCompositionText
      | InputType::InsertFromComposition
      | InputType::InsertFromDrop
      | InputType::InsertFromPaste
      | InputType::InsertFromYank
      | InputType::InsertReplacementText
      | InputType::InsertText => {
        self.insert(cx, input_type, data.unwrap_or_default(), target, can_store);
      },
    }
  }

  fn insert(
    &mut self,
    cx: &mut InputContext<'_>,
    input_type: InputType,
    mut text: String,
    target: Range,
    can_store: bool,
  ) {
    // Typing into a mark placeholder carries its zero-width char along.
    if matches!(self.insertion_marks, Some(Some(_))) {
      text = text.replacen('\u{FEFF}', "", 1);
    }

    // Pasting multi-line text through the keyboard appends a newline.
    if input_type == InputType::InsertText
      && text.ends_with('\n')
      && text.matches('\n').count() >= 2
    {
      text.pop();
    }

    let at = Some(Target::Range(target.clone()));
    if text.contains('\n') {
      return self.schedule_action(cx, EditAction::InsertLines(text), at);
    }

    if target.anchor.path == target.focus.path {
      let (start, end) = target.edges();
      let mut diff = StringDiff::new(start.offset, end.offset, text.clone());
      let path = start.path.clone();

      let tracking = match &self.hint {
        PositionHint::Tracking(hint) => Some(hint.clone()),
        _ => None,
      };
      match tracking {
        Some(hint) if !text.is_empty() && input_type == InputType::InsertCompositionText => {
          let hint_position = hint.start + leading_whitespace(&hint.text);
          let diff_position = diff.start + leading_whitespace(&diff.text);
          if diff_position == hint_position + 1 && diff.end == hint.start + hint.text_len() {
            tracing::debug!("adjusting insert position using hint");
            diff.start -= 1;
            self.hint = PositionHint::Armed;
            self.schedule_flush(cx.timers);
          } else {
            self.hint = PositionHint::Off;
          }
        },
        _ if input_type == InputType::InsertText => {
          self.hint = match std::mem::take(&mut self.hint) {
            PositionHint::Armed => PositionHint::Tracking(diff.clone()),
            PositionHint::Tracking(mut hint)
              if target.is_collapsed() && hint.end + hint.text_len() == start.offset =>
            {
              hint.text.push_str(&text);
              PositionHint::Tracking(hint)
            },
            _ => PositionHint::Off,
          };
        },
        _ => self.hint = PositionHint::Off,
      }

      if can_store {
        self.store_diff(cx.editor, path, diff);
        return;
      }
    }

    self.schedule_action(cx, EditAction::InsertText(text), at);
  }

  /// The text at `path` as the platform shows it, pending diff included.
  fn native_text(&self, editor: &Editor, path: &Path) -> Option<String> {
    let text = editor.leaf(path)?.text.to_string();
    let pending = self
      .diffs
      .iter()
      .find(|pending| pending.path == *path)
      .map(|pending| &pending.diff);
    Some(apply_string_diffs(&text, pending))
  }
}

fn select(editor: &mut Editor, range: Range) {
  if let Err(err) = editor.select(range) {
    tracing::warn!(%err, "failed to select");
  }
}

/// Applies one pending diff as a selection plus an insertion or deletion.
fn commit_diff(
  editor: &mut Editor,
  diff: &TextDiff,
  marks: Option<Option<Properties>>,
) -> the_doc::Result<()> {
  let range = diff.target_range();
  if editor.selection() != Some(&range) {
    editor.select(range)?;
  }
  if let Some(marks) = marks {
    editor.set_pending_marks(marks);
  }
  if diff.diff.text.is_empty() {
    editor.delete_fragment(Direction::Forward)
  } else {
    editor.insert_text(&diff.diff.text)
  }
}

/// Index of the first non-whitespace char, or the length of `text`.
fn leading_whitespace(text: &str) -> usize {
  text.chars().take_while(|ch| ch.is_whitespace()).count()
}
