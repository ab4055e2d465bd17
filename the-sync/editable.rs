//! The editing session: one document bound to one native surface.
//!
//! [`Editable`] owns every piece of the bridge and is the only place they
//! meet. Each entry point handles one platform notification and ends with
//! [`Editable::commit`], which lets pending input follow the new
//! operations, prunes handles of removed nodes, notifies change listeners
//! and writes the selection back to the surface.

use std::{
  hash::Hash,
  time::Duration,
};

use the_doc::{
  Editor,
  Operation,
  Range,
};
use the_event::Timers;

use crate::{
  TimerKind,
  config::SyncConfig,
  diff::normalize_range,
  handles::HandleMap,
  input::{
    BeforeInput,
    Flushed,
    Flushing,
    InputContext,
    InputManager,
    InputType,
  },
  mutation::{
    MutationRecord,
    MutationWatcher,
  },
  native::{
    NativeRange,
    NativeSurface,
    to_logical_range,
  },
  selection::{
    NativeSelection,
    SelectionSync,
  },
};

pub struct Editable<S, H> {
  editor:    Editor,
  handles:   HandleMap<H>,
  selection: SelectionSync,
  input:     InputManager,
  mutations: MutationWatcher<H>,
  timers:    Timers<TimerKind>,
  config:    SyncConfig,
  surface:   S,
}

impl<S, H> Editable<S, H>
where
  S: NativeSurface<H>,
  H: Copy + Eq + Hash,
{
  pub fn new(editor: Editor, surface: S, config: SyncConfig) -> Self {
    Self {
      handles: HandleMap::new(),
      selection: SelectionSync::new(&config),
      input: InputManager::new(&config, &editor),
      mutations: MutationWatcher::new(),
      timers: Timers::new(),
      editor,
      config,
      surface,
    }
  }

  #[inline]
  pub fn editor(&self) -> &Editor {
    &self.editor
  }

  #[inline]
  pub fn handles(&self) -> &HandleMap<H> {
    &self.handles
  }

  /// The table the renderer registers its handles in.
  #[inline]
  pub fn handles_mut(&mut self) -> &mut HandleMap<H> {
    &mut self.handles
  }

  #[inline]
  pub fn surface(&self) -> &S {
    &self.surface
  }

  #[inline]
  pub fn surface_mut(&mut self) -> &mut S {
    &mut self.surface
  }

  #[inline]
  pub fn input(&self) -> &InputManager {
    &self.input
  }

  #[inline]
  pub fn selection_sync(&self) -> &SelectionSync {
    &self.selection
  }

  #[inline]
  pub fn timers(&self) -> &Timers<TimerKind> {
    &self.timers
  }

  #[inline]
  pub fn config(&self) -> &SyncConfig {
    &self.config
  }

  /// Runs `f` against the document, then commits.
  pub fn edit<T>(
    &mut self,
    f: impl FnOnce(&mut Editor) -> the_doc::Result<T>,
  ) -> the_doc::Result<T> {
    let result = f(&mut self.editor);
    self.commit();
    result
  }

  /// Applies one operation and normalizes what it touched.
  pub fn apply(&mut self, op: Operation) -> the_doc::Result<()> {
    self.edit(|editor| editor.apply_normalized(op))
  }

  /// Ends an event turn.
  pub fn commit(&mut self) {
    self.input.catch_up(&self.editor);
    self.handles.retain_live(self.editor.tree());
    self.editor.flush_change();
    self.sync_selection();
  }

  /// Writes the document selection to the surface. Nothing is written
  /// while input is pending, since the native selection is ahead of the
  /// document until the flush, or while the surface is not focused.
  pub fn sync_selection(&mut self) -> bool {
    if self.input.has_pending_changes() || !self.surface.has_focus() {
      return false;
    }
    let force = self.input.is_flushing() == Flushing::Action;
    self.selection.sync_native(
      &self.editor,
      &self.handles,
      &mut self.surface,
      self.input.is_composing(),
      force,
      &mut self.timers,
    )
  }

  pub fn set_dragging(&mut self, dragging: bool) {
    self.selection.set_dragging(dragging);
  }

  /// The platform reports that its selection changed.
  pub fn on_selection_change(&mut self) {
    if self.selection.notify(&mut self.timers) {
      self.selection_changed();
    }
    self.commit();
  }

  fn selection_changed(&mut self) {
    let composing = self.input.is_composing();
    let flushing = self.input.is_flushing() != Flushing::No;
    if !self.selection.accepts_native(composing, flushing) {
      tracing::trace!(composing, flushing, "ignored native selection change");
      return;
    }
    self.read_native_selection();
  }

  /// Takes over the native selection. While input is pending or flushing
  /// it is only recorded, since it is in native coordinates.
  pub fn read_native_selection(&mut self) {
    let native = self.surface.selection();
    let resolved = self
      .selection
      .resolve(self.editor.tree(), &self.handles, native.as_ref());

    let range = match resolved {
      NativeSelection::Select(range) => range,
      NativeSelection::Deselect => {
        self.deselect();
        return;
      },
    };

    if self.input.has_pending_changes() || self.input.is_flushing() != Flushing::No {
      let mut cx = InputContext {
        editor:    &mut self.editor,
        timers:    &mut self.timers,
        selection: &mut self.selection,
      };
      self.input.handle_user_select(&mut cx, Some(range));
      return;
    }

    match normalize_range(&self.editor, &range) {
      Some(range) => self.select(range),
      None => {
        tracing::debug!(?range, "native selection does not resolve to document text");
        self.deselect();
      },
    }
  }

  fn select(&mut self, range: Range) {
    if let Err(err) = self.editor.select(range) {
      tracing::warn!(%err, "failed to take over native selection");
    }
  }

  fn deselect(&mut self) {
    if self.editor.selection().is_none() {
      return;
    }
    tracing::debug!("deselect");
    if let Err(err) = self.editor.deselect() {
      tracing::warn!(%err, "failed to deselect");
    }
  }

  /// A before-input notification. `target` is the platform's own target
  /// range; without one the native selection stands in.
  pub fn on_before_input(
    &mut self,
    input_type: InputType,
    data: Option<String>,
    target: Option<NativeRange<H>>,
  ) {
    if self.config.read_only {
      return;
    }
    let native = target.or_else(|| self.surface.selection());
    let event = BeforeInput {
      input_type,
      data,
      target: native
        .as_ref()
        .and_then(|native| to_logical_range(self.editor.tree(), &self.handles, native)),
      native_collapsed: native.is_some_and(|native| native.is_collapsed()),
    };

    let mut cx = InputContext {
      editor:    &mut self.editor,
      timers:    &mut self.timers,
      selection: &mut self.selection,
    };
    self.input.handle_before_input(&mut cx, event);
    self.commit();
  }

  /// An input notification: the platform finished a mutation.
  pub fn on_input(&mut self) {
    if self.input.wants_flush_on_input() {
      tracing::debug!("flush input");
      self.flush();
    }
    self.commit();
  }

  pub fn on_composition_start(&mut self) {
    if self.config.read_only {
      return;
    }
    self.input.handle_composition_start(&mut self.timers);
  }

  pub fn on_composition_end(&mut self) {
    self.input.handle_composition_end(&mut self.timers);
  }

  /// Buffers a mutation record until the next [`Editable::on_mutations`].
  pub fn record_mutation(&mut self, record: MutationRecord<H>) {
    self.mutations.record(record);
  }

  /// Delivers buffered mutation records. Returns true when the surface was
  /// asked to re-render.
  pub fn on_mutations(&mut self) -> bool {
    let records = self.mutations.take_records();
    self.restore_if_needed(&records)
  }

  /// Stops watching mutations. Records buffered so far are still handled.
  pub fn disconnect_mutations(&mut self) -> bool {
    let records = self.mutations.disconnect();
    self.restore_if_needed(&records)
  }

  pub fn observe_mutations(&mut self) {
    self.mutations.observe();
  }

  fn restore_if_needed(&mut self, records: &[MutationRecord<H>]) -> bool {
    if !self.input.handle_mutations(records, &self.handles) {
      return false;
    }
    tracing::debug!(records = records.len(), "untracked native edit, re-rendering");
    self.surface.force_render();
    true
  }

  /// Commits everything pending now.
  pub fn flush(&mut self) -> Flushed {
    let mut cx = InputContext {
      editor:    &mut self.editor,
      timers:    &mut self.timers,
      selection: &mut self.selection,
    };
    let flushed = self.input.flush(&mut cx);
    if let Flushed::Diffs { read_selection } = flushed {
      if read_selection {
        self.selection.schedule(&mut self.timers);
      }
      if self.selection.take_pending(&mut self.timers) {
        self.selection_changed();
      }
      self.input.finish_flush(&mut self.editor);
    }
    flushed
  }

  /// Moves the clock forward by `by`, firing every timer that comes due.
  /// Each fired timer ends its own turn.
  pub fn advance(&mut self, by: Duration) {
    let until = self.timers.now() + by;
    while let Some(kind) = self.timers.pop_due(until) {
      self.fire(kind);
      self.commit();
    }
    self.timers.settle(until);
  }

  fn fire(&mut self, kind: TimerKind) {
    tracing::trace!(?kind, "timer fired");
    match kind {
      TimerKind::Flush | TimerKind::Action => {
        self.flush();
      },
      TimerKind::CompositionEnd => {
        self.input.end_composition();
        self.flush();
      },
      TimerKind::FlushingReset => self.input.reset_flushing(),
      TimerKind::SelectionChange => {
        if self.selection.fire(self.timers.now()) {
          self.selection_changed();
        }
      },
      TimerKind::ScheduledSelectionChange => {
        if self.selection.notify(&mut self.timers) {
          self.selection_changed();
        }
      },
      TimerKind::SelectionRelease => self.selection.release(),
    }
  }
}
