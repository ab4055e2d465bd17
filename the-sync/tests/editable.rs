use std::time::Duration;

use the_doc::{
  Editor,
  Element,
  Node,
  Path,
  Point,
  Range,
};
use the_sync::{
  Editable,
  InputState,
  InputType,
  MutationKind,
  MutationRecord,
  NativePoint,
  NativeRange,
  NativeSurface,
  SyncConfig,
  SyncState,
};

const BLOCK: u32 = 1;
const TEXT: u32 = 2;

#[derive(Debug)]
struct Surface {
  selection: Option<NativeRange<u32>>,
  focused:   bool,
  writes:    usize,
  renders:   usize,
}

impl Surface {
  fn at(offset: usize) -> Self {
    Self {
      selection: Some(native(offset)),
      focused:   true,
      writes:    0,
      renders:   0,
    }
  }
}

impl NativeSurface<u32> for Surface {
  fn selection(&self) -> Option<NativeRange<u32>> {
    self.selection
  }

  fn set_selection(&mut self, range: Option<NativeRange<u32>>) {
    self.selection = range;
    self.writes += 1;
  }

  fn has_focus(&self) -> bool {
    self.focused
  }

  fn force_render(&mut self) {
    self.renders += 1;
  }
}

fn native(offset: usize) -> NativeRange<u32> {
  NativeRange::collapsed(NativePoint::new(TEXT, offset))
}

fn caret(offset: usize) -> Range {
  Range::collapsed(Point::new([0, 0], offset))
}

/// One paragraph with the caret at `offset` on both sides.
fn session(text: &str, offset: usize, config: SyncConfig) -> Editable<Surface, u32> {
  let editor = Editor::new([Element::new("paragraph")
    .with_children([Node::text(text)])
    .into()])
  .with_selection(caret(offset));
  let block = editor.tree().get(&[0]).unwrap();
  let leaf = editor.tree().get(&[0, 0]).unwrap();

  let mut editable = Editable::new(editor, Surface::at(offset), config);
  editable.handles_mut().register(block, BLOCK);
  editable.handles_mut().register(leaf, TEXT);
  editable
}

fn text(editable: &Editable<Surface, u32>) -> String {
  editable
    .editor()
    .leaf(&Path::from([0, 0]))
    .map(|leaf| leaf.text.to_string())
    .unwrap_or_default()
}

#[test]
fn typing_commits_once_the_user_pauses() {
  let config = SyncConfig::default();
  let flush_delay = config.flush_delay;
  let mut editable = session("Hello", 5, config);

  editable.on_before_input(InputType::InsertText, Some("!".into()), Some(native(5)));
  editable.on_input();
  assert_eq!(editable.input().state(), InputState::PendingDiffs);
  assert_eq!(text(&editable), "Hello");

  // The platform moved its caret past the new char.
  editable.surface_mut().selection = Some(native(6));
  editable.on_selection_change();
  assert_eq!(editable.editor().selection(), Some(&caret(5)));

  editable.advance(flush_delay);
  assert_eq!(text(&editable), "Hello!");
  assert_eq!(editable.editor().selection(), Some(&caret(6)));
  assert_eq!(editable.input().state(), InputState::Idle);
  assert_eq!(editable.surface().writes, 0);
}

#[test]
fn composition_commits_after_it_ends() {
  let config = SyncConfig::default();
  let resolve_delay = config.resolve_delay;
  let mut editable = session("Hello", 5, config);

  editable.on_composition_start();
  editable.on_before_input(
    InputType::InsertCompositionText,
    Some("hi".into()),
    Some(native(5)),
  );
  editable.on_input();
  editable.surface_mut().selection = Some(native(7));
  editable.on_selection_change();
  assert_eq!(editable.input().state(), InputState::Composing);

  editable.on_composition_end();
  editable.advance(resolve_delay - Duration::from_millis(1));
  assert_eq!(text(&editable), "Hello");

  editable.advance(Duration::from_millis(1));
  assert_eq!(text(&editable), "Hellohi");
  assert_eq!(editable.editor().selection(), Some(&caret(7)));
  assert!(!editable.input().is_composing());
}

#[test]
fn actions_rewrite_the_native_selection() {
  let mut editable = session("Hi", 2, SyncConfig::default());
  let target = NativeRange::new(NativePoint::new(TEXT, 2), NativePoint::new(TEXT, 0));

  editable.on_before_input(InputType::DeleteContentBackward, None, Some(target));
  assert!(editable.input().has_pending_action());

  editable.on_input();
  assert_eq!(text(&editable), "");
  assert_eq!(editable.editor().selection(), Some(&caret(0)));
  assert_eq!(editable.surface().selection, Some(native(0)));
  assert_eq!(editable.surface().writes, 1);
  assert_eq!(editable.selection_sync().state(), SyncState::Syncing);

  editable.advance(Duration::ZERO);
  assert_eq!(editable.selection_sync().state(), SyncState::Idle);
  assert_eq!(editable.input().state(), InputState::Idle);
}

#[test]
fn document_selection_is_written_back_without_echo() {
  let mut editable = session("Hello", 5, SyncConfig::default());

  editable.edit(|editor| editor.select(caret(1))).unwrap();
  assert_eq!(editable.surface().selection, Some(native(1)));
  assert_eq!(editable.surface().writes, 1);

  // A change reported while our write is in flight is not read back; the
  // document selection is written again instead.
  editable.surface_mut().selection = Some(native(3));
  editable.on_selection_change();
  assert_eq!(editable.editor().selection(), Some(&caret(1)));
  assert_eq!(editable.surface().selection, Some(native(1)));
  assert_eq!(editable.surface().writes, 2);

  editable.advance(Duration::ZERO);
  assert_eq!(editable.selection_sync().state(), SyncState::Idle);

  let throttle = editable.config().selection_throttle;
  editable.advance(throttle);
  editable.surface_mut().selection = Some(native(3));
  editable.on_selection_change();
  assert_eq!(editable.editor().selection(), Some(&caret(3)));
  assert_eq!(editable.surface().writes, 2);
}

#[test]
fn unfocused_surfaces_are_left_alone() {
  let mut editable = session("Hello", 5, SyncConfig::default());
  editable.surface_mut().focused = false;

  editable.edit(|editor| editor.select(caret(2))).unwrap();
  assert_eq!(editable.surface().writes, 0);
  assert_eq!(editable.surface().selection, Some(native(5)));
}

#[test]
fn selection_on_unknown_content_deselects() {
  let mut editable = session("Hello", 5, SyncConfig::default());
  editable.surface_mut().selection = Some(NativeRange::collapsed(NativePoint::new(99, 0)));

  editable.on_selection_change();
  assert_eq!(editable.editor().selection(), None);
  assert_eq!(editable.surface().writes, 0);
}

#[test]
fn untracked_mutations_force_a_render() {
  let mut editable = session("Hello", 5, SyncConfig::default());

  editable.record_mutation(MutationRecord::new(MutationKind::CharacterData, TEXT));
  assert!(editable.on_mutations());
  assert_eq!(editable.surface().renders, 1);

  // Expected while input is pending.
  editable.on_before_input(InputType::InsertText, Some("!".into()), Some(native(5)));
  editable.record_mutation(MutationRecord::new(MutationKind::CharacterData, TEXT));
  assert!(!editable.disconnect_mutations());

  editable.record_mutation(MutationRecord::new(MutationKind::CharacterData, TEXT));
  assert!(!editable.on_mutations());
  assert_eq!(editable.surface().renders, 1);
}

#[test]
fn read_only_ignores_input() {
  let config = SyncConfig {
    read_only: true,
    ..SyncConfig::default()
  };
  let mut editable = session("Hello", 5, config);

  editable.on_before_input(InputType::InsertText, Some("!".into()), Some(native(5)));
  editable.on_composition_start();
  assert_eq!(editable.input().state(), InputState::Idle);
}

#[test]
fn removed_nodes_lose_their_handles() {
  let mut editable = session("Hello", 5, SyncConfig::default());
  editable
    .apply(the_doc::Operation::RemoveNode {
      path: Path::from([0, 0]),
      node: Node::text("Hello"),
    })
    .unwrap();

  assert!(!editable.handles().contains(TEXT));
  assert!(editable.handles().contains(BLOCK));
}

#[test]
fn diverged_input_is_dropped_with_its_action() {
  let mut editable = session("Hello", 5, SyncConfig::default());

  // The platform claims a caret the document does not have.
  editable.on_before_input(InputType::InsertText, Some("x".into()), Some(native(9)));
  editable.surface_mut().selection = Some(native(9));
  assert_eq!(editable.input().state(), InputState::PendingDiffs);

  editable.on_before_input(InputType::InsertParagraph, None, Some(native(5)));
  assert!(editable.input().has_pending_action());

  editable.advance(Duration::ZERO);
  assert_eq!(editable.editor().children().len(), 1);
  assert_eq!(text(&editable), "Hello");
  assert_eq!(editable.editor().selection(), Some(&caret(5)));
  assert_eq!(editable.surface().selection, Some(native(5)));
  assert_eq!(editable.surface().writes, 1);
  assert!(!editable.input().has_pending_changes());
  assert_eq!(editable.input().state(), InputState::Idle);
}
