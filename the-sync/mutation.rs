//! Buffering of native mutation records.

use std::mem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
  ChildList,
  CharacterData,
  Attributes,
}

/// One change the platform made to the rendered tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationRecord<H> {
  pub kind:   MutationKind,
  pub target: H,
}

impl<H> MutationRecord<H> {
  pub fn new(kind: MutationKind, target: H) -> Self {
    Self { kind, target }
  }
}

/// Collects mutation records between deliveries. Records are only lost by
/// taking them; disconnecting hands back whatever was still buffered.
#[derive(Debug)]
pub struct MutationWatcher<H> {
  records:   Vec<MutationRecord<H>>,
  observing: bool,
}

impl<H> Default for MutationWatcher<H> {
  fn default() -> Self {
    Self {
      records:   Vec::new(),
      observing: true,
    }
  }
}

impl<H> MutationWatcher<H> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn observe(&mut self) {
    self.observing = true;
  }

  #[inline]
  pub fn is_observing(&self) -> bool {
    self.observing
  }

  /// Buffers `record`. Ignored while disconnected.
  pub fn record(&mut self, record: MutationRecord<H>) {
    if self.observing {
      self.records.push(record);
    }
  }

  pub fn take_records(&mut self) -> Vec<MutationRecord<H>> {
    mem::take(&mut self.records)
  }

  /// Stops observing and returns the records buffered so far.
  pub fn disconnect(&mut self) -> Vec<MutationRecord<H>> {
    self.observing = false;
    self.take_records()
  }

  #[inline]
  pub fn has_records(&self) -> bool {
    !self.records.is_empty()
  }
}
