//! A deadline queue keyed by timer kind.
//!
//! Each kind has at most one live timer: arming a kind again replaces the
//! previous deadline, so there are never duplicate flushes queued for the
//! same purpose. The clock only moves when the owner calls [`Timers::advance`]
//! or [`Timers::pop_due`].

use std::{
  fmt::Debug,
  time::Duration,
};

#[derive(Debug, Clone)]
struct Timer<K> {
  kind:     K,
  deadline: Duration,
  seq:      u64,
}

#[derive(Debug, Clone)]
pub struct Timers<K> {
  now:     Duration,
  seq:     u64,
  pending: Vec<Timer<K>>,
}

impl<K> Default for Timers<K> {
  fn default() -> Self {
    Self {
      now:     Duration::ZERO,
      seq:     0,
      pending: Vec::new(),
    }
  }
}

impl<K: Copy + Eq + Debug> Timers<K> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Time elapsed on the virtual clock.
  #[inline]
  pub fn now(&self) -> Duration {
    self.now
  }

  /// Schedules `kind` to fire `delay` from now, cancelling any timer of the
  /// same kind that is still pending.
  pub fn arm(&mut self, kind: K, delay: Duration) {
    self.cancel(kind);
    self.seq += 1;
    let deadline = self.now + delay;
    tracing::trace!(?kind, ?deadline, "arm timer");
    self.pending.push(Timer {
      kind,
      deadline,
      seq: self.seq,
    });
  }

  /// Returns true if a timer of this kind was pending.
  pub fn cancel(&mut self, kind: K) -> bool {
    let before = self.pending.len();
    self.pending.retain(|timer| timer.kind != kind);
    before != self.pending.len()
  }

  pub fn cancel_all(&mut self) {
    self.pending.clear();
  }

  pub fn is_armed(&self, kind: K) -> bool {
    self.pending.iter().any(|timer| timer.kind == kind)
  }

  pub fn deadline(&self, kind: K) -> Option<Duration> {
    self
      .pending
      .iter()
      .find(|timer| timer.kind == kind)
      .map(|timer| timer.deadline)
  }

  /// The earliest pending deadline.
  pub fn next_deadline(&self) -> Option<Duration> {
    self.pending.iter().map(|timer| timer.deadline).min()
  }

  pub fn is_empty(&self) -> bool {
    self.pending.is_empty()
  }

  /// Removes and returns the next timer due at or before `until`, moving the
  /// clock to its deadline. Ties fire in the order they were armed.
  ///
  /// Handlers may arm new timers between calls; a zero-delay timer armed
  /// while draining is still picked up by the same drain.
  pub fn pop_due(&mut self, until: Duration) -> Option<K> {
    let (idx, _) = self
      .pending
      .iter()
      .enumerate()
      .filter(|(_, timer)| timer.deadline <= until)
      .min_by_key(|(_, timer)| (timer.deadline, timer.seq))?;
    let timer = self.pending.remove(idx);
    self.now = self.now.max(timer.deadline);
    Some(timer.kind)
  }

  /// Moves the clock to `until` without firing anything.
  pub fn settle(&mut self, until: Duration) {
    self.now = self.now.max(until);
  }

  /// Advances the clock by `by`, returning every kind that came due in
  /// deadline order.
  pub fn advance(&mut self, by: Duration) -> Vec<K> {
    let until = self.now + by;
    let mut due = Vec::new();
    while let Some(kind) = self.pop_due(until) {
      due.push(kind);
    }
    self.settle(until);
    due
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  enum Kind {
    Flush,
    Action,
    Resolve,
  }

  fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
  }

  #[test]
  fn fires_in_deadline_order() {
    let mut timers = Timers::new();
    timers.arm(Kind::Flush, ms(200));
    timers.arm(Kind::Resolve, ms(25));
    timers.arm(Kind::Action, ms(0));

    assert_eq!(timers.advance(ms(30)), vec![Kind::Action, Kind::Resolve]);
    assert_eq!(timers.now(), ms(30));
    assert_eq!(timers.advance(ms(170)), vec![Kind::Flush]);
    assert!(timers.is_empty());
  }

  #[test]
  fn rearming_replaces_previous_timer() {
    let mut timers = Timers::new();
    timers.arm(Kind::Flush, ms(200));
    timers.advance(ms(150));
    timers.arm(Kind::Flush, ms(200));

    assert!(timers.advance(ms(100)).is_empty());
    assert_eq!(timers.deadline(Kind::Flush), Some(ms(350)));
    assert_eq!(timers.advance(ms(100)), vec![Kind::Flush]);
  }

  #[test]
  fn ties_fire_in_arm_order() {
    let mut timers = Timers::new();
    timers.arm(Kind::Resolve, ms(10));
    timers.arm(Kind::Action, ms(10));
    assert_eq!(timers.advance(ms(10)), vec![Kind::Resolve, Kind::Action]);
  }

  #[test]
  fn cancel_reports_whether_armed() {
    let mut timers = Timers::new();
    timers.arm(Kind::Action, ms(0));
    assert!(timers.is_armed(Kind::Action));
    assert!(timers.cancel(Kind::Action));
    assert!(!timers.cancel(Kind::Action));
    assert_eq!(timers.next_deadline(), None);
  }

  #[test]
  fn pop_due_sees_timers_armed_while_draining() {
    let mut timers = Timers::new();
    timers.arm(Kind::Flush, ms(5));
    let until = ms(10);

    assert_eq!(timers.pop_due(until), Some(Kind::Flush));
    assert_eq!(timers.now(), ms(5));
    timers.arm(Kind::Action, ms(0));
    assert_eq!(timers.pop_due(until), Some(Kind::Action));
    assert_eq!(timers.pop_due(until), None);
  }

  quickcheck::quickcheck! {
    fn never_fires_twice_per_kind(delays: Vec<(bool, u8)>) -> bool {
      let mut timers = Timers::new();
      for (flush, delay) in &delays {
        let kind = if *flush { Kind::Flush } else { Kind::Action };
        timers.arm(kind, ms(u64::from(*delay)));
      }
      let fired = timers.advance(ms(300));
      let flushes = fired.iter().filter(|k| **k == Kind::Flush).count();
      let actions = fired.len() - flushes;
      flushes <= 1 && actions <= 1 && timers.is_empty()
    }
  }
}
