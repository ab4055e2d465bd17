//! Leading + trailing throttling on the virtual clock.
//!
//! The first call in a quiet period runs immediately. Calls arriving within
//! `wait` of the last invocation collapse into one trailing invocation at
//! the end of the window. The throttle does not own a timer; it tells the
//! caller when to arm one and is told when it fired.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
  /// Invoke now.
  Invoke,
  /// A trailing invocation is due after this delay; (re)arm the timer.
  Defer(Duration),
}

#[derive(Debug, Clone)]
pub struct Throttle {
  wait:        Duration,
  last_invoke: Option<Duration>,
  trailing:    bool,
}

impl Throttle {
  pub fn new(wait: Duration) -> Self {
    Self {
      wait,
      last_invoke: None,
      trailing: false,
    }
  }

  #[inline]
  pub fn wait(&self) -> Duration {
    self.wait
  }

  /// Registers a call at `now`.
  pub fn call(&mut self, now: Duration) -> ThrottleDecision {
    match self.last_invoke {
      Some(last) if now < last + self.wait => {
        self.trailing = true;
        ThrottleDecision::Defer(last + self.wait - now)
      },
      _ => {
        self.last_invoke = Some(now);
        self.trailing = false;
        ThrottleDecision::Invoke
      },
    }
  }

  /// The trailing timer fired. Returns true when the caller should invoke.
  pub fn fire(&mut self, now: Duration) -> bool {
    if !self.trailing {
      return false;
    }
    self.trailing = false;
    self.last_invoke = Some(now);
    true
  }

  /// Runs a pending trailing invocation right away.
  pub fn flush(&mut self, now: Duration) -> bool {
    self.fire(now)
  }

  /// Drops any pending trailing call and resets the window.
  pub fn cancel(&mut self) {
    self.trailing = false;
    self.last_invoke = None;
  }

  #[inline]
  pub fn is_pending(&self) -> bool {
    self.trailing
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
  }

  #[test]
  fn leading_then_trailing() {
    let mut throttle = Throttle::new(ms(100));
    assert_eq!(throttle.call(ms(0)), ThrottleDecision::Invoke);
    assert_eq!(throttle.call(ms(30)), ThrottleDecision::Defer(ms(70)));
    assert_eq!(throttle.call(ms(60)), ThrottleDecision::Defer(ms(40)));
    assert!(throttle.is_pending());

    assert!(throttle.fire(ms(100)));
    assert!(!throttle.fire(ms(100)));
    assert_eq!(throttle.call(ms(150)), ThrottleDecision::Defer(ms(50)));
    assert_eq!(throttle.call(ms(250)), ThrottleDecision::Invoke);
  }

  #[test]
  fn cancel_resets_window() {
    let mut throttle = Throttle::new(ms(100));
    throttle.call(ms(0));
    throttle.call(ms(10));
    throttle.cancel();
    assert!(!throttle.flush(ms(20)));
    assert_eq!(throttle.call(ms(20)), ThrottleDecision::Invoke);
  }
}
