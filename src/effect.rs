//! Side effects requested by the game engines.
//!
//! Engines never perform I/O themselves: every state transition returns the
//! oracle calls and timers it needs, and the session runtime executes them.
//! Results come back as events carrying the same `Ticket`, so an engine can
//! recognise (and drop) answers to requests it has since superseded.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Identity of one in-flight oracle request or timer. Unique process-wide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl Ticket {
  pub fn next() -> Self {
    Ticket(NEXT_TICKET.fetch_add(1, Ordering::Relaxed))
  }
}

impl fmt::Display for Ticket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

#[derive(Debug)]
pub enum Effect<C> {
  /// Issue an oracle request.
  Call { ticket: Ticket, call: C },
  /// Abort a request or timer. Unknown tickets are ignored.
  Cancel(Ticket),
  /// Fire repeatedly every `every` until cancelled.
  Ticker { ticket: Ticket, every: Duration },
  /// Fire once after `after`.
  Timer { ticket: Ticket, after: Duration },
}

impl<C> Effect<C> {
  pub fn ticket(&self) -> Ticket {
    match self {
      Effect::Call { ticket, .. }
      | Effect::Ticker { ticket, .. }
      | Effect::Timer { ticket, .. } => *ticket,
      Effect::Cancel(ticket) => *ticket,
    }
  }
}
