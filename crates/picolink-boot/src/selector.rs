use std::fmt;

use tracing::{info, warn};

use crate::console::Console;
use crate::flag::FlagStore;
use crate::pin::{BootPin, Level};

/// Result of the once-per-boot mode decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootDecision {
    /// Leave the interactive console attached for manual recovery.
    Maintenance,
    /// Detach the console and serve framed requests.
    Production,
}

impl fmt::Display for BootDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BootDecision::Maintenance => "maintenance",
            BootDecision::Production => "production",
        })
    }
}

/// Which signal produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSignal {
    /// The one-shot flag was present (and has been consumed).
    Flag,
    /// The boot pin read low.
    Pin,
    /// No signal asked for maintenance.
    Default,
}

/// Decides the boot mode from the maintenance flag and the boot pin.
pub struct BootSelector<F, P> {
    flag: F,
    pin: P,
}

impl<F: FlagStore, P: BootPin> BootSelector<F, P> {
    pub fn new(flag: F, pin: P) -> Self {
        Self { flag, pin }
    }

    /// Decide the boot mode. First match wins:
    ///
    /// 1. flag present: consume it, maintenance
    /// 2. pin low: maintenance
    /// 3. otherwise production
    ///
    /// A probe that fails counts as "signal absent".
    pub fn decide(&mut self) -> BootDecision {
        self.evaluate().0
    }

    /// Like [`decide`](Self::decide), also reporting which signal won.
    pub fn evaluate(&mut self) -> (BootDecision, BootSignal) {
        let (decision, signal) = if self.consume_flag() {
            (BootDecision::Maintenance, BootSignal::Flag)
        } else if self.pin_low() {
            (BootDecision::Maintenance, BootSignal::Pin)
        } else {
            (BootDecision::Production, BootSignal::Default)
        };
        info!(%decision, ?signal, "boot mode decided");
        (decision, signal)
    }

    fn consume_flag(&mut self) -> bool {
        match self.flag.is_armed() {
            Ok(true) => {
                if let Err(err) = self.flag.clear() {
                    warn!(error = %err, "failed to consume maintenance flag");
                }
                true
            }
            Ok(false) => false,
            Err(err) => {
                warn!(error = %err, "maintenance flag unavailable");
                false
            }
        }
    }

    fn pin_low(&mut self) -> bool {
        match self.pin.level() {
            Ok(level) => level == Level::Low,
            Err(err) => {
                warn!(error = %err, "boot pin unavailable");
                false
            }
        }
    }

    /// Give back the signal sources.
    pub fn into_parts(self) -> (F, P) {
        (self.flag, self.pin)
    }
}

/// Run the boot sequence: decide, then detach the console in production.
///
/// Detach failures are logged and never fail the boot.
pub fn boot<F, P, C>(selector: &mut BootSelector<F, P>, console: &mut C) -> BootDecision
where
    F: FlagStore,
    P: BootPin,
    C: Console + ?Sized,
{
    let decision = selector.decide();
    if decision == BootDecision::Production {
        if let Err(err) = console.detach() {
            warn!(error = %err, "console detach failed; continuing");
        }
    }
    decision
}
