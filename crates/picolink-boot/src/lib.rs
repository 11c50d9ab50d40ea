//! Boot mode selection.
//!
//! Runs once per power-on or reset and decides between maintenance mode
//! (interactive console left attached) and production mode (console detached,
//! channel used as a clean binary pipe). Two signal sources are checked in
//! order, each individually fault-tolerant:
//!
//! 1. the persisted one-shot maintenance flag, consumed when observed
//! 2. the boot pin, pulled up, where logic-low requests maintenance

pub mod console;
pub mod error;
pub mod flag;
pub mod pin;
pub mod selector;

pub use console::{Console, NoConsole};
#[cfg(unix)]
pub use console::TtyConsole;
pub use error::{BootError, Result};
pub use flag::{FileFlag, FlagStore, MAINTENANCE_FLAG};
pub use pin::{BootPin, Level, PullUp, SysfsPin};
pub use selector::{boot, BootDecision, BootSelector, BootSignal};
