//! Supervision core: daemon lifecycle and signal handling.
//!
//! The public API from this module is [`Supervisor`], which drives one [`Daemon`](crate::Daemon)
//! through setup, run and bounded shutdown, plus the [`Signal`] set it listens for.
//!
//! Internal modules:
//! - [`supervisor`]: the setup → run → shutdown state machine;
//! - [`signals`]: cross-platform termination signal handling;
//! - [`phase`]: lifecycle phases used in logs.

mod phase;
mod signals;
mod supervisor;

pub use phase::Phase;
pub use signals::{Signal, SignalListener};
pub use supervisor::Supervisor;
