//! # Cross-platform OS signal handling.
//!
//! Provides [`SignalListener`], registered for a configured set of [`Signal`]s, whose
//! [`recv`](SignalListener::recv) completes with whichever signal arrives first.
//!
//! ## Signals
//! **Unix platforms:** every [`Signal`] variant maps to its `SIGxxx` counterpart.
//!
//! **Windows platforms:** only [`Signal::Interrupt`] (Ctrl-C via [`tokio::signal::ctrl_c`]);
//! other variants are ignored.
//!
//! Registration is separate from waiting so a registration failure surfaces before the
//! daemon's `run` task is spawned.

use std::{fmt, io};

/// Termination signals the supervisor can observe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGINT` (Ctrl-C).
    Interrupt,
    /// `SIGTERM`, the default kill signal used by systemd/Kubernetes.
    Terminate,
    /// `SIGQUIT`.
    Quit,
    /// `SIGHUP`.
    Hangup,
    /// `SIGUSR1`.
    User1,
    /// `SIGUSR2`.
    User2,
}

impl Signal {
    /// Conventional signal name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Quit => "SIGQUIT",
            Signal::Hangup => "SIGHUP",
            Signal::User1 => "SIGUSR1",
            Signal::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn kind(&self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            Signal::Interrupt => SignalKind::interrupt(),
            Signal::Terminate => SignalKind::terminate(),
            Signal::Quit => SignalKind::quit(),
            Signal::Hangup => SignalKind::hangup(),
            Signal::User1 => SignalKind::user_defined1(),
            Signal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listener registered for a fixed set of signals.
///
/// An empty set never completes.
#[cfg(unix)]
pub struct SignalListener {
    streams: Vec<(Signal, tokio::signal::unix::Signal)>,
}

#[cfg(unix)]
impl SignalListener {
    /// Registers OS handlers for every signal in `signals`.
    pub fn register(signals: &[Signal]) -> io::Result<Self> {
        let mut streams = Vec::with_capacity(signals.len());
        for sig in signals {
            if streams.iter().any(|(s, _)| s == sig) {
                continue;
            }
            streams.push((*sig, tokio::signal::unix::signal(sig.kind())?));
        }
        Ok(Self { streams })
    }

    /// Waits for the next signal in the set.
    pub async fn recv(&mut self) -> Signal {
        if self.streams.is_empty() {
            return std::future::pending().await;
        }
        let waits = self.streams.iter_mut().map(|(sig, stream)| {
            let sig = *sig;
            Box::pin(async move {
                stream.recv().await;
                sig
            })
        });
        let (sig, _, _) = futures::future::select_all(waits).await;
        sig
    }
}

/// Listener registered for a fixed set of signals.
///
/// Only [`Signal::Interrupt`] is observable; a set without it never completes.
#[cfg(not(unix))]
pub struct SignalListener {
    interrupt: bool,
}

#[cfg(not(unix))]
impl SignalListener {
    /// Registers the Ctrl-C handler if `signals` contains [`Signal::Interrupt`].
    pub fn register(signals: &[Signal]) -> io::Result<Self> {
        Ok(Self {
            interrupt: signals.contains(&Signal::Interrupt),
        })
    }

    /// Waits for the next signal in the set.
    pub async fn recv(&mut self) -> Signal {
        if self.interrupt && tokio::signal::ctrl_c().await.is_ok() {
            return Signal::Interrupt;
        }
        std::future::pending().await
    }
}
