//! # Construction-time configuration.
//!
//! Each component takes one plain configuration struct in its constructor:
//! - [`SupervisorConfig`] for [`Supervisor::new`](crate::Supervisor::new);
//! - [`GatewayConfig`] for [`Gateway::new`](crate::Gateway::new).
//!
//! Values are built once at the entry point and passed down; nothing here reads the
//! environment or files.
//!
//! ## Sentinel values
//! - `GatewayConfig::group = None` (or empty) → a generated `daemonic.gateway.<uuid>` group
//! - `GatewayConfig::topic = ""` → rejected by `Gateway::new`

use std::time::Duration;

use crate::core::Signal;

/// Supervisor settings.
///
/// ## Field semantics
/// - `timeout`: window given to `Daemon::shutdown` after a signal
/// - `signals`: OS signals that trigger graceful shutdown
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time `Daemon::shutdown` may take.
    ///
    /// The shutdown context's deadline is `now + timeout`, and the supervisor stops
    /// waiting with `SupervisorError::ShutdownTimeout` once it passes.
    pub timeout: Duration,

    /// Signals that start graceful shutdown.
    pub signals: Vec<Signal>,
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `timeout = 30s`
    /// - `signals = [Interrupt, Terminate]`
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            signals: vec![Signal::Interrupt, Signal::Terminate],
        }
    }
}

/// Gateway settings.
#[derive(Clone, Debug, Default)]
pub struct GatewayConfig {
    /// Seed broker addresses (`host:port`).
    pub brokers: Vec<String>,

    /// Topic to consume from. Required.
    pub topic: String,

    /// Consumer group name; generated when unset.
    pub group: Option<String>,
}

impl GatewayConfig {
    /// Creates a config for `topic` with no brokers and a generated group.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Sets the seed broker addresses.
    pub fn with_brokers<I, S>(mut self, brokers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.brokers = brokers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the consumer group name.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Returns the configured group, treating an empty name as unset.
    #[inline]
    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref().filter(|g| !g.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supervisor_defaults() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.signals, vec![Signal::Interrupt, Signal::Terminate]);
    }

    #[test]
    fn empty_group_is_unset() {
        let cfg = GatewayConfig::new("T").with_group("");
        assert_eq!(cfg.group_name(), None);

        let cfg = GatewayConfig::new("T").with_group("billing");
        assert_eq!(cfg.group_name(), Some("billing"));
    }

    #[test]
    fn builder_sets_brokers() {
        let cfg = GatewayConfig::new("T").with_brokers(["a:9092", "b:9092"]);
        assert_eq!(cfg.brokers, vec!["a:9092".to_string(), "b:9092".to_string()]);
        assert_eq!(cfg.topic, "T");
    }
}
