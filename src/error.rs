//! Error types used by the supervisor, the gateway, and broker clients.
//!
//! This module defines:
//!
//! - [`SupervisorError`]: failures of one supervised invocation (setup, run, shutdown).
//! - [`GatewayError`]: failures surfaced by the [`Gateway`](crate::Gateway) daemon.
//! - [`BrokerError`]: failures reported by a broker client.
//! - [`RecordError`]: per-record failures inside one poll cycle (logged, never returned).
//!
//! All enums provide `as_label` for stable snake_case labels in logs.

use std::{io, time::Duration};

use thiserror::Error;

/// Boxed error carried across the [`Daemon`](crate::Daemon) and [`Handler`](crate::Handler) seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by [`Supervisor::run`](crate::Supervisor::run).
///
/// Every variant ends the invocation. Only [`SupervisorError::Shutdown`] and
/// [`SupervisorError::ShutdownTimeout`] are reachable after `Shutdown` was attempted.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SupervisorError {
    /// The supervisor is already driving another daemon; this one was not touched.
    #[error("supervisor is already running a daemon")]
    Busy,

    /// `Setup` failed; `Run` and `Shutdown` were never called.
    #[error("daemon setup failed: {source}")]
    Setup {
        /// Underlying daemon error.
        source: BoxError,
    },

    /// The termination signal listener could not be registered.
    #[error("signal registration failed: {source}")]
    Signal {
        /// Underlying OS error.
        source: io::Error,
    },

    /// `Run` failed before any termination signal arrived; `Shutdown` was not called.
    #[error("daemon run failed: {source}")]
    Run {
        /// Underlying daemon error.
        source: BoxError,
    },

    /// `Shutdown` returned an error.
    #[error("daemon shutdown failed: {source}")]
    Shutdown {
        /// Underlying daemon error.
        source: BoxError,
    },

    /// `Shutdown` did not finish within the configured window.
    #[error("daemon shutdown exceeded {timeout:?}")]
    ShutdownTimeout {
        /// The configured shutdown timeout.
        timeout: Duration,
    },
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use daemonic::SupervisorError;
    ///
    /// let err = SupervisorError::ShutdownTimeout { timeout: Duration::from_secs(30) };
    /// assert_eq!(err.as_label(), "supervisor_shutdown_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorError::Busy => "supervisor_busy",
            SupervisorError::Setup { .. } => "supervisor_setup",
            SupervisorError::Signal { .. } => "supervisor_signal",
            SupervisorError::Run { .. } => "supervisor_run",
            SupervisorError::Shutdown { .. } => "supervisor_shutdown",
            SupervisorError::ShutdownTimeout { .. } => "supervisor_shutdown_timeout",
        }
    }
}

/// # Errors produced by the [`Gateway`](crate::Gateway).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Construction without a topic.
    #[error("topic is not configured")]
    MissingTopic,

    /// `Run` was called before a successful `Setup`.
    #[error("broker client is not connected")]
    NotConnected,

    /// The broker client could not be created.
    #[error("failed to create broker client: {source}")]
    Connect {
        /// Underlying broker error.
        source: BrokerError,
    },

    /// The poll returned fetch-level errors; the whole batch was discarded.
    #[error("fetch errors: {errors:?}")]
    Fetch {
        /// Every fetch error reported by the poll.
        errors: Vec<BrokerError>,
    },

    /// Too many consecutive poll cycles failed.
    #[error("exceeded maximum error count of {max}")]
    ErrorLimit {
        /// The consecutive-failure threshold.
        max: usize,
    },
}

impl GatewayError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            GatewayError::MissingTopic => "gateway_missing_topic",
            GatewayError::NotConnected => "gateway_not_connected",
            GatewayError::Connect { .. } => "gateway_connect",
            GatewayError::Fetch { .. } => "gateway_fetch",
            GatewayError::ErrorLimit { .. } => "gateway_error_limit",
        }
    }
}

/// # Errors reported by a [`Broker`](crate::Broker) client.
///
/// Details are carried as strings so any client library can map into them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Bootstrapping or subscribing failed.
    #[error("connect: {0}")]
    Connect(String),

    /// A fetch from one or more partitions failed.
    #[error("fetch: {0}")]
    Fetch(String),

    /// Begin, commit or abort of a transaction failed.
    #[error("transaction: {0}")]
    Transaction(String),

    /// Producing a record failed.
    #[error("produce: {0}")]
    Produce(String),
}

impl BrokerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BrokerError::Connect(_) => "broker_connect",
            BrokerError::Fetch(_) => "broker_fetch",
            BrokerError::Transaction(_) => "broker_transaction",
            BrokerError::Produce(_) => "broker_produce",
        }
    }
}

/// # Per-record failures inside one poll cycle.
///
/// Each variant names the step that failed. The gateway aborts the record's
/// transaction, logs the error, and moves on to the next record.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RecordError {
    /// `BeginTransaction` failed.
    #[error("beginning transaction: {0}")]
    Begin(BrokerError),

    /// The handler rejected the record.
    #[error("handling record: {0}")]
    Handle(BoxError),

    /// Producing derived records failed.
    #[error("producing records: {0}")]
    Produce(BrokerError),

    /// `CommitTransaction` failed.
    #[error("committing transaction: {0}")]
    Commit(BrokerError),
}

impl RecordError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RecordError::Begin(_) => "record_begin",
            RecordError::Handle(_) => "record_handle",
            RecordError::Produce(_) => "record_produce",
            RecordError::Commit(_) => "record_commit",
        }
    }

    /// Returns the log message for the failed step.
    pub fn as_message(&self) -> &'static str {
        match self {
            RecordError::Begin(_) => "beginning transaction",
            RecordError::Handle(_) => "handling record",
            RecordError::Produce(_) => "producing records",
            RecordError::Commit(_) => "committing transaction",
        }
    }
}
