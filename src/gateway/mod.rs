//! Transactional consume-transform-produce daemon.
//!
//! - [`broker`] the broker client capability and record types
//! - [`handler`] the per-record transform
//! - [`gateway`] the daemon driving `poll → begin → handle → produce → commit`
//! - `kafka` rdkafka-backed [`Connector`] (feature `kafka`)

mod broker;
#[allow(clippy::module_inception)]
mod gateway;
mod handler;
#[cfg(feature = "kafka")]
mod kafka;

pub use broker::{Broker, ConnectOptions, Connector, FetchBatch, Partition, Position, Record};
pub use gateway::{Gateway, MAX_CONSECUTIVE_FAILURES, RETRY_DELAY};
pub use handler::{Handler, HandlerFn};
#[cfg(feature = "kafka")]
pub use kafka::{KafkaBroker, KafkaConnector};
