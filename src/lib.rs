//! # daemonic
//!
//! **Daemonic** supervises one long-running service per invocation and ships a
//! transactional consume → transform → produce gateway that plugs into it.
//!
//! It provides primitives to define a daemon as three phases (setup, run, shutdown),
//! drive those phases in response to OS termination signals, and bound the time a
//! daemon may spend shutting down.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                 ┌───────────────────────────────┐
//!                 │   Daemon (user component)     │
//!                 │   e.g. Gateway<KafkaConnector>│
//!                 └───────────────┬───────────────┘
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - SupervisorConfig (shutdown timeout, signal set)                │
//! │  - SignalListener   (OS termination signals)                      │
//! │  - Logger           (TracingLogger by default)                    │
//! └──────┬──────────────────────────┬─────────────────────────┬───────┘
//!        ▼                          ▼                         ▼
//!   setup(run_ctx)        spawn run(run_ctx)        shutdown(shutdown_ctx)
//!                                   │                  (fresh, bounded)
//!                                   ▼
//!                    ┌──────────────────────────────┐
//!                    │ Gateway::run                 │
//!                    │  poll ─► for each record:    │
//!                    │   begin ─► Handler::handle   │
//!                    │   ─► produce_sync ─► commit  │
//!                    └──────────────┬───────────────┘
//!                                   ▼
//!                        Broker / Connector (kafka)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Idle ──► SettingUp ──► Running ──► ShuttingDown ──► Terminated
//!              │            │              │
//!              └────────────┴──────────────┴──► ErrorExit
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                        |
//! |-------------------|---------------------------------------------------------------|-------------------------------------------|
//! | **Supervision**   | Drive a daemon's phases, signals, bounded shutdown.           | [`Supervisor`], [`Daemon`], [`Phase`]     |
//! | **Gateway**       | Transactional consume-transform-produce loop.                 | [`Gateway`], [`Handler`], [`HandlerFn`]   |
//! | **Broker**        | Capability the gateway needs from a message broker.           | [`Broker`], [`Connector`], [`Record`]     |
//! | **Errors**        | Typed errors per subsystem.                                   | [`SupervisorError`], [`GatewayError`]     |
//! | **Logging**       | Structured leveled sink, `tracing` by default.                | [`Logger`], [`TracingLogger`]             |
//! | **Configuration** | Construction-time settings.                                   | [`SupervisorConfig`], [`GatewayConfig`]   |
//!
//! ## Optional features
//! - `kafka`: exposes [`KafkaConnector`] backed by `rdkafka` (transactional producer,
//!   read-committed consumer).
//!
//! ## Example
//! ```rust,no_run
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use daemonic::{BoxError, Context, Daemon, Supervisor, SupervisorConfig};
//!
//! struct Ticker;
//!
//! #[async_trait]
//! impl Daemon for Ticker {
//!     async fn setup(&self, _ctx: &Context) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//!
//!     async fn run(&self, ctx: &Context) -> Result<(), BoxError> {
//!         while !ctx.is_done() {
//!             tokio::select! {
//!                 _ = tokio::time::sleep(Duration::from_secs(1)) => println!("tick"),
//!                 _ = ctx.done() => {}
//!             }
//!         }
//!         Ok(())
//!     }
//!
//!     async fn shutdown(&self, _ctx: &Context) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = SupervisorConfig::default();
//!     cfg.timeout = Duration::from_secs(5);
//!
//!     Supervisor::new(cfg).run(&Context::new(), Ticker).await?;
//!     Ok(())
//! }
//! ```
mod config;
mod context;
mod core;
mod daemon;
mod error;
mod gateway;
mod logger;

// ---- Public re-exports ----

pub use config::{GatewayConfig, SupervisorConfig};
pub use context::Context;
pub use core::{Phase, Signal, SignalListener, Supervisor};
pub use daemon::Daemon;
pub use error::{BoxError, BrokerError, GatewayError, RecordError, SupervisorError};
pub use gateway::{
    Broker, ConnectOptions, Connector, FetchBatch, Gateway, Handler, HandlerFn, Partition,
    Position, Record, MAX_CONSECUTIVE_FAILURES, RETRY_DELAY,
};
pub use logger::{Field, Logger, TracingLogger};

// Optional: rdkafka-backed broker client.
// Enable with: `--features kafka`
#[cfg(feature = "kafka")]
pub use gateway::{KafkaBroker, KafkaConnector};
