//! # Gateway: transactional consume → transform → produce daemon.
//!
//! A [`Gateway`] owns one broker client bound to a topic and consumer group. Each poll
//! cycle hands every consumed record to a [`Handler`] and republishes the derived
//! records in the same transaction that commits the consumed offset.
//!
//! ## Poll cycle
//! ```text
//! run(ctx):
//! loop while !ctx.is_done() {
//!   ├─► handle(ctx)
//!   │     ├─► poll() ── fetch errors ──► Err (whole batch discarded)
//!   │     └─► for partition, for record (sequential):
//!   │            begin ─► handler.handle ─► produce_sync (if any) ─► commit(offset + 1)
//!   │              └─ any step fails ─► warn + abort, continue with next record
//!   ├─ Ok  ─► failures = 0
//!   └─ Err ─► warn, failures += 1
//!             ├─ failures == MAX_CONSECUTIVE_FAILURES ─► Err(ErrorLimit)
//!             └─ sleep(RETRY_DELAY) (cancellable)
//! }
//! ```
//!
//! ## Rules
//! - The client is created by the first `setup` and never recreated.
//! - Closers run in registration order, exactly once, during `shutdown`.
//! - Per-record failures never leave `handle` and never count as failures.
//! - Cancellation is observed between cycles and while waiting on a poll or a retry
//!   delay; an in-flight transaction is allowed to finish.

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use tokio::{
    sync::{Mutex, OnceCell},
    time,
};
use uuid::Uuid;

use crate::{
    config::GatewayConfig,
    context::Context,
    daemon::Daemon,
    error::{BoxError, GatewayError, RecordError},
    gateway::{
        broker::{Broker, ConnectOptions, Connector, Record},
        handler::Handler,
    },
    logger::{Logger, TracingLogger},
};

/// Consecutive failed poll cycles after which `run` gives up.
pub const MAX_CONSECUTIVE_FAILURES: usize = 5;

/// Fixed delay between failed poll cycles.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

type Closer = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>;

/// Broker-to-broker transform daemon.
pub struct Gateway<C: Connector> {
    options: ConnectOptions,
    connector: C,
    broker: OnceCell<Arc<C::Broker>>,
    closers: Mutex<Vec<Closer>>,
    handler: Arc<dyn Handler>,
    logger: Arc<dyn Logger>,
}

impl<C: Connector> Gateway<C> {
    /// Creates a gateway; fails with [`GatewayError::MissingTopic`] if `cfg.topic` is empty.
    ///
    /// Without a configured group the gateway joins `daemonic.gateway.<uuid>`.
    pub fn new<H: Handler>(
        cfg: GatewayConfig,
        connector: C,
        handler: H,
    ) -> Result<Self, GatewayError> {
        if cfg.topic.is_empty() {
            return Err(GatewayError::MissingTopic);
        }
        let group = match cfg.group_name() {
            Some(group) => group.to_owned(),
            None => format!("daemonic.gateway.{}", Uuid::new_v4()),
        };

        Ok(Self {
            options: ConnectOptions {
                brokers: cfg.brokers,
                group,
                topic: cfg.topic,
            },
            connector,
            broker: OnceCell::new(),
            closers: Mutex::new(Vec::new()),
            handler: Arc::new(handler),
            logger: Arc::new(TracingLogger::new()),
        })
    }

    /// Replaces the logger.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn group(&self) -> &str {
        &self.options.group
    }

    /// Returns `true` once `setup` has created the broker client.
    pub fn is_connected(&self) -> bool {
        self.broker.initialized()
    }

    /// Registers a cleanup action to run during shutdown, after those already registered.
    pub async fn register_closer<F, Fut>(&self, closer: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        let closer: Closer = Box::new(move || closer().boxed());
        self.closers.lock().await.push(closer);
    }

    /// Creates the broker client on first call and registers its closer.
    async fn connect(&self, ctx: &Context) -> Result<(), GatewayError> {
        self.broker
            .get_or_try_init(|| async {
                let broker = self
                    .connector
                    .connect(ctx, &self.options)
                    .await
                    .map_err(|source| GatewayError::Connect { source })?;
                let broker = Arc::new(broker);

                let closing = Arc::clone(&broker);
                let logger = Arc::clone(&self.logger);
                self.register_closer(move || async move {
                    logger.info("closing broker client", &[]);
                    closing.close().await;
                    logger.info("broker client closed", &[]);
                    Ok::<(), BoxError>(())
                })
                .await;

                self.logger.info(
                    "broker client connected",
                    &[
                        ("group", &self.options.group),
                        ("topic", &self.options.topic),
                    ],
                );
                Ok::<_, GatewayError>(broker)
            })
            .await?;
        Ok(())
    }

    /// Poll loop with the fixed failure policy.
    async fn run_loop(&self, ctx: &Context) -> Result<(), GatewayError> {
        let broker = self.broker.get().cloned().ok_or(GatewayError::NotConnected)?;
        let mut failures = 0;

        while !ctx.is_done() {
            match self.handle(ctx, broker.as_ref()).await {
                Ok(()) => failures = 0,
                Err(err) => {
                    failures += 1;
                    self.logger.warn(
                        "handling errors",
                        &[
                            ("kind", &err.as_label()),
                            ("errors", &err),
                            ("consecutive", &failures),
                        ],
                    );
                    if failures >= MAX_CONSECUTIVE_FAILURES {
                        return Err(GatewayError::ErrorLimit {
                            max: MAX_CONSECUTIVE_FAILURES,
                        });
                    }
                    tokio::select! {
                        _ = time::sleep(RETRY_DELAY) => {}
                        _ = ctx.done() => break,
                    }
                }
            }
        }
        Ok(())
    }

    /// One poll cycle. Only poll-level failures are returned.
    async fn handle(&self, ctx: &Context, broker: &C::Broker) -> Result<(), GatewayError> {
        let batch = tokio::select! {
            batch = broker.poll(ctx) => batch,
            _ = ctx.done() => return Ok(()),
        };

        let (partitions, errors) = batch.into_parts();
        if !errors.is_empty() {
            return Err(GatewayError::Fetch { errors });
        }

        for partition in partitions {
            for record in &partition.records {
                if let Err(err) = self.process(ctx, broker, record).await {
                    self.logger.warn(
                        err.as_message(),
                        &[
                            ("topic", &record.topic),
                            ("partition", &record.partition),
                            ("offset", &record.offset),
                            ("kind", &err.as_label()),
                            ("error", &err),
                        ],
                    );
                    if let Err(abort) = broker.abort_transaction(ctx).await {
                        self.logger.warn(
                            "aborting transaction",
                            &[
                                ("topic", &record.topic),
                                ("partition", &record.partition),
                                ("offset", &record.offset),
                                ("error", &abort),
                            ],
                        );
                    }
                }
            }
        }
        Ok(())
    }

    /// Runs one record's transaction, stopping at the first failed step.
    async fn process(
        &self,
        ctx: &Context,
        broker: &C::Broker,
        record: &Record,
    ) -> Result<(), RecordError> {
        broker
            .begin_transaction(ctx)
            .await
            .map_err(RecordError::Begin)?;

        let derived = self
            .handler
            .handle(ctx, record)
            .await
            .map_err(RecordError::Handle)?;

        if !derived.is_empty() {
            broker
                .produce_sync(ctx, derived)
                .await
                .map_err(RecordError::Produce)?;
        }

        broker
            .commit_transaction(ctx, &record.next_position())
            .await
            .map_err(RecordError::Commit)
    }

    /// Drains and runs the closers. Failures are logged, not returned.
    async fn close(&self) {
        let closers = std::mem::take(&mut *self.closers.lock().await);
        for closer in closers {
            if let Err(err) = closer().await {
                self.logger.warn("closer failed", &[("error", &err)]);
            }
        }
    }
}

#[async_trait]
impl<C: Connector> Daemon for Gateway<C> {
    async fn setup(&self, ctx: &Context) -> Result<(), BoxError> {
        self.connect(ctx).await?;
        Ok(())
    }

    async fn run(&self, ctx: &Context) -> Result<(), BoxError> {
        self.run_loop(ctx).await?;
        Ok(())
    }

    async fn shutdown(&self, _ctx: &Context) -> Result<(), BoxError> {
        self.close().await;
        Ok(())
    }
}
