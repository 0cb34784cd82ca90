//! # rdkafka-backed broker client.
//!
//! [`KafkaConnector`] builds a [`KafkaBroker`] from two librdkafka handles:
//! - a `StreamConsumer` in the gateway's group, subscribed to its topic, with
//!   `isolation.level=read_committed` and auto-commit disabled;
//! - a transactional `FutureProducer` (`transactional.id`), initialised once.
//!
//! Consumed offsets are attached to each transaction with `send_offsets_to_transaction`,
//! so the consumer position and the derived records become visible together.
//!
//! librdkafka's transaction calls block up to their timeout; they run on the blocking pool.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    error::{KafkaError, KafkaResult},
    message::BorrowedMessage,
    producer::{FutureProducer, FutureRecord, Producer},
    ClientConfig, Message, Offset, TopicPartitionList,
};
use tokio::time;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    context::Context,
    error::BrokerError,
    gateway::broker::{Broker, ConnectOptions, Connector, FetchBatch, Position, Record},
};

/// Creates [`KafkaBroker`]s.
#[derive(Clone, Debug)]
pub struct KafkaConnector {
    /// Producer `transactional.id`; must be stable per gateway instance.
    pub transactional_id: String,
    /// Timeout for init/commit/abort and the broker-side `transaction.timeout.ms`.
    pub transaction_timeout: Duration,
    /// Maximum records per poll.
    pub batch_size: usize,
    /// How long a poll keeps collecting after the first record.
    pub batch_linger: Duration,
    /// Connect over TLS.
    pub tls: bool,
}

impl Default for KafkaConnector {
    /// - `transactional_id = "daemonic-<uuid>"`
    /// - `transaction_timeout = 10s`
    /// - `batch_size = 500`
    /// - `batch_linger = 100ms`
    /// - `tls = false`
    fn default() -> Self {
        Self {
            transactional_id: format!("daemonic-{}", Uuid::new_v4()),
            transaction_timeout: Duration::from_secs(10),
            batch_size: 500,
            batch_linger: Duration::from_millis(100),
            tls: false,
        }
    }
}

impl KafkaConnector {
    fn consumer_config(&self, opts: &ConnectOptions) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", opts.brokers.join(","))
            .set("group.id", &opts.group)
            .set("isolation.level", "read_committed")
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest");
        if self.tls {
            config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        }
        config
    }

    fn producer_config(&self, opts: &ConnectOptions) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", opts.brokers.join(","))
            .set("transactional.id", &self.transactional_id)
            .set(
                "transaction.timeout.ms",
                self.transaction_timeout.as_millis().to_string(),
            );
        if self.tls {
            config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        }
        config
    }
}

#[async_trait]
impl Connector for KafkaConnector {
    type Broker = KafkaBroker;

    async fn connect(
        &self,
        _ctx: &Context,
        opts: &ConnectOptions,
    ) -> Result<KafkaBroker, BrokerError> {
        let consumer_config = self.consumer_config(opts);
        debug!("rdkafka consumer configuration: {:?}", consumer_config);
        let consumer: StreamConsumer = consumer_config.create().map_err(connect_error)?;
        consumer
            .subscribe(&[opts.topic.as_str()])
            .map_err(connect_error)?;

        let producer_config = self.producer_config(opts);
        debug!("rdkafka producer configuration: {:?}", producer_config);
        let producer: FutureProducer = producer_config.create().map_err(connect_error)?;

        let init = producer.clone();
        let timeout = self.transaction_timeout;
        blocking(move || init.init_transactions(timeout))
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        info!(
            group = %opts.group,
            topic = %opts.topic,
            "kafka client subscribed"
        );
        Ok(KafkaBroker {
            consumer,
            producer,
            timeout,
            batch_size: self.batch_size.max(1),
            batch_linger: self.batch_linger,
        })
    }
}

/// Consumer/producer pair driven by the gateway.
pub struct KafkaBroker {
    consumer: StreamConsumer,
    producer: FutureProducer,
    timeout: Duration,
    batch_size: usize,
    batch_linger: Duration,
}

#[async_trait]
impl Broker for KafkaBroker {
    async fn poll(&self, ctx: &Context) -> FetchBatch {
        let mut batch = FetchBatch::new();

        let first = tokio::select! {
            res = self.recv() => res,
            _ = ctx.done() => return batch,
        };
        match first {
            Ok(record) => batch.push(record),
            Err(err) => {
                batch.push_error(BrokerError::Fetch(err.to_string()));
                return batch;
            }
        }

        while batch.len() < self.batch_size {
            match time::timeout(self.batch_linger, self.recv()).await {
                Ok(Ok(record)) => batch.push(record),
                Ok(Err(err)) => {
                    batch.push_error(BrokerError::Fetch(err.to_string()));
                    break;
                }
                Err(_elapsed) => break,
            }
        }
        batch
    }

    async fn begin_transaction(&self, _ctx: &Context) -> Result<(), BrokerError> {
        self.producer
            .begin_transaction()
            .map_err(|e| BrokerError::Transaction(e.to_string()))
    }

    async fn produce_sync(&self, _ctx: &Context, records: Vec<Record>) -> Result<(), BrokerError> {
        let mut deliveries = Vec::with_capacity(records.len());
        for record in &records {
            let mut future_record =
                FutureRecord::<[u8], [u8]>::to(&record.topic).payload(record.payload.as_slice());
            if let Some(key) = &record.key {
                future_record = future_record.key(key.as_slice());
            }
            match self.producer.send_result(future_record) {
                Ok(delivery) => deliveries.push(delivery),
                Err((err, _)) => return Err(BrokerError::Produce(err.to_string())),
            }
        }

        let mut first_error = None;
        for delivery in deliveries {
            let res = match delivery.await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err((err, _))) => Err(BrokerError::Produce(err.to_string())),
                Err(_canceled) => Err(BrokerError::Produce("delivery canceled".into())),
            };
            if let (None, Err(err)) = (&first_error, res) {
                first_error = Some(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn commit_transaction(
        &self,
        _ctx: &Context,
        consumed: &Position,
    ) -> Result<(), BrokerError> {
        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(
                &consumed.topic,
                consumed.partition,
                Offset::Offset(consumed.offset),
            )
            .map_err(|e| BrokerError::Transaction(e.to_string()))?;
        let metadata = self.consumer.group_metadata().ok_or_else(|| {
            BrokerError::Transaction("consumer group metadata unavailable".into())
        })?;

        let producer = self.producer.clone();
        let timeout = self.timeout;
        blocking(move || {
            producer.send_offsets_to_transaction(&offsets, &metadata, timeout)?;
            producer.commit_transaction(timeout)
        })
        .await
        .map_err(|e| BrokerError::Transaction(e.to_string()))
    }

    async fn abort_transaction(&self, _ctx: &Context) -> Result<(), BrokerError> {
        let producer = self.producer.clone();
        let timeout = self.timeout;
        blocking(move || producer.abort_transaction(timeout))
            .await
            .map_err(|e| BrokerError::Transaction(e.to_string()))
    }

    async fn close(&self) {
        self.consumer.unsubscribe();
        let producer = self.producer.clone();
        let timeout = self.timeout;
        if let Err(err) = blocking(move || producer.flush(timeout)).await {
            warn!("failed to flush kafka producer: {}", err);
        }
    }
}

impl KafkaBroker {
    async fn recv(&self) -> KafkaResult<Record> {
        self.consumer.recv().await.map(|m| to_record(&m))
    }
}

fn to_record(message: &BorrowedMessage<'_>) -> Record {
    Record {
        topic: message.topic().to_owned(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(<[u8]>::to_vec),
        payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
    }
}

fn connect_error(err: KafkaError) -> BrokerError {
    BrokerError::Connect(err.to_string())
}

/// Runs a blocking librdkafka call on the blocking pool.
async fn blocking<F>(f: F) -> KafkaResult<()>
where
    F: FnOnce() -> KafkaResult<()> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(res) => res,
        Err(join) => {
            warn!("blocking kafka call did not complete: {}", join);
            Err(KafkaError::Canceled)
        }
    }
}
