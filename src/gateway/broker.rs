//! # Broker client capability.
//!
//! The gateway talks to its message broker only through two traits:
//! - [`Connector`] creates a connected client from [`ConnectOptions`];
//! - [`Broker`] is that client: poll a [`FetchBatch`], run transactions, produce records.
//!
//! ## Fetch batch layout
//! ```text
//! FetchBatch
//!   ├─ partitions: [ Partition{topic, partition, records: [r0, r1, ...]}, ... ]  (first-seen order)
//!   └─ errors:     [ BrokerError, ... ]                                          (any ⇒ batch discarded)
//! ```
//!
//! The `kafka` feature provides an rdkafka-backed implementation (`KafkaConnector`).

use async_trait::async_trait;

use crate::{context::Context, error::BrokerError};

/// One consumed or produced message.
///
/// Derived records only need `topic`, `key` and `payload`; the broker assigns
/// partition and offset when producing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

impl Record {
    /// Creates an unkeyed record for `topic`.
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }

    /// Sets the record key.
    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets the source coordinates of a consumed record.
    pub fn at(mut self, partition: i32, offset: i64) -> Self {
        self.partition = partition;
        self.offset = offset;
        self
    }

    /// Position to commit once this record is processed (`offset + 1`).
    pub fn next_position(&self) -> Position {
        Position {
            topic: self.topic.clone(),
            partition: self.partition,
            offset: self.offset + 1,
        }
    }
}

/// Consumer position committed together with a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    pub topic: String,
    pub partition: i32,
    /// Next offset to consume.
    pub offset: i64,
}

/// Records fetched from one topic partition, in offset order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    pub topic: String,
    pub partition: i32,
    pub records: Vec<Record>,
}

/// Result of one poll: partitioned records plus any fetch-level errors.
#[derive(Clone, Debug, Default)]
pub struct FetchBatch {
    partitions: Vec<Partition>,
    errors: Vec<BrokerError>,
}

impl FetchBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch that carries a single fetch error.
    pub fn from_error(err: BrokerError) -> Self {
        Self {
            partitions: Vec::new(),
            errors: vec![err],
        }
    }

    /// Appends a record to its partition, creating the partition on first sight.
    pub fn push(&mut self, record: Record) {
        let slot = self
            .partitions
            .iter_mut()
            .find(|p| p.topic == record.topic && p.partition == record.partition);
        match slot {
            Some(p) => p.records.push(record),
            None => self.partitions.push(Partition {
                topic: record.topic.clone(),
                partition: record.partition,
                records: vec![record],
            }),
        }
    }

    /// Records a fetch-level error.
    pub fn push_error(&mut self, err: BrokerError) {
        self.errors.push(err);
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn errors(&self) -> &[BrokerError] {
        &self.errors
    }

    /// Total number of records across partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits the batch into partitions and errors.
    pub fn into_parts(self) -> (Vec<Partition>, Vec<BrokerError>) {
        (self.partitions, self.errors)
    }
}

impl FromIterator<Record> for FetchBatch {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut batch = FetchBatch::new();
        for record in iter {
            batch.push(record);
        }
        batch
    }
}

/// Everything a [`Connector`] needs to build a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Seed broker addresses.
    pub brokers: Vec<String>,
    /// Consumer group the client joins.
    pub group: String,
    /// Topic the client subscribes to.
    pub topic: String,
}

/// # Connected broker client.
///
/// One transaction is open at a time; the gateway drives
/// `begin → produce? → commit` or `begin → ... → abort` per consumed record.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Fetches the next batch. Fetch failures are reported inside the batch.
    async fn poll(&self, ctx: &Context) -> FetchBatch;

    async fn begin_transaction(&self, ctx: &Context) -> Result<(), BrokerError>;

    /// Produces `records` inside the open transaction, waiting for every delivery.
    /// Returns the first failure.
    async fn produce_sync(&self, ctx: &Context, records: Vec<Record>) -> Result<(), BrokerError>;

    /// Commits the open transaction together with the consumer position `consumed`.
    async fn commit_transaction(&self, ctx: &Context, consumed: &Position)
        -> Result<(), BrokerError>;

    async fn abort_transaction(&self, ctx: &Context) -> Result<(), BrokerError>;

    /// Releases the client. Called once, during shutdown.
    async fn close(&self);
}

/// # Factory for [`Broker`] clients.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Broker: Broker;

    /// Bootstraps from the seed brokers and subscribes per `opts`.
    ///
    /// The client must consume with read-committed isolation: records from open or
    /// aborted transactions are never returned by [`Broker::poll`].
    async fn connect(&self, ctx: &Context, opts: &ConnectOptions)
        -> Result<Self::Broker, BrokerError>;
}
