//! # Example: gateway
//!
//! Runs a [`Gateway`] under a [`Supervisor`]: every record consumed from `orders`
//! is upper-cased and republished to `orders.shouted` in the transaction that
//! commits its offset. Empty payloads are skipped without producing anything.
//!
//! ## Flow
//! ```text
//! Supervisor::run()
//!   ├─► Gateway::setup()     → connect (read_committed, transactional producer)
//!   ├─► Gateway::run()       → poll ─► begin ─► shout ─► produce ─► commit
//!   ├─► Ctrl+C / SIGTERM
//!   └─► Gateway::shutdown()  → closers (broker client)
//! ```
//!
//! ## Run
//! ```bash
//! KAFKA_BROKERS=localhost:9092 RUST_LOG=debug cargo run --example gateway --features kafka
//! ```

use std::time::Duration;

use daemonic::{
    BoxError, Context, Gateway, GatewayConfig, HandlerFn, KafkaConnector, Record, Supervisor,
    SupervisorConfig,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 1. Gateway config: topic is required, the group is generated when unset
    let brokers = std::env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".into());
    let cfg = GatewayConfig::new("orders")
        .with_brokers(brokers.split(','))
        .with_group("orders-shouter");

    // 2. Handler: one derived record per non-empty payload
    let shout = HandlerFn::new(|record: &Record| {
        if record.payload.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Record::new("orders.shouted", record.payload.to_ascii_uppercase());
        out.key = record.key.clone();
        Ok::<_, BoxError>(vec![out])
    });

    let connector = KafkaConnector {
        transactional_id: "orders-shouter-0".into(),
        ..KafkaConnector::default()
    };
    let gateway = Gateway::new(cfg, connector, shout)?;

    // 3. Supervise with a 10s shutdown window
    let mut sup_cfg = SupervisorConfig::default();
    sup_cfg.timeout = Duration::from_secs(10);

    Supervisor::new(sup_cfg)
        .run(&Context::new(), gateway)
        .await?;
    Ok(())
}
