//! # Record handler and function-backed implementation.
//!
//! [`Handler`] turns one consumed [`Record`] into zero or more derived records.
//! The gateway treats it as a pure transform: an error aborts only the current
//! record's transaction.
//!
//! [`HandlerFn`] wraps a plain closure `Fn(&Record) -> Result<Vec<Record>, BoxError>`.
//!
//! ## Example
//! ```rust
//! use daemonic::{BoxError, HandlerFn, Record};
//!
//! let upper = HandlerFn::new(|record: &Record| {
//!     let payload = record.payload.to_ascii_uppercase();
//!     Ok::<_, BoxError>(vec![Record::new("shouted", payload)])
//! });
//! # let _ = upper;
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::{context::Context, error::BoxError, gateway::broker::Record};

/// Per-record transform invoked by the gateway.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Returns the records to produce for `record`, possibly none.
    async fn handle(&self, ctx: &Context, record: &Record) -> Result<Vec<Record>, BoxError>;
}

#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
    async fn handle(&self, ctx: &Context, record: &Record) -> Result<Vec<Record>, BoxError> {
        (**self).handle(ctx, record).await
    }
}

/// Closure-backed handler.
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F>
where
    F: Fn(&Record) -> Result<Vec<Record>, BoxError> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: Fn(&Record) -> Result<Vec<Record>, BoxError> + Send + Sync + 'static,
{
    async fn handle(&self, _ctx: &Context, record: &Record) -> Result<Vec<Record>, BoxError> {
        (self.f)(record)
    }
}
