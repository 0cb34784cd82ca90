//! # Daemon abstraction.
//!
//! A [`Daemon`] is any long-running component with three phases the
//! [`Supervisor`](crate::Supervisor) drives:
//!
//! ```text
//! setup(run ctx) ──► run(run ctx) ──► [signal] ──► shutdown(shutdown ctx)
//! ```
//!
//! `run` executes on its own tokio task while the supervisor waits for a signal, so
//! `shutdown` may be called while `run` is still unwinding. Implementations therefore
//! take `&self` and keep mutable state behind their own synchronization.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{context::Context, error::BoxError};

/// # Supervisable long-running component.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use daemonic::{BoxError, Context, Daemon};
///
/// struct Idle;
///
/// #[async_trait]
/// impl Daemon for Idle {
///     async fn setup(&self, _ctx: &Context) -> Result<(), BoxError> {
///         Ok(())
///     }
///
///     async fn run(&self, ctx: &Context) -> Result<(), BoxError> {
///         ctx.done().await;
///         Ok(())
///     }
///
///     async fn shutdown(&self, _ctx: &Context) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Daemon: Send + Sync + 'static {
    /// Acquires resources. Called once, before `run`.
    async fn setup(&self, ctx: &Context) -> Result<(), BoxError>;

    /// Does the work until `ctx` is done or a fatal error occurs.
    ///
    /// Implementations should check `ctx.is_done()` between units of work.
    async fn run(&self, ctx: &Context) -> Result<(), BoxError>;

    /// Releases resources. `ctx` carries the shutdown deadline.
    async fn shutdown(&self, ctx: &Context) -> Result<(), BoxError>;
}

#[async_trait]
impl<T: Daemon + ?Sized> Daemon for Arc<T> {
    async fn setup(&self, ctx: &Context) -> Result<(), BoxError> {
        (**self).setup(ctx).await
    }

    async fn run(&self, ctx: &Context) -> Result<(), BoxError> {
        (**self).run(ctx).await
    }

    async fn shutdown(&self, ctx: &Context) -> Result<(), BoxError> {
        (**self).shutdown(ctx).await
    }
}
