//! # Supervisor: drives one daemon through setup, run and bounded shutdown.
//!
//! The [`Supervisor`] owns the configuration (shutdown timeout, signal set) and a
//! [`Logger`]. [`Supervisor::run`] takes a [`Daemon`] by value, so one invocation
//! supervises exactly one daemon and the daemon is not reused afterwards.
//!
//! ## High-level architecture
//! ```text
//! Supervisor::run(ctx, daemon)
//!   ├─► run_ctx = ctx.child()                         (cancelled on every exit path)
//!   ├─► daemon.setup(run_ctx) ── Err ──► SupervisorError::Setup
//!   ├─► SignalListener::register(cfg.signals) ── Err ──► SupervisorError::Signal
//!   ├─► tokio::spawn(daemon.run(run_ctx))             (result kept in the JoinHandle slot)
//!   └─► select! {
//!         run task ── Err ──► SupervisorError::Run    (shutdown is NOT called)
//!         run task ── Ok  ──► keep waiting
//!         signal          ──► break
//!         ctx.done()      ──► break
//!       }
//!
//! Shutdown path:
//!   run_ctx.cancel()
//!   shutdown_ctx = Context::with_timeout(cfg.timeout) (independent of run_ctx)
//!   timeout(cfg.timeout, daemon.shutdown(shutdown_ctx)):
//!     ├─ Ok(Ok)   → Terminated
//!     ├─ Ok(Err)  → SupervisorError::Shutdown
//!     └─ Elapsed  → SupervisorError::ShutdownTimeout
//! ```
//!
//! ## Rules
//! - One daemon at a time: a concurrent `run` on the same supervisor fails with
//!   `SupervisorError::Busy` without touching its daemon.
//! - `run` and `shutdown` are never called if `setup` fails.
//! - `shutdown` is called at most once, and only after a signal or caller cancellation.
//! - The `run` task is detached after shutdown; it is expected to exit on its own once
//!   `run_ctx` is cancelled.
//!
//! ## Example
//! ```rust,no_run
//! use async_trait::async_trait;
//! use daemonic::{BoxError, Context, Daemon, Supervisor, SupervisorConfig};
//!
//! struct Idle;
//!
//! #[async_trait]
//! impl Daemon for Idle {
//!     async fn setup(&self, _ctx: &Context) -> Result<(), BoxError> { Ok(()) }
//!     async fn run(&self, ctx: &Context) -> Result<(), BoxError> {
//!         ctx.done().await;
//!         Ok(())
//!     }
//!     async fn shutdown(&self, _ctx: &Context) -> Result<(), BoxError> { Ok(()) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::new(SupervisorConfig::default());
//!     sup.run(&Context::new(), Idle).await?;
//!     Ok(())
//! }
//! ```

use std::{
    future::Future,
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::time;

use crate::{
    config::SupervisorConfig,
    context::Context,
    core::{Phase, Signal, SignalListener},
    daemon::Daemon,
    error::SupervisorError,
    logger::{Logger, TracingLogger},
};

/// Orchestrates a daemon's lifecycle, termination signals and bounded shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    logger: Arc<dyn Logger>,
    busy: AtomicBool,
}

impl Supervisor {
    /// Creates a supervisor that logs through [`TracingLogger`].
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            logger: Arc::new(TracingLogger::new()),
            busy: AtomicBool::new(false),
        }
    }

    /// Replaces the logger.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Runs `daemon` until a configured signal arrives (or `ctx` is cancelled) and it
    /// has shut down, or until one of its phases fails.
    pub async fn run<D: Daemon>(&self, ctx: &Context, daemon: D) -> Result<(), SupervisorError> {
        let signals = self.cfg.signals.clone();
        self.supervise(ctx, daemon, move || {
            let mut listener = SignalListener::register(&signals)?;
            Ok(async move { listener.recv().await })
        })
        .await
    }

    /// State machine behind [`Supervisor::run`] with a pluggable signal source.
    ///
    /// `listen` is invoked once, after a successful setup and before `run` is spawned.
    pub(crate) async fn supervise<D, L, S>(
        &self,
        ctx: &Context,
        daemon: D,
        listen: L,
    ) -> Result<(), SupervisorError>
    where
        D: Daemon,
        L: FnOnce() -> io::Result<S>,
        S: Future<Output = Signal>,
    {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(SupervisorError::Busy);
        }
        let _busy = Busy(&self.busy);

        let daemon = Arc::new(daemon);
        let run_ctx = ctx.child();
        let _cancel_run = run_ctx.drop_guard();

        self.enter(Phase::SettingUp);
        if let Err(source) = daemon.setup(&run_ctx).await {
            self.enter(Phase::ErrorExit);
            return Err(SupervisorError::Setup { source });
        }

        let signal = match listen() {
            Ok(signal) => signal,
            Err(source) => {
                self.enter(Phase::ErrorExit);
                return Err(SupervisorError::Signal { source });
            }
        };
        tokio::pin!(signal);

        self.enter(Phase::Running);
        self.logger.info("starting daemon", &[]);
        let mut run_task = tokio::spawn({
            let daemon = Arc::clone(&daemon);
            let run_ctx = run_ctx.clone();
            async move { daemon.run(&run_ctx).await }
        });

        let mut run_returned = false;
        loop {
            tokio::select! {
                res = &mut run_task, if !run_returned => {
                    match res {
                        Ok(Ok(())) => {
                            run_returned = true;
                            self.logger.debug("daemon run returned", &[]);
                        }
                        Ok(Err(source)) => {
                            self.enter(Phase::ErrorExit);
                            return Err(SupervisorError::Run { source });
                        }
                        Err(join) => {
                            self.enter(Phase::ErrorExit);
                            return Err(SupervisorError::Run { source: Box::new(join) });
                        }
                    }
                }
                sig = &mut signal => {
                    self.logger.info("received signal", &[("signal", &sig)]);
                    break;
                }
                _ = ctx.done() => {
                    self.logger.info("context cancelled", &[]);
                    break;
                }
            }
        }

        run_ctx.cancel();
        self.shutdown(daemon.as_ref()).await
    }

    async fn shutdown<D: Daemon>(&self, daemon: &D) -> Result<(), SupervisorError> {
        self.enter(Phase::ShuttingDown);

        let timeout = self.cfg.timeout;
        let shutdown_ctx = Context::with_timeout(timeout);
        let _cancel_shutdown = shutdown_ctx.drop_guard();

        let budget = format!("{timeout:?}");
        self.logger
            .info("shutting down gracefully", &[("timeout", &budget)]);

        match time::timeout(timeout, daemon.shutdown(&shutdown_ctx)).await {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                self.enter(Phase::ErrorExit);
                return Err(SupervisorError::Shutdown { source });
            }
            Err(_elapsed) => {
                self.enter(Phase::ErrorExit);
                return Err(SupervisorError::ShutdownTimeout { timeout });
            }
        }

        self.enter(Phase::Terminated);
        self.logger.info("shutdown complete", &[]);
        Ok(())
    }

    fn enter(&self, phase: Phase) {
        self.logger.debug("entering phase", &[("phase", &phase)]);
    }
}

/// Releases the supervisor's busy flag when an invocation ends.
struct Busy<'a>(&'a AtomicBool);

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    };
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::{sync::oneshot, time::Instant};
    use tracing::Level;

    use super::*;
    use crate::{error::BoxError, logger::testing::RecordingLogger};

    #[derive(Default)]
    struct Probe {
        setup: AtomicUsize,
        run: AtomicUsize,
        run_saw_cancel: AtomicUsize,
        shutdown: AtomicUsize,
        run_ctx: Mutex<Option<Context>>,
        deadline: Mutex<Option<Instant>>,
    }

    #[derive(Clone, Copy)]
    enum RunMode {
        UntilCancelled,
        Fail,
        ReturnOk,
        Panic,
    }

    #[derive(Clone, Copy)]
    enum ShutdownMode {
        Ok,
        Fail,
        Hang,
    }

    struct FakeDaemon {
        probe: Arc<Probe>,
        fail_setup: bool,
        run: RunMode,
        shutdown: ShutdownMode,
    }

    impl FakeDaemon {
        fn new(probe: &Arc<Probe>) -> Self {
            Self {
                probe: Arc::clone(probe),
                fail_setup: false,
                run: RunMode::UntilCancelled,
                shutdown: ShutdownMode::Ok,
            }
        }
    }

    #[async_trait]
    impl Daemon for FakeDaemon {
        async fn setup(&self, ctx: &Context) -> Result<(), BoxError> {
            self.probe.setup.fetch_add(1, Ordering::SeqCst);
            *self.probe.run_ctx.lock().unwrap() = Some(ctx.clone());
            if self.fail_setup {
                return Err("broker unreachable".into());
            }
            Ok(())
        }

        async fn run(&self, ctx: &Context) -> Result<(), BoxError> {
            self.probe.run.fetch_add(1, Ordering::SeqCst);
            match self.run {
                RunMode::UntilCancelled => {
                    ctx.done().await;
                    self.probe.run_saw_cancel.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
                RunMode::Fail => Err("poll loop gave up".into()),
                RunMode::ReturnOk => Ok(()),
                RunMode::Panic => panic!("run exploded"),
            }
        }

        async fn shutdown(&self, ctx: &Context) -> Result<(), BoxError> {
            self.probe.shutdown.fetch_add(1, Ordering::SeqCst);
            *self.probe.deadline.lock().unwrap() = ctx.deadline();
            match self.shutdown {
                ShutdownMode::Ok => {
                    // Let the run task observe cancellation before returning.
                    for _ in 0..100 {
                        if self.probe.run_saw_cancel.load(Ordering::SeqCst) > 0 {
                            break;
                        }
                        tokio::task::yield_now().await;
                    }
                    Ok(())
                }
                ShutdownMode::Fail => Err("close failed".into()),
                ShutdownMode::Hang => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }
    }

    fn supervisor(timeout: Duration) -> (Supervisor, Arc<RecordingLogger>) {
        let logger = Arc::new(RecordingLogger::default());
        let cfg = SupervisorConfig {
            timeout,
            ..SupervisorConfig::default()
        };
        let sup = Supervisor::new(cfg).with_logger(logger.clone());
        (sup, logger)
    }

    fn fire(sig: Signal) -> impl FnOnce() -> io::Result<oneshot::Receiver<Signal>> {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(sig);
        move || Ok(rx)
    }

    fn never() -> io::Result<std::future::Pending<Signal>> {
        Ok(std::future::pending())
    }

    // oneshot::Receiver resolves to Result; adapt it to a Signal future.
    async fn signal_of(rx: oneshot::Receiver<Signal>) -> Signal {
        rx.await.unwrap_or(Signal::Terminate)
    }

    #[tokio::test(start_paused = true)]
    async fn signal_cancels_run_once_and_shuts_down_with_deadline() {
        for sig in [Signal::Interrupt, Signal::Terminate] {
            let (sup, _logs) = supervisor(Duration::from_secs(30));
            let probe = Arc::new(Probe::default());
            let listen = fire(sig);

            let start = Instant::now();
            let res = sup
                .supervise(&Context::new(), FakeDaemon::new(&probe), move || {
                    listen().map(signal_of)
                })
                .await;

            assert!(res.is_ok(), "{sig}: {res:?}");
            assert_eq!(probe.setup.load(Ordering::SeqCst), 1);
            assert_eq!(probe.run.load(Ordering::SeqCst), 1);
            assert_eq!(probe.run_saw_cancel.load(Ordering::SeqCst), 1);
            assert_eq!(probe.shutdown.load(Ordering::SeqCst), 1);

            let run_ctx = probe.run_ctx.lock().unwrap().clone().unwrap();
            assert!(run_ctx.is_cancelled());

            let deadline = probe.deadline.lock().unwrap().unwrap();
            let expected = start + Duration::from_secs(30);
            assert!(deadline >= expected && deadline <= expected + Duration::from_millis(1));
        }
    }

    #[tokio::test]
    async fn setup_failure_skips_run_and_shutdown() {
        let (sup, _logs) = supervisor(Duration::from_secs(30));
        let probe = Arc::new(Probe::default());
        let mut daemon = FakeDaemon::new(&probe);
        daemon.fail_setup = true;

        let listened = AtomicBool::new(false);
        let err = sup
            .supervise(&Context::new(), daemon, || {
                listened.store(true, Ordering::SeqCst);
                never()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::Setup { .. }));
        assert!(err.to_string().contains("broker unreachable"));
        assert_eq!(probe.setup.load(Ordering::SeqCst), 1);
        assert_eq!(probe.run.load(Ordering::SeqCst), 0);
        assert_eq!(probe.shutdown.load(Ordering::SeqCst), 0);
        assert!(!listened.load(Ordering::SeqCst));

        let run_ctx = probe.run_ctx.lock().unwrap().clone().unwrap();
        assert!(run_ctx.is_cancelled());
    }

    #[tokio::test]
    async fn run_failure_without_signal_skips_shutdown() {
        let (sup, _logs) = supervisor(Duration::from_secs(30));
        let probe = Arc::new(Probe::default());
        let mut daemon = FakeDaemon::new(&probe);
        daemon.run = RunMode::Fail;

        let err = sup
            .supervise(&Context::new(), daemon, never)
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::Run { .. }));
        assert_eq!(err.to_string(), "daemon run failed: poll loop gave up");
        assert_eq!(probe.run.load(Ordering::SeqCst), 1);
        assert_eq!(probe.shutdown.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn run_panic_is_reported_as_run_error() {
        let (sup, _logs) = supervisor(Duration::from_secs(30));
        let probe = Arc::new(Probe::default());
        let mut daemon = FakeDaemon::new(&probe);
        daemon.run = RunMode::Panic;

        let err = sup
            .supervise(&Context::new(), daemon, never)
            .await
            .unwrap_err();

        assert_eq!(err.as_label(), "supervisor_run");
        assert_eq!(probe.shutdown.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_returning_ok_waits_for_signal() {
        let (sup, _logs) = supervisor(Duration::from_secs(30));
        let probe = Arc::new(Probe::default());
        let mut daemon = FakeDaemon::new(&probe);
        daemon.run = RunMode::ReturnOk;

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(5)).await;
            let _ = tx.send(Signal::Terminate);
        });

        let start = Instant::now();
        sup.supervise(&Context::new(), daemon, move || Ok(signal_of(rx)))
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(probe.shutdown.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn caller_cancellation_starts_shutdown() {
        let (sup, logs) = supervisor(Duration::from_secs(30));
        let probe = Arc::new(Probe::default());

        let ctx = Context::new();
        let trigger = ctx.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            trigger.cancel();
        });

        sup.supervise(&ctx, FakeDaemon::new(&probe), never)
            .await
            .unwrap();

        assert_eq!(probe.shutdown.load(Ordering::SeqCst), 1);
        assert!(logs
            .messages(Level::INFO)
            .contains(&"context cancelled".to_string()));
    }

    #[tokio::test]
    async fn shutdown_failure_is_wrapped() {
        let (sup, _logs) = supervisor(Duration::from_secs(30));
        let probe = Arc::new(Probe::default());
        let mut daemon = FakeDaemon::new(&probe);
        daemon.shutdown = ShutdownMode::Fail;
        let listen = fire(Signal::Interrupt);

        let err = sup
            .supervise(&Context::new(), daemon, move || listen().map(signal_of))
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::Shutdown { .. }));
        assert_eq!(err.to_string(), "daemon shutdown failed: close failed");
        assert_eq!(probe.shutdown.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_shutdown_times_out() {
        let (sup, _logs) = supervisor(Duration::from_secs(3));
        let probe = Arc::new(Probe::default());
        let mut daemon = FakeDaemon::new(&probe);
        daemon.shutdown = ShutdownMode::Hang;
        let listen = fire(Signal::Terminate);

        let start = Instant::now();
        let err = sup
            .supervise(&Context::new(), daemon, move || listen().map(signal_of))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SupervisorError::ShutdownTimeout { timeout } if timeout == Duration::from_secs(3)
        ));
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn signal_registration_failure_skips_run() {
        let (sup, _logs) = supervisor(Duration::from_secs(30));
        let probe = Arc::new(Probe::default());

        let err = sup
            .supervise(&Context::new(), FakeDaemon::new(&probe), || {
                Err::<std::future::Pending<Signal>, _>(io::Error::other("no handler"))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::Signal { .. }));
        assert_eq!(probe.run.load(Ordering::SeqCst), 0);
        assert_eq!(probe.shutdown.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn lifecycle_info_entries() {
        let (sup, logs) = supervisor(Duration::from_secs(30));
        let probe = Arc::new(Probe::default());
        let listen = fire(Signal::Terminate);

        sup.supervise(&Context::new(), FakeDaemon::new(&probe), move || {
            listen().map(signal_of)
        })
        .await
        .unwrap();

        assert_eq!(
            logs.messages(Level::INFO),
            vec![
                "starting daemon",
                "received signal",
                "shutting down gracefully",
                "shutdown complete",
            ]
        );

        let signal_entry = logs
            .entries()
            .into_iter()
            .find(|e| e.message == "received signal")
            .unwrap();
        assert_eq!(
            signal_entry.fields,
            vec![("signal".to_string(), "SIGTERM".to_string())]
        );

        let phases: Vec<String> = logs
            .entries()
            .into_iter()
            .filter(|e| e.message == "entering phase")
            .map(|e| e.fields[0].1.clone())
            .collect();
        assert_eq!(
            phases,
            vec!["setting_up", "running", "shutting_down", "terminated"]
        );
    }

    #[tokio::test]
    async fn concurrent_run_on_same_supervisor_is_rejected() {
        let (sup, _logs) = supervisor(Duration::from_secs(30));
        let first = Arc::new(Probe::default());
        let second = Arc::new(Probe::default());
        let ctx = Context::new();

        let (a, b) = tokio::join!(
            sup.supervise(&ctx, FakeDaemon::new(&first), never),
            async {
                let res = sup.supervise(&ctx, FakeDaemon::new(&second), never).await;
                ctx.cancel();
                res
            },
        );

        assert!(a.is_ok(), "{a:?}");
        assert!(matches!(b, Err(SupervisorError::Busy)));
        assert_eq!(first.shutdown.load(Ordering::SeqCst), 1);
        assert_eq!(second.setup.load(Ordering::SeqCst), 0);
        assert_eq!(second.run.load(Ordering::SeqCst), 0);
        assert_eq!(second.shutdown.load(Ordering::SeqCst), 0);

        // The supervisor is free again once the first invocation returns.
        let listen = fire(Signal::Terminate);
        sup.supervise(&Context::new(), FakeDaemon::new(&second), move || {
            listen().map(signal_of)
        })
        .await
        .unwrap();
        assert_eq!(second.shutdown.load(Ordering::SeqCst), 1);
    }

    /// Sends itself `SIGUSR2` from `run`, after the supervisor registered its listener.
    #[cfg(unix)]
    struct RaisesUser2;

    #[cfg(unix)]
    #[async_trait]
    impl Daemon for RaisesUser2 {
        async fn setup(&self, _ctx: &Context) -> Result<(), BoxError> {
            Ok(())
        }

        async fn run(&self, ctx: &Context) -> Result<(), BoxError> {
            let status = std::process::Command::new("kill")
                .args(["-USR2", &std::process::id().to_string()])
                .status()?;
            if !status.success() {
                return Err(format!("kill exited with {status}").into());
            }
            ctx.done().await;
            Ok(())
        }

        async fn shutdown(&self, _ctx: &Context) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_shuts_down_on_configured_os_signal() {
        let logger = Arc::new(RecordingLogger::default());
        let cfg = SupervisorConfig {
            timeout: Duration::from_secs(5),
            signals: vec![Signal::User2],
        };
        let sup = Supervisor::new(cfg).with_logger(logger.clone());

        time::timeout(
            Duration::from_secs(10),
            sup.run(&Context::new(), RaisesUser2),
        )
        .await
        .unwrap()
        .unwrap();

        let signal_entry = logger
            .entries()
            .into_iter()
            .find(|e| e.message == "received signal")
            .unwrap();
        assert_eq!(
            signal_entry.fields,
            vec![("signal".to_string(), "SIGUSR2".to_string())]
        );
        assert!(logger
            .messages(Level::INFO)
            .contains(&"shutdown complete".to_string()));
    }

}
