//! Execution context threaded through every kernel call.
//!
//! Kernels report errors and diagnostic prints through the context they are
//! handed, so no process-wide "active call" state is needed and independent
//! calls may run concurrently.

use log::{error, info};

/// Smallest worker count a call may request.
pub const MIN_THREADS: usize = 1;

/// Largest worker count a call may request.
pub const MAX_THREADS: usize = 32;

/// Capabilities a kernel can reach during a call.
///
/// Implementations must be `Sync`: a kernel running its own worker pool may
/// report from any of its threads.
pub trait CallContext: Sync {
    /// Reports a human-readable failure. Called before a kernel returns a nonzero status.
    fn error(&self, message: &str);

    /// Reports diagnostic output produced while running.
    fn print(&self, message: &str);

    /// Value injected into opaque-handle scalar arguments.
    fn handle(&self) -> u64 {
        0
    }

    /// Number of worker threads the kernel may use.
    fn num_threads(&self) -> usize {
        MIN_THREADS
    }
}

/// Per-call configuration.
#[derive(Debug, Clone, Default)]
pub struct CallConfig {
    threads: Option<usize>,
}

impl CallConfig {
    pub fn new() -> Self {
        Self { threads: None }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Requested worker count, clamped to `MIN_THREADS..=MAX_THREADS`.
    pub fn get_threads(&self) -> usize {
        self.threads
            .unwrap_or(MIN_THREADS)
            .clamp(MIN_THREADS, MAX_THREADS)
    }
}

/// A context that forwards kernel reports to the `log` facade.
#[derive(Debug, Clone, Default)]
pub struct LoggingCallContext {
    config: CallConfig,
}

impl LoggingCallContext {
    pub fn new(config: CallConfig) -> Self {
        Self { config }
    }
}

impl CallContext for LoggingCallContext {
    fn error(&self, message: &str) {
        error!("kernel error: {message}");
    }

    fn print(&self, message: &str) {
        info!("kernel: {message}");
    }

    fn num_threads(&self) -> usize {
        self.config.get_threads()
    }
}
