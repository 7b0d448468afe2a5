//! Tracing bootstrap for embedders.
//!
//! Events go to a JSON-lines file under a host-provided directory; the
//! keyboard process must never write to stdout. The decoder emits explicit
//! debug events per call, so span open/close events are not recorded.

#[cfg(feature = "trace")]
mod enabled {
    use std::path::Path;
    use std::sync::OnceLock;

    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_subscriber::EnvFilter;

    /// Keeps the background writer alive for the life of the process;
    /// dropping it would discard buffered events when the host unloads us.
    static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

    const TRACE_FILE: &str = "tapdict-trace.jsonl";
    const DEFAULT_FILTER: &str = "tap_engine=debug,tap_core=debug";

    pub fn init_tracing(log_dir: &Path) {
        if GUARD.get().is_some() {
            return;
        }
        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, TRACE_FILE));
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(writer)
            .finish();
        // Lost race or a host-installed subscriber: keep theirs, drop ours.
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            let _ = GUARD.set(guard);
        }
    }
}

#[cfg(feature = "trace")]
pub use enabled::init_tracing;

#[cfg(not(feature = "trace"))]
pub fn init_tracing(_log_dir: &std::path::Path) {}
