//! Metrics facade for flashsim.
//!
//! Provides a [`MetricsRecorder`] trait with domain-specific methods and
//! default no-op implementations. A global singleton recorder is accessed via
//! [`recorder()`], and convenience free functions delegate to it.
//!
//! Scheduling correctness never depends on this crate; when no recorder is
//! installed every call is a no-op.
//!
//! # Usage
//!
//! Callers record metrics via free functions:
//! ```ignore
//! flashsim_metrics::record_command_issued("read", 4);
//! flashsim_metrics::record_suspension("erase");
//! ```
//!
//! At startup, install a backend:
//! ```ignore
//! flashsim_metrics::install(Box::new(MyRecorder));
//! ```

use std::sync::OnceLock;

/// Domain-specific metrics recording trait.
///
/// All methods have default no-op implementations so backends only need to
/// override the metrics they care about.
#[allow(unused_variables)]
pub trait MetricsRecorder: Send + Sync + 'static {
    /// Record a command dispatched to a chip, with its bundle width.
    fn record_command_issued(&self, kind: &str, planes: usize) {}

    /// Record an in-flight operation suspended in favor of a newer command.
    fn record_suspension(&self, kind: &str) {}

    /// Record a suspended operation resumed after the interloper finished.
    fn record_resume(&self, kind: &str) {}

    /// Record a transaction fully serviced by the hardware model.
    fn record_transaction_serviced(&self, kind: &str) {}

    /// Set the current event queue depth gauge.
    fn set_event_queue_depth(&self, depth: usize) {}
}

/// No-op recorder, used when nothing is installed.
pub struct NoopRecorder;

impl MetricsRecorder for NoopRecorder {}

static RECORDER: OnceLock<Box<dyn MetricsRecorder>> = OnceLock::new();
static NOOP: NoopRecorder = NoopRecorder;

/// Install the process-wide recorder. Later installs are ignored.
pub fn install(recorder: Box<dyn MetricsRecorder>) {
    let _ = RECORDER.set(recorder);
}

/// The installed recorder, or the no-op fallback.
pub fn recorder() -> &'static dyn MetricsRecorder {
    RECORDER.get().map(|r| r.as_ref()).unwrap_or(&NOOP)
}

pub fn record_command_issued(kind: &str, planes: usize) {
    recorder().record_command_issued(kind, planes);
}

pub fn record_suspension(kind: &str) {
    recorder().record_suspension(kind);
}

pub fn record_resume(kind: &str) {
    recorder().record_resume(kind);
}

pub fn record_transaction_serviced(kind: &str) {
    recorder().record_transaction_serviced(kind);
}

pub fn set_event_queue_depth(depth: usize) {
    recorder().set_event_queue_depth(depth);
}
