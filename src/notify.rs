//! Desktop notification sink.
//!
//! Delivery is a fire-and-forget side effect; the engine never depends on
//! it succeeding. The default implementation writes to the log, and a host
//! application substitutes its own delivery behind the trait.

use tracing::info;

/// Fire-and-forget notification sink. Failures are swallowed by impls.
pub trait Notifier: Send + Sync {
    /// Deliver a notification, best-effort.
    fn notify(&self, title: &str, body: &str);
}

/// Default sink that logs instead of delivering.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        info!(title, body, "notification");
    }
}
