//! Progress reporting and cooperative cancellation.
//!
//! # Why a callback trait instead of channels?
//!
//! The callback is the least-invasive integration point: callers can forward
//! events to a task record, a WebSocket, or a terminal progress bar without
//! the library knowing how the host application communicates. The trait is
//! `Send + Sync` because the engine runs on a background worker while the
//! callback typically writes state read from another thread.
//!
//! Closures work directly:
//!
//! ```rust
//! use imgconv::ProgressSink;
//!
//! let sink = |message: &str, percent: u8| {
//!     eprintln!("[{percent:>3}%] {message}");
//! };
//! sink.on_progress("Converting: scan.tiff", 50);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives `(message, percent)` events as the engine works through a batch.
///
/// Fire-and-forget: the engine never consults a return value and never
/// blocks on the sink. Percent is 0–100; per-file handlers report after each
/// completed unit, merge handlers report only 0 and 100.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, message: &str, percent: u8) {
        let _ = (message, percent);
    }
}

/// A no-op sink for callers that do not need progress events.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {}

impl<F> ProgressSink for F
where
    F: Fn(&str, u8) + Send + Sync,
{
    fn on_progress(&self, message: &str, percent: u8) {
        self(message, percent)
    }
}

/// A shared, write-once cancellation signal, polled cooperatively at unit
/// boundaries (each file or page; between groups in the engine).
///
/// Once set it is never reset; in-flight blocking calls are never preempted.
/// Cloning produces another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn closure_sink_receives_events() {
        let count = AtomicUsize::new(0);
        {
            let sink = |_m: &str, p: u8| {
                assert!(p <= 100);
                count.fetch_add(1, Ordering::SeqCst);
            };
            sink.on_progress("one", 0);
            sink.on_progress("two", 100);
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn noop_sink_does_not_panic() {
        NoopProgress.on_progress("ignored", 42);
    }

    #[test]
    fn cancel_token_is_shared_and_sticky() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
        token.cancel(); // setting twice is harmless
        assert!(token.is_cancelled());
    }
}
