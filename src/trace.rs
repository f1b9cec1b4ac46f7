//! Wire-level trace hooks.

use tracing::trace;

/// Observer notified of every line the engine writes or reads.
///
/// Lines are passed without their terminator. Both methods default to no-ops.
pub trait ProtocolTrace: Send + Sync {
    fn on_sent(&self, _line: &str) {}
    fn on_received(&self, _line: &str) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrace;

impl ProtocolTrace for NoTrace {}

/// Forwards every line to `tracing` at TRACE level under target `stli::wire`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTrace;

impl ProtocolTrace for TracingTrace {
    fn on_sent(&self, line: &str) {
        trace!(target: "stli::wire", "[SEND] {}", line);
    }

    fn on_received(&self, line: &str) {
        trace!(target: "stli::wire", "[RECV] {}", line);
    }
}
