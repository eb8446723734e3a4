//! Per-session diagnostic context: the lazily built log label and the sink
//! it is published to.
//!
//! Every record a handler writes for a session looks like
//!
//! ```text
//! Api[42] alice login alice/secret
//! └─label─┘ └id─┘ └──message───────┘
//! ```
//!
//! The label is `display_name[connection_id]`. It is computed on the first
//! record, pushed once into the connection's prefix slot
//! ([`LogSink::set_prefix`]), and reused for the rest of the session.
//!
//! # Concurrency
//!
//! Two handlers may race to write the first record for the same session.
//! The label lives in a [`OnceLock`], so exactly one initializer runs and
//! every caller observes its result; the sink's prefix is published once.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rpcforge_protocol::ConnectionId;

/// Where a session's diagnostic records go.
///
/// The connection layer supplies one sink per connection. `Send + Sync`
/// because handlers for the same session may run on different worker
/// threads.
pub trait LogSink: Send + Sync + 'static {
    /// Publishes the session's label into the connection's prefix slot.
    /// Called at most once per session.
    fn set_prefix(&self, prefix: &str);

    /// Writes one fully formatted record.
    fn write(&self, line: &str);
}

// ---------------------------------------------------------------------------
// TracingSink
// ---------------------------------------------------------------------------

/// Default sink: forwards records to `tracing` at `INFO`, tagged with the
/// connection id.
#[derive(Debug)]
pub struct TracingSink {
    conn_id: ConnectionId,
    prefix: OnceLock<String>,
}

impl TracingSink {
    pub fn new(conn_id: ConnectionId) -> Self {
        Self {
            conn_id,
            prefix: OnceLock::new(),
        }
    }

    /// The published prefix, once a label has been computed.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.get().map(String::as_str)
    }
}

impl LogSink for TracingSink {
    fn set_prefix(&self, prefix: &str) {
        if self.prefix.set(prefix.to_string()).is_err() {
            tracing::warn!(conn = %self.conn_id, "log prefix already set");
        }
    }

    fn write(&self, line: &str) {
        tracing::info!(conn = %self.conn_id, "{line}");
    }
}

// ---------------------------------------------------------------------------
// DiagnosticContext
// ---------------------------------------------------------------------------

/// The compute-once label cache plus the sink it writes through.
pub struct DiagnosticContext {
    label: OnceLock<String>,
    sink: Arc<dyn LogSink>,
}

impl DiagnosticContext {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            label: OnceLock::new(),
            sink,
        }
    }

    /// Returns the session label, computing and publishing it on first use.
    ///
    /// Later calls return the cached label even if they pass a different
    /// `display_name`.
    pub fn label(&self, display_name: &str, conn_id: ConnectionId) -> &str {
        self.label.get_or_init(|| {
            let label = format!("{display_name}[{conn_id}]");
            self.sink.set_prefix(&label);
            label
        })
    }

    /// The label if it has already been computed.
    pub fn cached_label(&self) -> Option<&str> {
        self.label.get().map(String::as_str)
    }

    /// Writes `"<label> <identity> <message>"` to the sink. `identity` is
    /// empty before login.
    pub fn write(
        &self,
        display_name: &str,
        conn_id: ConnectionId,
        identity: &str,
        message: fmt::Arguments<'_>,
    ) {
        let label = self.label(display_name, conn_id);
        self.sink.write(&format!("{label} {identity} {message}"));
    }
}

impl fmt::Debug for DiagnosticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticContext")
            .field("label", &self.label.get())
            .finish_non_exhaustive()
    }
}
