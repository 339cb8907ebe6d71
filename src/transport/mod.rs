//! Transport abstraction for SOSS RPC calls.
//!
//! A transport moves whole packets: one `call` sends the 128-byte header plus
//! payload to the service bound to a program number and resolves with that
//! service's raw reply. Fragmentation, reconnection and byte-level framing
//! are the transport's problem, not the caller's.
//!
//! [`MemoryTransport`] is the in-process implementation used by tests and
//! same-process wiring; network transports implement the same trait.

mod memory;

pub use memory::MemoryTransport;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No service is bound to the target program number.
    #[error("no service bound to program number {0:#010x}")]
    NoSuchProgram(u32),

    /// The peer did not reply within the allotted time.
    #[error("call to program {program:#010x} timed out after {timeout:?}")]
    Timeout {
        /// Target program number.
        program: u32,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The peer went away before producing a reply.
    #[error("peer for program {0:#010x} went away before replying")]
    PeerGone(u32),

    /// The channel is one-way and has no program bound in this direction.
    #[error("channel is one-way: no {direction} program bound")]
    Unbound {
        /// `"send"` or `"receive"`.
        direction: &'static str,
    },

    /// Underlying I/O failure.
    #[error("transport i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A synchronous-call RPC transport keyed by program number.
///
/// `call` is a blocking request/reply exchange from the caller's point of
/// view; concurrency comes from issuing calls on separate tasks. Inbound
/// packets for a program this process serves are delivered to the handler
/// registered for it, one invocation per packet, on a transport-managed task.
pub trait RpcTransport: Send + Sync {
    /// Send one packet to `program` and wait for its reply.
    fn call(
        &self,
        program: u32,
        packet: Vec<u8>,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Bind `handler` to `program`, replacing any previous binding.
    ///
    /// The handler maps one inbound packet to its raw reply bytes and may
    /// block; the transport keeps it off the async executor.
    fn register_handler<F>(&self, program: u32, handler: F)
    where
        F: Fn(Vec<u8>) -> Vec<u8> + Send + Sync + 'static;
}
