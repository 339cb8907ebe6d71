//! Three-phase handshake orchestration over a bound channel.
//!
//! Every SOSS transaction is request, acknowledgment, completion: CD/AB/EN
//! for commands, DS/AB/DE for instrument file transfers, FS/AB/FE for archive
//! transfers. ST/SD status pushes are the one exception and carry no state.
//! The orchestrator runs the initiator side of these exchanges and correlates
//! replies by sequence number.

mod orchestrator;
mod pending;

pub use orchestrator::{
    ArchiveReply, CommandReply, HandshakeConfig, HandshakeOrchestrator, TransferReply,
};

use std::time::Duration;

use thiserror::Error;

use crate::core::{ProtocolError, SossError, UnknownServiceError};
use crate::transport::TransportError;

/// Terminal failure of one handshake.
///
/// A failed handshake yields exactly one of these, never a partial reply.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The peer acknowledged with a non-zero result and will not proceed.
    #[error("request rejected by peer: ack result {result}")]
    Rejected {
        /// The non-zero AB result field.
        result: i32,
    },

    /// The peer took delivery attempts but refused every one of them.
    #[error("delivery refused by peer")]
    Refused,

    /// No acknowledgment arrived within the window, across all attempts.
    #[error("no acknowledgment after {attempts} attempts")]
    AckTimeout {
        /// Total send attempts made.
        attempts: u32,
    },

    /// Acknowledged, but no completion arrived in time.
    #[error("no completion within {timeout:?}")]
    CompletionTimeout {
        /// The completion window that elapsed.
        timeout: Duration,
    },

    /// The pending call was torn down before a reply arrived.
    #[error("pending call canceled")]
    Canceled,

    /// A reply violated the wire protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport failed outside the retry window.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Program-number lookup failed while wiring the channel.
    #[error(transparent)]
    Service(#[from] UnknownServiceError),
}

impl From<SossError> for HandshakeError {
    fn from(err: SossError) -> Self {
        match err {
            SossError::Protocol(e) => HandshakeError::Protocol(e),
            SossError::UnknownService(e) => HandshakeError::Service(e),
            SossError::Transport(e) => HandshakeError::Transport(e),
            SossError::Handshake(e) => e,
        }
    }
}
