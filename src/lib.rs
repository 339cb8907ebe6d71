//! # SOSS RPC Protocol
//!
//! Messaging layer of the Subaru Observatory Software System: the fixed
//! 128-byte wire header, the three-phase command/transfer handshakes, and the
//! program-number routing that connects the observation supervisor, the
//! instruments (OBCPs), the telescope, and the STARS archive.
//!
//! Every transaction follows the same shape: a request (CD, DS or FS), an
//! acknowledgment (AB) that accepts or rejects it, and a terminal completion
//! (EN, DE or FE) that may arrive much later and is correlated by sequence
//! number, never by arrival order. Status pushes (SD) are the one exception
//! and carry no handshake state at all.
//!
//! ## Feature Flags
//!
//! - `transport` (default): the transport trait, channels, and handshake
//!   orchestration (pulls in tokio)
//!
//! ## Modules
//!
//! - [`core`]: constants, errors, program-number registry, sequence numbers
//! - [`wire`]: header and payload codecs, wire timestamps
//! - [`transport`]: transport trait and the in-process bus
//! - [`channel`]: a service's program-number pair bound to a transport
//! - [`handshake`]: the request/ack/completion state machine
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use soss_protocol::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ProgramNumberRegistry::builtin();
//!     let numbers = registry.lookup("OBStoOBCP1(cmd)")?;
//!
//!     let bus = MemoryTransport::new();
//!     let channel = Channel::bind(
//!         bus,
//!         ChannelConfig::new("OBS", "OBCP1"),
//!         Role::Initiator,
//!         &numbers,
//!         Arc::new(SequenceNumberAllocator::default()),
//!     );
//!     let rpc = HandshakeOrchestrator::new(
//!         "OBStoOBCP1(cmd)",
//!         channel,
//!         HandshakeConfig::default(),
//!     );
//!     rpc.start()?;
//!
//!     let reply = rpc.command("EXEC OBS SETUP").await?;
//!     println!("status {}: {}", reply.status, reply.result);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Wire format (always included)
pub mod wire;

// Transport abstraction (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Bound program-number channels (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod channel;

// Handshake orchestration (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod handshake;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{
        ProgramNumberRegistry, ProgramNumbers, ProtocolError, SequenceNumberAllocator,
        ServiceDirectory, SossError, UnknownServiceError,
    };
    pub use crate::wire::{timestamp, ArchiveRequest, FrameEntry, Header, Message, PacketType};

    #[cfg(feature = "transport")]
    pub use crate::transport::{MemoryTransport, RpcTransport, TransportError};

    #[cfg(feature = "transport")]
    pub use crate::channel::{Channel, ChannelConfig, Role};

    #[cfg(feature = "transport")]
    pub use crate::handshake::{
        ArchiveReply, CommandReply, HandshakeConfig, HandshakeError, HandshakeOrchestrator,
        TransferReply,
    };
}

// Re-export commonly used items at crate root
pub use crate::core::{ProgramNumberRegistry, ProtocolError, SequenceNumberAllocator, SossError};
pub use crate::wire::{Header, Message};

#[cfg(feature = "transport")]
pub use crate::channel::{Channel, ChannelConfig, Role};

#[cfg(feature = "transport")]
pub use crate::handshake::{HandshakeConfig, HandshakeError, HandshakeOrchestrator};

#[cfg(feature = "transport")]
pub use crate::transport::{MemoryTransport, RpcTransport, TransportError};
