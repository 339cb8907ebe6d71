//! Wire format: the 128-byte fixed header, message payload codecs, and
//! timestamp conversions.
//!
//! A packet on the wire is a [`Header`] followed immediately by its payload.
//! [`Header::pack`] and [`Header::unpack`] handle the header framing;
//! [`Message`] maps `(packet_type, message_type)` pairs to typed payloads.

mod header;
mod message;
pub mod timestamp;

use crate::core::ProtocolError;

pub use header::Header;
pub use message::{ArchiveRequest, FrameEntry, Message, PacketType};

/// Decode one whole packet into its header and typed message.
pub fn decode_packet(packet: &[u8]) -> Result<(Header, Message), ProtocolError> {
    let (header, payload) = Header::unpack(packet)?;
    let message = Message::unpack_payload(&header.packet_type, &header.message_type, &payload)?;
    Ok((header, message))
}
