//! Error types for the SOSS RPC protocol.

use thiserror::Error;

/// Errors raised while encoding or decoding wire messages.
///
/// Every schema violation surfaces as a `ProtocolError`, never as a generic
/// parse failure, so callers can distinguish a malformed peer from a local
/// bug.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer shorter than the declared or minimum length.
    #[error("message too short: expected {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum bytes required.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// A numeric header or payload field did not parse as a number.
    #[error("non-numeric {field} field: {value:?}")]
    BadNumericField {
        /// Name of the offending field.
        field: &'static str,
        /// The raw text that failed to parse.
        value: String,
    },

    /// A header field exceeds its fixed wire width.
    ///
    /// Fields are never silently truncated to fit.
    #[error("{field} field too wide: {actual} chars, limit {width}")]
    FieldTooWide {
        /// Name of the offending field.
        field: &'static str,
        /// Fixed wire width of the field.
        width: usize,
        /// Actual length supplied.
        actual: usize,
    },

    /// Payload field count does not match the message kind's schema.
    #[error("{kind} payload has wrong field count: {detail}")]
    FieldCount {
        /// Two-letter message kind (e.g. "DS").
        kind: &'static str,
        /// What was wrong with the count.
        detail: String,
    },

    /// The (packet type, message type) pair names no known message kind.
    #[error("unknown message kind: packet {packet:?}, message {message:?}")]
    UnknownKind {
        /// Packet-type field as received.
        packet: String,
        /// Message-type field as received.
        message: String,
    },

    /// A per-file status list does not match the original frame list.
    #[error("status list length {actual} does not match frame list length {expected}")]
    StatusListMismatch {
        /// Number of frames in the originating request.
        expected: usize,
        /// Number of statuses in the completion.
        actual: usize,
    },

    /// Payload bytes are not valid ASCII/UTF-8 text.
    #[error("payload is not valid text")]
    NotText,

    /// Malformed wire timestamp.
    #[error("malformed timestamp: {0:?}")]
    BadTimestamp(String),
}

/// A program-number lookup named a service the registry does not know.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown RPC service key: {key:?}")]
pub struct UnknownServiceError {
    /// The service key that missed.
    pub key: String,
}

/// Top-level SOSS RPC errors.
#[derive(Debug, Error)]
pub enum SossError {
    /// Wire encode/decode error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Program-number lookup miss.
    #[error("service lookup error: {0}")]
    UnknownService(#[from] UnknownServiceError),

    /// Failure surfaced by the underlying transport.
    #[cfg(feature = "transport")]
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// Handshake failure.
    #[cfg(feature = "transport")]
    #[error("handshake error: {0}")]
    Handshake(#[from] crate::handshake::HandshakeError),
}
