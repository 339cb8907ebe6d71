//! Protocol constants for SOSS RPC.
//!
//! The wire format is a byte-for-byte contract with legacy peers; the field
//! widths and separators here MUST NOT be changed.

use std::time::Duration;

// =============================================================================
// HEADER LAYOUT
// =============================================================================

/// Fixed header length in bytes.
pub const HEADER_LEN: usize = 128;

/// Protocol version string carried in every header.
pub const PROTOCOL_VERSION: &str = "SUBARUV1";

/// Width of the total-length field (digits).
pub const TOTAL_LENGTH_WIDTH: usize = 10;

/// Width of the time-sent field (wire timestamp).
pub const TIME_SENT_WIDTH: usize = 18;

/// Width of the protocol-version field.
pub const PROTOCOL_VERSION_WIDTH: usize = 8;

/// Width of the sequence-number field (digits).
pub const SEQ_NUM_WIDTH: usize = 8;

/// Width of the sender-id field.
pub const SENDER_WIDTH: usize = 8;

/// Width of the process-code field (digits).
pub const PROCESS_CODE_WIDTH: usize = 5;

/// Width of the uid field (may be blank).
pub const UID_WIDTH: usize = 5;

/// Width of the gid field (may be blank).
pub const GID_WIDTH: usize = 5;

/// Width of the receiver-id field.
pub const RECEIVER_WIDTH: usize = 8;

/// Width of the packet-type field.
pub const PACKET_TYPE_WIDTH: usize = 2;

/// Width of the message-type field.
pub const MESSAGE_TYPE_WIDTH: usize = 2;

/// Width of the payload-length field (digits).
pub const PAYLOAD_LENGTH_WIDTH: usize = 10;

/// Width of the reserved trailer.
pub const RESERVED_WIDTH: usize = 27;

// =============================================================================
// TIMESTAMP
// =============================================================================

/// Wire timestamp length (`YYYYMMDDHHMMSS.mmm`).
pub const TIMESTAMP_LEN: usize = 18;

/// Offset of the wire's local time (Hawaii Standard Time) from UTC, in
/// seconds. HST has no daylight saving, so this is a fixed constant.
pub const HST_UTC_OFFSET_SECS: i32 = -10 * 3600;

// =============================================================================
// SEQUENCE NUMBERS
// =============================================================================

/// The sequence-number wire field is 8 decimal digits; allocators wrap here.
pub const SEQ_NUM_MODULUS: u32 = 100_000_000;

// =============================================================================
// HANDSHAKE TIMING DEFAULTS
// =============================================================================

/// Default wait for the transport-level call to be accepted.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait for the AB acknowledgment after sending a request.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(15);

/// Default wait for the EN/DE/FE completion after a successful AB.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

/// Default number of request retries while waiting for an AB.
pub const DEFAULT_ACK_RETRIES: u32 = 2;
