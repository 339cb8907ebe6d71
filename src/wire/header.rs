//! The fixed 128-byte SOSS RPC header.
//!
//! Thirteen fixed-width ASCII fields joined by commas:
//!
//! ```text
//! +0    total length   (10 digits)
//! +11   time sent      (18 chars, wire timestamp)
//! +30   protocol ver   (8 chars, "SUBARUV1")
//! +39   sequence num   (8 digits)
//! +48   sender id      (<=8 chars, left-aligned)
//! +57   process code   (5 digits)
//! +63   uid            (<=5 chars, may be blank)
//! +69   gid            (<=5 chars, may be blank)
//! +75   receiver id    (<=8 chars, left-aligned)
//! +84   packet type    (2 chars)
//! +87   message type   (2 chars)
//! +90   payload length (10 digits)
//! +101  reserved       (27 chars)
//! +128  payload...
//! ```

use std::fmt::Write as _;

use crate::core::constants::{
    GID_WIDTH, HEADER_LEN, MESSAGE_TYPE_WIDTH, PACKET_TYPE_WIDTH, PROCESS_CODE_WIDTH,
    PROTOCOL_VERSION, PROTOCOL_VERSION_WIDTH, RECEIVER_WIDTH, SENDER_WIDTH, SEQ_NUM_WIDTH,
    TIME_SENT_WIDTH, UID_WIDTH,
};
use crate::core::ProtocolError;

// (offset, width) of each header field.
const F_TOTAL_LENGTH: (usize, usize) = (0, 10);
const F_TIME_SENT: (usize, usize) = (11, 18);
const F_PROTOCOL_VERSION: (usize, usize) = (30, 8);
const F_SEQ_NUM: (usize, usize) = (39, 8);
const F_SENDER: (usize, usize) = (48, 8);
const F_PROCESS_CODE: (usize, usize) = (57, 5);
const F_UID: (usize, usize) = (63, 5);
const F_GID: (usize, usize) = (69, 5);
const F_RECEIVER: (usize, usize) = (75, 8);
const F_PACKET_TYPE: (usize, usize) = (84, 2);
const F_MESSAGE_TYPE: (usize, usize) = (87, 2);
const F_PAYLOAD_LENGTH: (usize, usize) = (90, 10);

/// Decoded SOSS RPC header.
///
/// String fields hold their trimmed values; padding is applied on pack and
/// stripped on unpack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header plus payload length in bytes.
    pub total_length: u32,
    /// Wire timestamp at send time.
    pub time_sent: String,
    /// Protocol version, `SUBARUV1`.
    pub protocol_version: String,
    /// Sequence number correlating the transaction.
    pub seq_num: u32,
    /// Sending host id.
    pub sender: String,
    /// Sending process code.
    pub process_code: u32,
    /// User id; often blank.
    pub uid: String,
    /// Group id; often blank.
    pub gid: String,
    /// Receiving host id.
    pub receiver: String,
    /// Two-letter packet type (CT, DT, FT, ST).
    pub packet_type: String,
    /// Two-letter message type (CD, AB, EN, ...).
    pub message_type: String,
    /// Payload length in bytes.
    pub payload_length: u32,
}

fn check_width(field: &'static str, value: &str, width: usize) -> Result<(), ProtocolError> {
    if value.len() > width {
        return Err(ProtocolError::FieldTooWide {
            field,
            width,
            actual: value.len(),
        });
    }
    Ok(())
}

fn check_digits(field: &'static str, value: u64, width: usize) -> Result<(), ProtocolError> {
    if value >= 10u64.pow(width as u32) {
        return Err(ProtocolError::FieldTooWide {
            field,
            width,
            actual: value.to_string().len(),
        });
    }
    Ok(())
}

fn field_str(buf: &[u8], (offset, width): (usize, usize)) -> Result<&str, ProtocolError> {
    std::str::from_utf8(&buf[offset..offset + width]).map_err(|_| ProtocolError::NotText)
}

fn field_num(
    buf: &[u8],
    field: &'static str,
    loc: (usize, usize),
) -> Result<u32, ProtocolError> {
    let raw = field_str(buf, loc)?;
    raw.trim()
        .parse()
        .map_err(|_| ProtocolError::BadNumericField {
            field,
            value: raw.to_owned(),
        })
}

impl Header {
    /// Format the header and append the payload into one wire packet.
    ///
    /// The length fields are derived from `payload`, so the packet's
    /// `total_length` is always `128 + payload.len()`. Over-wide fields fail
    /// rather than truncate.
    pub fn pack(&self, payload: &str) -> Result<Vec<u8>, ProtocolError> {
        check_width("time_sent", &self.time_sent, TIME_SENT_WIDTH)?;
        check_width("protocol_version", &self.protocol_version, PROTOCOL_VERSION_WIDTH)?;
        check_width("sender", &self.sender, SENDER_WIDTH)?;
        check_width("uid", &self.uid, UID_WIDTH)?;
        check_width("gid", &self.gid, GID_WIDTH)?;
        check_width("receiver", &self.receiver, RECEIVER_WIDTH)?;
        check_width("packet_type", &self.packet_type, PACKET_TYPE_WIDTH)?;
        check_width("message_type", &self.message_type, MESSAGE_TYPE_WIDTH)?;
        check_digits("seq_num", self.seq_num as u64, SEQ_NUM_WIDTH)?;
        check_digits("process_code", self.process_code as u64, PROCESS_CODE_WIDTH)?;

        let total = (HEADER_LEN + payload.len()) as u64;
        check_digits("total_length", total, F_TOTAL_LENGTH.1)?;

        let mut packet = String::with_capacity(HEADER_LEN + payload.len());
        write!(
            packet,
            "{:010},{:>18},{:>8},{:08},{:<8},{:>5},{:>5},{:>5},{:<8},{:>2},{:>2},{:010},{:27}",
            total,
            self.time_sent,
            self.protocol_version,
            self.seq_num,
            self.sender,
            self.process_code,
            self.uid,
            self.gid,
            self.receiver,
            self.packet_type,
            self.message_type,
            payload.len(),
            ""
        )
        .expect("writing to a String cannot fail");
        debug_assert_eq!(packet.len(), HEADER_LEN);
        packet.push_str(payload);
        Ok(packet.into_bytes())
    }

    /// Slice a wire packet into its header and payload text.
    ///
    /// Fields are read at fixed byte offsets, never by scanning.
    pub fn unpack(buf: &[u8]) -> Result<(Header, String), ProtocolError> {
        if buf.len() < HEADER_LEN {
            return Err(ProtocolError::TooShort {
                expected: HEADER_LEN,
                actual: buf.len(),
            });
        }

        let total_length = field_num(buf, "total_length", F_TOTAL_LENGTH)?;
        let payload_length = field_num(buf, "payload_length", F_PAYLOAD_LENGTH)?;
        let expected = HEADER_LEN + payload_length as usize;
        if buf.len() < expected {
            return Err(ProtocolError::TooShort {
                expected,
                actual: buf.len(),
            });
        }

        let header = Header {
            total_length,
            time_sent: field_str(buf, F_TIME_SENT)?.trim().to_owned(),
            protocol_version: field_str(buf, F_PROTOCOL_VERSION)?.trim().to_owned(),
            seq_num: field_num(buf, "seq_num", F_SEQ_NUM)?,
            sender: field_str(buf, F_SENDER)?.trim().to_owned(),
            process_code: field_num(buf, "process_code", F_PROCESS_CODE)?,
            uid: field_str(buf, F_UID)?.trim().to_owned(),
            gid: field_str(buf, F_GID)?.trim().to_owned(),
            receiver: field_str(buf, F_RECEIVER)?.trim().to_owned(),
            packet_type: field_str(buf, F_PACKET_TYPE)?.trim().to_owned(),
            message_type: field_str(buf, F_MESSAGE_TYPE)?.trim().to_owned(),
            payload_length,
        };

        let payload = std::str::from_utf8(&buf[HEADER_LEN..expected])
            .map_err(|_| ProtocolError::NotText)?
            .to_owned();
        Ok((header, payload))
    }
}

impl Default for Header {
    fn default() -> Self {
        Self {
            total_length: HEADER_LEN as u32,
            time_sent: String::new(),
            protocol_version: PROTOCOL_VERSION.to_owned(),
            seq_num: 0,
            sender: String::new(),
            process_code: 0,
            uid: String::new(),
            gid: String::new(),
            receiver: String::new(),
            packet_type: String::new(),
            message_type: String::new(),
            payload_length: 0,
        }
    }
}
