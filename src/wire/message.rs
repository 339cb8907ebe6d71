//! SOSS RPC message kinds and their payload codecs.
//!
//! A message kind is selected by the header's `(packet_type, message_type)`
//! pair; consumers match on the [`Message`] variant rather than probing
//! fields. Payload schemas are comma-delimited ASCII except SD, whose status
//! blob is raw.

use crate::core::ProtocolError;

/// Two-letter packet type, the first half of a message kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// `CT` - command transactions.
    Command,
    /// `DT` - instrument file-transfer transactions.
    DataTransfer,
    /// `FT` - archive (STARS) transfer transactions.
    FileTransfer,
    /// `ST` - one-way status pushes.
    Status,
}

impl PacketType {
    /// The wire code for this packet type.
    pub fn code(self) -> &'static str {
        match self {
            PacketType::Command => "CT",
            PacketType::DataTransfer => "DT",
            PacketType::FileTransfer => "FT",
            PacketType::Status => "ST",
        }
    }

    /// Parse a wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "CT" => Some(PacketType::Command),
            "DT" => Some(PacketType::DataTransfer),
            "FT" => Some(PacketType::FileTransfer),
            "ST" => Some(PacketType::Status),
            _ => None,
        }
    }
}

/// One file named by a DT/DS transfer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    /// Path of the file on the sending host.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Frame id, e.g. `ABCA0000001`.
    pub frame_id: String,
}

/// Metadata of an FT/FS archive transfer request: a FITS file plus its index
/// file, transferred as two steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    /// Path of the FITS file.
    pub fits_path: String,
    /// FITS file size in bytes.
    pub fits_size: u64,
    /// Frame id of the exposure.
    pub frame_id: String,
    /// Proposal id the frame belongs to.
    pub prop_id: String,
    /// Destination archive host.
    pub dest_host: String,
    /// Archive channel name.
    pub channel: String,
    /// Path of the index file.
    pub index_path: String,
    /// Index file size in bytes.
    pub index_size: u64,
}

/// A decoded SOSS RPC message, one variant per `(packet, message)` kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// CT/CD - command dispatch; payload is the raw command text.
    Command {
        /// Command string to execute.
        command: String,
    },

    /// AB - acknowledgment, shared by CT, DT and FT transactions.
    Ack {
        /// Which transaction family this acknowledges.
        packet: PacketType,
        /// Sequence number of the request being acknowledged.
        seq_num: u32,
        /// 0 accepts the request; anything else rejects it.
        result: i32,
    },

    /// CT/EN - command completion notification.
    Completion {
        /// Sequence number of the originating CD.
        seq_num: u32,
        /// Numeric completion status.
        status: i32,
        /// Application-level payload, passed through verbatim.
        result: String,
    },

    /// DT/DS - file-transfer request.
    TransferRequest {
        /// Files to transfer, in order.
        frames: Vec<FrameEntry>,
    },

    /// DT/DE - file-transfer completion.
    TransferCompletion {
        /// Sequence number of the originating DS.
        seq_num: u32,
        /// Overall result.
        result: i32,
        /// One status per transferred file, in request order.
        statuses: Vec<i32>,
    },

    /// FT/FS - archive-transfer request.
    ArchiveRequest(ArchiveRequest),

    /// FT/FE - archive-transfer completion.
    ArchiveCompletion {
        /// Sequence number of the originating FS.
        seq_num: u32,
        /// Outcome of the FITS file step.
        status1: i32,
        /// Outcome of the index file step.
        status2: i32,
        /// Overall result.
        result: i32,
    },

    /// ST/SD - status-table push, fire and forget.
    StatusPush {
        /// Destination status table name (8-byte wire slot).
        table: String,
        /// Raw status data, not comma-delimited.
        data: String,
    },
}

fn num_field<T>(field: &'static str, raw: &str) -> Result<T, ProtocolError>
where
    T: std::str::FromStr,
{
    raw.trim()
        .parse()
        .map_err(|_| ProtocolError::BadNumericField {
            field,
            value: raw.to_owned(),
        })
}

impl Message {
    /// The packet type this message travels under.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Message::Command { .. } | Message::Completion { .. } => PacketType::Command,
            Message::Ack { packet, .. } => *packet,
            Message::TransferRequest { .. } | Message::TransferCompletion { .. } => {
                PacketType::DataTransfer
            }
            Message::ArchiveRequest(_) | Message::ArchiveCompletion { .. } => {
                PacketType::FileTransfer
            }
            Message::StatusPush { .. } => PacketType::Status,
        }
    }

    /// The two-letter message type code.
    pub fn message_type(&self) -> &'static str {
        match self {
            Message::Command { .. } => "CD",
            Message::Ack { .. } => "AB",
            Message::Completion { .. } => "EN",
            Message::TransferRequest { .. } => "DS",
            Message::TransferCompletion { .. } => "DE",
            Message::ArchiveRequest(_) => "FS",
            Message::ArchiveCompletion { .. } => "FE",
            Message::StatusPush { .. } => "SD",
        }
    }

    /// Format this message's payload with the legacy field layout.
    pub fn pack_payload(&self) -> String {
        match self {
            Message::Command { command } => command.clone(),

            Message::Ack { seq_num, result, .. } => format!("{seq_num:08},{result:4}"),

            Message::Completion {
                seq_num,
                status,
                result,
            } => format!("{seq_num:08},{status:4},{result}"),

            Message::TransferRequest { frames } => frames
                .iter()
                .map(|f| format!("{},{},{}", f.path, f.size, f.frame_id))
                .collect::<Vec<_>>()
                .join(","),

            Message::TransferCompletion {
                seq_num,
                result,
                statuses,
            } => {
                let mut fields = vec![format!("{seq_num:08}"), format!("{result:4}")];
                fields.extend(statuses.iter().map(|s| format!("{s:4}")));
                fields.join(",")
            }

            Message::ArchiveRequest(req) => format!(
                "{},{},{},{},{},{},{},{}",
                req.fits_path,
                req.fits_size,
                req.frame_id,
                req.prop_id,
                req.dest_host,
                req.channel,
                req.index_path,
                req.index_size
            ),

            // Sent as seq,result,status1,status2; receivers read the middle
            // fields as status1,status2 and the last as result. Legacy wire
            // contract, preserved as-is.
            Message::ArchiveCompletion {
                seq_num,
                status1,
                status2,
                result,
            } => format!("{seq_num:08},{result:4},{status1:4},{status2:4}"),

            Message::StatusPush { table, data } => format!("{table:<8.8},{data}"),
        }
    }

    /// Decode a payload against the schema named by `(packet, message)` type
    /// codes.
    pub fn unpack_payload(
        packet_type: &str,
        message_type: &str,
        payload: &str,
    ) -> Result<Message, ProtocolError> {
        let packet = PacketType::from_code(packet_type);
        match (packet, message_type) {
            (Some(PacketType::Command), "CD") => Ok(Message::Command {
                command: payload.trim().to_owned(),
            }),

            (Some(packet @ (PacketType::Command | PacketType::DataTransfer | PacketType::FileTransfer)), "AB") => {
                let fields: Vec<&str> = payload.split(',').collect();
                if fields.len() != 2 {
                    return Err(ProtocolError::FieldCount {
                        kind: "AB",
                        detail: format!("expected 2 fields, got {}", fields.len()),
                    });
                }
                Ok(Message::Ack {
                    packet,
                    seq_num: num_field("seq_num", fields[0])?,
                    result: num_field("result", fields[1])?,
                })
            }

            (Some(PacketType::Command), "EN") => {
                let mut fields = payload.splitn(3, ',');
                let seq = fields.next().unwrap_or_default();
                let status = fields.next().ok_or(ProtocolError::FieldCount {
                    kind: "EN",
                    detail: "expected at least 2 fields".to_owned(),
                })?;
                Ok(Message::Completion {
                    seq_num: num_field("seq_num", seq)?,
                    status: num_field("status", status)?,
                    result: fields.next().unwrap_or_default().to_owned(),
                })
            }

            (Some(PacketType::DataTransfer), "DS") => {
                let fields: Vec<&str> = payload.split(',').collect();
                if fields.is_empty() || fields.len() % 3 != 0 {
                    return Err(ProtocolError::FieldCount {
                        kind: "DS",
                        detail: format!("{} fields is not a multiple of 3", fields.len()),
                    });
                }
                let frames = fields
                    .chunks(3)
                    .map(|triple| {
                        Ok(FrameEntry {
                            path: triple[0].trim().to_owned(),
                            size: num_field("size", triple[1])?,
                            frame_id: triple[2].trim().to_uppercase(),
                        })
                    })
                    .collect::<Result<Vec<_>, ProtocolError>>()?;
                Ok(Message::TransferRequest { frames })
            }

            (Some(PacketType::DataTransfer), "DE") => {
                let fields: Vec<&str> = payload.split(',').collect();
                if fields.len() < 2 {
                    return Err(ProtocolError::FieldCount {
                        kind: "DE",
                        detail: format!("expected at least 2 fields, got {}", fields.len()),
                    });
                }
                Ok(Message::TransferCompletion {
                    seq_num: num_field("seq_num", fields[0])?,
                    result: num_field("result", fields[1])?,
                    statuses: fields[2..]
                        .iter()
                        .map(|s| num_field("status", s))
                        .collect::<Result<Vec<_>, _>>()?,
                })
            }

            (Some(PacketType::FileTransfer), "FS") => {
                let fields: Vec<&str> = payload.split(',').collect();
                if fields.len() != 8 {
                    return Err(ProtocolError::FieldCount {
                        kind: "FS",
                        detail: format!("expected 8 fields, got {}", fields.len()),
                    });
                }
                Ok(Message::ArchiveRequest(ArchiveRequest {
                    fits_path: fields[0].to_owned(),
                    fits_size: num_field("fits_size", fields[1])?,
                    frame_id: fields[2].to_owned(),
                    prop_id: fields[3].to_owned(),
                    dest_host: fields[4].to_owned(),
                    channel: fields[5].to_owned(),
                    index_path: fields[6].to_owned(),
                    index_size: num_field("index_size", fields[7])?,
                }))
            }

            (Some(PacketType::FileTransfer), "FE") => {
                let fields: Vec<&str> = payload.split(',').collect();
                if fields.len() != 4 {
                    return Err(ProtocolError::FieldCount {
                        kind: "FE",
                        detail: format!("expected 4 fields, got {}", fields.len()),
                    });
                }
                Ok(Message::ArchiveCompletion {
                    seq_num: num_field("seq_num", fields[0])?,
                    status1: num_field("status1", fields[1])?,
                    status2: num_field("status2", fields[2])?,
                    result: num_field("result", fields[3])?,
                })
            }

            (Some(PacketType::Status), "SD") => {
                let bytes = payload.as_bytes();
                if bytes.len() < 9 {
                    return Err(ProtocolError::TooShort {
                        expected: 9,
                        actual: bytes.len(),
                    });
                }
                let table = std::str::from_utf8(&bytes[0..8]).map_err(|_| ProtocolError::NotText)?;
                let data = std::str::from_utf8(&bytes[9..]).map_err(|_| ProtocolError::NotText)?;
                Ok(Message::StatusPush {
                    table: table.trim().to_owned(),
                    data: data.to_owned(),
                })
            }

            _ => Err(ProtocolError::UnknownKind {
                packet: packet_type.to_owned(),
                message: message_type.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ab_layout() {
        let msg = Message::Ack {
            packet: PacketType::Command,
            seq_num: 5,
            result: 0,
        };
        assert_eq!(msg.pack_payload(), "00000005,   0");

        let back = Message::unpack_payload("CT", "AB", "00000005,   0").unwrap();
        assert_eq!(back, msg);

        // AB is shared by all three transaction families.
        let back = Message::unpack_payload("DT", "AB", "00000012,  -3").unwrap();
        assert_eq!(
            back,
            Message::Ack {
                packet: PacketType::DataTransfer,
                seq_num: 12,
                result: -3,
            }
        );
    }

    #[test]
    fn test_ab_schema_errors() {
        assert!(matches!(
            Message::unpack_payload("CT", "AB", "00000005"),
            Err(ProtocolError::FieldCount { kind: "AB", .. })
        ));
        assert!(matches!(
            Message::unpack_payload("CT", "AB", "0000000x,   0"),
            Err(ProtocolError::BadNumericField { field: "seq_num", .. })
        ));
    }

    #[test]
    fn test_cd_carries_raw_command() {
        let msg = Message::Command {
            command: "EXEC TSC AG_PARTS SHUTTER=OPEN".to_owned(),
        };
        assert_eq!(msg.pack_payload(), "EXEC TSC AG_PARTS SHUTTER=OPEN");
        let back =
            Message::unpack_payload("CT", "CD", "EXEC TSC AG_PARTS SHUTTER=OPEN ").unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_en_remainder_passes_through_verbatim() {
        let msg = Message::Completion {
            seq_num: 5,
            status: 0,
            result: "OK,with,embedded,commas".to_owned(),
        };
        assert_eq!(msg.pack_payload(), "00000005,   0,OK,with,embedded,commas");

        let back =
            Message::unpack_payload("CT", "EN", "00000005,   0,OK,with,embedded,commas").unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_ds_triples() {
        let msg = Message::TransferRequest {
            frames: vec![
                FrameEntry {
                    path: "/d/a.fits".into(),
                    size: 100,
                    frame_id: "ABCA0000001".into(),
                },
                FrameEntry {
                    path: "/d/b.fits".into(),
                    size: 200,
                    frame_id: "ABCA0000002".into(),
                },
            ],
        };
        let payload = msg.pack_payload();
        assert_eq!(payload, "/d/a.fits,100,ABCA0000001,/d/b.fits,200,ABCA0000002");

        let back = Message::unpack_payload("DT", "DS", &payload).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_ds_uppercases_frame_ids() {
        let back =
            Message::unpack_payload("DT", "DS", "/d/a.fits,100,abca0000001").unwrap();
        let Message::TransferRequest { frames } = back else {
            panic!("wrong variant");
        };
        assert_eq!(frames[0].frame_id, "ABCA0000001");
    }

    #[test]
    fn test_ds_field_count_must_be_triple() {
        assert!(matches!(
            Message::unpack_payload("DT", "DS", "/d/a.fits,100"),
            Err(ProtocolError::FieldCount { kind: "DS", .. })
        ));
    }

    #[test]
    fn test_de_per_file_statuses() {
        let msg = Message::TransferCompletion {
            seq_num: 42,
            result: 0,
            statuses: vec![0, 0, 7],
        };
        assert_eq!(msg.pack_payload(), "00000042,   0,   0,   0,   7");

        let back = Message::unpack_payload("DT", "DE", "00000042,   0,   0,   0,   7").unwrap();
        assert_eq!(back, msg);

        // A DE may carry no per-file statuses at all.
        let back = Message::unpack_payload("DT", "DE", "00000042,   1").unwrap();
        assert_eq!(
            back,
            Message::TransferCompletion {
                seq_num: 42,
                result: 1,
                statuses: vec![],
            }
        );
    }

    #[test]
    fn test_fs_eight_fields() {
        let payload = "/mdata/fits/obcp13/SKYA00584047.fits,1005120,SKYA00584047,o98017,sdata01,S01,/mdata/index/SKYA00584047.index,400";
        let back = Message::unpack_payload("FT", "FS", payload).unwrap();
        let Message::ArchiveRequest(req) = back.clone() else {
            panic!("wrong variant");
        };
        assert_eq!(req.fits_path, "/mdata/fits/obcp13/SKYA00584047.fits");
        assert_eq!(req.fits_size, 1_005_120);
        assert_eq!(req.frame_id, "SKYA00584047");
        assert_eq!(req.prop_id, "o98017");
        assert_eq!(req.dest_host, "sdata01");
        assert_eq!(req.channel, "S01");
        assert_eq!(req.index_path, "/mdata/index/SKYA00584047.index");
        assert_eq!(req.index_size, 400);

        assert_eq!(back.pack_payload(), payload);

        assert!(matches!(
            Message::unpack_payload("FT", "FS", "a,1,b,c,d,e,f"),
            Err(ProtocolError::FieldCount { kind: "FS", .. })
        ));
    }

    #[test]
    fn test_fe_wire_order() {
        // Send side writes seq,result,status1,status2.
        let msg = Message::ArchiveCompletion {
            seq_num: 9,
            status1: 1,
            status2: 2,
            result: 3,
        };
        assert_eq!(msg.pack_payload(), "00000009,   3,   1,   2");

        // Receive side reads seq,status1,status2,result.
        let back = Message::unpack_payload("FT", "FE", "00000009,   0,   4,   0").unwrap();
        assert_eq!(
            back,
            Message::ArchiveCompletion {
                seq_num: 9,
                status1: 0,
                status2: 4,
                result: 0,
            }
        );
    }

    #[test]
    fn test_sd_fixed_table_slot() {
        let msg = Message::StatusPush {
            table: "OBCPD".to_owned(),
            data: "S1=0.4,S2=ON;raw blob ~!".to_owned(),
        };
        let payload = msg.pack_payload();
        assert_eq!(&payload[0..9], "OBCPD   ,");

        let back = Message::unpack_payload("ST", "SD", &payload).unwrap();
        assert_eq!(back, msg);

        assert!(matches!(
            Message::unpack_payload("ST", "SD", "short"),
            Err(ProtocolError::TooShort { expected: 9, .. })
        ));
    }

    #[test]
    fn test_unknown_kind() {
        assert!(matches!(
            Message::unpack_payload("XX", "CD", ""),
            Err(ProtocolError::UnknownKind { .. })
        ));
        assert!(matches!(
            Message::unpack_payload("ST", "AB", "00000001,   0"),
            Err(ProtocolError::UnknownKind { .. })
        ));
    }
}
