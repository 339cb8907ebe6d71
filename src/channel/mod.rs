//! A channel binds one service's program-number pair to a transport.
//!
//! A SOSS service key names four program numbers; which two this process uses
//! depends on its [`Role`]. The channel stamps the caller's identity into
//! every outbound header, allocates nothing itself, and leaves transaction
//! state to the handshake layer above it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::constants::PROTOCOL_VERSION;
use crate::core::{ProgramNumbers, SequenceNumberAllocator, SossError};
use crate::transport::{RpcTransport, TransportError};
use crate::wire::{decode_packet, timestamp, Header, Message};

/// Transport-level reply for a packet that was decoded and handed off.
pub const REPLY_ACCEPTED: &[u8] = b"1";
/// Transport-level reply for a packet the receiver could not take.
pub const REPLY_REJECTED: &[u8] = b"0";

/// Which side of a service pair this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The side that opens transactions (the original rpc client).
    Initiator,
    /// The side that answers them (the original rpc server).
    Responder,
}

impl Role {
    /// Split a service's four program numbers into this role's
    /// `(send, receive)` pair. One-way services leave one side unbound.
    fn split(self, numbers: &ProgramNumbers) -> (Option<u32>, Option<u32>) {
        match self {
            Role::Initiator => (Some(numbers.client_send), numbers.client_receive),
            Role::Responder => (numbers.server_send, Some(numbers.server_receive)),
        }
    }
}

/// Identity stamped into every outbound header.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Sender host id (8-char wire slot).
    pub sender: String,
    /// Receiver host id (8-char wire slot).
    pub receiver: String,
    /// Sending process code.
    pub process_code: u32,
    /// User id; blank unless the deployment uses it.
    pub uid: String,
    /// Group id; blank unless the deployment uses it.
    pub gid: String,
}

impl ChannelConfig {
    /// Identity with the given endpoints and blank uid/gid.
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            process_code: 0,
            uid: String::new(),
            gid: String::new(),
        }
    }

    /// Set the sending process code.
    pub fn with_process_code(mut self, process_code: u32) -> Self {
        self.process_code = process_code;
        self
    }

    /// Set the uid and gid header fields.
    pub fn with_credentials(mut self, uid: impl Into<String>, gid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self.gid = gid.into();
        self
    }
}

/// One bound direction pair of a SOSS service over a transport.
pub struct Channel<T> {
    transport: T,
    config: ChannelConfig,
    send_program: Option<u32>,
    receive_program: Option<u32>,
    seq: Arc<SequenceNumberAllocator>,
}

impl<T: RpcTransport> Channel<T> {
    /// Bind `role`'s side of a service's program numbers.
    ///
    /// The allocator is shared so that every channel a process opens draws
    /// from one sequence-number stream.
    pub fn bind(
        transport: T,
        config: ChannelConfig,
        role: Role,
        numbers: &ProgramNumbers,
        seq: Arc<SequenceNumberAllocator>,
    ) -> Self {
        let (send_program, receive_program) = role.split(numbers);
        Self {
            transport,
            config,
            send_program,
            receive_program,
            seq,
        }
    }

    /// The sequence-number allocator this channel draws from.
    pub fn seq(&self) -> &Arc<SequenceNumberAllocator> {
        &self.seq
    }

    /// Program number outbound packets go to, if this side sends.
    pub fn send_program(&self) -> Option<u32> {
        self.send_program
    }

    /// Program number inbound packets arrive on, if this side receives.
    pub fn receive_program(&self) -> Option<u32> {
        self.receive_program
    }

    /// Stamp a full header for `message` under `seq_num`.
    fn header_for(&self, message: &Message, seq_num: u32) -> Header {
        Header {
            // Both lengths are derived during pack.
            total_length: 0,
            time_sent: timestamp::now(),
            protocol_version: PROTOCOL_VERSION.to_owned(),
            seq_num,
            sender: self.config.sender.clone(),
            process_code: self.config.process_code,
            uid: self.config.uid.clone(),
            gid: self.config.gid.clone(),
            receiver: self.config.receiver.clone(),
            packet_type: message.packet_type().code().to_owned(),
            message_type: message.message_type().to_owned(),
            payload_length: 0,
        }
    }

    /// Send one message under an existing sequence number and wait for the
    /// transport-level reply.
    ///
    /// This is a single blocking exchange; protocol-level replies (AB, EN,
    /// DE, FE) arrive as separate inbound packets on the peer's own channel.
    pub async fn call(
        &self,
        message: &Message,
        seq_num: u32,
        timeout: Duration,
    ) -> Result<Vec<u8>, SossError> {
        let program = self
            .send_program
            .ok_or(TransportError::Unbound { direction: "send" })?;
        let packet = self.header_for(message, seq_num).pack(&message.pack_payload())?;
        debug!(
            program = format_args!("{program:#010x}"),
            seq_num,
            kind = message.message_type(),
            "sending packet"
        );
        let reply = self.transport.call(program, packet, timeout).await?;
        Ok(reply)
    }

    /// Register `handler` for inbound packets on the receive program.
    ///
    /// The handler runs once per packet on a transport-managed task and
    /// returns whether it took the message; packets that fail to decode are
    /// logged and refused without reaching it.
    pub fn serve<F>(&self, handler: F) -> Result<(), TransportError>
    where
        F: Fn(Header, Message) -> bool + Send + Sync + 'static,
    {
        let program = self
            .receive_program
            .ok_or(TransportError::Unbound { direction: "receive" })?;
        self.transport.register_handler(program, move |packet| {
            match decode_packet(&packet) {
                Ok((header, message)) => {
                    if handler(header, message) {
                        REPLY_ACCEPTED.to_vec()
                    } else {
                        REPLY_REJECTED.to_vec()
                    }
                }
                Err(err) => {
                    warn!(program = format_args!("{program:#010x}"), %err, "refusing undecodable packet");
                    REPLY_REJECTED.to_vec()
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::core::ProgramNumberRegistry;
    use crate::transport::MemoryTransport;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn command_pair(bus: &MemoryTransport) -> (Channel<MemoryTransport>, Channel<MemoryTransport>) {
        let registry = ProgramNumberRegistry::builtin();
        let numbers = registry.lookup("OBStoOBCP1(cmd)").unwrap();
        let seq = Arc::new(SequenceNumberAllocator::default());

        let initiator = Channel::bind(
            bus.clone(),
            ChannelConfig::new("OBS", "OBCP1").with_process_code(901),
            Role::Initiator,
            &numbers,
            Arc::clone(&seq),
        );
        let responder = Channel::bind(
            bus.clone(),
            ChannelConfig::new("OBCP1", "OBS"),
            Role::Responder,
            &numbers,
            seq,
        );
        (initiator, responder)
    }

    #[tokio::test]
    async fn test_call_delivers_decoded_message() {
        let bus = MemoryTransport::new();
        let (initiator, responder) = command_pair(&bus);

        let seen: Arc<Mutex<Vec<(Header, Message)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        responder
            .serve(move |header, message| {
                sink.lock().unwrap().push((header, message));
                true
            })
            .unwrap();

        let msg = Message::Command {
            command: "EXEC OBS SETUP".to_owned(),
        };
        let seq_num = initiator.seq().bump();
        let reply = initiator.call(&msg, seq_num, TIMEOUT).await.unwrap();
        assert_eq!(reply, REPLY_ACCEPTED);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (header, message) = &seen[0];
        assert_eq!(header.sender, "OBS");
        assert_eq!(header.receiver, "OBCP1");
        assert_eq!(header.process_code, 901);
        assert_eq!(header.seq_num, seq_num);
        assert_eq!(header.protocol_version, PROTOCOL_VERSION);
        assert_eq!(message, &msg);
    }

    #[tokio::test]
    async fn test_handler_refusal_is_visible_to_the_caller() {
        let bus = MemoryTransport::new();
        let (initiator, responder) = command_pair(&bus);
        responder.serve(|_, _| false).unwrap();

        let msg = Message::Command {
            command: "EXEC OBS SETUP".to_owned(),
        };
        let reply = initiator.call(&msg, 1, TIMEOUT).await.unwrap();
        assert_eq!(reply, REPLY_REJECTED);
    }

    #[tokio::test]
    async fn test_undecodable_packet_is_refused_before_the_handler() {
        let bus = MemoryTransport::new();
        let (initiator, responder) = command_pair(&bus);
        responder.serve(|_, _| panic!("handler must not see garbage")).unwrap();

        let program = initiator.send_program().unwrap();
        let reply = bus
            .call(program, b"not a soss packet".to_vec(), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(reply, REPLY_REJECTED);
    }

    #[tokio::test]
    async fn test_one_way_service_has_no_responder_send() {
        let bus = MemoryTransport::new();
        let registry = ProgramNumberRegistry::builtin();
        let numbers = registry.lookup("TSCS3->").unwrap();

        let responder = Channel::bind(
            bus,
            ChannelConfig::new("OBS", "TSC"),
            Role::Responder,
            &numbers,
            Arc::new(SequenceNumberAllocator::default()),
        );
        assert_eq!(responder.send_program(), None);

        let msg = Message::StatusPush {
            table: "TSCS".to_owned(),
            data: "blob".to_owned(),
        };
        let err = responder.call(&msg, 1, TIMEOUT).await.unwrap_err();
        assert!(matches!(
            err,
            SossError::Transport(TransportError::Unbound { direction: "send" })
        ));
    }
}
