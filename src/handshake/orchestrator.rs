//! The initiator-side handshake state machine.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::channel::{Channel, REPLY_ACCEPTED};
use crate::core::constants::{
    DEFAULT_ACK_RETRIES, DEFAULT_ACK_TIMEOUT, DEFAULT_CALL_TIMEOUT, DEFAULT_COMPLETION_TIMEOUT,
};
use crate::core::ProtocolError;
use crate::transport::{RpcTransport, TransportError};
use crate::wire::{ArchiveRequest, FrameEntry, Header, Message};

use super::pending::{Completion, CompletionKind, PendingTable};
use super::HandshakeError;

/// Timing and retry policy for one orchestrator.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Transport-level timeout of a single packet exchange.
    pub call_timeout: Duration,
    /// How long to wait for an AB before re-sending the request.
    pub ack_timeout: Duration,
    /// How long to wait for the terminal completion after the AB.
    pub completion_timeout: Duration,
    /// Re-sends of the request while waiting for the AB.
    pub ack_retries: u32,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            completion_timeout: DEFAULT_COMPLETION_TIMEOUT,
            ack_retries: DEFAULT_ACK_RETRIES,
        }
    }
}

impl HandshakeConfig {
    /// Set the single-exchange transport timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the acknowledgment window.
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Set the completion window.
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = timeout;
        self
    }

    /// Set how many times the request is re-sent while unacknowledged.
    pub fn with_ack_retries(mut self, retries: u32) -> Self {
        self.ack_retries = retries;
        self
    }
}

/// Outcome of a completed CT command transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// Numeric completion status from the EN.
    pub status: i32,
    /// Application payload from the EN, verbatim.
    pub result: String,
}

/// Outcome of a completed DT file-transfer transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReply {
    /// Overall result from the DE.
    pub result: i32,
    /// One status per requested file, in request order.
    pub statuses: Vec<i32>,
}

/// Outcome of a completed FT archive-transfer transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReply {
    /// Outcome of the FITS file step.
    pub status1: i32,
    /// Outcome of the index file step.
    pub status2: i32,
    /// Overall result.
    pub result: i32,
}

/// Runs the initiator side of SOSS transactions over one channel.
///
/// Replies arrive as separate inbound packets; [`start`] wires the channel's
/// receive program into the pending-call table. Multiple transactions may be
/// in flight at once, each correlated by its own sequence number.
///
/// [`start`]: HandshakeOrchestrator::start
pub struct HandshakeOrchestrator<T> {
    service: String,
    channel: Channel<T>,
    config: HandshakeConfig,
    pending: Arc<PendingTable>,
}

impl<T: RpcTransport> HandshakeOrchestrator<T> {
    /// Wrap a bound channel. `service` is the service key, used in logs only.
    pub fn new(service: impl Into<String>, channel: Channel<T>, config: HandshakeConfig) -> Self {
        Self {
            service: service.into(),
            channel,
            config,
            pending: Arc::new(PendingTable::default()),
        }
    }

    /// The underlying channel.
    pub fn channel(&self) -> &Channel<T> {
        &self.channel
    }

    /// Start receiving replies; inbound requests are refused.
    pub fn start(&self) -> Result<(), TransportError> {
        let service = self.service.clone();
        self.start_with_inbound(move |header, _| {
            warn!(
                %service,
                seq_num = header.seq_num,
                kind = %header.message_type,
                "refusing inbound request: no handler installed"
            );
            false
        })
    }

    /// Start receiving replies, forwarding inbound requests (CD, DS, FS, SD)
    /// to `inbound`, which reports whether it took the message.
    ///
    /// This is how the peer role is served: install a handler and answer with
    /// AB and completion packets on your own channel.
    pub fn start_with_inbound<F>(&self, inbound: F) -> Result<(), TransportError>
    where
        F: Fn(Header, Message) -> bool + Send + Sync + 'static,
    {
        let service = self.service.clone();
        let pending = Arc::clone(&self.pending);
        self.channel.serve(move |header, message| {
            if let Message::Ack { seq_num, result, .. } = &message {
                let matched = pending.resolve_ack(*seq_num, *result);
                if !matched {
                    warn!(%service, seq_num, "discarding unmatched ack");
                }
                return matched;
            }
            match Completion::from_message(&message) {
                Some((seq_num, completion)) => {
                    let matched = pending.resolve_completion(seq_num, completion);
                    if !matched {
                        warn!(
                            %service,
                            seq_num,
                            kind = %header.message_type,
                            "discarding unmatched completion"
                        );
                    }
                    matched
                }
                None => inbound(header, message),
            }
        })
    }

    /// Issue a CT command and wait for its completion.
    pub async fn command(&self, command: impl Into<String>) -> Result<CommandReply, HandshakeError> {
        let message = Message::Command {
            command: command.into(),
        };
        match self.transact(message, CompletionKind::Command).await? {
            Completion::Command { status, result } => Ok(CommandReply { status, result }),
            _ => unreachable!("pending table enforces the completion kind"),
        }
    }

    /// Issue a DT file-transfer request and wait for its completion.
    ///
    /// The DE's per-file status list must be the same length as `frames`.
    pub async fn transfer(&self, frames: Vec<FrameEntry>) -> Result<TransferReply, HandshakeError> {
        let requested = frames.len();
        let message = Message::TransferRequest { frames };
        match self.transact(message, CompletionKind::Transfer).await? {
            Completion::Transfer { result, statuses } => {
                if statuses.len() != requested {
                    return Err(ProtocolError::StatusListMismatch {
                        expected: requested,
                        actual: statuses.len(),
                    }
                    .into());
                }
                Ok(TransferReply { result, statuses })
            }
            _ => unreachable!("pending table enforces the completion kind"),
        }
    }

    /// Issue an FT archive-transfer request and wait for its completion.
    pub async fn archive(&self, request: ArchiveRequest) -> Result<ArchiveReply, HandshakeError> {
        let message = Message::ArchiveRequest(request);
        match self.transact(message, CompletionKind::Archive).await? {
            Completion::Archive {
                status1,
                status2,
                result,
            } => Ok(ArchiveReply {
                status1,
                status2,
                result,
            }),
            _ => unreachable!("pending table enforces the completion kind"),
        }
    }

    /// Push one status record. Send and forget: no acknowledgment, no
    /// completion, no pending state.
    pub async fn push_status(
        &self,
        table: impl Into<String>,
        data: impl Into<String>,
    ) -> Result<(), HandshakeError> {
        let message = Message::StatusPush {
            table: table.into(),
            data: data.into(),
        };
        let seq_num = self.channel.seq().bump();
        let reply = self
            .channel
            .call(&message, seq_num, self.config.call_timeout)
            .await?;
        if reply != REPLY_ACCEPTED {
            warn!(service = %self.service, seq_num, "status push refused by peer");
        }
        Ok(())
    }

    /// Run one request through the full request/ack/completion handshake.
    async fn transact(
        &self,
        message: Message,
        expected: CompletionKind,
    ) -> Result<Completion, HandshakeError> {
        let seq_num = self.channel.seq().bump();
        let kind = message.message_type();
        let (mut ack_rx, done_rx) = self.pending.open(seq_num, expected);
        debug!(service = %self.service, seq_num, kind, "handshake opened, awaiting ack");

        // The request may be re-sent while unacknowledged; once acknowledged
        // it must not be, the peer may already be executing it.
        let attempts = self.config.ack_retries + 1;
        let mut ack = None;
        for attempt in 1..=attempts {
            match self
                .channel
                .call(&message, seq_num, self.config.call_timeout)
                .await
            {
                Ok(reply) if reply == REPLY_ACCEPTED => {}
                Ok(_) => {
                    warn!(service = %self.service, seq_num, kind, attempt, "delivery refused");
                    if attempt == attempts {
                        self.pending.close(seq_num);
                        return Err(HandshakeError::Refused);
                    }
                    continue;
                }
                Err(err) => {
                    warn!(service = %self.service, seq_num, kind, attempt, %err, "send failed");
                    if attempt == attempts {
                        self.pending.close(seq_num);
                        return Err(err.into());
                    }
                    continue;
                }
            }

            match tokio::time::timeout(self.config.ack_timeout, &mut ack_rx).await {
                Ok(Ok(result)) => {
                    ack = Some(result);
                    break;
                }
                Ok(Err(_)) => {
                    self.pending.close(seq_num);
                    return Err(HandshakeError::Canceled);
                }
                Err(_) => {
                    warn!(service = %self.service, seq_num, kind, attempt, "no ack, re-sending");
                }
            }
        }

        let Some(ack_result) = ack else {
            self.pending.close(seq_num);
            info!(service = %self.service, seq_num, kind, "handshake failed: unacknowledged");
            return Err(HandshakeError::AckTimeout { attempts });
        };

        if ack_result != 0 {
            self.pending.close(seq_num);
            info!(
                service = %self.service,
                seq_num,
                kind,
                result = ack_result,
                "handshake failed: rejected by peer"
            );
            return Err(HandshakeError::Rejected { result: ack_result });
        }

        debug!(service = %self.service, seq_num, kind, "acknowledged, awaiting completion");
        match tokio::time::timeout(self.config.completion_timeout, done_rx).await {
            Ok(Ok(completion)) => {
                debug!(service = %self.service, seq_num, kind, "handshake done");
                Ok(completion)
            }
            Ok(Err(_)) => {
                self.pending.close(seq_num);
                Err(HandshakeError::Canceled)
            }
            Err(_) => {
                self.pending.close(seq_num);
                info!(service = %self.service, seq_num, kind, "handshake failed: no completion");
                Err(HandshakeError::CompletionTimeout {
                    timeout: self.config.completion_timeout,
                })
            }
        }
    }
}
