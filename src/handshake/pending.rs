//! Correlation table for in-flight handshakes.
//!
//! Replies are matched to their request by the sequence number embedded in
//! the reply payload, never by arrival order. Each pending call holds two
//! one-shot slots: one for the acknowledgment, one for the terminal
//! completion.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::wire::Message;

/// Which completion message closes a pending handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompletionKind {
    /// CT transaction, closed by EN.
    Command,
    /// DT transaction, closed by DE.
    Transfer,
    /// FT transaction, closed by FE.
    Archive,
}

impl CompletionKind {
    pub(crate) fn wire_code(self) -> &'static str {
        match self {
            CompletionKind::Command => "EN",
            CompletionKind::Transfer => "DE",
            CompletionKind::Archive => "FE",
        }
    }
}

/// Terminal payload delivered to the waiting caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Completion {
    Command {
        status: i32,
        result: String,
    },
    Transfer {
        result: i32,
        statuses: Vec<i32>,
    },
    Archive {
        status1: i32,
        status2: i32,
        result: i32,
    },
}

impl Completion {
    pub(crate) fn kind(&self) -> CompletionKind {
        match self {
            Completion::Command { .. } => CompletionKind::Command,
            Completion::Transfer { .. } => CompletionKind::Transfer,
            Completion::Archive { .. } => CompletionKind::Archive,
        }
    }

    /// Extract the referenced sequence number and completion payload from a
    /// completion message, or `None` for any other message kind.
    pub(crate) fn from_message(message: &Message) -> Option<(u32, Completion)> {
        match message {
            Message::Completion {
                seq_num,
                status,
                result,
            } => Some((
                *seq_num,
                Completion::Command {
                    status: *status,
                    result: result.clone(),
                },
            )),
            Message::TransferCompletion {
                seq_num,
                result,
                statuses,
            } => Some((
                *seq_num,
                Completion::Transfer {
                    result: *result,
                    statuses: statuses.clone(),
                },
            )),
            Message::ArchiveCompletion {
                seq_num,
                status1,
                status2,
                result,
            } => Some((
                *seq_num,
                Completion::Archive {
                    status1: *status1,
                    status2: *status2,
                    result: *result,
                },
            )),
            _ => None,
        }
    }
}

struct PendingCall {
    sent_at: Instant,
    expected: CompletionKind,
    ack_tx: Option<oneshot::Sender<i32>>,
    done_tx: Option<oneshot::Sender<Completion>>,
}

/// All in-flight handshakes of one orchestrator, keyed by sequence number.
#[derive(Default)]
pub(crate) struct PendingTable {
    calls: Mutex<HashMap<u32, PendingCall>>,
}

impl PendingTable {
    /// Open a pending entry and hand back its two reply slots.
    pub(crate) fn open(
        &self,
        seq_num: u32,
        expected: CompletionKind,
    ) -> (oneshot::Receiver<i32>, oneshot::Receiver<Completion>) {
        let (ack_tx, ack_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        self.lock().insert(
            seq_num,
            PendingCall {
                sent_at: Instant::now(),
                expected,
                ack_tx: Some(ack_tx),
                done_tx: Some(done_tx),
            },
        );
        (ack_rx, done_rx)
    }

    /// Deliver an acknowledgment result to the matching pending call.
    ///
    /// Returns `false` for an unknown sequence number or a repeated ack.
    pub(crate) fn resolve_ack(&self, seq_num: u32, result: i32) -> bool {
        let mut calls = self.lock();
        match calls.get_mut(&seq_num).and_then(|call| call.ack_tx.take()) {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    /// Deliver a completion to the matching pending call and close it.
    ///
    /// Returns `false` for an unknown sequence number; a completion of the
    /// wrong kind leaves the entry open and is reported as unmatched.
    pub(crate) fn resolve_completion(&self, seq_num: u32, completion: Completion) -> bool {
        let mut calls = self.lock();
        let Some(call) = calls.get(&seq_num) else {
            return false;
        };
        if call.expected != completion.kind() {
            warn!(
                seq_num,
                expected = call.expected.wire_code(),
                got = completion.kind().wire_code(),
                "completion kind mismatch for pending call"
            );
            return false;
        }
        let Some(call) = calls.remove(&seq_num) else {
            return false;
        };
        debug!(
            seq_num,
            elapsed_ms = call.sent_at.elapsed().as_millis() as u64,
            "pending call completed"
        );
        match call.done_tx {
            Some(tx) => tx.send(completion).is_ok(),
            None => false,
        }
    }

    /// Drop a pending entry, if still present.
    pub(crate) fn close(&self, seq_num: u32) {
        self.lock().remove(&seq_num);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u32, PendingCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ack_and_completion_reach_their_slots() {
        let table = PendingTable::default();
        let (ack_rx, done_rx) = table.open(7, CompletionKind::Command);

        assert!(table.resolve_ack(7, 0));
        assert_eq!(ack_rx.await.unwrap(), 0);

        let done = Completion::Command {
            status: 0,
            result: "OK".to_owned(),
        };
        assert!(table.resolve_completion(7, done.clone()));
        assert_eq!(done_rx.await.unwrap(), done);
    }

    #[tokio::test]
    async fn test_unknown_seq_num_misses() {
        let table = PendingTable::default();
        assert!(!table.resolve_ack(9, 0));
        assert!(!table.resolve_completion(
            9,
            Completion::Command {
                status: 0,
                result: String::new(),
            }
        ));
    }

    #[tokio::test]
    async fn test_completion_closes_the_entry() {
        let table = PendingTable::default();
        let (_ack_rx, _done_rx) = table.open(7, CompletionKind::Command);
        let done = Completion::Command {
            status: 0,
            result: String::new(),
        };
        assert!(table.resolve_completion(7, done.clone()));
        // A duplicate of the same completion finds nothing to resolve.
        assert!(!table.resolve_completion(7, done));
    }

    #[tokio::test]
    async fn test_wrong_completion_kind_leaves_entry_open() {
        let table = PendingTable::default();
        let (_ack_rx, done_rx) = table.open(7, CompletionKind::Transfer);

        assert!(!table.resolve_completion(
            7,
            Completion::Command {
                status: 0,
                result: String::new(),
            }
        ));

        let done = Completion::Transfer {
            result: 0,
            statuses: vec![0],
        };
        assert!(table.resolve_completion(7, done.clone()));
        assert_eq!(done_rx.await.unwrap(), done);
    }

    #[tokio::test]
    async fn test_repeated_ack_misses() {
        let table = PendingTable::default();
        let (ack_rx, _done_rx) = table.open(7, CompletionKind::Command);
        assert!(table.resolve_ack(7, 0));
        assert!(!table.resolve_ack(7, 0));
        assert_eq!(ack_rx.await.unwrap(), 0);
    }
}
