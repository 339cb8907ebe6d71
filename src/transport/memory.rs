//! In-process transport: a program-number bus inside one process.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::core::ServiceDirectory;

use super::{RpcTransport, TransportError};

type Handler = Arc<dyn Fn(Vec<u8>) -> Vec<u8> + Send + Sync>;

/// An in-process [`RpcTransport`]: packets are routed to handlers registered
/// on the same bus, by program number.
///
/// Clones share the same handler table, so one `MemoryTransport` can be handed
/// to both ends of a conversation. Handlers run on the blocking thread pool;
/// calls still observe their timeout.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    handlers: Arc<Mutex<HashMap<u32, Handler>>>,
}

impl MemoryTransport {
    /// An empty bus with no bound programs.
    pub fn new() -> Self {
        Self::default()
    }

    fn handler_for(&self, program: u32) -> Option<Handler> {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&program)
            .cloned()
    }
}

impl RpcTransport for MemoryTransport {
    async fn call(
        &self,
        program: u32,
        packet: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let handler = self
            .handler_for(program)
            .ok_or(TransportError::NoSuchProgram(program))?;

        let reply = tokio::task::spawn_blocking(move || handler(packet));
        match tokio::time::timeout(timeout, reply).await {
            Err(_) => Err(TransportError::Timeout { program, timeout }),
            Ok(Err(_)) => Err(TransportError::PeerGone(program)),
            Ok(Ok(reply)) => Ok(reply),
        }
    }

    fn register_handler<F>(&self, program: u32, handler: F)
    where
        F: Fn(Vec<u8>) -> Vec<u8> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(program, Arc::new(handler));
    }
}

impl ServiceDirectory for MemoryTransport {
    fn unset(&self, program: u32) -> io::Result<bool> {
        Ok(self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&program)
            .is_some())
    }
}
