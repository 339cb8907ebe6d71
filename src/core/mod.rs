//! Core types for SOSS RPC: constants, errors, the program-number registry,
//! and sequence-number allocation (always included).

pub mod constants;
mod error;
mod registry;
mod seqnum;

pub use error::{ProtocolError, SossError, UnknownServiceError};
pub use registry::{ProgramNumberRegistry, ProgramNumbers, ServiceDirectory};
pub use seqnum::SequenceNumberAllocator;
