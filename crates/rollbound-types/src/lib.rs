//! Primitive types, protocol constants, errors, and the canonical codec
//! shared by every crate in the `rollbound` workspace.

pub mod codec;
pub mod constants;
pub mod error;
pub mod primitives;

pub use constants::ProtocolConstants;
pub use error::{ArithError, ChainError, ErrorCode, OperationError, Severity, StateError};
pub use primitives::{
    BlockHash, Cycle, Digest32, Level, NonceHash, OperationHash, PublicKeyHash, Roll, Tez,
};
