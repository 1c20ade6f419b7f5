//! Tessera Core - fundamental types, errors, state machines and
//! configuration shared by every Tessera crate.

pub mod canonical;
pub mod config;
pub mod error;
pub mod logging;
pub mod opaque;
pub mod protocol_state;
pub mod types;

pub use canonical::canonical_json;
pub use config::{IdentityConfig, LogFormat, LoggingConfig, PresentationConfig, TesseraConfig};
pub use error::CoreError;
pub use protocol_state::{
    AttestationEvent, AttestationState, PresentationEvent, PresentationState,
    ProtocolStateMachine,
};
pub use types::{now_millis, Address, CTypeHash, DelegationId, Digest, Permissions};
