//! sealroom-protocol – Draht-Typen an der Grenze zur Transportschicht
//!
//! Dieses Crate definiert, wie Ciphertexte, Nonces und oeffentliche
//! Schluessel zwischen Client und Server transportiert werden. Es enthaelt
//! keine Kryptografie; alle Binaerfelder sind Base64-Text.

pub mod envelope;
pub mod error;
pub mod message;
pub mod signaling;

pub use envelope::{FileEnvelope, MessageEnvelope};
pub use error::{ProtocolError, ProtocolResult};
pub use message::RoomMessage;
pub use signaling::SignalingEvent;
