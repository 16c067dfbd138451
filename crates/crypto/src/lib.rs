//! # sealroom-crypto
//!
//! Client-seitige Ende-zu-Ende Verschluesselung fuer Sealroom.
//! Der Server sieht nie Klartext, Dateiinhalte oder Raum-Schluessel.
//!
//! ## Module
//! - `identity` - P-256 Sitzungs-Identitaet (Keyring)
//! - `fingerprint` - SHA-256 Fingerprints fuer den manuellen Vergleich
//! - `e2e` - Raum-Schluessel, Nachrichten- und Datei-Verschluesselung
//! - `session` - Expliziter Sitzungs-Kontext
//! - `types` - Gemeinsame Typen (MemberPublicKey, Nonce, Envelopes)
//! - `wire` - Konvertierung in die Draht-Envelopes
//! - `error` - Fehlertypen

pub mod e2e;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod session;
pub mod types;
pub mod wire;

// Bequeme Re-Exports
pub use error::{CryptoError, CryptoResult};
pub use fingerprint::{fingerprint, fingerprint_of, Fingerprint};
pub use identity::IdentityKeyring;
pub use session::{CryptoSession, DisplayText, SessionConfig, UNDECRYPTABLE_PLACEHOLDER};
pub use types::{
    DecryptedFile, EncryptedFile, EncryptedMessage, FileMetadata, MemberPublicKey, Nonce,
    SealedFileMetadata,
};

pub use e2e::{
    decrypt_file, decrypt_file_envelope, decrypt_message, decrypt_message_envelope,
    derive_room_key, derive_room_key_from_base64, derive_room_key_from_bytes, encrypt_file,
    encrypt_message, hkdf_derive, RoomKey, RoomKeyEpoch, RoomKeyManager,
};
