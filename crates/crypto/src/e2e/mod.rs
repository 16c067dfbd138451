//! E2E Verschluesselung (End-to-End)
//!
//! Client <-> Client Verschluesselung. Der Server sieht nur Ciphertexte,
//! Nonces und oeffentliche Schluessel.
//!
//! ## Ablauf
//! 1. Jede Sitzung hat einen `IdentityKeyring` (P-256)
//! 2. Der oeffentliche Schluessel geht ueber das Signaling an den Raum
//! 3. Bei jeder Mitgliedschaftsaenderung leitet jedes Mitglied lokal den
//!    Raum-Schluessel aus Raum-ID und allen oeffentlichen Schluesseln ab
//! 4. Text und Dateien werden mit dem Raum-Schluessel (AES-256-GCM)
//!    verschluesselt
//! 5. Bei Join/Leave: neue Epoch, alte Schluessel werden verworfen

pub mod decrypt;
pub mod encrypt;
pub mod file;
pub mod key_manager;
pub mod room_key;

pub use decrypt::{decrypt_message, decrypt_message_envelope};
pub use encrypt::encrypt_message;
pub use file::{decrypt_file, decrypt_file_envelope, encrypt_file};
pub use key_manager::{RoomKeyEpoch, RoomKeyManager};
pub use room_key::{
    derive_room_key, derive_room_key_from_base64, derive_room_key_from_bytes, hkdf_derive,
    RoomKey,
};
