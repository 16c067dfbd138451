//! Nachrichten-Verschluesselung
//!
//! Verschluesselt Textnachrichten mit dem aktuellen Raum-Schluessel.
//!
//! ## Format
//! ```text
//! nonce:      12 Bytes, pro Aufruf frisch aus dem System-CSPRNG
//! ciphertext: AES-256-GCM(plaintext) || auth_tag(16)
//! ```
//!
//! Textnachrichten haben keine AAD. Dateien binden Inhalt und Metadaten ueber
//! AAD aneinander (siehe `file`).

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce as AesNonce,
};

use crate::e2e::room_key::RoomKey;
use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptedMessage, Nonce};

/// Verschluesselt eine Textnachricht mit dem Raum-Schluessel
///
/// Zwei Aufrufe mit gleichem Text liefern verschiedene Ciphertexte.
pub fn encrypt_message(plaintext: &str, key: &RoomKey) -> CryptoResult<EncryptedMessage> {
    let (nonce, ciphertext) = seal(key, plaintext.as_bytes(), &[])?;
    Ok(EncryptedMessage { ciphertext, nonce })
}

/// AES-256-GCM mit frischer Zufalls-Nonce
pub(crate) fn seal(key: &RoomKey, plaintext: &[u8], aad: &[u8]) -> CryptoResult<(Nonce, Vec<u8>)> {
    let nonce = Nonce::random()?;
    let ciphertext = seal_with_nonce(key, &nonce, plaintext, aad)?;
    Ok((nonce, ciphertext))
}

fn seal_with_nonce(
    key: &RoomKey,
    nonce: &Nonce,
    plaintext: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .encrypt(
            AesNonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
