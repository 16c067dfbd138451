//! Nachrichten-Entschluesselung
//!
//! Prueft den Auth-Tag, bevor Klartext zurueckgegeben wird. Jeder Fehler
//! (falscher Schluessel, manipulierte Daten, falsche Nonce-Laenge, kein
//! gueltiges UTF-8) wird als `DecryptionFailure` zurueckgegeben. Ein erneuter
//! Versuch mit denselben Eingaben kann nie gelingen.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce as AesNonce,
};

use crate::e2e::room_key::RoomKey;
use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptedMessage, Nonce};

/// Entschluesselt eine Textnachricht aus rohen Ciphertext- und Nonce-Bytes
pub fn decrypt_message(ciphertext: &[u8], nonce: &[u8], key: &RoomKey) -> CryptoResult<String> {
    let nonce = Nonce::from_slice(nonce)?;
    let plaintext = open(key, &nonce, ciphertext, &[])?;
    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::DecryptionFailure("Klartext ist kein UTF-8".to_string()))
}

/// Entschluesselt eine [`EncryptedMessage`]
pub fn decrypt_message_envelope(message: &EncryptedMessage, key: &RoomKey) -> CryptoResult<String> {
    decrypt_message(&message.ciphertext, message.nonce.as_bytes(), key)
}

/// AES-256-GCM Entschluesselung inkl. Tag-Pruefung
pub(crate) fn open(
    key: &RoomKey,
    nonce: &Nonce,
    ciphertext: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(
            AesNonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::DecryptionFailure("Auth-Tag ungueltig".to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::e2e::encrypt::{encrypt_message, seal};
    use crate::e2e::room_key::{derive_room_key, test_key};

    #[test]
    fn roundtrip() {
        let key = test_key("AB12C9");
        let plaintext = "Hallo Raum, grüße aus dem Tresor 🔐";

        let msg = encrypt_message(plaintext, &key).unwrap();
        let decrypted = decrypt_message(&msg.ciphertext, msg.nonce.as_bytes(), &key).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn beide_ciphertexte_entschluesselbar() {
        let key = test_key("AB12C9");
        let a = encrypt_message("hello", &key).unwrap();
        let b = encrypt_message("hello", &key).unwrap();
        assert_eq!(decrypt_message_envelope(&a, &key).unwrap(), "hello");
        assert_eq!(decrypt_message_envelope(&b, &key).unwrap(), "hello");
    }

    #[test]
    fn falscher_schluessel_schlaegt_fehl() {
        let key1 = test_key("AB12C9");
        let key2 = test_key("AB12C9");

        let msg = encrypt_message("Geheime Daten", &key1).unwrap();
        let result = decrypt_message_envelope(&msg, &key2);
        assert!(matches!(result, Err(CryptoError::DecryptionFailure(_))));
    }

    #[test]
    fn jedes_gekippte_ciphertext_bit_wird_erkannt() {
        let key = test_key("AB12C9");
        let msg = encrypt_message("Original", &key).unwrap();

        for byte in 0..msg.ciphertext.len() {
            for bit in 0..8 {
                let mut manipuliert = msg.clone();
                manipuliert.ciphertext[byte] ^= 1 << bit;
                let result = decrypt_message_envelope(&manipuliert, &key);
                assert!(
                    matches!(result, Err(CryptoError::DecryptionFailure(_))),
                    "Bit {bit} in Byte {byte} nicht erkannt"
                );
            }
        }
    }

    #[test]
    fn jedes_gekippte_nonce_bit_wird_erkannt() {
        let key = test_key("AB12C9");
        let msg = encrypt_message("Original", &key).unwrap();

        for byte in 0..12 {
            for bit in 0..8 {
                let mut manipuliert = msg.clone();
                manipuliert.nonce.bytes[byte] ^= 1 << bit;
                assert!(decrypt_message_envelope(&manipuliert, &key).is_err());
            }
        }
    }

    #[test]
    fn abgeschnittener_ciphertext() {
        let key = test_key("AB12C9");
        let msg = encrypt_message("Original", &key).unwrap();
        let result = decrypt_message(&msg.ciphertext[..10], msg.nonce.as_bytes(), &key);
        assert!(result.is_err());
        let result = decrypt_message(&[], msg.nonce.as_bytes(), &key);
        assert!(result.is_err());
    }

    #[test]
    fn falsche_nonce_laenge() {
        let key = test_key("AB12C9");
        let msg = encrypt_message("Original", &key).unwrap();
        let result = decrypt_message(&msg.ciphertext, &[0u8; 16], &key);
        assert!(matches!(result, Err(CryptoError::DecryptionFailure(_))));
    }

    #[test]
    fn ungueltiges_utf8() {
        let key = test_key("AB12C9");
        let (nonce, ciphertext) = seal(&key, &[0xFF, 0xFE, 0xFD], &[]).unwrap();
        let result = decrypt_message(&ciphertext, nonce.as_bytes(), &key);
        assert!(matches!(result, Err(CryptoError::DecryptionFailure(_))));
    }

    #[test]
    fn gleiche_mitglieder_ergeben_gleichen_schluessel() {
        let mitglied = crate::identity::IdentityKeyring::initialize()
            .unwrap()
            .public_key()
            .clone();
        let key = derive_room_key("AB12C9", std::slice::from_ref(&mitglied)).unwrap();
        let same = derive_room_key("AB12C9", std::slice::from_ref(&mitglied)).unwrap();
        let msg = encrypt_message("fest", &key).unwrap();
        assert_eq!(decrypt_message_envelope(&msg, &same).unwrap(), "fest");
    }

    #[test]
    fn falsche_aad_schlaegt_fehl() {
        let key = test_key("AB12C9");
        let (nonce, ciphertext) = seal(&key, b"daten", b"a").unwrap();
        assert!(open(&key, &nonce, &ciphertext, b"b").is_err());
        assert_eq!(open(&key, &nonce, &ciphertext, b"a").unwrap(), b"daten");
    }
}
