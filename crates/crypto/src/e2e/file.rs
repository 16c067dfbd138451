//! Datei-Verschluesselung
//!
//! Der Dateiinhalt wird in einem AEAD-Aufruf versiegelt. Dateiname und
//! MIME-Typ werden als JSON mit eigener Nonce unter demselben Raum-Schluessel
//! versiegelt. Sichtbar bleibt nur die Groesse.
//!
//! ## AAD
//! ```text
//! Inhalt:    "sealroom-file-v1"      || size(8, BE)
//! Metadaten: "sealroom-file-meta-v1" || content_nonce(12)
//! ```
//!
//! Die Metadaten sind damit an genau diese Datei gebunden und lassen sich
//! nicht an einen anderen Blob haengen.

use crate::e2e::decrypt::open;
use crate::e2e::encrypt::seal;
use crate::e2e::room_key::RoomKey;
use crate::error::{CryptoError, CryptoResult};
use crate::types::{DecryptedFile, EncryptedFile, FileMetadata, Nonce, SealedFileMetadata};

const CONTENT_AAD_LABEL: &[u8] = b"sealroom-file-v1";
const METADATA_AAD_LABEL: &[u8] = b"sealroom-file-meta-v1";

/// Verschluesselt eine Datei samt Metadaten
pub fn encrypt_file(
    file_bytes: &[u8],
    filename: &str,
    mime_type: &str,
    key: &RoomKey,
) -> CryptoResult<EncryptedFile> {
    let size = file_bytes.len() as u64;
    let (nonce, ciphertext) = seal(key, file_bytes, &content_aad(size))?;

    let metadata = FileMetadata {
        filename: filename.to_string(),
        mime_type: mime_type.to_string(),
        size,
    };
    let metadata_json = serde_json::to_vec(&metadata)
        .map_err(|e| CryptoError::Verschluesselung(format!("Metadaten: {e}")))?;
    let (metadata_nonce, metadata_ciphertext) =
        seal(key, &metadata_json, &metadata_aad(&nonce))?;

    tracing::debug!(
        room_id = key.room_id(),
        groesse = size,
        "Datei verschluesselt"
    );

    Ok(EncryptedFile {
        ciphertext,
        nonce,
        metadata: SealedFileMetadata {
            nonce: metadata_nonce,
            ciphertext: metadata_ciphertext,
            size,
        },
    })
}

/// Entschluesselt eine Datei und stellt Dateiname und MIME-Typ wieder her
///
/// Die Laenge des Klartexts muss zur versiegelten und zur sichtbaren Groesse
/// passen, sonst `DecryptionFailure`.
pub fn decrypt_file(
    ciphertext: &[u8],
    nonce: &[u8],
    metadata: &SealedFileMetadata,
    key: &RoomKey,
) -> CryptoResult<DecryptedFile> {
    let nonce = Nonce::from_slice(nonce)?;

    let metadata_json = open(
        key,
        &metadata.nonce,
        &metadata.ciphertext,
        &metadata_aad(&nonce),
    )?;
    let file_metadata: FileMetadata = serde_json::from_slice(&metadata_json)
        .map_err(|e| CryptoError::DecryptionFailure(format!("Metadaten: {e}")))?;
    if file_metadata.size != metadata.size {
        return Err(CryptoError::DecryptionFailure(format!(
            "Groesse: versiegelt {}, sichtbar {}",
            file_metadata.size, metadata.size
        )));
    }

    let bytes = open(key, &nonce, ciphertext, &content_aad(file_metadata.size))?;
    if bytes.len() as u64 != file_metadata.size {
        return Err(CryptoError::DecryptionFailure(format!(
            "Groesse: erwartet {}, erhalten {}",
            file_metadata.size,
            bytes.len()
        )));
    }

    Ok(DecryptedFile {
        bytes,
        metadata: file_metadata,
    })
}

/// Entschluesselt eine [`EncryptedFile`]
pub fn decrypt_file_envelope(file: &EncryptedFile, key: &RoomKey) -> CryptoResult<DecryptedFile> {
    decrypt_file(&file.ciphertext, file.nonce.as_bytes(), &file.metadata, key)
}

fn content_aad(size: u64) -> Vec<u8> {
    let mut aad = Vec::with_capacity(CONTENT_AAD_LABEL.len() + 8);
    aad.extend_from_slice(CONTENT_AAD_LABEL);
    aad.extend_from_slice(&size.to_be_bytes());
    aad
}

fn metadata_aad(content_nonce: &Nonce) -> Vec<u8> {
    let mut aad = Vec::with_capacity(METADATA_AAD_LABEL.len() + 12);
    aad.extend_from_slice(METADATA_AAD_LABEL);
    aad.extend_from_slice(content_nonce.as_bytes());
    aad
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
