//! Konvertierung zwischen Krypto-Typen und Draht-Envelopes
//!
//! Eingehende Envelopes kommen von aussen. Kaputtes Base64 oder eine falsche
//! Nonce-Laenge betreffen nur diese eine Nachricht und werden daher als
//! `DecryptionFailure` gemeldet.

use sealroom_protocol::{FileEnvelope, MessageEnvelope, ProtocolError};

use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptedFile, EncryptedMessage, Nonce, SealedFileMetadata};

impl From<ProtocolError> for CryptoError {
    fn from(err: ProtocolError) -> Self {
        CryptoError::DecryptionFailure(err.to_string())
    }
}

impl EncryptedMessage {
    pub fn to_envelope(&self) -> MessageEnvelope {
        MessageEnvelope::new(&self.ciphertext, self.nonce.as_bytes())
    }

    pub fn from_envelope(envelope: &MessageEnvelope) -> CryptoResult<Self> {
        let (ciphertext, nonce) = envelope.decode()?;
        Ok(Self {
            ciphertext,
            nonce: Nonce::from_slice(&nonce)?,
        })
    }
}

impl EncryptedFile {
    /// Envelope fuer die Nachricht; der Ciphertext geht separat unter
    /// `blob_ref` in den Datei-Speicher
    pub fn to_envelope(&self, blob_ref: impl Into<String>) -> FileEnvelope {
        FileEnvelope::new(
            blob_ref,
            self.nonce.as_bytes(),
            &self.metadata.to_bytes(),
            self.metadata.size,
        )
    }

    /// Setzt Envelope und abgerufenen Blob wieder zusammen
    pub fn from_envelope(envelope: &FileEnvelope, ciphertext: Vec<u8>) -> CryptoResult<Self> {
        let nonce = Nonce::from_slice(&envelope.decode_nonce()?)?;
        let metadata = SealedFileMetadata::from_bytes(&envelope.decode_metadata()?, envelope.size)?;
        Ok(Self {
            ciphertext,
            nonce,
            metadata,
        })
    }
}
