//! Transport-Envelopes fuer verschluesselte Inhalte
//!
//! Alle Binaerfelder sind Base64 (Standard-Alphabet). Die Envelopes koennen
//! gefahrlos geloggt und gespeichert werden; sie enthalten weder Klartext
//! noch Schluessel.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

/// Verschluesselte Textnachricht auf dem Draht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// AES-256-GCM Ciphertext inkl. Auth-Tag
    #[serde(alias = "encryptedData")]
    pub ciphertext: String,
    /// 12-Byte Nonce
    #[serde(alias = "iv")]
    pub nonce: String,
}

impl MessageEnvelope {
    pub fn new(ciphertext: &[u8], nonce: &[u8]) -> Self {
        Self {
            ciphertext: BASE64.encode(ciphertext),
            nonce: BASE64.encode(nonce),
        }
    }

    /// Dekodiert zu `(ciphertext, nonce)`
    pub fn decode(&self) -> ProtocolResult<(Vec<u8>, Vec<u8>)> {
        Ok((
            decode_field("ciphertext", &self.ciphertext)?,
            decode_field("nonce", &self.nonce)?,
        ))
    }
}

/// Verweis auf eine verschluesselte Datei
///
/// Der Ciphertext selbst liegt als opaker Blob im Datei-Speicher und wird
/// ueber `blob_ref` authentifiziert abgerufen. Nonce und versiegelte
/// Metadaten reisen mit der Nachricht.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEnvelope {
    /// Speicher-Referenz (URL oder ID) des Ciphertext-Blobs
    #[serde(alias = "url")]
    pub blob_ref: String,
    /// Nonce des Dateiinhalts
    #[serde(alias = "iv")]
    pub nonce: String,
    /// Versiegelte Metadaten: nonce(12) || ciphertext
    pub metadata: String,
    /// Klartext-Groesse in Bytes (fuer den Speicher ohnehin sichtbar)
    pub size: u64,
}

impl FileEnvelope {
    pub fn new(blob_ref: impl Into<String>, nonce: &[u8], metadata: &[u8], size: u64) -> Self {
        Self {
            blob_ref: blob_ref.into(),
            nonce: BASE64.encode(nonce),
            metadata: BASE64.encode(metadata),
            size,
        }
    }

    pub fn decode_nonce(&self) -> ProtocolResult<Vec<u8>> {
        decode_field("nonce", &self.nonce)
    }

    pub fn decode_metadata(&self) -> ProtocolResult<Vec<u8>> {
        decode_field("metadata", &self.metadata)
    }
}

fn decode_field(feld: &'static str, wert: &str) -> ProtocolResult<Vec<u8>> {
    BASE64
        .decode(wert)
        .map_err(|quelle| ProtocolError::Base64 { feld, quelle })
}
