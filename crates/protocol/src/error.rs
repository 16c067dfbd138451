//! Fehlertypen fuer das Protokoll-Crate

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Feld '{feld}' ist kein gueltiges Base64: {quelle}")]
    Base64 {
        feld: &'static str,
        #[source]
        quelle: base64::DecodeError,
    },

    #[error("JSON-Fehler: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
