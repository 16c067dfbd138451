//! Fehlertypen fuer das Kryptografie-Subsystem
//!
//! Konstruktionsfehler (`CryptoUnavailable`, `InvalidMembership`,
//! `MalformedKeyInput`) stoppen die abhaengige Funktion sofort.
//! `DecryptionFailure` betrifft immer nur eine einzelne Nachricht oder Datei
//! und wird vom Aufrufer als Wert behandelt.

use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Kryptografie nicht verfuegbar: {0}")]
    CryptoUnavailable(String),

    #[error("Ungueltige Mitgliedschaft: {0}")]
    InvalidMembership(String),

    #[error("Ungueltiger oeffentlicher Schluessel: {0}")]
    MalformedKeyInput(String),

    #[error("Entschluesselung fehlgeschlagen: {0}")]
    DecryptionFailure(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Key Derivation fehlgeschlagen: {0}")]
    KeyDerivation(String),

    #[error("Signierung fehlgeschlagen: {0}")]
    Signierung(String),

    #[error("Kein Schluessel fuer Raum {room_id}")]
    KeinSchluessel { room_id: String },
}

impl CryptoError {
    /// `true` fuer Fehler, die eine Funktion als Ganzes blockieren.
    ///
    /// `DecryptionFailure` ist nie fatal: die Nachricht wird als
    /// Platzhalter angezeigt, die Sitzung laeuft weiter.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CryptoError::CryptoUnavailable(_)
                | CryptoError::InvalidMembership(_)
                | CryptoError::MalformedKeyInput(_)
        )
    }

    /// `true` wenn es sich um einen Entschluesselungsfehler handelt
    pub fn is_decryption_failure(&self) -> bool {
        matches!(self, CryptoError::DecryptionFailure(_))
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
