//! Fingerprints oeffentlicher Schluessel
//!
//! SHA-256 ueber den rohen P-256 Punkt, dargestellt als 16 Gruppen zu je vier
//! Hex-Zeichen. Zwei Personen vergleichen den Wert ueber einen zweiten Kanal
//! (Telefon, persoenlich) und bestaetigen so den Schluessel des Gegenuebers.

use sha2::{Digest, Sha256};

use crate::error::CryptoResult;
use crate::types::MemberPublicKey;

/// Hex-Zeichen pro Gruppe
const GRUPPEN_BREITE: usize = 4;

/// Gruppen in der Kurzform
const KURZ_GRUPPEN: usize = 4;

/// Menschlich vergleichbarer Fingerprint eines oeffentlichen Schluessels
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    digest: [u8; 32],
}

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Einzelne Gruppen, z.B. `["3F2A", "9C01", ...]`
    pub fn groups(&self) -> Vec<String> {
        let hex: String = self.digest.iter().map(|b| format!("{b:02X}")).collect();
        hex.as_bytes()
            .chunks(GRUPPEN_BREITE)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect()
    }

    /// Kurzform fuer kompakte Anzeigen (erste vier Gruppen)
    pub fn short(&self) -> String {
        self.groups()[..KURZ_GRUPPEN].join(" ")
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.groups().join(" "))
    }
}

/// Fingerprint eines bereits geparsten Schluessels
pub fn fingerprint_of(key: &MemberPublicKey) -> Fingerprint {
    let digest: [u8; 32] = Sha256::digest(key.as_bytes()).into();
    Fingerprint { digest }
}

/// Fingerprint aus rohen Schluessel-Bytes (roh oder SPKI)
///
/// Beide Kodierungen desselben Schluessels ergeben denselben Fingerprint.
pub fn fingerprint(public_key_bytes: &[u8]) -> CryptoResult<Fingerprint> {
    let key = MemberPublicKey::from_bytes(public_key_bytes)?;
    Ok(fingerprint_of(&key))
}
