//! Sitzungs-Identitaet (P-256)
//!
//! Jede Geraete-Sitzung erhaelt beim Start ein frisches P-256
//! Schluessel-Paar. Der oeffentliche Schluessel geht an die Signaling-Schicht,
//! der private Schluessel verlaesst den Keyring nie. Persistenz ist nicht
//! vorgesehen; nach einem Neustart gibt es eine neue Identitaet.

use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, UnparsedPublicKey, ECDSA_P256_SHA256_FIXED,
    ECDSA_P256_SHA256_FIXED_SIGNING,
};

use crate::error::{CryptoError, CryptoResult};
use crate::fingerprint::{fingerprint_of, Fingerprint};
use crate::types::MemberPublicKey;

/// Laenge einer ECDSA P-256 Signatur im festen Format (r || s)
pub const SIGNATURE_LEN: usize = 64;

/// Haelt das P-256 Schluessel-Paar einer Sitzung
pub struct IdentityKeyring {
    key_pair: EcdsaKeyPair,
    public_key: MemberPublicKey,
    rng: SystemRandom,
}

impl IdentityKeyring {
    /// Generiert ein neues P-256 Schluessel-Paar
    ///
    /// Schlaegt mit `CryptoUnavailable` fehl, wenn der System-RNG oder die
    /// Kurven-Primitiven nicht nutzbar sind. Ohne Keyring darf keine andere
    /// Krypto-Funktion der Sitzung laufen.
    pub fn initialize() -> CryptoResult<Self> {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
            .map_err(|_| CryptoError::CryptoUnavailable("P-256 Schluessel-Generierung".to_string()))?;
        // Das PKCS#8-Dokument lebt nur bis zum Ende dieser Funktion.
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                .map_err(|e| CryptoError::CryptoUnavailable(format!("P-256 Schluessel: {e}")))?;
        let public_key = MemberPublicKey::from_bytes(key_pair.public_key().as_ref())?;

        tracing::debug!(
            fingerprint = %fingerprint_of(&public_key).short(),
            "Sitzungs-Identitaet erzeugt"
        );

        Ok(Self {
            key_pair,
            public_key,
            rng,
        })
    }

    /// Oeffentlicher Schluessel in kanonischer Form
    pub fn public_key(&self) -> &MemberPublicKey {
        &self.public_key
    }

    /// Roher Punkt (65 Bytes)
    pub fn export_public_key(&self) -> Vec<u8> {
        self.public_key.as_bytes().to_vec()
    }

    /// SubjectPublicKeyInfo DER
    pub fn export_public_key_spki(&self) -> Vec<u8> {
        self.public_key.to_spki_der()
    }

    /// Base64 des rohen Punkts, wie er in Signaling-Nachrichten steht
    pub fn export_public_key_base64(&self) -> String {
        self.public_key.to_base64()
    }

    /// Fingerprint des eigenen Schluessels
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint_of(&self.public_key)
    }

    /// Signiert Daten mit dem privaten Schluessel (ECDSA P-256 / SHA-256)
    pub fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let signature = self
            .key_pair
            .sign(&self.rng, data)
            .map_err(|_| CryptoError::Signierung("ECDSA P-256".to_string()))?;
        Ok(signature.as_ref().to_vec())
    }

    /// Verifiziert eine Signatur gegen einen oeffentlichen Schluessel
    pub fn verify(data: &[u8], signature: &[u8], public_key: &MemberPublicKey) -> bool {
        if signature.len() != SIGNATURE_LEN {
            return false;
        }
        UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, public_key.as_bytes())
            .verify(data, signature)
            .is_ok()
    }
}

impl std::fmt::Debug for IdentityKeyring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IdentityKeyring {{ fingerprint: {} }}", self.fingerprint().short())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_generieren() {
        let keyring = IdentityKeyring::initialize().unwrap();
        let raw = keyring.export_public_key();
        assert_eq!(raw.len(), 65);
        assert_eq!(raw[0], 0x04);
    }

    #[test]
    fn export_ist_deterministisch() {
        let keyring = IdentityKeyring::initialize().unwrap();
        assert_eq!(keyring.export_public_key(), keyring.export_public_key());
        assert_eq!(
            keyring.export_public_key_base64(),
            keyring.export_public_key_base64()
        );
    }

    #[test]
    fn spki_und_roh_beschreiben_denselben_schluessel() {
        let keyring = IdentityKeyring::initialize().unwrap();
        let spki = keyring.export_public_key_spki();
        let key = MemberPublicKey::from_bytes(&spki).unwrap();
        assert_eq!(&key, keyring.public_key());
    }

    #[test]
    fn jede_sitzung_hat_eigene_identitaet() {
        let a = IdentityKeyring::initialize().unwrap();
        let b = IdentityKeyring::initialize().unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn signieren_und_verifizieren() {
        let keyring = IdentityKeyring::initialize().unwrap();
        let data = b"Hallo, Sealroom!";

        let signature = keyring.sign(data).unwrap();
        assert_eq!(signature.len(), SIGNATURE_LEN);
        assert!(IdentityKeyring::verify(data, &signature, keyring.public_key()));
    }

    #[test]
    fn manipulierte_signatur_wird_abgelehnt() {
        let keyring = IdentityKeyring::initialize().unwrap();
        let data = b"Originaltext";

        let mut signature = keyring.sign(data).unwrap();
        signature[0] ^= 0xFF;
        assert!(!IdentityKeyring::verify(data, &signature, keyring.public_key()));
        assert!(!IdentityKeyring::verify(data, &signature[..10], keyring.public_key()));
    }

    #[test]
    fn fremder_schluessel_wird_abgelehnt() {
        let a = IdentityKeyring::initialize().unwrap();
        let b = IdentityKeyring::initialize().unwrap();
        let signature = a.sign(b"Testdaten").unwrap();
        assert!(!IdentityKeyring::verify(b"Testdaten", &signature, b.public_key()));
    }

    #[test]
    fn debug_zeigt_keinen_schluessel() {
        let keyring = IdentityKeyring::initialize().unwrap();
        let debug = format!("{keyring:?}");
        assert!(debug.starts_with("IdentityKeyring { fingerprint: "));
        assert!(!debug.contains(&keyring.export_public_key_base64()));
    }
}
