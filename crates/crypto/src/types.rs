//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ring::agreement::{agree_ephemeral, EphemeralPrivateKey, UnparsedPublicKey, ECDH_P256};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};

/// Laenge eines unkomprimierten P-256 Punkts (0x04 || X || Y)
pub const P256_RAW_LEN: usize = 65;

/// Laenge der AES-GCM Nonce in Bytes (96 Bit)
pub const NONCE_LEN: usize = 12;

/// SubjectPublicKeyInfo-Praefix fuer id-ecPublicKey / prime256v1 mit
/// unkomprimiertem Punkt. Danach folgen die 65 Bytes des Punkts.
const P256_SPKI_HEADER: [u8; 26] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08,
    0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];

// ---------------------------------------------------------------------------
// MemberPublicKey
// ---------------------------------------------------------------------------

/// Oeffentlicher P-256 Schluessel eines Raum-Mitglieds in kanonischer Form
///
/// Intern immer der rohe, unkomprimierte Punkt. Die Ordnung ist die
/// lexikografische Byte-Ordnung, die auch die Raum-Schluessel-Ableitung
/// verwendet.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberPublicKey {
    bytes: [u8; P256_RAW_LEN],
}

impl MemberPublicKey {
    /// Parst einen Schluessel als rohen Punkt (65 Bytes) oder SPKI DER (91 Bytes)
    ///
    /// Der Punkt muss auf der Kurve liegen, sonst `MalformedKeyInput`.
    pub fn from_bytes(input: &[u8]) -> CryptoResult<Self> {
        let raw = match input.len() {
            P256_RAW_LEN => input,
            len if len == P256_SPKI_HEADER.len() + P256_RAW_LEN => {
                if input[..P256_SPKI_HEADER.len()] != P256_SPKI_HEADER {
                    return Err(CryptoError::MalformedKeyInput(
                        "SPKI ist kein P-256 Schluessel".to_string(),
                    ));
                }
                &input[P256_SPKI_HEADER.len()..]
            }
            other => {
                return Err(CryptoError::MalformedKeyInput(format!(
                    "erwartet {} (roh) oder {} (SPKI) Bytes, erhalten {}",
                    P256_RAW_LEN,
                    P256_SPKI_HEADER.len() + P256_RAW_LEN,
                    other
                )))
            }
        };

        if raw[0] != 0x04 {
            return Err(CryptoError::MalformedKeyInput(
                "nur unkomprimierte Punkte werden unterstuetzt".to_string(),
            ));
        }
        validate_point(raw)?;

        let mut bytes = [0u8; P256_RAW_LEN];
        bytes.copy_from_slice(raw);
        Ok(Self { bytes })
    }

    /// Parst einen Base64-kodierten Schluessel (Standard-Alphabet)
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::MalformedKeyInput(format!("Base64: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Roher Punkt (65 Bytes)
    pub fn as_bytes(&self) -> &[u8; P256_RAW_LEN] {
        &self.bytes
    }

    /// Base64 des rohen Punkts (Transportformat fuer Signaling)
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.bytes)
    }

    /// SubjectPublicKeyInfo DER (91 Bytes)
    pub fn to_spki_der(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(P256_SPKI_HEADER.len() + P256_RAW_LEN);
        out.extend_from_slice(&P256_SPKI_HEADER);
        out.extend_from_slice(&self.bytes);
        out
    }
}

impl std::fmt::Debug for MemberPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemberPublicKey({})", crate::fingerprint::fingerprint_of(self).short())
    }
}

/// Prueft, ob der Punkt auf P-256 liegt.
///
/// ring validiert fremde Punkte erst bei der Schluesselvereinbarung, daher
/// wird gegen einen frischen ephemeren Schluessel vereinbart und das
/// Ergebnis verworfen.
fn validate_point(raw: &[u8]) -> CryptoResult<()> {
    let rng = SystemRandom::new();
    let wegwerf = EphemeralPrivateKey::generate(&ECDH_P256, &rng)
        .map_err(|_| CryptoError::CryptoUnavailable("P-256 Schluessel-Generierung".to_string()))?;
    agree_ephemeral(wegwerf, &UnparsedPublicKey::new(&ECDH_P256, raw), |_| ())
        .map_err(|_| CryptoError::MalformedKeyInput("Punkt liegt nicht auf P-256".to_string()))
}

// ---------------------------------------------------------------------------
// Nonce
// ---------------------------------------------------------------------------

/// AES-GCM Nonce (96 Bit, pro Verschluesselung frisch gezogen)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce {
    pub bytes: [u8; NONCE_LEN],
}

impl Nonce {
    /// Zieht eine Nonce aus dem System-CSPRNG
    pub fn random() -> CryptoResult<Self> {
        let mut bytes = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| CryptoError::CryptoUnavailable("System-RNG".to_string()))?;
        Ok(Self { bytes })
    }

    /// Liest eine Nonce aus empfangenen Bytes
    ///
    /// Falsche Laenge ist ein Fehler der einzelnen Nachricht, daher
    /// `DecryptionFailure`.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; NONCE_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::DecryptionFailure(format!(
                "Nonce-Laenge: erwartet {NONCE_LEN}, erhalten {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.bytes
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Verschluesselte Textnachricht (Ciphertext inkl. 16 Byte Auth-Tag)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMessage {
    pub ciphertext: Vec<u8>,
    pub nonce: Nonce,
}

/// Klartext-Metadaten einer Datei
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

impl FileMetadata {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Groesse fuer die Anzeige, z.B. `"1.5 MB"`
    pub fn formatted_size(&self) -> String {
        const EINHEITEN: [&str; 3] = ["KB", "MB", "GB"];
        if self.size < 1024 {
            return format!("{} B", self.size);
        }
        let mut wert = self.size as f64 / 1024.0;
        let mut einheit = 0;
        while wert >= 1024.0 && einheit < EINHEITEN.len() - 1 {
            wert /= 1024.0;
            einheit += 1;
        }
        format!("{:.1} {}", wert, EINHEITEN[einheit])
    }
}

/// Verschluesselte Datei-Metadaten
///
/// Dateiname und MIME-Typ sind AEAD-geschuetzt; nur die Groesse ist fuer die
/// Speicherschicht sichtbar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedFileMetadata {
    pub nonce: Nonce,
    pub ciphertext: Vec<u8>,
    pub size: u64,
}

impl SealedFileMetadata {
    /// Serialisiert zu Bytes: [nonce(12)] + [ciphertext]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce.bytes);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Deserialisiert aus Bytes; die Groesse kommt separat aus dem Envelope
    pub fn from_bytes(bytes: &[u8], size: u64) -> CryptoResult<Self> {
        if bytes.len() < NONCE_LEN {
            return Err(CryptoError::DecryptionFailure(
                "Metadaten zu kurz".to_string(),
            ));
        }
        let nonce = Nonce::from_slice(&bytes[..NONCE_LEN])?;
        Ok(Self {
            nonce,
            ciphertext: bytes[NONCE_LEN..].to_vec(),
            size,
        })
    }
}

/// Verschluesselte Datei
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedFile {
    pub ciphertext: Vec<u8>,
    pub nonce: Nonce,
    pub metadata: SealedFileMetadata,
}

/// Entschluesselte Datei mit wiederhergestellten Metadaten
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedFile {
    pub bytes: Vec<u8>,
    pub metadata: FileMetadata,
}
