//! Raum-Schluessel aus der Mitgliedschaft
//!
//! Jeder Raum hat pro Mitglieder-Snapshot genau einen symmetrischen
//! Schluessel (AES-256-GCM). Er wird lokal von jedem Mitglied abgeleitet und
//! nie uebertragen.
//!
//! ## Ableitung
//! ```text
//! IKM  = sort(keys)[0] | sort(keys)[1] | ... | room_id
//! Salt = room_id
//! Info = "sealroom-room-key-v1"
//! Key  = HKDF-SHA256(Salt, IKM, Info, 32)
//! ```
//!
//! Durch das Sortieren haengt der Schluessel nur von der *Menge* der
//! Schluessel ab, nicht von der Reihenfolge, in der ein Mitglied sie erhalten
//! hat.
//!
//! ## Vertrauensgrenze
//! Alle Eingaben sind oeffentlich. Wer Raum-ID und alle oeffentlichen
//! Schluessel kennt, kann den Raum-Schluessel ebenfalls berechnen. Die
//! Vertraulichkeit haengt damit an der Integritaet des Signaling-Kanals.

use std::collections::BTreeSet;

use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{MemberPublicKey, P256_RAW_LEN};

/// Laenge eines Raum-Schluessels (256 Bit)
pub const ROOM_KEY_LEN: usize = 32;

const TRENNER: u8 = b'|';
const ROOM_KEY_INFO: &[u8] = b"sealroom-room-key-v1";
const CHECK_LABEL: &[u8] = b"sealroom-key-check";

/// Symmetrischer Raum-Schluessel fuer einen Mitglieder-Snapshot
///
/// Das Schluesselmaterial wird beim Drop genullt.
#[derive(Clone)]
pub struct RoomKey {
    room_id: String,
    member_count: usize,
    key_bytes: Zeroizing<[u8; ROOM_KEY_LEN]>,
}

impl RoomKey {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Anzahl der (deduplizierten) Mitglieder im Snapshot
    pub fn member_count(&self) -> usize {
        self.member_count
    }

    pub fn as_bytes(&self) -> &[u8; ROOM_KEY_LEN] {
        &self.key_bytes
    }

    /// Pruefwert (8 Hex-Zeichen), mit dem Mitglieder vergleichen koennen,
    /// ob sie denselben Schluessel abgeleitet haben.
    pub fn check_value(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(CHECK_LABEL);
        hasher.update(self.key_bytes.as_slice());
        hasher.finalize()[..4]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

impl std::fmt::Debug for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomKey")
            .field("room_id", &self.room_id)
            .field("member_count", &self.member_count)
            .field("key_bytes", &"[REDACTED]")
            .finish()
    }
}

/// Sortierter, deduplizierter Mitglieder-Snapshot
pub fn canonical_snapshot(member_keys: &[MemberPublicKey]) -> Vec<MemberPublicKey> {
    member_keys
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect()
}

/// Leitet den Raum-Schluessel aus Raum-ID und Mitglieder-Schluesseln ab
///
/// Reine Funktion der Eingaben. Ein einzelnes Mitglied ist gueltig (Raum
/// gerade erstellt), eine leere Menge nicht.
pub fn derive_room_key(room_id: &str, member_keys: &[MemberPublicKey]) -> CryptoResult<RoomKey> {
    if room_id.is_empty() {
        return Err(CryptoError::InvalidMembership("leere Raum-ID".to_string()));
    }
    let snapshot = canonical_snapshot(member_keys);
    if snapshot.is_empty() {
        return Err(CryptoError::InvalidMembership(format!(
            "keine Mitglieder-Schluessel fuer Raum {room_id}"
        )));
    }

    let mut material =
        Vec::with_capacity(snapshot.len() * (P256_RAW_LEN + 1) + room_id.len());
    for (i, key) in snapshot.iter().enumerate() {
        if i > 0 {
            material.push(TRENNER);
        }
        material.extend_from_slice(key.as_bytes());
    }
    material.push(TRENNER);
    material.extend_from_slice(room_id.as_bytes());

    let okm = Zeroizing::new(hkdf_derive(
        &material,
        room_id.as_bytes(),
        ROOM_KEY_INFO,
        ROOM_KEY_LEN,
    )?);
    let mut key_bytes = Zeroizing::new([0u8; ROOM_KEY_LEN]);
    key_bytes.copy_from_slice(&okm);

    tracing::debug!(
        room_id = room_id,
        mitglieder = snapshot.len(),
        "Raum-Schluessel abgeleitet"
    );

    Ok(RoomKey {
        room_id: room_id.to_string(),
        member_count: snapshot.len(),
        key_bytes,
    })
}

/// Wie [`derive_room_key`], parst aber rohe oder SPKI-kodierte Schluessel
pub fn derive_room_key_from_bytes<B: AsRef<[u8]>>(
    room_id: &str,
    member_keys: &[B],
) -> CryptoResult<RoomKey> {
    let keys = member_keys
        .iter()
        .map(|k| MemberPublicKey::from_bytes(k.as_ref()))
        .collect::<CryptoResult<Vec<_>>>()?;
    derive_room_key(room_id, &keys)
}

/// Wie [`derive_room_key`], parst aber Base64-Schluessel aus dem Signaling
pub fn derive_room_key_from_base64<S: AsRef<str>>(
    room_id: &str,
    member_keys: &[S],
) -> CryptoResult<RoomKey> {
    let keys = member_keys
        .iter()
        .map(|k| MemberPublicKey::from_base64(k.as_ref()))
        .collect::<CryptoResult<Vec<_>>>()?;
    derive_room_key(room_id, &keys)
}

/// HKDF-basierte Key Derivation (allgemein verwendbar)
pub fn hkdf_derive(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> CryptoResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

#[cfg(test)]
pub(crate) fn test_key(room_id: &str) -> RoomKey {
    let keyring = crate::identity::IdentityKeyring::initialize().unwrap();
    derive_room_key(room_id, &[keyring.public_key().clone()]).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
