//! Krypto-Sitzung
//!
//! Expliziter Kontext statt globaler Zustand: eine `CryptoSession` besitzt
//! genau einen `IdentityKeyring` und einen `RoomKeyManager`. Alle
//! Operationen sind synchron; die Sitzung ist `Send + Sync` und kann hinter
//! einem `Arc` von mehreren Tasks gleichzeitig benutzt werden.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use sealroom_protocol::{RoomMessage, SignalingEvent};

use crate::e2e::{
    decrypt_file_envelope, decrypt_message_envelope, encrypt_file, encrypt_message, RoomKeyEpoch,
    RoomKeyManager,
};
use crate::error::{CryptoError, CryptoResult};
use crate::fingerprint::Fingerprint;
use crate::identity::IdentityKeyring;
use crate::types::{DecryptedFile, EncryptedFile, EncryptedMessage, MemberPublicKey};

/// Anzeigetext fuer nicht entschluesselbare Nachrichten
pub const UNDECRYPTABLE_PLACEHOLDER: &str = "[Nachricht konnte nicht entschluesselt werden]";

const JOIN_PROOF_LABEL: &[u8] = b"sealroom-join-v1";

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Einstellungen einer Sitzung (TOML-Abschnitt `[sitzung]`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Wie viele abgeloeste Raum-Schluessel fuer die History behalten werden
    pub behaltene_epochen: usize,
}

// ---------------------------------------------------------------------------
// Anzeige
// ---------------------------------------------------------------------------

/// Ergebnis einer Entschluesselung fuer die Anzeige
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayText {
    Plain(String),
    /// Wird als Platzhalter angezeigt, nie erneut versucht
    Undecryptable,
}

impl DisplayText {
    pub fn as_str(&self) -> &str {
        match self {
            DisplayText::Plain(text) => text.as_str(),
            DisplayText::Undecryptable => UNDECRYPTABLE_PLACEHOLDER,
        }
    }

    pub fn is_undecryptable(&self) -> bool {
        matches!(self, DisplayText::Undecryptable)
    }
}

impl std::fmt::Display for DisplayText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sitzung
// ---------------------------------------------------------------------------

/// Krypto-Kontext einer Geraete-Sitzung
#[derive(Debug)]
pub struct CryptoSession {
    identity: IdentityKeyring,
    keys: RoomKeyManager,
}

impl CryptoSession {
    /// Startet eine Sitzung mit frischer Identitaet
    ///
    /// Schlaegt mit `CryptoUnavailable` fehl, bevor irgendeine andere
    /// Operation moeglich ist.
    pub fn start(config: SessionConfig) -> CryptoResult<Self> {
        let identity = IdentityKeyring::initialize()?;
        tracing::info!(
            fingerprint = %identity.fingerprint().short(),
            behaltene_epochen = config.behaltene_epochen,
            "Krypto-Sitzung gestartet"
        );
        Ok(Self {
            identity,
            keys: RoomKeyManager::with_retention(config.behaltene_epochen),
        })
    }

    pub fn identity(&self) -> &IdentityKeyring {
        &self.identity
    }

    pub fn public_key_base64(&self) -> String {
        self.identity.export_public_key_base64()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.identity.fingerprint()
    }

    pub fn keys(&self) -> &RoomKeyManager {
        &self.keys
    }

    // -----------------------------------------------------------------------
    // Mitgliedschaft
    // -----------------------------------------------------------------------

    /// Neuer Raum mit dem eigenen Schluessel als einzigem Mitglied
    pub fn create_room(&self, room_id: &str) -> CryptoResult<Arc<RoomKeyEpoch>> {
        self.keys
            .update_membership(room_id, std::slice::from_ref(self.identity.public_key()))
    }

    pub fn update_membership(
        &self,
        room_id: &str,
        member_keys: &[MemberPublicKey],
    ) -> CryptoResult<Arc<RoomKeyEpoch>> {
        self.keys.update_membership(room_id, member_keys)
    }

    /// Mitgliedschaft aus einem Registry-Snapshot (Benutzername -> Base64)
    ///
    /// Ein einziger ungueltiger Schluessel laesst das ganze Update scheitern;
    /// der bisherige Raum-Schluessel bleibt dann unveraendert.
    pub fn update_membership_from_registry(
        &self,
        room_id: &str,
        registry: &BTreeMap<String, String>,
    ) -> CryptoResult<Arc<RoomKeyEpoch>> {
        let member_keys = registry
            .iter()
            .map(|(username, encoded)| {
                MemberPublicKey::from_base64(encoded).map_err(|e| match e {
                    CryptoError::MalformedKeyInput(grund) => {
                        CryptoError::MalformedKeyInput(format!("{username}: {grund}"))
                    }
                    andere => andere,
                })
            })
            .collect::<CryptoResult<Vec<_>>>()?;
        self.keys.update_membership(room_id, &member_keys)
    }

    /// Wendet ein Signaling-Event an
    ///
    /// Liefert die neue Epoch fuer Events, die die Mitgliedschaft festlegen,
    /// sonst `None`. Abgeleitet wird immer ueber den Raum-Code.
    pub fn apply_event(&self, event: &SignalingEvent) -> CryptoResult<Option<Arc<RoomKeyEpoch>>> {
        let Some(room_code) = event.room_code() else {
            return Ok(None);
        };
        let epoch = match event {
            SignalingEvent::JoinApproved { member_keys, .. }
            | SignalingEvent::MembersUpdate { member_keys, .. } => {
                self.update_membership_from_registry(room_code, member_keys)?
            }
            _ => self.create_room(room_code)?,
        };
        Ok(Some(epoch))
    }

    pub fn close_room(&self, room_id: &str) -> bool {
        self.keys.close_room(room_id)
    }

    // -----------------------------------------------------------------------
    // Text
    // -----------------------------------------------------------------------

    pub fn encrypt_text(&self, room_id: &str, plaintext: &str) -> CryptoResult<EncryptedMessage> {
        let current = self.keys.current_key(room_id)?;
        encrypt_message(plaintext, &current.key)
    }

    /// Entschluesselt mit dem aktuellen, danach mit behaltenen Schluesseln
    pub fn decrypt_text(&self, room_id: &str, message: &EncryptedMessage) -> CryptoResult<String> {
        self.with_room_keys(room_id, |epoch| {
            decrypt_message_envelope(message, &epoch.key)
        })
    }

    /// Wie [`decrypt_text`](Self::decrypt_text), aber Fehler werden zum
    /// Platzhalter
    pub fn decrypt_text_for_display(&self, room_id: &str, message: &EncryptedMessage) -> DisplayText {
        match self.decrypt_text(room_id, message) {
            Ok(text) => DisplayText::Plain(text),
            Err(e) => {
                tracing::warn!(room_id = room_id, fehler = %e, "Nachricht nicht entschluesselbar");
                DisplayText::Undecryptable
            }
        }
    }

    /// Anzeigetext fuer eine Raum-Nachricht
    ///
    /// Systemhinweise sind Klartext; bei Dateien wird der Begleittext
    /// entschluesselt.
    pub fn display_message(&self, room_id: &str, message: &RoomMessage) -> DisplayText {
        let envelope = match message {
            RoomMessage::SystemNotice { text, .. } => return DisplayText::Plain(text.clone()),
            RoomMessage::EncryptedText { envelope, .. }
            | RoomMessage::EncryptedFile { envelope, .. } => envelope,
        };
        match EncryptedMessage::from_envelope(envelope) {
            Ok(encrypted) => self.decrypt_text_for_display(room_id, &encrypted),
            Err(e) => {
                tracing::warn!(room_id = room_id, fehler = %e, "Envelope nicht lesbar");
                DisplayText::Undecryptable
            }
        }
    }

    // -----------------------------------------------------------------------
    // Dateien
    // -----------------------------------------------------------------------

    pub fn encrypt_file(
        &self,
        room_id: &str,
        file_bytes: &[u8],
        filename: &str,
        mime_type: &str,
    ) -> CryptoResult<EncryptedFile> {
        let current = self.keys.current_key(room_id)?;
        encrypt_file(file_bytes, filename, mime_type, &current.key)
    }

    pub fn decrypt_file(&self, room_id: &str, file: &EncryptedFile) -> CryptoResult<DecryptedFile> {
        self.with_room_keys(room_id, |epoch| decrypt_file_envelope(file, &epoch.key))
    }

    // -----------------------------------------------------------------------
    // Besitznachweis
    // -----------------------------------------------------------------------

    /// Signatur ueber die Raum-ID als Nachweis, dass der Beitretende den
    /// privaten Schluessel zu seinem angekuendigten oeffentlichen besitzt
    pub fn join_proof(&self, room_id: &str) -> CryptoResult<String> {
        let signature = self.identity.sign(&join_proof_payload(room_id))?;
        Ok(BASE64.encode(signature))
    }

    pub fn verify_join_proof(&self, room_id: &str, public_key: &MemberPublicKey, proof: &str) -> bool {
        let Ok(signature) = BASE64.decode(proof) else {
            return false;
        };
        IdentityKeyring::verify(&join_proof_payload(room_id), &signature, public_key)
    }

    // -----------------------------------------------------------------------
    // Intern
    // -----------------------------------------------------------------------

    /// Probiert erst die aktuelle Epoch, danach behaltene (neueste zuerst).
    /// Nur `DecryptionFailure` fuehrt zum naechsten Versuch.
    fn with_room_keys<T>(
        &self,
        room_id: &str,
        op: impl Fn(&RoomKeyEpoch) -> CryptoResult<T>,
    ) -> CryptoResult<T> {
        let current = self.keys.current_key(room_id)?;
        let mut last_err = match op(current.as_ref()) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_decryption_failure() => e,
            Err(e) => return Err(e),
        };

        for retained in self.keys.retained_keys(room_id) {
            match op(retained.as_ref()) {
                Ok(value) => {
                    tracing::debug!(
                        room_id = room_id,
                        epoch = retained.epoch,
                        "Mit behaltenem Schluessel entschluesselt"
                    );
                    return Ok(value);
                }
                Err(e) if e.is_decryption_failure() => last_err = e,
                Err(e) => return Err(e),
            }
        }
        Err(last_err)
    }
}

fn join_proof_payload(room_id: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(JOIN_PROOF_LABEL.len() + room_id.len());
    payload.extend_from_slice(JOIN_PROOF_LABEL);
    payload.extend_from_slice(room_id.as_bytes());
    payload
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
