//! Signaling-Events, die oeffentliche Schluessel transportieren
//!
//! Die Signaling-Schicht selbst (Raum erstellen, Beitritt anfragen und
//! bestaetigen) liegt ausserhalb dieses Projekts. Modelliert sind nur die
//! Events, aus denen die Krypto-Schicht Mitglieder-Snapshots bezieht.
//! Feldnamen sind camelCase wie auf dem Draht.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolResult;

/// Signaling-Event (getaggt ueber `event`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SignalingEvent {
    /// Raum wurde erstellt; der Ersteller ist einziges Mitglied
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_id: String, room_code: String },

    /// Jemand moechte beitreten (geht an den Raum-Besitzer)
    ///
    /// Legt noch keine Mitgliedschaft fest; `room_code()` liefert hier `None`.
    #[serde(rename_all = "camelCase")]
    JoinRequest {
        request_id: String,
        room_id: String,
        /// Raum-Code, ueber den `proof` signiert ist
        room_code: String,
        username: String,
        /// Base64 des rohen P-256 Punkts
        public_key: String,
        /// Optionaler Besitznachweis (Base64-Signatur ueber `room_code`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        proof: Option<String>,
    },

    /// Beitritt bestaetigt, mit allen aktuellen Mitglieder-Schluesseln
    #[serde(rename_all = "camelCase")]
    JoinApproved {
        room_id: String,
        room_code: String,
        /// Benutzername -> Base64-Schluessel
        member_keys: BTreeMap<String, String>,
    },

    /// Mitgliedschaft hat sich geaendert (Join oder Leave)
    #[serde(rename_all = "camelCase")]
    MembersUpdate {
        room_code: String,
        members: Vec<String>,
        member_keys: BTreeMap<String, String>,
    },

    #[serde(rename_all = "camelCase")]
    MemberJoined { username: String, public_key: String },

    #[serde(rename_all = "camelCase")]
    MemberLeft { username: String },
}

impl SignalingEvent {
    /// Raum-Code, falls das Event eine Mitgliedschaft festlegt
    pub fn room_code(&self) -> Option<&str> {
        match self {
            SignalingEvent::RoomCreated { room_code, .. }
            | SignalingEvent::JoinApproved { room_code, .. }
            | SignalingEvent::MembersUpdate { room_code, .. } => Some(room_code.as_str()),
            _ => None,
        }
    }

    /// Serialisiert ein Event zu JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert ein Event aus JSON
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_created_draht_format() {
        let json = r#"{"event":"room-created","roomId":"r-1","roomCode":"AB12C9"}"#;
        let event = SignalingEvent::from_json(json).unwrap();
        assert_eq!(
            event,
            SignalingEvent::RoomCreated {
                room_id: "r-1".into(),
                room_code: "AB12C9".into(),
            }
        );
        assert_eq!(event.room_code(), Some("AB12C9"));
    }

    #[test]
    fn join_approved_mit_schluesseln() {
        let json = r#"{
            "event": "join-approved",
            "roomId": "r-1",
            "roomCode": "AB12C9",
            "memberKeys": { "alice": "QUFB", "bob": "QkJC" }
        }"#;
        let event = SignalingEvent::from_json(json).unwrap();
        let SignalingEvent::JoinApproved { member_keys, .. } = event else {
            panic!("falscher Event-Typ");
        };
        assert_eq!(member_keys.len(), 2);
        assert_eq!(member_keys["bob"], "QkJC");
    }

    #[test]
    fn members_update_roundtrip() {
        let mut member_keys = BTreeMap::new();
        member_keys.insert("alice".to_string(), "QUFB".to_string());
        let event = SignalingEvent::MembersUpdate {
            room_code: "AB12C9".into(),
            members: vec!["alice".into()],
            member_keys,
        };
        let json = event.to_json().unwrap();
        assert!(json.contains("\"event\":\"members-update\""));
        assert!(json.contains("\"memberKeys\""));
        assert_eq!(SignalingEvent::from_json(&json).unwrap(), event);
    }

    #[test]
    fn join_request_ohne_proof() {
        let json = r#"{"event":"join-request","requestId":"q","roomId":"r","roomCode":"AB12C9","username":"bob","publicKey":"QkJC"}"#;
        let event = SignalingEvent::from_json(json).unwrap();
        let SignalingEvent::JoinRequest {
            room_code, proof, ..
        } = &event
        else {
            panic!("falscher Event-Typ");
        };
        assert_eq!(room_code, "AB12C9");
        assert!(proof.is_none());
        assert_eq!(event.room_code(), None);
        assert!(!event.to_json().unwrap().contains("proof"));
    }

    #[test]
    fn member_left_hat_keinen_raum_code() {
        let event = SignalingEvent::MemberLeft {
            username: "bob".into(),
        };
        assert_eq!(event.room_code(), None);
    }

    #[test]
    fn join_request_ohne_raum_code_wird_abgelehnt() {
        let json = r#"{"event":"join-request","requestId":"q","roomId":"r","username":"bob","publicKey":"QkJC"}"#;
        assert!(SignalingEvent::from_json(json).is_err());
    }
}
