//! Raum-Nachrichten
//!
//! Eine Nachricht im Raum ist entweder ein Systemhinweis (Klartext vom
//! Server, z.B. "Bob hat den Raum verlassen"), ein verschluesselter Text oder
//! ein verschluesselter Text mit Dateianhang. Die Krypto-Schicht bearbeitet
//! nur die beiden verschluesselten Varianten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::{FileEnvelope, MessageEnvelope};
use crate::error::ProtocolResult;

/// Nachricht in einem Raum (getaggt ueber `type`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomMessage {
    /// Hinweis des Servers, unverschluesselt
    SystemNotice {
        text: String,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },

    /// Verschluesselte Textnachricht
    EncryptedText {
        /// Vom Server vergebene Nachrichten-ID
        id: String,
        sender: String,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        envelope: MessageEnvelope,
    },

    /// Verschluesselte Nachricht mit Dateianhang
    EncryptedFile {
        id: String,
        sender: String,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
        /// Begleittext (ebenfalls verschluesselt)
        envelope: MessageEnvelope,
        attachment: FileEnvelope,
    },
}

impl RoomMessage {
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, RoomMessage::SystemNotice { .. })
    }

    /// Absender, `None` fuer Systemhinweise
    pub fn sender(&self) -> Option<&str> {
        match self {
            RoomMessage::SystemNotice { .. } => None,
            RoomMessage::EncryptedText { sender, .. } | RoomMessage::EncryptedFile { sender, .. } => {
                Some(sender.as_str())
            }
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            RoomMessage::SystemNotice { timestamp, .. }
            | RoomMessage::EncryptedText { timestamp, .. }
            | RoomMessage::EncryptedFile { timestamp, .. } => *timestamp,
        }
    }

    /// Serialisiert eine Nachricht zu JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
