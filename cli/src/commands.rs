//! Befehle der CLI
//!
//! Jeder Befehl ist eine synchrone Funktion mit eigenem Ergebnis-Typ; die
//! Ausgabe uebernimmt `main`. Die CLI hat keinen persistenten privaten
//! Schluessel: Raum-Schluessel werden aus Raum-ID und den uebergebenen
//! oeffentlichen Schluesseln abgeleitet.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;

use sealroom_crypto::{
    fingerprint_of, CryptoSession, EncryptedFile, EncryptedMessage, Fingerprint, MemberPublicKey,
    SessionConfig,
};
use sealroom_protocol::{FileEnvelope, MessageEnvelope};

use crate::config::DateiEinstellungen;

/// Endung des Ciphertext-Blobs
pub const BLOB_ENDUNG: &str = "sealed";
/// Endung des Envelope-JSON
pub const ENVELOPE_ENDUNG: &str = "envelope.json";

// ---------------------------------------------------------------------------
// Schluessel
// ---------------------------------------------------------------------------

/// Ausgabe von `keygen`
#[derive(Debug, Serialize)]
pub struct KeygenAusgabe {
    pub public_key: String,
    pub public_key_spki: String,
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_proof: Option<String>,
}

/// Erzeugt eine Sitzungs-Identitaet und gibt den oeffentlichen Teil aus
pub fn keygen(sitzung: &SessionConfig, proof_raum: Option<&str>) -> Result<KeygenAusgabe> {
    let session = CryptoSession::start(sitzung.clone())?;
    let identity = session.identity();
    let join_proof = proof_raum
        .map(|raum| session.join_proof(raum))
        .transpose()?;

    Ok(KeygenAusgabe {
        public_key: identity.export_public_key_base64(),
        public_key_spki: BASE64.encode(identity.export_public_key_spki()),
        fingerprint: identity.fingerprint().to_string(),
        join_proof,
    })
}

/// Fingerprint eines Base64-kodierten oeffentlichen Schluessels (roh oder SPKI)
pub fn fingerprint_berechnen(schluessel: &str) -> Result<Fingerprint> {
    let key = MemberPublicKey::from_base64(schluessel)
        .with_context(|| format!("Schluessel '{}' nicht lesbar", kuerzen(schluessel)))?;
    Ok(fingerprint_of(&key))
}

// ---------------------------------------------------------------------------
// Raum-Schluessel
// ---------------------------------------------------------------------------

/// Ausgabe von `derive`
#[derive(Debug, Serialize)]
pub struct DeriveAusgabe {
    pub room_id: String,
    pub mitglieder: usize,
    /// Pruefwert zum Vergleich zwischen Mitgliedern, nicht der Schluessel
    pub pruefwert: String,
}

/// Leitet den Raum-Schluessel ab und gibt nur den Pruefwert aus
pub fn derive(sitzung: &SessionConfig, room_id: &str, schluessel: &[String]) -> Result<DeriveAusgabe> {
    let session = raum_sitzung(sitzung, room_id, schluessel)?;
    let epoch = session.keys().current_key(room_id)?;
    Ok(DeriveAusgabe {
        room_id: room_id.to_string(),
        mitglieder: epoch.members.len(),
        pruefwert: epoch.key.check_value(),
    })
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

pub fn encrypt_text(
    sitzung: &SessionConfig,
    room_id: &str,
    schluessel: &[String],
    text: &str,
) -> Result<MessageEnvelope> {
    let session = raum_sitzung(sitzung, room_id, schluessel)?;
    Ok(session.encrypt_text(room_id, text)?.to_envelope())
}

pub fn decrypt_text(
    sitzung: &SessionConfig,
    room_id: &str,
    schluessel: &[String],
    envelope: &MessageEnvelope,
) -> Result<String> {
    let session = raum_sitzung(sitzung, room_id, schluessel)?;
    let encrypted = EncryptedMessage::from_envelope(envelope)?;
    session
        .decrypt_text(room_id, &encrypted)
        .context("Nachricht nicht entschluesselbar (falscher Raum oder falsche Mitglieder?)")
}

// ---------------------------------------------------------------------------
// Dateien
// ---------------------------------------------------------------------------

/// Ergebnis von `encrypt-file`
#[derive(Debug, Serialize)]
pub struct VerschluesselteDatei {
    pub blob: PathBuf,
    pub envelope: PathBuf,
    pub groesse: u64,
}

/// Verschluesselt eine Datei nach `<name>.sealed` und `<name>.envelope.json`
pub fn encrypt_file(
    sitzung: &SessionConfig,
    dateien: &DateiEinstellungen,
    room_id: &str,
    schluessel: &[String],
    eingabe: &Path,
    mime_type: Option<&str>,
    ausgabe: Option<&Path>,
) -> Result<VerschluesselteDatei> {
    let groesse = fs::metadata(eingabe)
        .with_context(|| format!("Datei '{}' nicht lesbar", eingabe.display()))?
        .len();
    if groesse > dateien.max_groesse_bytes {
        bail!(
            "Datei '{}' ist zu gross: {} Bytes (Maximum {})",
            eingabe.display(),
            groesse,
            dateien.max_groesse_bytes
        );
    }

    let dateiname = eingabe
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Ungueltiger Dateiname: '{}'", eingabe.display()))?
        .to_string();
    let mime_type = mime_type
        .map(str::to_string)
        .unwrap_or_else(|| mime_aus_endung(eingabe).to_string());

    let session = raum_sitzung(sitzung, room_id, schluessel)?;
    let inhalt = fs::read(eingabe)
        .with_context(|| format!("Datei '{}' nicht lesbar", eingabe.display()))?;
    let encrypted = session.encrypt_file(room_id, &inhalt, &dateiname, &mime_type)?;

    let ziel = ausgabe_verzeichnis(ausgabe, dateien, eingabe);
    fs::create_dir_all(&ziel)
        .with_context(|| format!("Verzeichnis '{}' nicht anlegbar", ziel.display()))?;

    let blob_name = format!("{dateiname}.{BLOB_ENDUNG}");
    let blob = ziel.join(&blob_name);
    let envelope = ziel.join(format!("{dateiname}.{ENVELOPE_ENDUNG}"));

    fs::write(&blob, &encrypted.ciphertext)
        .with_context(|| format!("'{}' nicht schreibbar", blob.display()))?;
    let json = serde_json::to_string_pretty(&encrypted.to_envelope(blob_name))?;
    fs::write(&envelope, json)
        .with_context(|| format!("'{}' nicht schreibbar", envelope.display()))?;

    tracing::info!(room_id = room_id, groesse = groesse, "Datei verschluesselt");

    Ok(VerschluesselteDatei {
        blob,
        envelope,
        groesse,
    })
}

/// Entschluesselt anhand eines Envelope-JSON; der Blob wird relativ zum
/// Envelope aufgeloest. Liefert den Pfad der geschriebenen Datei.
pub fn decrypt_file(
    sitzung: &SessionConfig,
    dateien: &DateiEinstellungen,
    room_id: &str,
    schluessel: &[String],
    envelope_pfad: &Path,
    ausgabe: Option<&Path>,
) -> Result<PathBuf> {
    let json = fs::read_to_string(envelope_pfad)
        .with_context(|| format!("Envelope '{}' nicht lesbar", envelope_pfad.display()))?;
    let envelope: FileEnvelope = serde_json::from_str(&json)
        .with_context(|| format!("Envelope '{}' ungueltig", envelope_pfad.display()))?;

    let basis = envelope_pfad.parent().unwrap_or_else(|| Path::new("."));
    let blob = basis.join(blob_dateiname(&envelope.blob_ref)?);
    let ciphertext =
        fs::read(&blob).with_context(|| format!("Blob '{}' nicht lesbar", blob.display()))?;

    let session = raum_sitzung(sitzung, room_id, schluessel)?;
    let encrypted = EncryptedFile::from_envelope(&envelope, ciphertext)?;
    let datei = session
        .decrypt_file(room_id, &encrypted)
        .context("Datei nicht entschluesselbar (falscher Raum oder falsche Mitglieder?)")?;

    // Nur der letzte Pfad-Bestandteil des versiegelten Namens wird benutzt
    let dateiname = Path::new(&datei.metadata.filename)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("entschluesselt.bin"));
    let ziel = ausgabe_verzeichnis(ausgabe, dateien, envelope_pfad);
    fs::create_dir_all(&ziel)
        .with_context(|| format!("Verzeichnis '{}' nicht anlegbar", ziel.display()))?;
    let pfad = ziel.join(dateiname);
    if pfad.exists() {
        bail!("'{}' existiert bereits", pfad.display());
    }
    fs::write(&pfad, &datei.bytes)
        .with_context(|| format!("'{}' nicht schreibbar", pfad.display()))?;

    tracing::info!(
        room_id = room_id,
        groesse = datei.metadata.size,
        mime = %datei.metadata.mime_type,
        "Datei entschluesselt"
    );
    Ok(pfad)
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen
// ---------------------------------------------------------------------------

fn raum_sitzung(sitzung: &SessionConfig, room_id: &str, schluessel: &[String]) -> Result<CryptoSession> {
    let member_keys = schluessel
        .iter()
        .map(|s| {
            MemberPublicKey::from_base64(s)
                .with_context(|| format!("Schluessel '{}' nicht lesbar", kuerzen(s)))
        })
        .collect::<Result<Vec<_>>>()?;

    let session = CryptoSession::start(sitzung.clone())?;
    session
        .update_membership(room_id, &member_keys)
        .with_context(|| format!("Raum-Schluessel fuer '{room_id}' nicht ableitbar"))?;
    Ok(session)
}

/// Der Blob muss neben dem Envelope liegen: nur ein einzelner Dateiname
fn blob_dateiname(blob_ref: &str) -> Result<&Path> {
    let pfad = Path::new(blob_ref);
    let mut teile = pfad.components();
    match (teile.next(), teile.next()) {
        (Some(Component::Normal(_)), None) => Ok(pfad),
        _ => bail!("Ungueltige Blob-Referenz '{}'", kuerzen(blob_ref)),
    }
}

fn ausgabe_verzeichnis(explizit: Option<&Path>, dateien: &DateiEinstellungen, neben: &Path) -> PathBuf {
    explizit
        .map(Path::to_path_buf)
        .or_else(|| dateien.ausgabe_verzeichnis.clone())
        .unwrap_or_else(|| {
            neben
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        })
}

/// Grobe MIME-Erkennung ueber die Dateiendung
pub fn mime_aus_endung(pfad: &Path) -> &'static str {
    let endung = pfad
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match endung.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("txt" | "md") => "text/plain",
        Some("json") => "application/json",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

fn kuerzen(s: &str) -> String {
    if s.chars().count() > 16 {
        format!("{}...", s.chars().take(16).collect::<String>())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_erkennung() {
        assert_eq!(mime_aus_endung(Path::new("bild.PNG")), "image/png");
        assert_eq!(mime_aus_endung(Path::new("a/b/bericht.pdf")), "application/pdf");
        assert_eq!(mime_aus_endung(Path::new("ohne_endung")), "application/octet-stream");
    }

    #[test]
    fn lange_schluessel_werden_gekuerzt() {
        assert_eq!(kuerzen("kurz"), "kurz");
        assert_eq!(kuerzen("BKgnqVnDKa0d6lCtnpLhZ2hG"), "BKgnqVnDKa0d6lCt...");
    }

    #[test]
    fn blob_referenz_nur_als_dateiname() {
        assert_eq!(blob_dateiname("notiz.txt.sealed").unwrap(), Path::new("notiz.txt.sealed"));
        for ungueltig in ["/etc/hostname", "../geheim.sealed", "a/b.sealed", "", ".", ".."] {
            let err = blob_dateiname(ungueltig).unwrap_err();
            assert!(err.to_string().contains("Ungueltige Blob-Referenz"), "{ungueltig}");
        }
    }

    #[test]
    fn ausgabe_reihenfolge() {
        let mut dateien = DateiEinstellungen::default();
        let eingabe = Path::new("/daten/notiz.txt");
        assert_eq!(ausgabe_verzeichnis(None, &dateien, eingabe), PathBuf::from("/daten"));

        dateien.ausgabe_verzeichnis = Some(PathBuf::from("/konfig"));
        assert_eq!(ausgabe_verzeichnis(None, &dateien, eingabe), PathBuf::from("/konfig"));
        assert_eq!(
            ausgabe_verzeichnis(Some(Path::new("/cli")), &dateien, eingabe),
            PathBuf::from("/cli")
        );
    }

    #[test]
    fn keygen_mit_proof() {
        let ausgabe = keygen(&SessionConfig::default(), Some("AB12C9")).unwrap();
        assert!(ausgabe.join_proof.is_some());
        let fp = fingerprint_berechnen(&ausgabe.public_key).unwrap();
        assert_eq!(fp.to_string(), ausgabe.fingerprint);
        // SPKI liefert denselben Fingerprint
        let fp_spki = fingerprint_berechnen(&ausgabe.public_key_spki).unwrap();
        assert_eq!(fp, fp_spki);
    }
}
