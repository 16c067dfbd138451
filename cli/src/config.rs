//! CLI-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass die CLI ohne Konfigurationsdatei
//! lauffaehig ist.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use sealroom_crypto::SessionConfig;

/// Standard-Obergrenze fuer zu verschluesselnde Dateien (100 MiB)
pub const STANDARD_MAX_DATEI_GROESSE: u64 = 100 * 1024 * 1024;

/// Vollstaendige CLI-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SealroomConfig {
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Krypto-Sitzung
    pub sitzung: SessionConfig,
    /// Datei-Verschluesselung
    pub dateien: DateiEinstellungen,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

/// Einstellungen fuer Datei-Befehle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateiEinstellungen {
    /// Groessere Dateien werden abgelehnt, bevor sie gelesen werden
    pub max_groesse_bytes: u64,
    /// Ausgabe-Verzeichnis (leer = neben der Eingabedatei)
    pub ausgabe_verzeichnis: Option<PathBuf>,
}

impl Default for DateiEinstellungen {
    fn default() -> Self {
        Self {
            max_groesse_bytes: STANDARD_MAX_DATEI_GROESSE,
            ausgabe_verzeichnis: None,
        }
    }
}

impl SealroomConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = SealroomConfig::default();
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.logging.format, "text");
        assert_eq!(cfg.sitzung.behaltene_epochen, 0);
        assert_eq!(cfg.dateien.max_groesse_bytes, 100 * 1024 * 1024);
        assert!(cfg.dateien.ausgabe_verzeichnis.is_none());
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [logging]
            format = "json"

            [sitzung]
            behaltene_epochen = 3

            [dateien]
            ausgabe_verzeichnis = "/tmp/sealroom"
        "#;
        let cfg: SealroomConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.logging.format, "json");
        assert_eq!(cfg.sitzung.behaltene_epochen, 3);
        assert_eq!(
            cfg.dateien.ausgabe_verzeichnis,
            Some(PathBuf::from("/tmp/sealroom"))
        );
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.dateien.max_groesse_bytes, STANDARD_MAX_DATEI_GROESSE);
    }

    #[test]
    fn fehlende_datei_ergibt_standardwerte() {
        let cfg = SealroomConfig::laden("/nicht/vorhanden/sealroom.toml").unwrap();
        assert_eq!(cfg.sitzung, SessionConfig::default());
    }

    #[test]
    fn kaputtes_toml_ist_fehler() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("sealroom.toml");
        std::fs::write(&pfad, "[sitzung]\nbehaltene_epochen = \"viele\"\n").unwrap();
        let err = SealroomConfig::laden(pfad.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Konfigurationsfehler"));
    }
}
