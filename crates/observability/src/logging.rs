//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (ueberschreibt die Konfiguration):
//! - `SR_LOG_LEVEL`: Filter im `EnvFilter`-Format, z.B. `info` oder
//!   `sealroom_crypto=debug,info`
//! - `SR_LOG_FORMAT`: Format (text/json)
//!
//! Schluessel-Bytes und Klartexte werden nie geloggt, nur Raum-IDs,
//! Epochen, Groessen und Fingerprints.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

pub const ENV_LOG_LEVEL: &str = "SR_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "SR_LOG_FORMAT";

/// Fehler beim Einrichten des Loggings
#[derive(Debug, Error)]
pub enum LoggingFehler {
    #[error("Unbekanntes Log-Format: {0} (erlaubt: text, json)")]
    UnbekanntesFormat(String),

    #[error("Logging bereits initialisiert: {0}")]
    BereitsInitialisiert(String),
}

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = LoggingFehler;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            andere => Err(LoggingFehler::UnbekanntesFormat(andere.to_string())),
        }
    }
}

/// Initialisiert das Logging-System.
///
/// `SR_LOG_LEVEL` und `SR_LOG_FORMAT` haben Vorrang vor den uebergebenen
/// Werten. Ein ungueltiger Filter faellt auf `info` zurueck.
pub fn logging_initialisieren(level: &str, format: &str) -> Result<(), LoggingFehler> {
    let filter = filter_bestimmen(std::env::var(ENV_LOG_LEVEL).ok().as_deref(), level);
    let format = format_bestimmen(std::env::var(ENV_LOG_FORMAT).ok().as_deref(), format)?;

    let result = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    result.map_err(|e| LoggingFehler::BereitsInitialisiert(e.to_string()))
}

fn filter_bestimmen(env_wert: Option<&str>, konfiguriert: &str) -> EnvFilter {
    env_wert
        .and_then(|wert| EnvFilter::try_new(wert).ok())
        .or_else(|| EnvFilter::try_new(konfiguriert).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn format_bestimmen(env_wert: Option<&str>, konfiguriert: &str) -> Result<LogFormat, LoggingFehler> {
    env_wert.unwrap_or(konfiguriert).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsen() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(LoggingFehler::UnbekanntesFormat(_))
        ));
        assert!("JSON".parse::<LogFormat>().is_err());
    }

    #[test]
    fn env_format_hat_vorrang() {
        assert_eq!(format_bestimmen(Some("json"), "text").unwrap(), LogFormat::Json);
        assert_eq!(format_bestimmen(None, "text").unwrap(), LogFormat::Text);
    }

    #[test]
    fn ungueltiger_filter_faellt_zurueck() {
        // Darf nicht paniken; Rueckfall auf Konfiguration bzw. "info"
        let _ = filter_bestimmen(Some("=="), "debug");
        let _ = filter_bestimmen(None, "==");
        let filter = filter_bestimmen(Some("sealroom_crypto=trace"), "info");
        assert!(filter.to_string().contains("sealroom_crypto=trace"));
    }

    #[test]
    fn zweite_initialisierung_ist_fehler() {
        let _ = logging_initialisieren("info", "text");
        assert!(matches!(
            logging_initialisieren("info", "text"),
            Err(LoggingFehler::BereitsInitialisiert(_))
        ));
    }
}
