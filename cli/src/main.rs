//! Sealroom CLI – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und fuehrt den
//! gewaehlten Befehl aus. Nutzdaten gehen nach stdout, Logs nach stderr.

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sealroom_cli::commands;
use sealroom_cli::config::SealroomConfig;
use sealroom_protocol::MessageEnvelope;

/// Sealroom - Ende-zu-Ende Verschluesselung fuer Raeume
///
/// Raum-Schluessel werden aus der Raum-ID und den oeffentlichen Schluesseln
/// aller Mitglieder abgeleitet. Gleiche Eingaben ergeben auf jedem Geraet
/// denselben Schluessel.
#[derive(Parser)]
#[command(name = "sealroom")]
#[command(version)]
#[command(about = "Ende-zu-Ende Verschluesselung fuer Raeume (P-256, HKDF, AES-256-GCM)")]
struct Cli {
    #[command(subcommand)]
    command: Befehl,
}

/// Raum und Mitglieder, gemeinsam fuer alle Krypto-Befehle
#[derive(clap::Args, Debug)]
struct RaumArgs {
    /// Raum-ID (Raum-Code)
    #[arg(short, long)]
    room: String,

    /// Oeffentlicher Schluessel eines Mitglieds (Base64, roh oder SPKI); mehrfach angeben
    #[arg(short, long = "key", required = true)]
    keys: Vec<String>,
}

#[derive(Subcommand)]
enum Befehl {
    /// Erzeugt eine Sitzungs-Identitaet und zeigt den oeffentlichen Schluessel
    Keygen {
        /// Zusaetzlich einen Beitritts-Nachweis fuer diesen Raum erzeugen
        #[arg(long)]
        proof: Option<String>,
    },

    /// Zeigt den Fingerprint eines oeffentlichen Schluessels
    Fingerprint {
        /// Base64-Schluessel (roh oder SPKI)
        key: String,

        /// Nur die ersten vier Gruppen
        #[arg(short, long)]
        short: bool,
    },

    /// Leitet den Raum-Schluessel ab und zeigt seinen Pruefwert
    Derive {
        #[command(flatten)]
        raum: RaumArgs,
    },

    /// Verschluesselt Text (Argument oder stdin) zu einem Envelope-JSON
    EncryptText {
        #[command(flatten)]
        raum: RaumArgs,

        /// Klartext; ohne Angabe wird stdin gelesen
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Entschluesselt ein Envelope-JSON (Argument oder stdin)
    DecryptText {
        #[command(flatten)]
        raum: RaumArgs,

        /// Envelope-JSON; ohne Angabe wird stdin gelesen
        #[arg(short, long)]
        envelope: Option<String>,
    },

    /// Verschluesselt eine Datei zu <name>.sealed und <name>.envelope.json
    EncryptFile {
        #[command(flatten)]
        raum: RaumArgs,

        /// Zu verschluesselnde Datei
        input: PathBuf,

        /// MIME-Typ (Standard: aus der Dateiendung)
        #[arg(long)]
        mime: Option<String>,

        /// Ausgabe-Verzeichnis
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Entschluesselt eine Datei anhand ihres Envelope-JSON
    DecryptFile {
        #[command(flatten)]
        raum: RaumArgs,

        /// Pfad zu <name>.envelope.json
        envelope: PathBuf,

        /// Ausgabe-Verzeichnis
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var("SEALROOM_CONFIG").unwrap_or_else(|_| "sealroom.toml".into());
    let config = SealroomConfig::laden(&config_pfad)?;

    sealroom_observability::logging_initialisieren(&config.logging.level, &config.logging.format)?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Sealroom CLI gestartet"
    );

    ausfuehren(cli.command, config).await
}

async fn ausfuehren(befehl: Befehl, config: SealroomConfig) -> Result<()> {
    match befehl {
        Befehl::Keygen { proof } => {
            let ausgabe = commands::keygen(&config.sitzung, proof.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&ausgabe)?);
        }
        Befehl::Fingerprint { key, short } => {
            let fp = commands::fingerprint_berechnen(&key)?;
            if short {
                println!("{}", fp.short());
            } else {
                println!("{fp}");
            }
        }
        Befehl::Derive { raum } => {
            let ausgabe = commands::derive(&config.sitzung, &raum.room, &raum.keys)?;
            println!("{}", serde_json::to_string_pretty(&ausgabe)?);
        }
        Befehl::EncryptText { raum, text } => {
            let text = match text {
                Some(text) => text,
                None => stdin_lesen()?,
            };
            let envelope = commands::encrypt_text(&config.sitzung, &raum.room, &raum.keys, &text)?;
            println!("{}", serde_json::to_string(&envelope)?);
        }
        Befehl::DecryptText { raum, envelope } => {
            let json = match envelope {
                Some(json) => json,
                None => stdin_lesen()?,
            };
            let envelope: MessageEnvelope =
                serde_json::from_str(json.trim()).context("Envelope-JSON ungueltig")?;
            let text = commands::decrypt_text(&config.sitzung, &raum.room, &raum.keys, &envelope)?;
            println!("{text}");
        }
        Befehl::EncryptFile {
            raum,
            input,
            mime,
            output,
        } => {
            // Datei-Krypto blockiert; ausserhalb der Runtime-Threads ausfuehren
            let ergebnis = tokio::task::spawn_blocking(move || {
                commands::encrypt_file(
                    &config.sitzung,
                    &config.dateien,
                    &raum.room,
                    &raum.keys,
                    &input,
                    mime.as_deref(),
                    output.as_deref(),
                )
            })
            .await
            .context("Verschluesselungs-Task abgebrochen")??;
            println!("{}", serde_json::to_string_pretty(&ergebnis)?);
        }
        Befehl::DecryptFile {
            raum,
            envelope,
            output,
        } => {
            let pfad = tokio::task::spawn_blocking(move || {
                commands::decrypt_file(
                    &config.sitzung,
                    &config.dateien,
                    &raum.room,
                    &raum.keys,
                    &envelope,
                    output.as_deref(),
                )
            })
            .await
            .context("Entschluesselungs-Task abgebrochen")??;
            println!("{}", pfad.display());
        }
    }
    Ok(())
}

fn stdin_lesen() -> Result<String> {
    let mut puffer = String::new();
    io::stdin()
        .read_to_string(&mut puffer)
        .context("stdin nicht lesbar")?;
    Ok(puffer.trim_end_matches(['\r', '\n']).to_string())
}
