//! # sealroom-observability
//!
//! Structured Logging fuer Sealroom via tracing-subscriber (Text oder JSON).
//! Ausgabe geht nach stderr, damit stdout fuer die Nutzdaten der CLI frei
//! bleibt.

pub mod logging;

pub use logging::{logging_initialisieren, LogFormat, LoggingFehler};
