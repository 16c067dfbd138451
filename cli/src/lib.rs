//! sealroom-cli – Bibliotheks-Root
//!
//! Deklariert Konfiguration und Befehle und stellt sie fuer
//! Integrationstests bereit.

pub mod commands;
pub mod config;
