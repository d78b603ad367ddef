//! Línea de comandos de `gas-wrangler`.
//!
//! Uso:
//!   gas-wrangler load traces.json traces.db
//!   gas-wrangler load traces.json            (base tomada de DATABASE_URL)
//!   gas-wrangler normalize traces.json

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "gas-wrangler")]
#[command(about = "Normalize VM execution traces into deduplicated contexts, points and spans")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a trace file into an SQLite database
    Load {
        /// Trace file, one JSON array of spans per line
        input: PathBuf,
        /// SQLite database file (created if missing)
        database: Option<String>,
    },
    /// Write <INPUT>.contexts, <INPUT>.points and <INPUT>.spans next to the input
    Normalize {
        /// Trace file, one JSON array of spans per line
        input: PathBuf,
    },
}
