//! Biblioteca de la aplicación gas-wrangler.
//!
//! - `cli`: definiciones clap de los comandos `load` / `normalize`.
//! - `config`: parámetros tomados del entorno (`CONFIG`).
//! - `app`: los dos puntos de entrada, usables sin pasar por el binario.

pub mod app;
pub mod cli;
pub mod config;

pub use app::{run_load, run_normalize};
