//! Parámetros de conexión del sink SQLite, leídos del entorno.
//! El archivo `.env` se carga una sola vez, de forma perezosa.

use std::env;

use dotenvy::dotenv;
use log::warn;
use once_cell::sync::Lazy;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // sin .env también está bien
});

const JOURNAL_MODES: [&str; 6] = ["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    /// Ruta del archivo de base de datos.
    pub path: String,
    /// `PRAGMA journal_mode`; WAL salvo que se indique otro.
    pub journal_mode: String,
    /// `PRAGMA busy_timeout` en milisegundos.
    pub busy_timeout_ms: u32,
}

impl SqliteConfig {
    /// Parámetros para una ruta explícita; el resto sale de `WRANGLER_SQLITE_*`.
    pub fn for_path(path: impl Into<String>) -> Self {
        init_dotenv();
        let journal_mode = match env::var("WRANGLER_SQLITE_JOURNAL_MODE") {
            Ok(v) if JOURNAL_MODES.contains(&v.to_ascii_uppercase().as_str()) => {
                v.to_ascii_uppercase()
            }
            Ok(v) => {
                warn!("ignoring unsupported WRANGLER_SQLITE_JOURNAL_MODE={v}, using WAL");
                "WAL".to_string()
            }
            Err(_) => "WAL".to_string(),
        };
        let busy_timeout_ms = env::var("WRANGLER_SQLITE_BUSY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000);
        Self {
            path: path.into(),
            journal_mode,
            busy_timeout_ms,
        }
    }

    /// Parámetros desde `DATABASE_URL` (ruta simple o `sqlite://ruta`), si existe.
    pub fn from_env() -> Option<Self> {
        init_dotenv();
        let url = env::var("DATABASE_URL").ok()?;
        let path = url.strip_prefix("sqlite://").unwrap_or(&url).to_string();
        Some(Self::for_path(path))
    }

    /// Sentencias que se ejecutan en cada conexión nueva.
    pub fn pragmas(&self) -> String {
        format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {}; PRAGMA journal_mode = {};",
            self.busy_timeout_ms, self.journal_mode
        )
    }
}

/// Fuerza la carga de `.env` para aplicaciones que leen otras variables.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
