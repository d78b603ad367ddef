//! Configuración de la aplicación.
//! Se lee una vez del entorno (`.env` incluido) y se expone como `CONFIG`.
use std::env;

use once_cell::sync::Lazy;
use wrangler_persistence::config::init_dotenv;
use wrangler_persistence::SqliteConfig;

/// Parámetros compartidos por ambos comandos.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Línea de progreso cada N mensajes (`WRANGLER_PROGRESS_EVERY`, 0 = apagado).
    pub progress_every: u64,
    /// Base de respaldo para `load` cuando no se da ruta (`DATABASE_URL`).
    pub database: Option<SqliteConfig>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        init_dotenv();
        let progress_every = env::var("WRANGLER_PROGRESS_EVERY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        Self {
            progress_every,
            database: SqliteConfig::from_env(),
        }
    }

    /// La ruta explícita gana sobre `DATABASE_URL`.
    pub fn database_for(&self, explicit: Option<&str>) -> Option<SqliteConfig> {
        match explicit {
            Some(path) => Some(SqliteConfig::for_path(path)),
            None => self.database.clone(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            progress_every: 1,
            database: None,
        }
    }
}

/// Evaluada de forma perezosa, una vez por proceso.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);
