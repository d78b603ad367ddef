//! wrangler-persistence: implementaciones durables de `Sink`.
//!
//! - `sqlite`: sink relacional (diesel + migraciones embebidas), una
//!   transacción por mensaje.
//! - `split`: tres flujos JSON-lines de solo anexado.
//! - `config`: parámetros de conexión desde el entorno.
//! - `error`: mapeo de errores de diesel a `SinkError`.
pub mod config;
pub mod error;
pub mod migrations;
pub mod schema;
pub mod split;
pub mod sqlite;

pub use config::SqliteConfig;
pub use error::PersistenceError;
pub use split::{ContextRecord, PointRecord, SpanRecord, SplitFilePaths, SplitFileSink};
pub use sqlite::{SqliteSink, TraceRow};
