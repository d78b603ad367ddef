//! Migraciones diesel embebidas.
//!
//! `ensure_schema` del sink relacional las corre en cada arranque; el SQL solo
//! usa `CREATE TABLE IF NOT EXISTS`, así que repetirlas no tiene efecto.

use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

use crate::error::PersistenceError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub fn run_pending_migrations(conn: &mut SqliteConnection) -> Result<(), PersistenceError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| PersistenceError::Migration(e.to_string()))?;
    for version in applied {
        info!("applied migration {version}");
    }
    Ok(())
}
