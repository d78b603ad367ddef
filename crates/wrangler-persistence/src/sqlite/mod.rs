//! Sink relacional sobre SQLite (diesel).
//!
//! Objetivos del módulo:
//! - `contexts` / `points` son los diccionarios durables; sus restricciones
//!   UNIQUE son la autoridad final sobre la deduplicación.
//! - Los ids sustitutos son rowids de SQLite (`INTEGER PRIMARY KEY`), devueltos
//!   con `RETURNING id`: sobreviven reinicios y nunca se renumeran.
//! - Cada unidad de trabajo es una transacción diesel: los inserts de
//!   diccionario y las filas `traces` de un mensaje se confirman juntos o no
//!   se confirman.
//! - Las claves foráneas se aplican en la conexión (`PRAGMA foreign_keys`).

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use wrangler_core::{
    Context, DictId, MessageId, NormalizedSpan, Point, Sink, SinkError, SinkWriter,
};

use crate::config::SqliteConfig;
use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{contexts, points, traces};

/// SQLite limita los parámetros por sentencia; cada fila de `traces` usa 7.
const TRACE_INSERT_CHUNK: usize = 1000;

/// Fila de `contexts` tal como está guardada.
#[derive(Queryable, Debug)]
pub struct ContextRow {
    pub id: i64,
    pub code_cid: Option<String>,
    pub method_num: Option<i32>,
}

/// Fila de `points` tal como está guardada.
#[derive(Queryable, Debug)]
pub struct PointRow {
    pub id: i64,
    pub event: Option<String>,
    pub label: Option<String>,
}

/// Fila de `traces` tal como está guardada. `fuel_consumed` / `gas_consumed`
/// son NULL cuando el span no los reportó.
#[derive(Queryable, Debug, Clone, PartialEq, Eq)]
pub struct TraceRow {
    pub trace_id: i64,
    pub message_id: i64,
    pub context_id: i64,
    pub point_id: i64,
    pub elapsed_rel_ns: i64,
    pub elapsed_cum_ns: i64,
    pub fuel_consumed: Option<i64>,
    pub gas_consumed: Option<i64>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = contexts)]
struct NewContextRow<'a> {
    code_cid: Option<&'a str>,
    method_num: Option<i32>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = points)]
struct NewPointRow<'a> {
    event: Option<&'a str>,
    label: Option<&'a str>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = traces)]
#[diesel(treat_none_as_default_value = false)]
struct NewTraceRow {
    message_id: i64,
    context_id: i64,
    point_id: i64,
    elapsed_rel_ns: i64,
    elapsed_cum_ns: i64,
    fuel_consumed: Option<i64>,
    gas_consumed: Option<i64>,
}

impl TryFrom<ContextRow> for (Context, DictId) {
    type Error = SinkError;

    fn try_from(row: ContextRow) -> Result<Self, SinkError> {
        let raw = row.method_num.unwrap_or(0);
        let method_num = u8::try_from(raw).map_err(|_| {
            SinkError::InvalidRow(format!("contexts.id={} method_num={raw}", row.id))
        })?;
        let context = Context {
            code_cid: row.code_cid.unwrap_or_default(),
            method_num,
        };
        Ok((context, stored_id("contexts", row.id)?))
    }
}

impl TryFrom<PointRow> for (Point, DictId) {
    type Error = SinkError;

    fn try_from(row: PointRow) -> Result<Self, SinkError> {
        let point = Point {
            event: row.event.unwrap_or_default(),
            label: row.label.unwrap_or_default(),
        };
        Ok((point, stored_id("points", row.id)?))
    }
}

fn stored_id(table: &str, id: i64) -> Result<DictId, SinkError> {
    DictId::try_from(id).map_err(|_| SinkError::InvalidRow(format!("{table}.id={id}")))
}

/// u64 -> INTEGER de SQLite (64 bits con signo). Se rechaza todo lo que supere
/// `i64::MAX`.
fn to_sql_int(column: &'static str, value: u64) -> Result<i64, SinkError> {
    i64::try_from(value).map_err(|_| SinkError::OutOfRange { column, value })
}

fn to_trace_row(message_id: MessageId, fact: &NormalizedSpan) -> Result<NewTraceRow, SinkError> {
    let fuel_consumed = fact
        .fuel_consumed()
        .map(|v| to_sql_int("traces.fuel_consumed", v))
        .transpose()?;
    let gas_consumed = fact
        .gas_consumed()
        .map(|v| to_sql_int("traces.gas_consumed", v))
        .transpose()?;
    Ok(NewTraceRow {
        message_id: to_sql_int("traces.message_id", message_id)?,
        context_id: to_sql_int("traces.context_id", fact.context_id)?,
        point_id: to_sql_int("traces.point_id", fact.point_id)?,
        elapsed_rel_ns: to_sql_int("traces.elapsed_rel_ns", fact.elapsed_rel_ns())?,
        elapsed_cum_ns: to_sql_int("traces.elapsed_cum_ns", fact.elapsed_cum_ns())?,
        fuel_consumed,
        gas_consumed,
    })
}

/// `SinkWriter` atado a la conexión de una transacción abierta.
struct SqliteWriter<'c> {
    conn: &'c mut SqliteConnection,
}

impl SinkWriter for SqliteWriter<'_> {
    fn insert_context(&mut self, context: &Context) -> Result<DictId, SinkError> {
        let row = NewContextRow {
            code_cid: Some(context.code_cid.as_str()),
            method_num: Some(i32::from(context.method_num)),
        };
        let id: i64 = diesel::insert_into(contexts::table)
            .values(&row)
            .returning(contexts::id)
            .get_result(self.conn)
            .map_err(PersistenceError::from)?;
        stored_id("contexts", id)
    }

    fn insert_point(&mut self, point: &Point) -> Result<DictId, SinkError> {
        let row = NewPointRow {
            event: Some(point.event.as_str()),
            label: Some(point.label.as_str()),
        };
        let id: i64 = diesel::insert_into(points::table)
            .values(&row)
            .returning(points::id)
            .get_result(self.conn)
            .map_err(PersistenceError::from)?;
        stored_id("points", id)
    }

    fn append_facts(
        &mut self,
        message_id: MessageId,
        facts: &[NormalizedSpan],
    ) -> Result<(), SinkError> {
        let rows = facts
            .iter()
            .map(|f| to_trace_row(message_id, f))
            .collect::<Result<Vec<_>, _>>()?;
        for chunk in rows.chunks(TRACE_INSERT_CHUNK) {
            diesel::insert_into(traces::table)
                .values(chunk)
                .execute(self.conn)
                .map_err(PersistenceError::from)?;
        }
        Ok(())
    }
}

/// Error de transacción: falló el trabajo del llamador o falló diesel
/// (begin / commit / rollback).
enum TxError<E> {
    Work(E),
    Db(diesel::result::Error),
}

impl<E> From<diesel::result::Error> for TxError<E> {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Db(err)
    }
}

/// `Sink` relacional sobre una conexión SQLite.
pub struct SqliteSink {
    conn: SqliteConnection,
}

impl SqliteSink {
    /// Abre (creándola si hace falta) la base y aplica los pragmas de
    /// conexión. El esquema lo crea `ensure_schema`.
    pub fn open(config: SqliteConfig) -> Result<Self, PersistenceError> {
        let mut conn = SqliteConnection::establish(&config.path)?;
        conn.batch_execute(&config.pragmas())?;
        debug!(
            "sqlite sink opened path={} journal_mode={}",
            config.path, config.journal_mode
        );
        Ok(Self { conn })
    }

    pub fn open_path(path: impl Into<String>) -> Result<Self, PersistenceError> {
        Self::open(SqliteConfig::for_path(path))
    }

    /// Todas las filas de `traces` ordenadas por `trace_id`.
    pub fn load_traces(&mut self) -> Result<Vec<TraceRow>, PersistenceError> {
        Ok(traces::table
            .order(traces::trace_id.asc())
            .load(&mut self.conn)?)
    }

    /// Acceso directo a la conexión (inspección y mantenimiento).
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl Sink for SqliteSink {
    fn ensure_schema(&mut self) -> Result<(), SinkError> {
        run_pending_migrations(&mut self.conn)?;
        Ok(())
    }

    fn load_contexts(&mut self) -> Result<Vec<(Context, DictId)>, SinkError> {
        let rows: Vec<ContextRow> = contexts::table
            .order(contexts::id.asc())
            .load(&mut self.conn)
            .map_err(PersistenceError::from)?;
        rows.into_iter()
            .map(<(Context, DictId)>::try_from)
            .collect()
    }

    fn load_points(&mut self) -> Result<Vec<(Point, DictId)>, SinkError> {
        let rows: Vec<PointRow> = points::table
            .order(points::id.asc())
            .load(&mut self.conn)
            .map_err(PersistenceError::from)?;
        rows.into_iter().map(<(Point, DictId)>::try_from).collect()
    }

    fn unit_of_work<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        E: From<SinkError>,
        F: FnOnce(&mut dyn SinkWriter) -> Result<T, E>,
    {
        // diesel hace rollback siempre que el closure devuelve Err
        let outcome = self.conn.transaction::<T, TxError<E>, _>(|conn| {
            let mut writer = SqliteWriter { conn };
            work(&mut writer).map_err(TxError::Work)
        });
        match outcome {
            Ok(v) => Ok(v),
            Err(TxError::Work(e)) => {
                warn!("sqlite transaction rolled back");
                Err(e)
            }
            Err(TxError::Db(e)) => Err(E::from(SinkError::from(PersistenceError::from(e)))),
        }
    }
}
