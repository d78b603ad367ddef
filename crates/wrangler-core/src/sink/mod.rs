//! `Sink`: el único componente que toca estado durable.
//!
//! Contrato común a todas las implementaciones:
//! - `ensure_schema` es idempotente y se ejecuta en cada arranque.
//! - `load_contexts` / `load_points` devuelven las tablas completas de los
//!   diccionarios (vacías para un sink nuevo).
//! - `unit_of_work` agrupa todas las escrituras derivadas de un mensaje. El
//!   closure recibe un `SinkWriter`; si devuelve `Err`, la implementación
//!   descarta lo que pueda (rollback real en sinks transaccionales) y
//!   devuelve el error. El tipo de error es del llamador; solo tiene que
//!   poder absorber `SinkError`.
//! - `SinkWriter::insert_*` asignan el siguiente id sustituto y fallan con
//!   `SinkError::UniqueViolation` para una clave que el sink ya tiene.

mod memory;

pub use memory::InMemorySink;

use crate::errors::SinkError;
use crate::model::{Context, DictId, MessageId, NormalizedSpan, Point};

/// Escrituras disponibles dentro de una unidad de trabajo.
pub trait SinkWriter {
    /// Persiste un contexto nuevo y devuelve su id.
    fn insert_context(&mut self, context: &Context) -> Result<DictId, SinkError>;
    /// Persiste un punto nuevo y devuelve su id.
    fn insert_point(&mut self, point: &Point) -> Result<DictId, SinkError>;
    /// Persiste, en orden, todas las filas de hechos de un mensaje.
    fn append_facts(
        &mut self,
        message_id: MessageId,
        facts: &[NormalizedSpan],
    ) -> Result<(), SinkError>;
}

/// Destino de los diccionarios normalizados y de las filas de hechos.
pub trait Sink {
    fn ensure_schema(&mut self) -> Result<(), SinkError>;
    fn load_contexts(&mut self) -> Result<Vec<(Context, DictId)>, SinkError>;
    fn load_points(&mut self) -> Result<Vec<(Point, DictId)>, SinkError>;
    /// Ejecuta `work` como una unidad todo-o-nada (transacción o flush).
    fn unit_of_work<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        E: From<SinkError>,
        F: FnOnce(&mut dyn SinkWriter) -> Result<T, E>;
}
