//! wrangler-core: normalización de trazas (decode -> diccionarios -> sink).
//!
//! Módulos:
//! - `model`: spans crudos, claves de diccionario y filas de hechos.
//! - `decode`: una línea de entrada -> spans crudos.
//! - `dictionary`: caché clave natural -> id sustituto, sembrada desde el sink.
//! - `sink`: traits `Sink` / `SinkWriter` más la implementación en memoria.
//! - `pipeline`: la máquina de estados de normalización por mensaje.
pub mod decode;
pub mod dictionary;
pub mod errors;
pub mod model;
pub mod pipeline;
pub mod sink;

pub use decode::decode_line;
pub use dictionary::Dictionary;
pub use errors::{DecodeError, DictionaryError, PipelineError, SinkError};
pub use model::{Consumption, Context, DictId, MessageId, NormalizedSpan, Point, RawSpan, Timing};
pub use pipeline::{LineOutcome, MessageStats, Pipeline, PipelineOptions, RunSummary};
pub use sink::{InMemorySink, Sink, SinkWriter};
