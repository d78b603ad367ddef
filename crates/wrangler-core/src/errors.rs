//! Tipos de error del núcleo.
//!
//! Dos clases con propagación distinta:
//! - `DecodeError`: local a una línea; el pipeline lo registra y salta la
//!   línea.
//! - el resto (`SinkError`, `DictionaryError`, `PipelineError`): fatal, se
//!   propaga al llamador, que aborta la ejecución.

use thiserror::Error;

use crate::model::DictId;

/// Línea que no se pudo convertir en una secuencia de spans crudos.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Desacuerdo entre un diccionario y los ids que recibe.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DictionaryError {
    #[error("duplicate key for id {existing} (new id {id})")]
    DuplicateKey { existing: DictId, id: DictId },
    #[error("id {0} already assigned")]
    DuplicateId(DictId),
}

/// Falla reportada por una implementación de `Sink`.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("value {value} out of range for {column}")]
    OutOfRange { column: &'static str, value: u64 },
    #[error("invalid stored row: {0}")]
    InvalidRow(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Error fatal de una ejecución del pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("sink: {0}")]
    Sink(#[from] SinkError),
    #[error("dictionary: {0}")]
    Dictionary(#[from] DictionaryError),
    #[error("reading input: {0}")]
    Input(#[from] std::io::Error),
}
