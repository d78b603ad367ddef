//! Decoder de spans: una línea de entrada -> spans crudos en orden.
//!
//! Sin efectos secundarios. Una línea mal formada produce un `DecodeError`;
//! decidir si se salta es tarea del pipeline.

use crate::errors::DecodeError;
use crate::model::RawSpan;

/// Decodifica una línea (arreglo JSON de objetos span).
///
/// Se ignoran `\n` / `\r\n` finales. `method_num` fuera de `0..=255` es un
/// error, nunca se trunca. `null` (la línea completa o un elemento) se lee
/// como valor cero: mensaje vacío o span con todos sus campos en cero.
pub fn decode_line(line: &[u8]) -> Result<Vec<RawSpan>, DecodeError> {
    let line = trim_line_end(line);
    let text = std::str::from_utf8(line)?;
    let spans: Option<Vec<Option<RawSpan>>> = serde_json::from_str(text)?;
    Ok(spans
        .unwrap_or_default()
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

fn trim_line_end(mut line: &[u8]) -> &[u8] {
    if let [rest @ .., b'\n'] = line {
        line = rest;
    }
    if let [rest @ .., b'\r'] = line {
        line = rest;
    }
    line
}
