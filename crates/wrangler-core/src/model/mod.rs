//! Modelo de trazas: spans crudos tal como los emite la capa de
//! instrumentación de la VM y las filas de hechos normalizadas.
//!
//! Rol en el flujo:
//! - `RawSpan` es lo que produce el decoder por cada elemento de una línea
//!   (una línea = un mensaje).
//! - `Context` y `Point` son las claves naturales que deduplican los
//!   diccionarios; son inmutables una vez que reciben un id.
//! - `NormalizedSpan` es la fila de hechos que se escribe en un `Sink`; solo
//!   referencia entradas de diccionario por id.
//!
//! Formato: cualquier campo puede omitirse (o venir como `null`) cuando vale
//! cero. La excepción es `fuel_consumed` / `gas_consumed`: la ausencia se
//! conserva como `None` y nunca se colapsa a `0`.
use serde::{Deserialize, Deserializer, Serialize};

/// Id sustituto asignado por un `Sink` a una entrada de diccionario.
pub type DictId = u64;

/// Ordinal (base 0) de un mensaje decodificado dentro de una ejecución.
pub type MessageId = u64;

fn is_zero_u8(v: &u8) -> bool {
    *v == 0
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

/// `null` explícito -> valor cero del tipo.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Código y número de método en el que ocurrió un span.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub code_cid: String,
    #[serde(skip_serializing_if = "is_zero_u8", deserialize_with = "null_as_default")]
    pub method_num: u8,
}

impl Context {
    pub fn new(code_cid: impl Into<String>, method_num: u8) -> Self {
        Self { code_cid: code_cid.into(), method_num }
    }
}

/// Punto de instrumentación (evento + etiqueta) dentro de la VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Point {
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub event: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub label: String,
}

impl Point {
    pub fn new(event: impl Into<String>, label: impl Into<String>) -> Self {
        Self { event: event.into(), label: label.into() }
    }
}

/// Fuel / gas consumidos por un span. `None` significa "no reportado", que no
/// es lo mismo que un cero reportado.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consumption {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_consumed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_consumed: Option<u64>,
}

/// Tiempo transcurrido desde el inicio del mensaje y desde el span anterior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    #[serde(skip_serializing_if = "is_zero_u64", deserialize_with = "null_as_default")]
    pub elapsed_cum_ns: u64,
    #[serde(skip_serializing_if = "is_zero_u64", deserialize_with = "null_as_default")]
    pub elapsed_rel_ns: u64,
}

/// Un elemento de una línea de entrada.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSpan {
    #[serde(deserialize_with = "null_as_default")]
    pub context: Context,
    #[serde(deserialize_with = "null_as_default")]
    pub point: Point,
    #[serde(deserialize_with = "null_as_default")]
    pub consumption: Consumption,
    #[serde(deserialize_with = "null_as_default")]
    pub timing: Timing,
}

/// Fila de hechos: una por span crudo, referencia ambos diccionarios por id.
///
/// Invariante: `context_id` / `point_id` apuntan a entradas persistidas en la
/// misma unidad de trabajo o antes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedSpan {
    pub message_id: MessageId,
    pub context_id: DictId,
    pub point_id: DictId,
    pub timing: Timing,
    pub consumption: Consumption,
}

impl NormalizedSpan {
    pub fn elapsed_rel_ns(&self) -> u64 {
        self.timing.elapsed_rel_ns
    }

    pub fn elapsed_cum_ns(&self) -> u64 {
        self.timing.elapsed_cum_ns
    }

    pub fn fuel_consumed(&self) -> Option<u64> {
        self.consumption.fuel_consumed
    }

    pub fn gas_consumed(&self) -> Option<u64> {
        self.consumption.gas_consumed
    }
}
