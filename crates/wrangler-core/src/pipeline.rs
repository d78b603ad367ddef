//! Normalizador / pipeline: la máquina de estados que convierte líneas de
//! entrada en filas de diccionario y filas de hechos.
//!
//! Por línea:
//! 1. decodificar (`decode_line`); si falla, registrar, contar y saltar. Una
//!    línea saltada no consume ordinal de mensaje.
//! 2. abrir una unidad de trabajo en el sink.
//! 3. por cada span, en orden: resolver contexto y punto en los diccionarios,
//!    insertando primero en el sink cuando no se conocen (gana el primero
//!    visto), y armar la fila de hechos.
//! 4. agregar las filas de hechos, confirmar y promover las entradas
//!    pendientes de los diccionarios.
//! 5. avanzar el ordinal de mensaje.
//!
//! Cualquier error del sink revierte la unidad de trabajo, descarta las
//! entradas pendientes y se devuelve al llamador (fatal, sin reintentos).

use std::hash::Hash;
use std::io::BufRead;

use log::{debug, error, info, warn};

use crate::decode::decode_line;
use crate::dictionary::Dictionary;
use crate::errors::{PipelineError, SinkError};
use crate::model::{Context, DictId, MessageId, NormalizedSpan, Point, RawSpan};
use crate::sink::{Sink, SinkWriter};

/// Parámetros de una ejecución.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Línea de progreso cada N mensajes (0 la desactiva).
    pub progress_every: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { progress_every: 1 }
    }
}

/// Resultado de un mensaje confirmado.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageStats {
    pub message_id: MessageId,
    pub spans: usize,
    pub new_contexts: usize,
    pub new_points: usize,
}

/// Qué pasó con una línea de entrada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Processed(MessageStats),
    /// La línea no se pudo decodificar; `line_no` es base 1.
    Skipped { line_no: u64, reason: String },
}

/// Contadores de una ejecución completa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub lines_read: u64,
    pub messages: u64,
    pub skipped_lines: u64,
    pub spans: u64,
    pub new_contexts: u64,
    pub new_points: u64,
}

/// Conduce decodificación, resolución en diccionarios y escrituras al sink.
///
/// Es dueño del sink y de ambos diccionarios; no hay estado global.
pub struct Pipeline<S: Sink> {
    sink: S,
    contexts: Dictionary<Context>,
    points: Dictionary<Point>,
    next_message: MessageId,
    options: PipelineOptions,
    summary: RunSummary,
}

impl<S: Sink> Pipeline<S> {
    /// Prepara el esquema del sink y precarga ambos diccionarios desde él.
    pub fn open(sink: S) -> Result<Self, PipelineError> {
        Self::open_with(sink, PipelineOptions::default())
    }

    pub fn open_with(mut sink: S, options: PipelineOptions) -> Result<Self, PipelineError> {
        sink.ensure_schema()?;
        let mut contexts = Dictionary::new();
        let loaded_contexts = contexts.preload(sink.load_contexts()?)?;
        let mut points = Dictionary::new();
        let loaded_points = points.preload(sink.load_points()?)?;
        info!("dictionaries preloaded contexts={loaded_contexts} points={loaded_points}");
        Ok(Self {
            sink,
            contexts,
            points,
            next_message: 0,
            options,
            summary: RunSummary::default(),
        })
    }

    /// Lee `reader` línea por línea hasta el final.
    pub fn run<R: BufRead>(&mut self, mut reader: R) -> Result<RunSummary, PipelineError> {
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            self.process_line(&line)?;
        }
        let s = &self.summary;
        info!(
            "run finished lines={} messages={} skipped={} spans={} new_contexts={} new_points={}",
            s.lines_read, s.messages, s.skipped_lines, s.spans, s.new_contexts, s.new_points
        );
        Ok(self.summary.clone())
    }

    /// Procesa una línea cruda. Las fallas de decodificación se reportan como
    /// `LineOutcome::Skipped`; solo las fallas del sink son errores.
    pub fn process_line(&mut self, line: &[u8]) -> Result<LineOutcome, PipelineError> {
        self.summary.lines_read += 1;
        let line_no = self.summary.lines_read;
        match decode_line(line) {
            Ok(spans) => Ok(LineOutcome::Processed(self.process_message(&spans)?)),
            Err(e) => {
                warn!("skipping line {line_no} (next message {}): {e}", self.next_message);
                self.summary.skipped_lines += 1;
                Ok(LineOutcome::Skipped { line_no, reason: e.to_string() })
            }
        }
    }

    /// Normaliza un mensaje ya decodificado dentro de una sola unidad de
    /// trabajo.
    pub fn process_message(&mut self, spans: &[RawSpan]) -> Result<MessageStats, PipelineError> {
        let message_id = self.next_message;
        let Self { sink, contexts, points, .. } = self;
        let outcome = sink.unit_of_work(|w| {
            normalize_message(w, &mut *contexts, &mut *points, message_id, spans)
        });
        let stats = match outcome {
            Ok(stats) => {
                contexts.commit_staged();
                points.commit_staged();
                stats
            }
            Err(e) => {
                let dropped = contexts.discard_staged() + points.discard_staged();
                error!("message {message_id} rolled back, {dropped} staged entries dropped: {e}");
                return Err(e);
            }
        };

        self.next_message += 1;
        self.summary.messages += 1;
        self.summary.spans += stats.spans as u64;
        self.summary.new_contexts += stats.new_contexts as u64;
        self.summary.new_points += stats.new_points as u64;
        let every = self.options.progress_every;
        if every > 0 && (message_id + 1) % every == 0 {
            info!("processed message {message_id} spans={}", stats.spans);
        }
        Ok(stats)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn contexts(&self) -> &Dictionary<Context> {
        &self.contexts
    }

    pub fn points(&self) -> &Dictionary<Point> {
        &self.points
    }

    /// Ordinal que recibirá el próximo mensaje decodificado.
    pub fn next_message_id(&self) -> MessageId {
        self.next_message
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }
}

fn normalize_message(
    writer: &mut dyn SinkWriter,
    contexts: &mut Dictionary<Context>,
    points: &mut Dictionary<Point>,
    message_id: MessageId,
    spans: &[RawSpan],
) -> Result<MessageStats, PipelineError> {
    let mut stats = MessageStats { message_id, spans: spans.len(), ..Default::default() };
    let mut facts = Vec::with_capacity(spans.len());
    for span in spans {
        let (context_id, new_context) =
            resolve_or_insert(contexts, &span.context, "context", |c| writer.insert_context(c))?;
        let (point_id, new_point) =
            resolve_or_insert(points, &span.point, "point", |p| writer.insert_point(p))?;
        stats.new_contexts += usize::from(new_context);
        stats.new_points += usize::from(new_point);
        facts.push(NormalizedSpan {
            message_id,
            context_id,
            point_id,
            timing: span.timing,
            consumption: span.consumption,
        });
    }
    writer.append_facts(message_id, &facts)?;
    Ok(stats)
}

/// Acierto en caché: devuelve el id conocido. Fallo: inserta primero en el
/// sink y deja pendiente el id que el sink asignó.
fn resolve_or_insert<K, F>(
    dict: &mut Dictionary<K>,
    key: &K,
    what: &str,
    insert: F,
) -> Result<(DictId, bool), PipelineError>
where
    K: Eq + Hash + Clone,
    F: FnOnce(&K) -> Result<DictId, SinkError>,
{
    if let Some(id) = dict.resolve(key) {
        return Ok((id, false));
    }
    let id = insert(key)?;
    dict.stage(key.clone(), id)?;
    debug!("added {what} {id}");
    Ok((id, true))
}
