//! Sink de archivos separados: tres flujos JSON delimitados por línea
//! (contexts, points, spans) escritos en secuencia, en orden de descubrimiento.
//!
//! Los ids son base 0, un contador por diccionario, para que los flujos
//! coincidan con los archivos que generaban las ejecuciones anteriores del
//! normalizador.
//!
//! Aquí no hay rollback; una unidad de trabajo termina con un flush de los
//! tres writers. Una falla a mitad de un mensaje puede dejar los flujos
//! inconsistentes entre sí.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use wrangler_core::{
    Consumption, Context, DictId, MessageId, NormalizedSpan, Point, Sink, SinkError, SinkWriter,
    Timing,
};

/// Rutas de salida derivadas de una ruta de entrada.
///
/// `dir/trace.json` -> `dir/trace.json.contexts.json`,
/// `dir/trace.json.points.json`, `dir/trace.json.spans.json`. Sin extensión el
/// sufijo es solo `.contexts` / `.points` / `.spans`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitFilePaths {
    pub contexts: PathBuf,
    pub points: PathBuf,
    pub spans: PathBuf,
}

impl SplitFilePaths {
    pub fn derive(input: &Path) -> Self {
        let file = input.file_name().map(OsString::from).unwrap_or_default();
        let ext = input
            .extension()
            .map(|e| {
                let mut dotted = OsString::from(".");
                dotted.push(e);
                dotted
            })
            .unwrap_or_default();
        let sibling = |kind: &str| {
            let mut name = file.clone();
            name.push(".");
            name.push(kind);
            name.push(&ext);
            input.with_file_name(name)
        };
        Self {
            contexts: sibling("contexts"),
            points: sibling("points"),
            spans: sibling("spans"),
        }
    }
}

/// Registro del flujo de contextos: los campos del contexto más su id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
    #[serde(flatten)]
    pub context: Context,
    pub id: DictId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRecord {
    #[serde(flatten)]
    pub point: Point,
    pub id: DictId,
}

/// Registro del flujo de spans, uno por fila de hechos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanRecord {
    pub msg: MessageId,
    pub ctx: DictId,
    pub p: DictId,
    pub c: Consumption,
    pub t: Timing,
}

impl From<&NormalizedSpan> for SpanRecord {
    fn from(f: &NormalizedSpan) -> Self {
        Self {
            msg: f.message_id,
            ctx: f.context_id,
            p: f.point_id,
            c: f.consumption,
            t: f.timing,
        }
    }
}

fn write_line<W: Write, T: Serialize>(out: &mut W, record: &T) -> Result<(), SinkError> {
    serde_json::to_writer(&mut *out, record)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// `Sink` sobre tres writers. Archivos por defecto, cualquier `Write` en tests.
pub struct SplitFileSink<W: Write = BufWriter<File>> {
    contexts_out: W,
    points_out: W,
    spans_out: W,
    contexts: HashMap<Context, DictId>,
    points: HashMap<Point, DictId>,
}

impl SplitFileSink<BufWriter<File>> {
    /// Crea (truncando) los tres archivos de salida.
    pub fn create(paths: &SplitFilePaths) -> Result<Self, SinkError> {
        let open = |p: &Path| -> Result<BufWriter<File>, SinkError> {
            debug!("creating {}", p.display());
            Ok(BufWriter::new(File::create(p)?))
        };
        Ok(Self::new(
            open(&paths.contexts)?,
            open(&paths.points)?,
            open(&paths.spans)?,
        ))
    }
}

impl<W: Write> SplitFileSink<W> {
    pub fn new(contexts_out: W, points_out: W, spans_out: W) -> Self {
        Self {
            contexts_out,
            points_out,
            spans_out,
            contexts: HashMap::new(),
            points: HashMap::new(),
        }
    }

    /// Hace flush y devuelve los writers como `(contexts, points, spans)`.
    pub fn into_writers(mut self) -> Result<(W, W, W), SinkError> {
        self.flush()?;
        Ok((self.contexts_out, self.points_out, self.spans_out))
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.contexts_out.flush()?;
        self.points_out.flush()?;
        self.spans_out.flush()?;
        Ok(())
    }
}

impl<W: Write> SinkWriter for SplitFileSink<W> {
    fn insert_context(&mut self, context: &Context) -> Result<DictId, SinkError> {
        if let Some(id) = self.contexts.get(context) {
            return Err(SinkError::UniqueViolation(format!(
                "context ({}, {}) already written with id {id}",
                context.code_cid, context.method_num
            )));
        }
        let id = self.contexts.len() as DictId;
        let record = ContextRecord {
            context: context.clone(),
            id,
        };
        write_line(&mut self.contexts_out, &record)?;
        self.contexts.insert(context.clone(), id);
        Ok(id)
    }

    fn insert_point(&mut self, point: &Point) -> Result<DictId, SinkError> {
        if let Some(id) = self.points.get(point) {
            return Err(SinkError::UniqueViolation(format!(
                "point ({}, {}) already written with id {id}",
                point.event, point.label
            )));
        }
        let id = self.points.len() as DictId;
        let record = PointRecord {
            point: point.clone(),
            id,
        };
        write_line(&mut self.points_out, &record)?;
        self.points.insert(point.clone(), id);
        Ok(id)
    }

    fn append_facts(
        &mut self,
        _message_id: MessageId,
        facts: &[NormalizedSpan],
    ) -> Result<(), SinkError> {
        for fact in facts {
            write_line(&mut self.spans_out, &SpanRecord::from(fact))?;
        }
        Ok(())
    }
}

impl<W: Write> Sink for SplitFileSink<W> {
    /// Nada que crear; los flujos no llevan esquema.
    fn ensure_schema(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn load_contexts(&mut self) -> Result<Vec<(Context, DictId)>, SinkError> {
        let mut out: Vec<_> = self
            .contexts
            .iter()
            .map(|(c, id)| (c.clone(), *id))
            .collect();
        out.sort_by_key(|(_, id)| *id);
        Ok(out)
    }

    fn load_points(&mut self) -> Result<Vec<(Point, DictId)>, SinkError> {
        let mut out: Vec<_> = self.points.iter().map(|(p, id)| (p.clone(), *id)).collect();
        out.sort_by_key(|(_, id)| *id);
        Ok(out)
    }

    fn unit_of_work<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        E: From<SinkError>,
        F: FnOnce(&mut dyn SinkWriter) -> Result<T, E>,
    {
        let value = work(&mut *self)?;
        self.flush()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_the_input_name() {
        let p = SplitFilePaths::derive(Path::new("/data/trace.json"));
        assert_eq!(p.contexts, PathBuf::from("/data/trace.json.contexts.json"));
        assert_eq!(p.points, PathBuf::from("/data/trace.json.points.json"));
        assert_eq!(p.spans, PathBuf::from("/data/trace.json.spans.json"));

        let p = SplitFilePaths::derive(Path::new("trace"));
        assert_eq!(p.spans, PathBuf::from("trace.spans"));
    }

    #[test]
    fn records_mirror_the_line_encoding() {
        let rec = ContextRecord {
            context: Context::new("bafk1", 0),
            id: 4,
        };
        assert_eq!(
            serde_json::to_string(&rec).unwrap(),
            r#"{"code_cid":"bafk1","id":4}"#
        );

        let rec = SpanRecord {
            msg: 0,
            ctx: 1,
            p: 2,
            c: Consumption {
                fuel_consumed: None,
                gas_consumed: Some(0),
            },
            t: Timing::default(),
        };
        assert_eq!(
            serde_json::to_string(&rec).unwrap(),
            r#"{"msg":0,"ctx":1,"p":2,"c":{"gas_consumed":0},"t":{}}"#
        );
    }

    #[test]
    fn seen_key_is_never_written_twice() {
        let mut sink = SplitFileSink::new(Vec::new(), Vec::new(), Vec::new());
        let err = sink
            .unit_of_work(|w| -> Result<DictId, SinkError> {
                w.insert_point(&Point::new("Started", ""))?;
                w.insert_point(&Point::new("Started", ""))
            })
            .unwrap_err();
        assert!(matches!(err, SinkError::UniqueViolation(_)));
        let (_, points, _) = sink.into_writers().unwrap();
        assert_eq!(
            String::from_utf8(points).unwrap(),
            "{\"event\":\"Started\",\"id\":0}\n"
        );
    }

    #[test]
    fn first_ids_are_zero_in_every_stream() {
        let mut sink = SplitFileSink::new(Vec::new(), Vec::new(), Vec::new());
        let ids = sink
            .unit_of_work(|w| -> Result<_, SinkError> {
                let a = w.insert_context(&Context::new("a", 0))?;
                let b = w.insert_context(&Context::new("b", 0))?;
                let p = w.insert_point(&Point::new("S", ""))?;
                Ok((a, b, p))
            })
            .unwrap();
        assert_eq!(ids, (0, 1, 0));
        assert_eq!(
            sink.load_contexts().unwrap(),
            vec![(Context::new("a", 0), 0), (Context::new("b", 0), 1)]
        );
    }
}
