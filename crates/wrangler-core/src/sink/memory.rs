use std::collections::HashMap;

use log::debug;

use super::{Sink, SinkWriter};
use crate::errors::SinkError;
use crate::model::{Context, DictId, MessageId, NormalizedSpan, Point};

/// Sink mantenido completamente en memoria.
///
/// Mismo contrato observable que el sink relacional (ids base 1, unicidad,
/// chequeo referencial de hechos, rollback de una unidad de trabajo fallida),
/// sin durabilidad. Útil para tests y ejecuciones en seco.
#[derive(Debug, Default)]
pub struct InMemorySink {
    contexts: Vec<(Context, DictId)>,
    points: Vec<(Point, DictId)>,
    facts: Vec<NormalizedSpan>,
    context_index: HashMap<Context, DictId>,
    point_index: HashMap<Point, DictId>,
    schema_ready: bool,
    commits: usize,
    rollbacks: usize,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contexts(&self) -> &[(Context, DictId)] {
        &self.contexts
    }

    pub fn points(&self) -> &[(Point, DictId)] {
        &self.points
    }

    pub fn facts(&self) -> &[NormalizedSpan] {
        &self.facts
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    fn truncate_to(&mut self, contexts: usize, points: usize, facts: usize) {
        for (ctx, _) in self.contexts.drain(contexts..) {
            self.context_index.remove(&ctx);
        }
        for (point, _) in self.points.drain(points..) {
            self.point_index.remove(&point);
        }
        self.facts.truncate(facts);
    }
}

impl SinkWriter for InMemorySink {
    fn insert_context(&mut self, context: &Context) -> Result<DictId, SinkError> {
        if let Some(id) = self.context_index.get(context) {
            return Err(SinkError::UniqueViolation(format!(
                "contexts ({}, {}) already has id {id}",
                context.code_cid, context.method_num
            )));
        }
        let id = self.contexts.len() as DictId + 1;
        self.contexts.push((context.clone(), id));
        self.context_index.insert(context.clone(), id);
        Ok(id)
    }

    fn insert_point(&mut self, point: &Point) -> Result<DictId, SinkError> {
        if let Some(id) = self.point_index.get(point) {
            return Err(SinkError::UniqueViolation(format!(
                "points ({}, {}) already has id {id}",
                point.event, point.label
            )));
        }
        let id = self.points.len() as DictId + 1;
        self.points.push((point.clone(), id));
        self.point_index.insert(point.clone(), id);
        Ok(id)
    }

    fn append_facts(
        &mut self,
        message_id: MessageId,
        facts: &[NormalizedSpan],
    ) -> Result<(), SinkError> {
        for fact in facts {
            debug_assert_eq!(fact.message_id, message_id);
            // ids densos y base 1: la pertenencia es un chequeo de rango
            if fact.context_id == 0 || fact.context_id > self.contexts.len() as DictId {
                return Err(SinkError::ForeignKeyViolation(format!(
                    "context_id {}",
                    fact.context_id
                )));
            }
            if fact.point_id == 0 || fact.point_id > self.points.len() as DictId {
                return Err(SinkError::ForeignKeyViolation(format!(
                    "point_id {}",
                    fact.point_id
                )));
            }
            self.facts.push(*fact);
        }
        Ok(())
    }
}

impl Sink for InMemorySink {
    fn ensure_schema(&mut self) -> Result<(), SinkError> {
        self.schema_ready = true;
        Ok(())
    }

    fn load_contexts(&mut self) -> Result<Vec<(Context, DictId)>, SinkError> {
        Ok(self.contexts.clone())
    }

    fn load_points(&mut self) -> Result<Vec<(Point, DictId)>, SinkError> {
        Ok(self.points.clone())
    }

    fn unit_of_work<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        E: From<SinkError>,
        F: FnOnce(&mut dyn SinkWriter) -> Result<T, E>,
    {
        if !self.schema_ready {
            return Err(SinkError::Backend("schema not initialised".into()).into());
        }
        let marks = (self.contexts.len(), self.points.len(), self.facts.len());
        match work(&mut *self) {
            Ok(v) => {
                self.commits += 1;
                Ok(v)
            }
            Err(e) => {
                debug!("in-memory unit of work rolled back");
                self.truncate_to(marks.0, marks.1, marks.2);
                self.rollbacks += 1;
                Err(e)
            }
        }
    }
}
