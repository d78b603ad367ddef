use std::collections::HashSet;

use wrangler_core::{Context, InMemorySink, Pipeline, PipelineError, Point, SinkError};

const INPUT: &str = concat!(
    r#"[{"context":{"code_cid":"baeaaaaa","method_num":0},"point":{"event":"Started","label":""},"consumption":{},"timing":{"elapsed_cum_ns":60,"elapsed_rel_ns":60}}]"#,
    "\n",
    r#"[{"context":{"code_cid":"bafk1","method_num":2},"point":{"event":"Invoke","label":"send"},"consumption":{"fuel_consumed":10,"gas_consumed":0},"timing":{"elapsed_cum_ns":5,"elapsed_rel_ns":5}},{"context":{"code_cid":"baeaaaaa","method_num":0},"point":{"event":"Finished"},"timing":{"elapsed_cum_ns":9,"elapsed_rel_ns":4}}]"#,
    "\n",
    "this is not json\n",
    r#"[{"context":{"code_cid":"bafk1","method_num":2},"point":{"event":"Invoke","label":"send"}}]"#,
    "\n",
);

fn run(input: &str) -> InMemorySink {
    let mut pipeline = Pipeline::open(InMemorySink::new()).expect("open");
    pipeline.run(input.as_bytes()).expect("run");
    pipeline.into_sink()
}

#[test]
fn same_input_same_ids_and_facts() {
    let a = run(INPUT);
    let b = run(INPUT);
    assert_eq!(a.contexts(), b.contexts());
    assert_eq!(a.points(), b.points());
    assert_eq!(a.facts(), b.facts());
    // gana el primero visto
    assert_eq!(
        a.contexts(),
        &[(Context::new("baeaaaaa", 0), 1), (Context::new("bafk1", 2), 2)]
    );
    assert_eq!(a.points()[1], (Point::new("Invoke", "send"), 2));
}

#[test]
fn dictionaries_stay_unique_and_facts_reference_them() {
    let sink = run(INPUT);
    let keys: HashSet<_> = sink.contexts().iter().map(|(c, _)| c.clone()).collect();
    assert_eq!(keys.len(), sink.contexts().len());
    let keys: HashSet<_> = sink.points().iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(keys.len(), sink.points().len());

    let context_ids: HashSet<_> = sink.contexts().iter().map(|(_, id)| *id).collect();
    let point_ids: HashSet<_> = sink.points().iter().map(|(_, id)| *id).collect();
    for f in sink.facts() {
        assert!(
            context_ids.contains(&f.context_id),
            "dangling context_id {}",
            f.context_id
        );
        assert!(point_ids.contains(&f.point_id), "dangling point_id {}", f.point_id);
    }
}

#[test]
fn malformed_line_is_skipped_and_the_rest_is_kept() {
    let sink = run(INPUT);
    let without_bad: String = INPUT
        .lines()
        .filter(|l| l.starts_with('['))
        .map(|l| format!("{l}\n"))
        .collect();
    let clean = run(&without_bad);
    assert_eq!(sink.facts(), clean.facts());
    let messages: Vec<_> = sink.facts().iter().map(|f| f.message_id).collect();
    assert_eq!(messages, [0, 1, 1, 2]);
}

#[test]
fn absent_consumption_is_not_zero() {
    let sink = run(INPUT);
    let facts = sink.facts();
    assert_eq!((facts[0].fuel_consumed(), facts[0].gas_consumed()), (None, None));
    assert_eq!(
        (facts[1].fuel_consumed(), facts[1].gas_consumed()),
        (Some(10), Some(0))
    );
}

#[test]
fn preloaded_sink_keeps_existing_ids() {
    let first = run(INPUT);
    let mut pipeline = Pipeline::open(first).expect("reopen");
    assert_eq!(pipeline.contexts().len(), 2);
    let line = r#"[{"context":{"code_cid":"bafk1","method_num":2}},{"context":{"code_cid":"new","method_num":1}}]"#;
    pipeline.process_line(line.as_bytes()).unwrap();
    let sink = pipeline.into_sink();
    assert_eq!(sink.contexts().len(), 3);
    assert_eq!(sink.contexts()[2], (Context::new("new", 1), 3));
    let last = &sink.facts()[sink.facts().len() - 2..];
    assert_eq!((last[0].context_id, last[1].context_id), (2, 3));
}

#[test]
fn sink_failure_is_fatal_and_rolls_back_the_message() {
    use wrangler_core::{DictId, MessageId, NormalizedSpan, Sink, SinkWriter};

    // Envuelve el sink en memoria; la escritura de hechos siempre falla.
    struct FailingFacts(InMemorySink);
    struct Writer<'a>(&'a mut dyn SinkWriter);
    impl SinkWriter for Writer<'_> {
        fn insert_context(&mut self, c: &Context) -> Result<DictId, SinkError> {
            self.0.insert_context(c)
        }
        fn insert_point(&mut self, p: &Point) -> Result<DictId, SinkError> {
            self.0.insert_point(p)
        }
        fn append_facts(&mut self, _: MessageId, _: &[NormalizedSpan]) -> Result<(), SinkError> {
            Err(SinkError::Backend("disk full".into()))
        }
    }
    impl Sink for FailingFacts {
        fn ensure_schema(&mut self) -> Result<(), SinkError> {
            self.0.ensure_schema()
        }
        fn load_contexts(&mut self) -> Result<Vec<(Context, DictId)>, SinkError> {
            self.0.load_contexts()
        }
        fn load_points(&mut self) -> Result<Vec<(Point, DictId)>, SinkError> {
            self.0.load_points()
        }
        fn unit_of_work<T, E, F>(&mut self, work: F) -> Result<T, E>
        where
            E: From<SinkError>,
            F: FnOnce(&mut dyn SinkWriter) -> Result<T, E>,
        {
            self.0.unit_of_work(|w| work(&mut Writer(w)))
        }
    }

    let mut pipeline = Pipeline::open(FailingFacts(InMemorySink::new())).unwrap();
    let err = pipeline.run(INPUT.as_bytes()).unwrap_err();
    assert!(matches!(err, PipelineError::Sink(SinkError::Backend(_))), "got {err:?}");
    assert!(pipeline.contexts().is_empty(), "staged entries must be discarded");
    assert_eq!(pipeline.contexts().staged_len(), 0);
    assert_eq!(pipeline.next_message_id(), 0);
    let sink = pipeline.into_sink().0;
    assert!(sink.contexts().is_empty());
    assert_eq!(sink.rollbacks(), 1);
}
