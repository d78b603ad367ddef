use std::fs;

use wrangler_core::Pipeline;
use wrangler_persistence::{SpanRecord, SplitFilePaths, SplitFileSink};

const INPUT: &str = concat!(
    r#"[{"context":{"code_cid":"baeaaaaa","method_num":0},"point":{"event":"Started","label":""},"consumption":{},"timing":{"elapsed_cum_ns":60,"elapsed_rel_ns":60}}]"#,
    "\n",
    r#"[{"context":{"code_cid":"bafk1","method_num":2},"point":{"event":"Invoke","label":"send"},"consumption":{"fuel_consumed":10,"gas_consumed":0},"timing":{"elapsed_cum_ns":5,"elapsed_rel_ns":5}},{"context":{"code_cid":"baeaaaaa","method_num":0},"point":{"event":"Finished"},"timing":{"elapsed_cum_ns":9,"elapsed_rel_ns":4}}]"#,
    "\n",
    "not json\n",
    r#"[{"context":{"code_cid":"bafk1","method_num":2},"point":{"event":"Invoke","label":"send"}}]"#,
    "\n",
);

fn normalize(input: &str) -> (String, String, String) {
    let sink = SplitFileSink::new(Vec::new(), Vec::new(), Vec::new());
    let mut pipeline = Pipeline::open(sink).unwrap();
    pipeline.run(input.as_bytes()).unwrap();
    let (c, p, s) = pipeline.into_sink().into_writers().unwrap();
    (
        String::from_utf8(c).unwrap(),
        String::from_utf8(p).unwrap(),
        String::from_utf8(s).unwrap(),
    )
}

#[test]
fn streams_follow_discovery_order() {
    let (contexts, points, spans) = normalize(INPUT);
    assert_eq!(
        contexts,
        concat!(
            r#"{"code_cid":"baeaaaaa","id":0}"#,
            "\n",
            r#"{"code_cid":"bafk1","method_num":2,"id":1}"#,
            "\n",
        )
    );
    assert_eq!(
        points,
        concat!(
            r#"{"event":"Started","id":0}"#,
            "\n",
            r#"{"event":"Invoke","label":"send","id":1}"#,
            "\n",
            r#"{"event":"Finished","id":2}"#,
            "\n",
        )
    );
    assert_eq!(
        spans,
        concat!(
            r#"{"msg":0,"ctx":0,"p":0,"c":{},"t":{"elapsed_cum_ns":60,"elapsed_rel_ns":60}}"#,
            "\n",
            r#"{"msg":1,"ctx":1,"p":1,"c":{"fuel_consumed":10,"gas_consumed":0},"t":{"elapsed_cum_ns":5,"elapsed_rel_ns":5}}"#,
            "\n",
            r#"{"msg":1,"ctx":0,"p":2,"c":{},"t":{"elapsed_cum_ns":9,"elapsed_rel_ns":4}}"#,
            "\n",
            r#"{"msg":2,"ctx":1,"p":1,"c":{},"t":{}}"#,
            "\n",
        )
    );
}

#[test]
fn single_span_gets_id_zero() {
    let line = r#"[{"context":{"code_cid":"a"},"point":{"event":"S"}}]"#;
    let (contexts, points, spans) = normalize(line);
    assert_eq!(contexts, "{\"code_cid\":\"a\",\"id\":0}\n");
    assert_eq!(points, "{\"event\":\"S\",\"id\":0}\n");
    assert_eq!(spans, "{\"msg\":0,\"ctx\":0,\"p\":0,\"c\":{},\"t\":{}}\n");
}

#[test]
fn output_is_reproducible() {
    assert_eq!(normalize(INPUT), normalize(INPUT));
}

#[test]
fn span_records_read_back_with_absent_consumption() {
    let (_, _, spans) = normalize(INPUT);
    let records: Vec<SpanRecord> = spans
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].c.fuel_consumed, None);
    assert_eq!(records[1].c.gas_consumed, Some(0));
}

#[test]
fn files_are_created_next_to_the_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("trace.json");
    fs::write(&input, INPUT).unwrap();
    let paths = SplitFilePaths::derive(&input);

    let mut pipeline = Pipeline::open(SplitFileSink::create(&paths).unwrap()).unwrap();
    pipeline.run(fs::read(&input).unwrap().as_slice()).unwrap();
    drop(pipeline);

    let (contexts, points, spans) = normalize(INPUT);
    assert_eq!(
        fs::read_to_string(dir.path().join("trace.json.contexts.json")).unwrap(),
        contexts
    );
    assert_eq!(fs::read_to_string(&paths.points).unwrap(), points);
    assert_eq!(fs::read_to_string(&paths.spans).unwrap(), spans);
}
