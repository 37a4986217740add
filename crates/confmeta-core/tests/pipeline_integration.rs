//! End-to-end runs of the [`Pipeline`] against a scripted generator.
//!
//! The generator answers from a fixed table keyed by the raw listing found in
//! the prompt, so no network is involved.

use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use confmeta_core::{
    ChunkSink, ConferenceRow, ExtractionCache, Extractor, Gazetteer, Pipeline, ProgressEvent,
    TextGenerator, TransportError,
};
use tokio_util::sync::CancellationToken;

/// Answers each prompt with the reply registered for the raw listing it
/// contains; unknown listings get a transport error.
struct ScriptedGenerator {
    replies: Vec<(&'static str, &'static str)>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn new(replies: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            replies,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        on_chunk: Option<&'a ChunkSink>,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let Some((_, reply)) = self
                .replies
                .iter()
                .find(|(raw, _)| prompt.contains(&format!("Raw conference string:\n{raw}\n")))
            else {
                return Err(TransportError::Request("connection refused".into()));
            };
            if let Some(sink) = on_chunk {
                sink(reply);
            }
            Ok(reply.to_string())
        })
    }
}

const PARIS_RAW: &str = "Workshop on Data Systems, Paris, 12-14 May 2019";
const PARIS_REPLY: &str = r#"Here you go: {"conf_name": "workshop on data systems", "conf_place": "Paris", "conf_dates": "2019-05-12 / 2019-05-14"} Hope this helps."#;

const AUSTIN_RAW: &str = "Fifth International Conference on Robotics (ICR), Austin, Texas, June 2016";
const AUSTIN_REPLY: &str = r#"{"conf_name": "Fifth International Conference on Robotics", "conf_place": "Austin, Texas", "conf_dates": "2016-06 / 2016-06"}"#;

const TRUNCATED_RAW: &str = "Symposium on Truncation, Busan, Korea, 2021";
const TRUNCATED_REPLY: &str = r#"{"conf_name": "Symposium on Truncation", "conf_place": "Busan, Ko"#;

const HYDRO_RAW: &str = "Hydropower 15 in 83rd ICOLD Meeting, Stavanger Norway";

fn gazetteer_file(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("cities5000.txt");
    let mut f = std::fs::File::create(&path).unwrap();
    for line in [
        "2988507\tParis\tParis\t\t48.85\t2.35\tP\tPPLC\tFR\n",
        "4717560\tParis\tParis\t\t33.66\t-95.55\tP\tPPLA2\tUS\n",
        "3143244\tOslo\tOslo\t\t59.91\t10.75\tP\tPPLC\tNO\n",
        "1838524\tBusan\tBusan\t\t35.10\t129.04\tP\tPPLA\tKR\n",
        "short\trow\n",
    ] {
        f.write_all(line.as_bytes()).unwrap();
    }
    path
}

fn rows(raws: &[Option<&str>]) -> Vec<ConferenceRow> {
    raws.iter()
        .enumerate()
        .map(|(i, raw)| ConferenceRow {
            pid: 100 + i as i64,
            name_seq: 0,
            raw: raw.map(str::to_string),
        })
        .collect()
}

fn script() -> Arc<ScriptedGenerator> {
    Arc::new(ScriptedGenerator::new(vec![
        (PARIS_RAW, PARIS_REPLY),
        (AUSTIN_RAW, AUSTIN_REPLY),
        (TRUNCATED_RAW, TRUNCATED_REPLY),
    ]))
}

#[tokio::test]
async fn mixed_batch_yields_one_record_per_row() {
    let dir = tempfile::tempdir().unwrap();
    let gazetteer = Gazetteer::load(&gazetteer_file(dir.path())).unwrap();
    let generator = script();
    let pipeline = Pipeline::new(Extractor::new(generator.clone(), Arc::new(gazetteer)));

    let input = rows(&[
        Some(PARIS_RAW),
        Some(AUSTIN_RAW),
        Some(HYDRO_RAW),
        Some(TRUNCATED_RAW),
        Some("Unknown Meeting 2020, Nowhere"),
        None,
    ]);
    let (records, stats) = pipeline
        .run(input, |_| {}, &CancellationToken::new())
        .await;

    assert_eq!(records.len(), 6);
    assert_eq!(stats.total, 6);
    assert_eq!(stats.extracted, 3);
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.failed, 1);
    assert!(!stats.cancelled);

    // Paris is ambiguous in the file (FR and US), so no country is added.
    let paris = &records[0];
    assert_eq!(paris.conf_name, "Workshop on Data Systems");
    assert_eq!(paris.conf_place, "Paris");
    assert_eq!(paris.start_date().as_deref(), Some("2019-05-12"));
    assert_eq!(paris.end_date().as_deref(), Some("2019-05-14"));

    let austin = &records[1];
    assert_eq!(austin.conf_name, "Fifth International Conference on Robotics (ICR)");
    assert_eq!(austin.conf_place, "Austin, TX, USA");
    assert_eq!(austin.conf_order, Some(5));
    assert_eq!(austin.start.month, Some(6));
    assert_eq!(austin.start.day, None);
    assert_eq!(austin.start_date(), None);

    let hydro = &records[2];
    assert_eq!(hydro.conf_name, HYDRO_RAW);
    assert_eq!(hydro.conf_place, "");
    assert_eq!(hydro.conf_dates, "");
    assert_eq!(hydro.note, "no date detected or skipped by heuristic");

    let truncated = &records[3];
    assert_eq!(truncated.conf_name, TRUNCATED_RAW);
    assert_eq!(truncated.note, "fallback: could not parse JSON");

    let failed = &records[4];
    assert_eq!(failed.conf_name, "Unknown Meeting 2020, Nowhere");
    assert!(failed.note.starts_with("LLM error: "));

    assert_eq!(records[5].raw_conference, None);
    assert_eq!(generator.calls(), 4);
}

#[tokio::test]
async fn unique_city_gets_country_and_note() {
    const RAW: &str = "Nordic Workshop, Oslo, 2022";
    let generator = Arc::new(ScriptedGenerator::new(vec![(
        RAW,
        r#"{"conf_name":"Nordic Workshop","conf_place":"Oslo","conf_dates":"2022 / 2022"}"#,
    )]));
    let dir = tempfile::tempdir().unwrap();
    let gazetteer = Gazetteer::load(&gazetteer_file(dir.path())).unwrap();
    let pipeline = Pipeline::new(Extractor::new(generator, Arc::new(gazetteer)));

    let (records, _) = pipeline
        .run(rows(&[Some(RAW)]), |_| {}, &CancellationToken::new())
        .await;
    assert_eq!(records[0].conf_place, "Oslo, NO");
    assert_eq!(records[0].note, "country inferred from GeoNames");
    assert_eq!(records[0].start.year, Some(2022));
    assert_eq!(records[0].end.year, Some(2022));
    assert_eq!(records[0].start.month, None);
}

#[tokio::test]
async fn persistent_cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("cache").join("extractions.db");

    let first = script();
    {
        let cache = Arc::new(ExtractionCache::open(&cache_path).unwrap());
        let pipeline = Pipeline::new(
            Extractor::new(first.clone(), Arc::new(Gazetteer::empty())).with_cache(cache),
        );
        pipeline
            .run(rows(&[Some(AUSTIN_RAW)]), |_| {}, &CancellationToken::new())
            .await;
    }
    assert_eq!(first.calls(), 1);

    let second = script();
    let cache = Arc::new(ExtractionCache::open(&cache_path).unwrap());
    let pipeline = Pipeline::new(
        Extractor::new(second.clone(), Arc::new(Gazetteer::empty())).with_cache(cache),
    );
    let (records, stats) = pipeline
        .run(rows(&[Some(AUSTIN_RAW)]), |_| {}, &CancellationToken::new())
        .await;
    assert_eq!(second.calls(), 0);
    assert_eq!(stats.cached, 1);
    assert_eq!(records[0].conf_place, "Austin, TX, USA");
}

#[tokio::test]
async fn cancellation_returns_partial_results() {
    let pipeline = Pipeline::new(Extractor::new(script(), Arc::new(Gazetteer::empty())));
    let cancel = CancellationToken::new();
    let parsed = Mutex::new(0usize);

    let (records, stats) = pipeline
        .run(
            rows(&[Some(PARIS_RAW), Some(AUSTIN_RAW), Some(TRUNCATED_RAW)]),
            |ev| {
                if let ProgressEvent::Parsed { index, .. } = ev {
                    *parsed.lock().unwrap() = index;
                    if index == 2 {
                        cancel.cancel();
                    }
                }
            },
            &cancel,
        )
        .await;

    assert_eq!(records.len(), 2);
    assert!(stats.cancelled);
    assert_eq!(*parsed.lock().unwrap(), 2);
}
