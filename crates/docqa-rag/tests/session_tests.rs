use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use docqa_core::config::Settings;
use docqa_core::traits::{DocumentSource, Embedder, Extractor};
use docqa_core::types::{Document, ExtractedSpan};
use docqa_embed::{HashingEmbedder, LexicalExtractor};
use docqa_rag::{AnswerKind, Session};

/// Serves whatever documents the test put in `docs`, counting loads.
#[derive(Clone, Default)]
struct ScriptedSource {
    docs: Arc<Mutex<Vec<Document>>>,
    loads: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl ScriptedSource {
    fn with(docs: Vec<Document>) -> Self {
        let source = Self::default();
        *source.docs.lock().unwrap() = docs;
        source
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl DocumentSource for ScriptedSource {
    fn load(&self, _folder: &Path) -> anyhow::Result<Vec<Document>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("disk unplugged");
        }
        Ok(self.docs.lock().unwrap().clone())
    }
}

struct Always(&'static str, f32);

impl Extractor for Always {
    fn answer(&self, _question: &str, _context: &str) -> anyhow::Result<ExtractedSpan> {
        Ok(ExtractedSpan::new(self.0, self.1))
    }
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.corpus.chunk_size = 40;
    settings.corpus.chunk_overlap = 10;
    settings
}

fn session(source: &ScriptedSource, extractor: Arc<dyn Extractor>) -> Session {
    Session::with_models(settings(), Box::new(source.clone()), Arc::new(HashingEmbedder::new(64)), extractor)
}

#[test]
fn corpus_is_built_lazily_and_cached() {
    let source = ScriptedSource::with(vec![Document::new("a.txt", "The capital of France is Paris.")]);
    let session = session(&source, Arc::new(Always("Paris", 0.87)));
    assert_eq!(source.loads(), 0);

    let first = session.ask("What is the capital of France?").expect("ask");
    assert_eq!(first.message(), "Paris (Confidence: 0.87)");
    session.ask("And again?").expect("ask");
    assert_eq!(source.loads(), 1);
}

#[test]
fn reload_swaps_in_a_new_snapshot() {
    let source = ScriptedSource::with(vec![Document::new("a.txt", "short")]);
    let session = session(&source, Arc::new(Always("x", 0.5)));
    let before = session.corpus().expect("corpus");
    assert_eq!(before.passages().len(), 1);

    *source.docs.lock().unwrap() =
        vec![Document::new("a.txt", "short"), Document::new("b.txt", "a much longer document that spans several chunks")];
    let after = session.reload().expect("reload");
    assert!(after.passages().len() > 1);
    assert_eq!(session.stats().expect("stats").documents, 2);
    assert_eq!(before.passages().len(), 1, "old snapshot is untouched");
    assert_eq!(source.loads(), 2);
}

#[test]
fn failed_reload_keeps_the_previous_snapshot() {
    let source = ScriptedSource::with(vec![Document::new("a.txt", "kept text")]);
    let session = session(&source, Arc::new(Always("x", 0.5)));
    let before = session.corpus().expect("corpus");

    source.fail.store(true, Ordering::SeqCst);
    let err = session.reload().expect_err("reload fails");
    assert!(format!("{err:#}").contains("disk unplugged"));
    assert!(Arc::ptr_eq(&before, &session.corpus().expect("corpus")));
}

#[test]
fn empty_folder_answers_with_no_content() {
    let source = ScriptedSource::default();
    let session = session(&source, Arc::new(Always("x", 0.9)));
    let outcome = session.ask("anything?").expect("ask");
    assert_eq!(outcome.message(), "Error processing your request: No content to search");
    assert_eq!(session.stats().expect("stats").passages, 0);
}

#[test]
fn models_load_once_on_first_use() {
    let source = ScriptedSource::with(vec![Document::new("a.txt", "Paris is the capital of France.")]);
    let embedder_loads = Arc::new(AtomicUsize::new(0));
    let extractor_loads = Arc::new(AtomicUsize::new(0));
    let (e, x) = (Arc::clone(&embedder_loads), Arc::clone(&extractor_loads));
    let session = Session::new(
        settings(),
        Box::new(source.clone()),
        move || {
            e.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(HashingEmbedder::new(32)) as Arc<dyn Embedder>)
        },
        move || {
            x.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(LexicalExtractor) as Arc<dyn Extractor>)
        },
    );
    assert_eq!(embedder_loads.load(Ordering::SeqCst), 0);

    let outcome = session.ask("What is the capital of France?").expect("ask");
    assert!(outcome.kind().is_some());
    session.ask("Which city is the capital?").expect("ask");
    session.reload().expect("reload");
    assert_eq!(embedder_loads.load(Ordering::SeqCst), 1);
    assert_eq!(extractor_loads.load(Ordering::SeqCst), 1);
}

#[test]
fn model_load_failure_is_reported_and_retried() {
    let source = ScriptedSource::with(vec![Document::new("a.txt", "text")]);
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let session = Session::new(
        settings(),
        Box::new(source),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("weights missing")
        },
        || Ok(Arc::new(LexicalExtractor) as Arc<dyn Extractor>),
    );
    assert!(session.ask("q").is_err());
    assert!(session.ask("q").is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn low_confidence_answer_is_hedged() {
    let source = ScriptedSource::with(vec![Document::new("a.txt", "The capital of France is Paris.")]);
    let session = session(&source, Arc::new(Always("Lyon", 0.04)));
    let outcome = session.ask("capital?").expect("ask");
    assert_eq!(outcome.kind(), Some(AnswerKind::LowConfidence));
    assert!(outcome.message().starts_with("Low confidence (0.04): Lyon"));
}
