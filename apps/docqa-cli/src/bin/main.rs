use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docqa_core::config::{Config, Settings};
use docqa_core::loader::DirectorySource;
use docqa_embed::{get_default_embedder, get_default_extractor};
use docqa_rag::session::{self, Session};
use docqa_rag::{CorpusStats, Outcome};

const NO_TEXT_MESSAGE: &str = "No text found. Please check your docs/ folder.";
const ERROR_PREFIX: &str = "Error processing your request: ";

#[derive(Parser)]
#[command(name = "docqa", about = "Ask questions about the documents in a folder")]
struct Cli {
    /// Folder with .txt and .pdf files (overrides corpus.docs_dir)
    #[arg(long, global = true)]
    docs: Option<PathBuf>,

    /// Use the hashing embedder and lexical extractor instead of model weights
    #[arg(long, global = true)]
    fake_models: bool,

    /// Passages handed to the extractor (overrides retrieval.top_k)
    #[arg(long, global = true)]
    top_k: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one question and exit
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        /// Print the retrieved passages
        #[arg(long)]
        show_context: bool,
    },
    /// Answer questions from stdin until /quit
    Chat {
        #[arg(long)]
        show_context: bool,
    },
    /// Print corpus statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = settings_for(&cli)?;
    let models = settings.models.clone();
    let extractor_models = models.clone();
    let session = session::install(Session::new(
        settings,
        Box::new(DirectorySource::default()),
        move || get_default_embedder(&models),
        move || get_default_extractor(&extractor_models),
    ))?;

    match cli.command.unwrap_or(Command::Chat { show_context: false }) {
        Command::Ask { question, show_context } => {
            if !has_text(session)? {
                println!("{NO_TEXT_MESSAGE}");
                return Ok(());
            }
            let outcome = session.ask(&question.join(" "))?;
            println!("{}", format_outcome(&outcome, show_context));
        }
        Command::Chat { show_context } => chat(session, show_context)?,
        Command::Stats => println!("{}", format_stats(&session.stats()?)),
    }
    Ok(())
}

fn settings_for(cli: &Cli) -> anyhow::Result<Settings> {
    let config = Config::load().context("failed to load configuration")?;
    let mut settings = config.settings()?;
    if let Some(docs) = &cli.docs {
        settings.corpus.docs_dir = docs.to_string_lossy().into_owned();
    }
    if cli.fake_models {
        settings.models.use_fake = true;
    }
    if let Some(top_k) = cli.top_k {
        settings.retrieval.top_k = top_k;
    }
    settings.validate()?;
    Ok(settings)
}

fn has_text(session: &Session) -> anyhow::Result<bool> {
    Ok(!session.corpus()?.is_empty())
}

fn chat(session: &Session, show_context: bool) -> anyhow::Result<()> {
    println!("Documents from {}", session.docs_dir().display());
    match has_text(session) {
        Ok(false) => println!("{NO_TEXT_MESSAGE}"),
        Ok(true) => {}
        Err(e) => println!("{ERROR_PREFIX}{e:#}"),
    }
    println!("Type a question, /reload, /stats or /quit.");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        match reply(session, &line?, show_context) {
            Reply::Quit => break,
            Reply::Nothing => {}
            Reply::Text(text) => println!("{text}"),
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Reply {
    Quit,
    Nothing,
    Text(String),
}

/// One chat turn. Failures are shown to the user and the loop carries on.
fn reply(session: &Session, line: &str, show_context: bool) -> Reply {
    match line.trim() {
        "" => Reply::Nothing,
        "/quit" | "/exit" => Reply::Quit,
        "/stats" => Reply::Text(match session.stats() {
            Ok(stats) => format_stats(&stats),
            Err(e) => format!("{ERROR_PREFIX}{e:#}"),
        }),
        "/reload" => Reply::Text(match session.reload() {
            Ok(corpus) if corpus.is_empty() => NO_TEXT_MESSAGE.to_string(),
            Ok(corpus) => format!("Reloaded {} passages.", corpus.passages().len()),
            Err(e) => format!("Reload failed, keeping previous documents: {e:#}"),
        }),
        question => Reply::Text(match session.ask(question) {
            Ok(outcome) => format_outcome(&outcome, show_context),
            Err(e) => format!("{ERROR_PREFIX}{e:#}"),
        }),
    }
}

fn format_outcome(outcome: &Outcome, show_context: bool) -> String {
    let mut out = outcome.message();
    if show_context {
        if let Some(evidence) = outcome.evidence() {
            for (i, hit) in evidence.iter().enumerate() {
                out.push_str(&format!("\n\nContext {} (Match score: {:.2})\n{}", i + 1, hit.distance, hit.passage.text));
            }
        }
    }
    out
}

fn format_stats(stats: &CorpusStats) -> String {
    let mut lines = vec![format!("Documents: {}", stats.documents), format!("Passages: {}", stats.passages)];
    lines.push(match stats.dim {
        Some(dim) => format!("Embedding dimension: {dim}"),
        None => NO_TEXT_MESSAGE.to_string(),
    });
    if let Some(sample) = &stats.sample {
        lines.push(format!("Sample: {sample}"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use docqa_core::traits::{DocumentSource, Embedder, Extractor};
    use docqa_core::types::Document;
    use docqa_embed::{HashingEmbedder, LexicalExtractor};

    struct OneDoc;

    impl DocumentSource for OneDoc {
        fn load(&self, _folder: &Path) -> anyhow::Result<Vec<Document>> {
            Ok(vec![Document::new("france.txt", "The capital of France is Paris.")])
        }
    }

    fn session_without_extractor_weights() -> Session {
        Session::new(
            Settings::default(),
            Box::new(OneDoc),
            || Ok(Arc::new(HashingEmbedder::new(32)) as Arc<dyn Embedder>),
            || anyhow::bail!("tokenizer.json not found"),
        )
    }

    #[test]
    fn model_load_failure_keeps_the_chat_going() {
        let session = session_without_extractor_weights();
        match reply(&session, "What is the capital of France?", false) {
            Reply::Text(text) => {
                assert!(text.starts_with(ERROR_PREFIX), "{text}");
                assert!(text.contains("tokenizer.json not found"), "{text}");
            }
            other => panic!("unexpected reply {other:?}"),
        }
        match reply(&session, "/stats", false) {
            Reply::Text(text) => assert!(text.contains("Passages: 1"), "{text}"),
            other => panic!("unexpected reply {other:?}"),
        }
        assert_eq!(reply(&session, "/quit", false), Reply::Quit);
    }

    #[test]
    fn answers_with_context_when_asked() {
        let session = Session::with_models(
            Settings::default(),
            Box::new(OneDoc),
            Arc::new(HashingEmbedder::new(32)),
            Arc::new(LexicalExtractor) as Arc<dyn Extractor>,
        );
        match reply(&session, "capital of France?", true) {
            Reply::Text(text) => assert!(text.contains("Context 1 (Match score: "), "{text}"),
            other => panic!("unexpected reply {other:?}"),
        }
        assert_eq!(reply(&session, "   ", true), Reply::Nothing);
    }
}
