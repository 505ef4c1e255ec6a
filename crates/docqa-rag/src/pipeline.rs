use docqa_core::traits::{Embedder, Extractor};

use crate::corpus::Corpus;
use crate::policy::{AnswerPolicy, Outcome};
use crate::retriever::Retriever;

/// Retrieve `top_k` passages for `question`, run the extractor over them and
/// classify the result. Never fails: every error is reported as [`Outcome::Failed`].
pub fn answer_question(
    question: &str,
    corpus: &Corpus,
    embedder: &dyn Embedder,
    extractor: &dyn Extractor,
    top_k: usize,
    policy: &AnswerPolicy,
) -> Outcome {
    let retrieval = match Retriever::new(embedder, top_k).retrieve(question, corpus) {
        Ok(retrieval) => retrieval,
        Err(e) => {
            tracing::warn!(error = %e, "retrieval failed");
            return Outcome::failed(&e, None);
        }
    };
    policy.decide(question, retrieval, extractor)
}
