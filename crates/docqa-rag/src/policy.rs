//! Turns extractor output into a user-facing answer.
//!
//! Blank spans always become [`AnswerKind::NoAnswer`], whatever their confidence.
//! Non-blank spans below the threshold are shown with a hedge.

use serde::Serialize;

use docqa_core::config::AnswerSettings;
use docqa_core::error::Error;
use docqa_core::traits::Extractor;
use docqa_core::types::ExtractedSpan;

use crate::retriever::RetrievalResult;

pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f32 = 0.05;
pub const CONTEXT_SEPARATOR: &str = " ";
pub const NO_ANSWER_MESSAGE: &str = "I couldn't find a specific answer in the document.";
pub const LOW_CONFIDENCE_CAVEAT: &str = "I'm not sure if this is correct based on the document context.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnswerKind {
    Confident,
    LowConfidence,
    NoAnswer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub kind: AnswerKind,
    pub span: String,
    pub confidence: f32,
    pub evidence: RetrievalResult,
}

impl Answer {
    pub fn message(&self) -> String {
        match self.kind {
            AnswerKind::Confident => format!("{} (Confidence: {:.2})", self.span, self.confidence),
            AnswerKind::LowConfidence => {
                format!("Low confidence ({:.2}): {}\n\n{}", self.confidence, self.span, LOW_CONFIDENCE_CAVEAT)
            }
            AnswerKind::NoAnswer => NO_ANSWER_MESSAGE.to_string(),
        }
    }
}

/// Result of one question: an answer, or a failure that was caught instead of propagated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outcome {
    Answered(Answer),
    Failed { message: String, evidence: Option<RetrievalResult> },
}

impl Outcome {
    pub fn failed(err: &Error, evidence: Option<RetrievalResult>) -> Self {
        Self::Failed { message: err.to_string(), evidence }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Answered(answer) => answer.message(),
            Self::Failed { message, .. } => format!("Error processing your request: {message}"),
        }
    }

    pub fn evidence(&self) -> Option<&RetrievalResult> {
        match self {
            Self::Answered(answer) => Some(&answer.evidence),
            Self::Failed { evidence, .. } => evidence.as_ref(),
        }
    }

    pub fn kind(&self) -> Option<AnswerKind> {
        match self {
            Self::Answered(answer) => Some(answer.kind),
            Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerPolicy {
    pub low_confidence_threshold: f32,
    pub max_context_chars: Option<usize>,
}

impl Default for AnswerPolicy {
    fn default() -> Self {
        Self { low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD, max_context_chars: None }
    }
}

impl From<&AnswerSettings> for AnswerPolicy {
    fn from(settings: &AnswerSettings) -> Self {
        Self { low_confidence_threshold: settings.low_confidence_threshold, max_context_chars: settings.max_context_chars }
    }
}

impl AnswerPolicy {
    pub fn classify(&self, extracted: &ExtractedSpan) -> AnswerKind {
        if extracted.is_blank() {
            AnswerKind::NoAnswer
        } else if extracted.confidence < self.low_confidence_threshold {
            AnswerKind::LowConfidence
        } else {
            AnswerKind::Confident
        }
    }

    /// Passage texts joined best-first, cut to `max_context_chars` when set.
    pub fn assemble_context(&self, retrieval: &RetrievalResult) -> String {
        let context = retrieval.texts().collect::<Vec<_>>().join(CONTEXT_SEPARATOR);
        match self.max_context_chars {
            Some(limit) => match context.char_indices().nth(limit) {
                Some((cut, _)) => context[..cut].to_string(),
                None => context,
            },
            None => context,
        }
    }

    /// Ask `extractor` about the retrieved context and classify its answer.
    /// Extractor failures and malformed output become [`Outcome::Failed`].
    pub fn decide(&self, question: &str, retrieval: RetrievalResult, extractor: &dyn Extractor) -> Outcome {
        let context = self.assemble_context(&retrieval);
        let extracted = match extractor.answer(question, &context) {
            Ok(extracted) => extracted,
            Err(e) => return Outcome::failed(&Error::extraction(&e), Some(retrieval)),
        };
        if !extracted.confidence.is_finite() {
            let err = Error::ExtractionFailure(format!("extractor returned confidence {}", extracted.confidence));
            return Outcome::failed(&err, Some(retrieval));
        }
        let kind = self.classify(&extracted);
        let (span, confidence) = match kind {
            AnswerKind::NoAnswer => (String::new(), extracted.confidence.clamp(0.0, 1.0)),
            _ => (extracted.span.trim().to_string(), extracted.confidence.clamp(0.0, 1.0)),
        };
        tracing::debug!(?kind, confidence, "answer classified");
        Outcome::Answered(Answer { kind, span, confidence, evidence: retrieval })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::Passage;

    use crate::retriever::RetrievedPassage;

    struct Fixed(ExtractedSpan);

    impl Extractor for Fixed {
        fn answer(&self, _question: &str, _context: &str) -> anyhow::Result<ExtractedSpan> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl Extractor for Broken {
        fn answer(&self, _question: &str, _context: &str) -> anyhow::Result<ExtractedSpan> {
            Err(anyhow::anyhow!("model exploded"))
        }
    }

    fn evidence(texts: &[&str]) -> RetrievalResult {
        RetrievalResult {
            hits: texts
                .iter()
                .enumerate()
                .map(|(i, t)| RetrievedPassage {
                    passage: Passage { index: i, source: "doc.txt".into(), start: 0, text: (*t).to_string() },
                    #[allow(clippy::cast_precision_loss)]
                    distance: i as f32,
                })
                .collect(),
        }
    }

    fn kind_of(span: &str, confidence: f32) -> AnswerKind {
        AnswerPolicy::default().classify(&ExtractedSpan::new(span, confidence))
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        assert_eq!(kind_of("Paris", 0.05), AnswerKind::Confident);
        assert_eq!(kind_of("Paris", 0.04), AnswerKind::LowConfidence);
        assert_eq!(kind_of("Paris", 0.9), AnswerKind::Confident);
    }

    #[test]
    fn blank_span_dominates_confidence() {
        assert_eq!(kind_of("", 0.9), AnswerKind::NoAnswer);
        assert_eq!(kind_of("", 0.02), AnswerKind::NoAnswer);
        assert_eq!(kind_of("   ", 0.5), AnswerKind::NoAnswer);
    }

    #[test]
    fn messages_follow_the_outcome() {
        let policy = AnswerPolicy::default();
        let confident = policy.decide("q", evidence(&["ctx"]), &Fixed(ExtractedSpan::new("Paris", 0.87)));
        assert_eq!(confident.message(), "Paris (Confidence: 0.87)");

        let hedged = policy.decide("q", evidence(&["ctx"]), &Fixed(ExtractedSpan::new("Lyon", 0.04)));
        assert_eq!(hedged.kind(), Some(AnswerKind::LowConfidence));
        assert!(hedged.message().starts_with("Low confidence (0.04): Lyon"));
        assert!(hedged.message().ends_with(LOW_CONFIDENCE_CAVEAT));

        let empty = policy.decide("q", evidence(&["ctx"]), &Fixed(ExtractedSpan::new("", 0.02)));
        assert_eq!(empty.message(), NO_ANSWER_MESSAGE);
        assert!(!empty.message().contains("Confidence"));
    }

    #[test]
    fn every_outcome_keeps_the_evidence() {
        let policy = AnswerPolicy::default();
        let retrieval = evidence(&["first", "second"]);
        for extractor in [&Fixed(ExtractedSpan::new("x", 0.9)) as &dyn Extractor, &Fixed(ExtractedSpan::new("", 0.9)), &Broken] {
            let outcome = policy.decide("q", retrieval.clone(), extractor);
            assert_eq!(outcome.evidence(), Some(&retrieval));
        }
    }

    #[test]
    fn extractor_failure_is_caught() {
        let outcome = AnswerPolicy::default().decide("q", evidence(&["ctx"]), &Broken);
        assert!(matches!(outcome, Outcome::Failed { .. }));
        assert_eq!(outcome.message(), "Error processing your request: model exploded");
    }

    #[test]
    fn non_finite_confidence_is_a_failure() {
        let outcome = AnswerPolicy::default().decide("q", evidence(&["ctx"]), &Fixed(ExtractedSpan::new("x", f32::NAN)));
        assert!(matches!(outcome, Outcome::Failed { .. }));
    }

    #[test]
    fn context_joins_best_first_and_respects_cap() {
        let retrieval = evidence(&["alpha", "beta", "gamma"]);
        assert_eq!(AnswerPolicy::default().assemble_context(&retrieval), "alpha beta gamma");
        let capped = AnswerPolicy { max_context_chars: Some(8), ..AnswerPolicy::default() };
        assert_eq!(capped.assemble_context(&retrieval), "alpha be");
    }
}
