use anyhow::Result;
use std::collections::HashSet;

use docqa_core::traits::Extractor;
use docqa_core::types::ExtractedSpan;

use crate::hashing::words;

/// Question words that carry no content.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "did", "do", "does", "for", "from", "has", "have", "how", "in",
    "is", "it", "of", "on", "or", "that", "the", "this", "to", "was", "were", "what", "when", "where", "which", "who",
    "whom", "whose", "why", "with",
];

/// Development extractor: answers with the context sentence sharing the most content
/// words with the question. Confidence is the fraction of question words covered.
#[derive(Default)]
pub struct LexicalExtractor;

impl Extractor for LexicalExtractor {
    fn answer(&self, question: &str, context: &str) -> Result<ExtractedSpan> {
        let wanted: HashSet<String> = words(question).filter(|w| !STOP_WORDS.contains(&w.as_str())).collect();
        if wanted.is_empty() {
            return Ok(ExtractedSpan::new("", 0.0));
        }
        let best = sentences(context)
            .map(|sentence| {
                let found: HashSet<String> = words(sentence).filter(|w| wanted.contains(w)).collect();
                (found.len(), sentence)
            })
            .filter(|(hits, _)| *hits > 0)
            .fold(None, |best: Option<(usize, &str)>, cand| match best {
                Some(b) if b.0 >= cand.0 => Some(b),
                _ => Some(cand),
            });
        Ok(match best {
            #[allow(clippy::cast_precision_loss)]
            Some((hits, sentence)) => ExtractedSpan::new(sentence, hits as f32 / wanted.len() as f32),
            None => ExtractedSpan::new("", 0.0),
        })
    }
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '?', '!', '\n']).map(str::trim).filter(|s| !s.is_empty())
}
