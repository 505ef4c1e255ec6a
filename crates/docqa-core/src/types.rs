//! Domain types shared by the chunker, the index and the answer pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A fixed-dimension embedding.
pub type Vector = Vec<f32>;

/// Raw text of one source file.
///
/// - `source`: stable document identity (file name)
/// - `text`: extracted text payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }
}

/// A contiguous slice of a [`Document`] that is independently embedded and retrieved.
///
/// - `index`: position within the corpus, identical to the vector position in the index
/// - `source`: the owning document's `source`
/// - `start`: char offset of the passage inside the document text
/// - `text`: the passage payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub index: usize,
    pub source: String,
    pub start: usize,
    pub text: String,
}

/// Fixed-shape extractor output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSpan {
    pub span: String,
    pub confidence: f32,
}

impl ExtractedSpan {
    pub fn new(span: impl Into<String>, confidence: f32) -> Self {
        Self { span: span.into(), confidence }
    }

    /// Map a loosely shaped extractor response into an `ExtractedSpan`.
    ///
    /// Accepts `{"answer": .., "score": ..}` as well as `{"span": .., "confidence": ..}`.
    /// Scores outside `[0, 1]` are clamped; missing or non-finite values are rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let span = value
            .get("answer")
            .or_else(|| value.get("span"))
            .ok_or_else(|| Error::ExtractionFailure("extractor response has no answer".into()))?
            .as_str()
            .ok_or_else(|| Error::ExtractionFailure("extractor answer is not a string".into()))?;
        let score = value
            .get("score")
            .or_else(|| value.get("confidence"))
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| Error::ExtractionFailure("extractor response has no numeric score".into()))?;
        if !score.is_finite() {
            return Err(Error::ExtractionFailure(format!("extractor score is not finite: {score}")));
        }
        #[allow(clippy::cast_possible_truncation)]
        let confidence = score.clamp(0.0, 1.0) as f32;
        Ok(Self::new(span, confidence))
    }

    /// True when the span carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.span.trim().is_empty()
    }
}
