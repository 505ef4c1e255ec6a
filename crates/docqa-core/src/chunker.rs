//! Fixed-size sliding-window chunking.
//!
//! Windows are measured in chars, never bytes, so multi-byte text is cut on
//! code point boundaries. Consecutive windows start `size - overlap` chars apart
//! and the walk stops at the first window that reaches the end of the text.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { size: 500, overlap: 50 }
    }
}

impl ChunkingConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        let config = Self { size, overlap };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidParameter("chunk size must be greater than zero".into()));
        }
        if self.overlap >= self.size {
            return Err(Error::InvalidParameter(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.size
            )));
        }
        Ok(())
    }

    /// Chars between the starts of two consecutive chunks.
    pub fn step(&self) -> usize {
        self.size - self.overlap
    }
}

/// Split `text` into overlapping windows of `size` chars.
pub fn chunk(text: &str, size: usize, overlap: usize) -> Result<Chunks<'_>> {
    Ok(Chunks { spans: spans(text, ChunkingConfig::new(size, overlap)?) })
}

/// Like [`chunk`], but each item also carries its char offset in `text`.
pub fn spans(text: &str, config: ChunkingConfig) -> Spans<'_> {
    Spans { text, config, byte: 0, offset: 0, done: text.is_empty() }
}

/// Expected number of chunks for a text of `len` chars.
pub fn chunk_count(len: usize, config: ChunkingConfig) -> usize {
    match len {
        0 => 0,
        n if n <= config.size => 1,
        n => (n - config.overlap).div_ceil(config.step()),
    }
}

/// Lazy chunk iterator. A clone is an independent cursor at the same position.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    spans: Spans<'a>,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.spans.next().map(|(_, text)| text)
    }
}

#[derive(Debug, Clone)]
pub struct Spans<'a> {
    text: &'a str,
    config: ChunkingConfig,
    byte: usize,
    offset: usize,
    done: bool,
}

impl<'a> Iterator for Spans<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let start = self.byte;
        let end = advance(self.text, start, self.config.size);
        let item = (self.offset, &self.text[start..end]);
        if end == self.text.len() {
            self.done = true;
        } else {
            self.byte = advance(self.text, start, self.config.step());
            self.offset += self.config.step();
        }
        Some(item)
    }
}

/// Byte position `chars` chars after `from`, saturating at the end of `text`.
fn advance(text: &str, from: usize, chars: usize) -> usize {
    text[from..].char_indices().nth(chars).map_or(text.len(), |(i, _)| from + i)
}
