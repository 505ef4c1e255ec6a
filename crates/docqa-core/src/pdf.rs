//! PDF text through poppler's `pdftotext`, with a `pdftoppm` + `tesseract` OCR
//! fallback for scanned files.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::traits::PdfTextSource;

/// Below this many chars of native text a PDF is treated as scanned.
pub const MIN_NATIVE_CHARS: usize = 50;

pub struct PopplerPdfSource {
    pub pdftotext: PathBuf,
    pub pdftoppm: PathBuf,
    pub tesseract: PathBuf,
    pub ocr_fallback: bool,
}

impl Default for PopplerPdfSource {
    fn default() -> Self {
        Self {
            pdftotext: PathBuf::from("pdftotext"),
            pdftoppm: PathBuf::from("pdftoppm"),
            tesseract: PathBuf::from("tesseract"),
            ocr_fallback: true,
        }
    }
}

impl PdfTextSource for PopplerPdfSource {
    fn extract(&self, path: &Path) -> Result<String> {
        let mut text = match self.native_text(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(file = %path.display(), "native extraction failed: {e:#}");
                String::new()
            }
        };
        if self.ocr_fallback && text.trim().chars().count() < MIN_NATIVE_CHARS {
            tracing::info!(file = %path.display(), "native extraction found too little text, trying OCR");
            match self.ocr_text(path) {
                Ok(ocr) => {
                    if !text.is_empty() && !text.ends_with(char::is_whitespace) {
                        text.push('\n');
                    }
                    text.push_str(&ocr);
                }
                Err(e) => tracing::warn!(
                    file = %path.display(),
                    "OCR failed: {e:#}. Make sure poppler and tesseract are installed"
                ),
            }
        }
        Ok(text)
    }
}

impl PopplerPdfSource {
    fn native_text(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.pdftotext)
            .args(["-layout", "-enc", "UTF-8"])
            .arg(path)
            .arg("-")
            .output()
            .with_context(|| format!("running {}", self.pdftotext.display()))?;
        if !output.status.success() {
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.pdftotext.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn ocr_text(&self, path: &Path) -> Result<String> {
        let scratch = tempfile::tempdir().context("creating OCR scratch dir")?;
        let prefix = scratch.path().join("page");
        let status = Command::new(&self.pdftoppm)
            .args(["-r", "300", "-png"])
            .arg(path)
            .arg(&prefix)
            .status()
            .with_context(|| format!("running {}", self.pdftoppm.display()))?;
        if !status.success() {
            return Err(anyhow!("{} exited with {status}", self.pdftoppm.display()));
        }

        let mut pages: Vec<PathBuf> = std::fs::read_dir(scratch.path())?
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("png"))
            .collect();
        // pdftoppm zero-pads page numbers, so lexical order is page order
        pages.sort();

        let mut text = String::new();
        for page in pages {
            let output = Command::new(&self.tesseract)
                .arg(&page)
                .arg("stdout")
                .output()
                .with_context(|| format!("running {}", self.tesseract.display()))?;
            if !output.status.success() {
                return Err(anyhow!("{} exited with {}", self.tesseract.display(), output.status));
            }
            text.push_str(&String::from_utf8_lossy(&output.stdout));
            text.push('\n');
        }
        Ok(text)
    }
}
