use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::pdf::PopplerPdfSource;
use crate::traits::{DocumentSource, PdfTextSource};
use crate::types::Document;

/// Reads every `.txt` and `.pdf` file directly inside a folder.
pub struct DirectorySource {
    pdf: Box<dyn PdfTextSource>,
}

impl Default for DirectorySource {
    fn default() -> Self {
        Self::new(Box::new(PopplerPdfSource::default()))
    }
}

impl DirectorySource {
    pub fn new(pdf: Box<dyn PdfTextSource>) -> Self {
        Self { pdf }
    }

    fn read_document(&self, file_path: &Path) -> Result<String> {
        match file_path.extension().and_then(|s| s.to_str()) {
            Some("pdf") => self.pdf.extract(file_path),
            _ => read_file_content(file_path),
        }
    }
}

impl DocumentSource for DirectorySource {
    fn load(&self, folder: &Path) -> Result<Vec<Document>> {
        if !folder.exists() {
            fs::create_dir_all(folder).map_err(|source| Error::Io { path: folder.display().to_string(), source })?;
            tracing::info!(folder = %folder.display(), "created empty documents folder");
            return Ok(vec![]);
        }
        let files = list_document_files(folder);
        let mut documents = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::info!("Processing file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let text = match self.read_document(file_path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(file = %file_path.display(), "error reading document: {e:#}");
                    continue;
                }
            };
            if text.trim().is_empty() {
                tracing::warn!(file = %file_path.display(), "no text extracted");
                continue;
            }
            documents.push(Document::new(source_name(file_path), text));
        }
        tracing::info!("Loaded {} of {} files from {}", documents.len(), files.len(), folder.display());
        Ok(documents)
    }
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => {
            let bytes = fs::read(file_path).with_context(|| format!("reading {}", file_path.display()))?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
    }
}

fn source_name(file_path: &Path) -> String {
    file_path
        .file_name()
        .map_or_else(|| file_path.to_string_lossy().to_string(), |n| n.to_string_lossy().to_string())
}

fn list_document_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| matches!(p.extension().and_then(|s| s.to_str()), Some("txt" | "pdf")))
        .collect();
    files.sort();
    files
}
