use chrono::Local;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export: content is empty")]
    EmptyContent,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Persists a run's final content
pub trait DocumentExporter: Send + Sync {
    /// Write `content` and return the path of the created document
    fn export(&self, content: &str, score: Option<f64>) -> Result<PathBuf, ExportError>;
}

/// Writes each export to `post_<timestamp>_<hash>.md` in an output directory
#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    out_dir: PathBuf,
}

impl Default for MarkdownExporter {
    fn default() -> Self {
        Self::new(PathBuf::from("outputs"))
    }
}

impl MarkdownExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn file_name(content: &str) -> String {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let hash = hex::encode(hasher.finalize());

        format!("post_{}_{}.md", timestamp, &hash[..6])
    }

    fn render(content: &str, score: Option<f64>) -> String {
        let mut doc = String::new();
        if let Some(score) = score {
            doc.push_str(&format!("<!-- score: {:.2} -->\n\n", score));
        }

        let paragraphs: Vec<&str> = content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        doc.push_str(&paragraphs.join("\n\n"));
        doc.push('\n');
        doc
    }
}

impl DocumentExporter for MarkdownExporter {
    fn export(&self, content: &str, score: Option<f64>) -> Result<PathBuf, ExportError> {
        if content.trim().is_empty() {
            return Err(ExportError::EmptyContent);
        }

        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(Self::file_name(content));
        fs::write(&path, Self::render(content, score))?;

        debug!(path = %path.display(), bytes = content.len(), "Exported document");
        Ok(path)
    }
}
