use ignore::WalkBuilder;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Corpus directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to walk corpus: {0}")]
    Walk(#[from] ignore::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Source of ranked context snippets for a query
pub trait Retriever: Send + Sync {
    /// Up to `top_k` snippets, best first. No match is an empty list, not an error.
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, RetrievalError>;
}

/// Retriever for runs without a corpus
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRetriever;

impl Retriever for NoRetriever {
    fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<String>, RetrievalError> {
        Ok(Vec::new())
    }
}

/// Paragraphs shorter than this are merged into the next one
const MIN_CHUNK_CHARS: usize = 40;

const CORPUS_EXTENSIONS: &[&str] = &["md", "txt"];

#[derive(Debug, Clone)]
struct Chunk {
    text: String,
    terms: HashMap<String, usize>,
}

/// Lexical retriever over a directory of text documents.
///
/// Documents are split into paragraph chunks. A chunk's score blends the
/// share of distinct query terms it contains with its query-term frequency
/// (normalized by the best chunk), weighted by `alpha`.
#[derive(Debug, Clone)]
pub struct CorpusRetriever {
    chunks: Vec<Chunk>,
    alpha: f64,
}

impl CorpusRetriever {
    /// Load every `.md`/`.txt` file under `dir`, honouring `.gitignore`
    pub fn load(dir: &Path) -> Result<Self, RetrievalError> {
        if !dir.is_dir() {
            return Err(RetrievalError::NotFound(dir.to_path_buf()));
        }

        let mut chunks = Vec::new();
        for entry in WalkBuilder::new(dir).build() {
            let entry = entry?;
            let path = entry.path();
            let is_corpus_file = path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| CORPUS_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false);
            if !is_corpus_file {
                continue;
            }

            let text = std::fs::read_to_string(path)?;
            let before = chunks.len();
            chunks.extend(split_chunks(&text).into_iter().map(Chunk::new));
            debug!(path = %path.display(), chunks = chunks.len() - before, "Loaded corpus file");
        }

        Ok(Self { chunks, alpha: 0.5 })
    }

    /// Build directly from in-memory documents
    pub fn from_documents<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let chunks = documents
            .into_iter()
            .flat_map(|doc| split_chunks(doc.as_ref()))
            .map(Chunk::new)
            .collect();
        Self { chunks, alpha: 0.5 }
    }

    /// Weight of term coverage versus term frequency, clamped to [0, 1]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl Chunk {
    fn new(text: String) -> Self {
        let mut terms = HashMap::new();
        for term in tokenize(&text) {
            *terms.entry(term).or_insert(0) += 1;
        }
        Self { text, terms }
    }
}

impl Retriever for CorpusRetriever {
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, RetrievalError> {
        let query_terms: HashSet<String> = tokenize(query).collect();
        if query_terms.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let raw: Vec<(usize, f64, f64)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| {
                let matched = query_terms
                    .iter()
                    .filter(|t| chunk.terms.contains_key(*t))
                    .count();
                let frequency: usize = query_terms
                    .iter()
                    .filter_map(|t| chunk.terms.get(t))
                    .sum();
                let coverage = matched as f64 / query_terms.len() as f64;
                (idx, coverage, frequency as f64)
            })
            .filter(|(_, coverage, _)| *coverage > 0.0)
            .collect();

        let max_frequency = raw.iter().map(|(_, _, f)| *f).fold(0.0, f64::max);
        let mut scored: Vec<(usize, f64)> = raw
            .into_iter()
            .map(|(idx, coverage, frequency)| {
                let tf = if max_frequency > 0.0 {
                    frequency / max_frequency
                } else {
                    0.0
                };
                (idx, self.alpha * coverage + (1.0 - self.alpha) * tf)
            })
            .collect();

        // Stable sort keeps corpus order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        debug!(
            query_terms = query_terms.len(),
            matches = scored.len(),
            top_k,
            "Corpus retrieval"
        );

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(idx, _)| self.chunks[idx].text.clone())
            .collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1)
        .map(|w| w.to_lowercase())
}

fn split_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut pending = String::new();

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(paragraph);
        if pending.chars().count() >= MIN_CHUNK_CHARS {
            chunks.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        chunks.push(pending);
    }
    chunks
}
