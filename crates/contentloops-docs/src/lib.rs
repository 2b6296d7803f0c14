//! # contentloops-docs
//!
//! Document collaborators for the contentloops pipeline.
//!
//! The pipeline touches documents at two points: while planning it may pull
//! reference snippets from a local corpus, and when a run finishes the best
//! draft is written out for the user.
//!
//! ## Key Types
//!
//! - [`Retriever`] - Ranked snippet lookup for a query
//! - [`CorpusRetriever`] - Lexical retriever over a directory of `.md`/`.txt` files
//! - [`NoRetriever`] - Retriever that never finds anything
//! - [`DocumentExporter`] - Persists final content
//! - [`MarkdownExporter`] - Writes timestamped markdown files
//!
//! Both collaborators are allowed to fail. Callers log the error and carry
//! on: a failed retrieval means an empty context, a failed export means no
//! file path in the outcome.

mod exporter;
mod retriever;

pub use exporter::{DocumentExporter, ExportError, MarkdownExporter};
pub use retriever::{CorpusRetriever, NoRetriever, RetrievalError, Retriever};
