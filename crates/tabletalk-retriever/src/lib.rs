//! Table retriever: ranks catalog entries against a question by embedding
//! similarity and returns the top-K candidates.

use async_trait::async_trait;
use std::cmp::Ordering;
use tabletalk_catalog::{SchemaCatalog, TableDescriptor};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error("embedding service error: {0}")]
    Service(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Interface to the embedding service. Must be deterministic for a given
/// model/version so that rebuilding an unchanged catalog reproduces the
/// same vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RetrieveError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrieveError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// One catalog entry with its cached embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub descriptor: TableDescriptor,
    pub embedding: Vec<f32>,
}

/// A descriptor selected for a question, with its similarity score.
#[derive(Debug, Clone)]
pub struct RankedTable {
    pub descriptor: TableDescriptor,
    pub score: f64,
}

/// Embedding index over a schema catalog.
///
/// Read-only after construction; shareable across query calls. A changed
/// catalog requires a full rebuild, there is no incremental update.
#[derive(Debug, Default)]
pub struct RetrieverIndex {
    entries: Vec<IndexEntry>,
}

impl RetrieverIndex {
    /// Embed every descriptor in the catalog, in registration order.
    ///
    /// Fails as a whole on any service error; no partially built index is
    /// returned.
    pub async fn build(
        catalog: &SchemaCatalog,
        embedder: &dyn Embedder,
    ) -> Result<Self, RetrieveError> {
        let texts: Vec<String> = catalog
            .tables()
            .iter()
            .map(|descriptor| descriptor.embedding_text())
            .collect();

        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(RetrieveError::Service(format!(
                "embedding service returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }

        let mut entries = Vec::with_capacity(vectors.len());
        let mut dimensions: Option<usize> = None;
        for (descriptor, embedding) in catalog.tables().iter().cloned().zip(vectors) {
            match dimensions {
                None => dimensions = Some(embedding.len()),
                Some(expected) if expected != embedding.len() => {
                    return Err(RetrieveError::DimensionMismatch {
                        expected,
                        actual: embedding.len(),
                    });
                }
                Some(_) => {}
            }
            entries.push(IndexEntry {
                descriptor,
                embedding,
            });
        }

        debug!(tables = entries.len(), "built retriever index");
        Ok(Self { entries })
    }

    /// Rank all entries against `question` and return the top-`k` by
    /// descending cosine similarity. Ties are broken by catalog registration
    /// order.
    pub async fn retrieve(
        &self,
        embedder: &dyn Embedder,
        question: &str,
        k: usize,
    ) -> Result<Vec<RankedTable>, RetrieveError> {
        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let question_vec = embedder.embed(question).await?;
        let expected = self.entries[0].embedding.len();
        if question_vec.len() != expected {
            return Err(RetrieveError::DimensionMismatch {
                expected,
                actual: question_vec.len(),
            });
        }

        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(&question_vec, &entry.embedding)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        for (i, score) in &scored {
            debug!(table = %self.entries[*i].descriptor.name, score, "candidate table");
        }

        Ok(scored
            .into_iter()
            .map(|(i, score)| RankedTable {
                descriptor: self.entries[i].descriptor.clone(),
                score,
            })
            .collect())
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cosine similarity over f32 slices, accumulated in f64. Degenerate inputs
/// (zero norm) score 0.0 so they rank last without poisoning the sort.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let x64 = f64::from(x);
        let y64 = f64::from(y);
        dot += x64 * y64;
        norm_a += x64 * x64;
        norm_b += y64 * y64;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }
    dot / denom
}
