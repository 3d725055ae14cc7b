//! Query engine: turns a question plus a candidate table set into
//! (natural-language answer, generated SQL, raw rows).

use async_trait::async_trait;
use serde::Serialize;
use tabletalk_catalog::TableDescriptor;
use tabletalk_store::{ColumnInfo, QueryResult, Store, StoreError};
use thiserror::Error;
use tracing::debug;

pub mod prompt;
pub mod validate;

/// The model produced something we refuse to run. Distinct from [`EngineError::Service`]
/// so callers can tell "the model got it wrong" from "the infrastructure failed".
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model returned an empty completion")]
    EmptyCompletion,

    #[error("generated SQL does not parse: {0}")]
    Unparseable(String),

    #[error("generated statement is not a query")]
    NotAQuery,

    #[error("generated SQL references tables outside the candidate set: {tables:?}")]
    DisallowedTables { tables: Vec<String> },

    #[error("store rejected generated SQL: {0}")]
    Rejected(#[source] StoreError),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("language model service error: {0}")]
    Service(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Schema of one candidate table as rendered into the generation prompt.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSchema {
    pub name: String,
    pub context: Option<String>,
    pub columns: Vec<ColumnInfo>,
}

/// First LLM step: produce a single SQL statement for the question,
/// restricted to the candidate tables.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate_sql(
        &self,
        question: &str,
        candidates: &[CandidateSchema],
    ) -> Result<String, EngineError>;
}

/// Second LLM step: turn the executed SQL and its rows into a prose answer.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        question: &str,
        sql: &str,
        rows: &QueryResult,
    ) -> Result<String, EngineError>;
}

/// Everything a `query` call produces. The generated SQL and the raw rows are
/// surfaced alongside the answer so a caller can audit correctness
/// independently of the prose.
#[derive(Debug, Serialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub sql: String,
    pub rows: QueryResult,
}

/// Linear pipeline per call: generate SQL → validate → execute → synthesize.
/// Two sequential service round trips, one store execution, no retries and no
/// conversation state between calls.
pub struct QueryEngine {
    store: Store,
    generator: Box<dyn SqlGenerator>,
    synthesizer: Box<dyn AnswerSynthesizer>,
}

impl QueryEngine {
    pub fn new(
        store: Store,
        generator: Box<dyn SqlGenerator>,
        synthesizer: Box<dyn AnswerSynthesizer>,
    ) -> Self {
        Self {
            store,
            generator,
            synthesizer,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Resolve descriptors into prompt-ready schemas by introspecting the
    /// store for each table's columns.
    pub fn candidate_schemas(
        &self,
        descriptors: &[TableDescriptor],
    ) -> Result<Vec<CandidateSchema>, EngineError> {
        descriptors
            .iter()
            .map(|descriptor| {
                let columns = self.store.table_columns(&descriptor.name)?;
                Ok(CandidateSchema {
                    name: descriptor.name.clone(),
                    context: descriptor.context.clone(),
                    columns,
                })
            })
            .collect()
    }

    pub async fn query(
        &self,
        question: &str,
        candidates: &[CandidateSchema],
    ) -> Result<QueryOutcome, EngineError> {
        let raw = self.generator.generate_sql(question, candidates).await?;
        let sql = sanitize_completion(&raw);
        if sql.is_empty() {
            return Err(GenerationError::EmptyCompletion.into());
        }

        let referenced = validate::referenced_tables(&sql)?;
        validate::ensure_candidates(&referenced, candidates)?;

        debug!(%sql, "executing generated SQL");
        let rows = self
            .store
            .execute(&sql)
            .map_err(|e| EngineError::Generation(GenerationError::Rejected(e)))?;

        let answer = self.synthesizer.synthesize(question, &sql, &rows).await?;

        Ok(QueryOutcome {
            answer,
            sql,
            rows,
        })
    }
}

/// Strip the markdown fence the model sometimes wraps the statement in,
/// despite being told not to.
fn sanitize_completion(raw: &str) -> String {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```sql")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.strip_suffix("```").unwrap_or(rest))
        .unwrap_or(trimmed);
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_passes_plain_sql_through() {
        assert_eq!(
            sanitize_completion("SELECT 1\n"),
            "SELECT 1"
        );
    }

    #[test]
    fn sanitize_strips_sql_fence() {
        assert_eq!(
            sanitize_completion("```sql\nSELECT SUM(yellow_cards) FROM appearances\n```"),
            "SELECT SUM(yellow_cards) FROM appearances"
        );
    }

    #[test]
    fn sanitize_strips_bare_fence() {
        assert_eq!(sanitize_completion("```\nSELECT 1\n```"), "SELECT 1");
    }

    #[test]
    fn sanitize_handles_empty_completion() {
        assert_eq!(sanitize_completion("   \n"), "");
        assert_eq!(sanitize_completion("```sql\n```"), "");
    }
}
