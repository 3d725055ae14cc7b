//! tabletalk: ask natural-language questions of a directory of CSV files.
//!
//! On startup every CSV in the data directory is loaded into a DuckDB store
//! (skipped when the store file already exists). Each question is then
//! answered in four steps: rank the catalog tables against the question by
//! embedding similarity, prompt the model for a SQL statement over the top-K
//! tables, execute it, and prompt the model again to phrase the result rows
//! as an answer. The generated SQL and the raw rows are printed alongside
//! the answer.

use anyhow::Context;
use tabletalk_catalog::SchemaCatalog;
use tabletalk_engine::{QueryEngine, QueryOutcome};
use tabletalk_retriever::{Embedder, RetrieverIndex};
use tabletalk_store::{loader, Store};
use tracing::{error, info};

mod config;
mod dataset;
mod llm;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let config = config::Config::from_env()?;
    info!(
        model = %config.service.model,
        embedding_model = %config.service.embedding_model,
        base_url = %config.service.base_url,
        "starting tabletalk"
    );

    let summary = loader::load_dir(&config.store.db_path, &config.store.data_dir)
        .context("bulk load failed")?;
    if summary.skipped {
        info!(store = %config.store.db_path.display(), "reusing existing store");
    } else {
        info!(
            loaded = summary.loaded.len(),
            failed = summary.failed.len(),
            "bulk load finished"
        );
    }

    let store = Store::open(&config.store.db_path).context("failed to open store")?;
    for table in store.table_names()? {
        info!(table = %table, rows = store.row_count(&table)?, "table available");
    }

    let mut catalog = SchemaCatalog::new();
    catalog.register(dataset::descriptors())?;

    let llm = llm::LlmClient::new(&config.service);
    llm.verify_connectivity()
        .await
        .context("language model service is unreachable")?;

    let embedder = llm::ApiEmbedder::new(&config.service);
    let index = RetrieverIndex::build(&catalog, &embedder)
        .await
        .context("failed to build retriever index")?;

    let engine = QueryEngine::new(store, Box::new(llm.clone()), Box::new(llm));

    let mut questions: Vec<String> = std::env::args().skip(1).collect();
    if questions.is_empty() {
        questions = dataset::demo_questions();
    }

    for question in &questions {
        println!("Question: {question}");
        match answer(&engine, &index, &embedder, question, config.retrieval.top_k).await {
            Ok(outcome) => {
                println!("Answer: {}", outcome.answer);
                println!("Generated SQL: {}", outcome.sql);
                println!("Result: {}", outcome.rows.to_json());
                println!();
            }
            Err(e) => {
                error!(error = %e, "question failed");
                println!();
            }
        }
    }

    Ok(())
}

async fn answer(
    engine: &QueryEngine,
    index: &RetrieverIndex,
    embedder: &dyn Embedder,
    question: &str,
    top_k: usize,
) -> anyhow::Result<QueryOutcome> {
    let hits = index.retrieve(embedder, question, top_k).await?;
    let descriptors: Vec<_> = hits.into_iter().map(|hit| hit.descriptor).collect();
    let candidates = engine.candidate_schemas(&descriptors)?;
    Ok(engine.query(question, &candidates).await?)
}
