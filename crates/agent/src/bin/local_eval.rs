//! Local eval entrypoint
//!
//! Wires the full stack (retrieval, tools, model backend) from settings,
//! optionally ingests a knowledge-base directory, then scores every example
//! in the JSONL file and prints mean metric scores.
//!
//! Usage: `local-eval [settings.toml]`
//!   RETAIL_ASSIST_KB_DIR     knowledge-base directory   (default data/kb)
//!   RETAIL_ASSIST_EVAL_FILE  eval examples JSONL        (default data/eval_examples.jsonl)
//!   RETAIL_ASSIST_SEED_SQL   demo-store seed script     (default data/seed.sql)

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use retail_assist_agent::{run_eval, Pipeline};
use retail_assist_config::load_settings;
use retail_assist_llm::build_backend;
use retail_assist_rag::{
    ChunkConfig, CrossEncoderReranker, Embedder, EmbeddingConfig, HybridRetriever,
    KnowledgeIngestor, RerankerConfig, RetrieverConfig, SparseConfig, SparseIndex, VectorStore,
    VectorStoreConfig,
};
use retail_assist_tools::{build_registry, HttpMailer, HttpStoreApi, RegistryDeps, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = load_settings(config_path.as_deref()).context("failed to load settings")?;

    let kb_dir = env_path("RETAIL_ASSIST_KB_DIR", "data/kb");
    let eval_file = env_path("RETAIL_ASSIST_EVAL_FILE", "data/eval_examples.jsonl");

    let embedder = Arc::new(Embedder::new(
        "",
        "",
        EmbeddingConfig {
            embedding_dim: settings.rag.embedding_dim,
            ..Default::default()
        },
    )?);

    let sparse_index = Arc::new(SparseIndex::new(SparseConfig {
        top_k: settings.rag.top_k_retrieve,
        ..Default::default()
    })?);

    let vector_store = Arc::new(
        VectorStore::new(VectorStoreConfig {
            endpoint: settings.rag.qdrant_endpoint.clone(),
            collection: settings.rag.collection.clone(),
            vector_dim: settings.rag.embedding_dim,
            api_key: None,
        })
        .await
        .context("failed to connect to the vector store")?,
    );

    if kb_dir.is_dir() {
        let ingestor = KnowledgeIngestor::new(
            Arc::clone(&embedder),
            Arc::clone(&vector_store),
            Arc::clone(&sparse_index),
            ChunkConfig {
                chunk_size: settings.rag.chunk_size,
                chunk_overlap: settings.rag.chunk_overlap,
            },
        );
        let chunks = ingestor.ingest_dir(&kb_dir).await?;
        tracing::info!(chunks, dir = %kb_dir.display(), "knowledge base ingested");
    } else {
        // No local KB to ingest; rebuild the lexical index from whatever
        // the vector collection already holds
        let existing = vector_store.scroll_all().await?;
        if existing.is_empty() {
            tracing::warn!(dir = %kb_dir.display(), "no knowledge base found, retrieval will be empty");
        } else {
            let docs = existing.len();
            let sparse = Arc::clone(&sparse_index);
            tokio::task::spawn_blocking(move || sparse.index_documents(&existing)).await??;
            tracing::info!(docs, "lexical index hydrated from the vector store");
        }
    }

    let store = Arc::new(SqliteStore::new(&settings.database.path));
    store
        .seed_from_file(env_path("RETAIL_ASSIST_SEED_SQL", "data/seed.sql"))
        .await?;

    let registry = build_registry(RegistryDeps {
        retriever: Arc::new(HybridRetriever::new(
            RetrieverConfig::from(&settings.rag),
            embedder,
            sparse_index,
            vector_store,
        )),
        reranker: Arc::new(CrossEncoderReranker::new(RerankerConfig::from(
            &settings.rag,
        ))),
        store,
        store_api: Arc::new(HttpStoreApi::new(
            &settings.store_api.base_url,
            Duration::from_secs(settings.store_api.timeout_secs),
        )?),
        mailer: Arc::new(HttpMailer::new((&settings.mail).into())?),
    });

    let model = build_backend(&settings.llm)?;
    let pipeline = Pipeline::new(model, Arc::new(registry), settings.agent.clone());

    let summary = run_eval(&pipeline, &eval_file)
        .await
        .with_context(|| format!("eval run over {} failed", eval_file.display()))?;

    println!("Local Eval Summary");
    println!(
        "- citation_presence: {:.2}  (n={})",
        summary.citation_presence, summary.examples
    );
    println!(
        "- grounded_numeric_claims: {:.2}  (n={})",
        summary.grounded_numeric_claims, summary.examples
    );
    println!(
        "- escalation_when_low_confidence: {:.2}  (n={})",
        summary.escalation_when_low_confidence, summary.examples
    );

    Ok(())
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| Path::new(default).to_path_buf())
}
