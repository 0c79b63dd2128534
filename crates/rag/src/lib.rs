//! Retrieval for the retail assistant
//!
//! Features:
//! - Dense vector search via Qdrant
//! - Sparse BM25 search via Tantivy
//! - Hybrid fusion with weighted RRF
//! - Cross-encoder reranking with graceful pass-through fallback
//! - Knowledge-base ingestion (chunking + dual indexing)
//! - Citation formatting with PII sanitization

pub mod citations;
pub mod embeddings;
pub mod ingest;
pub mod reranker;
pub mod retriever;
pub mod sparse_search;
pub mod vector_store;

pub use citations::format_citations;
pub use embeddings::{Embedder, EmbeddingConfig, SimpleEmbedder};
pub use ingest::{chunk_text, ChunkConfig, KnowledgeIngestor};
pub use reranker::{CrossEncoderReranker, RerankerConfig};
pub use retriever::{HybridRetriever, RetrieverConfig};
pub use sparse_search::{SparseConfig, SparseIndex, SparseResult};
pub use vector_store::{VectorSearchResult, VectorStore, VectorStoreConfig};

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Reranker error: {0}")]
    Reranker(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<RagError> for retail_assist_core::Error {
    fn from(err: RagError) -> Self {
        retail_assist_core::Error::Rag(err.to_string())
    }
}
