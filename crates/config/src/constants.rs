//! Centralized constants for the retail assistant
//!
//! Single source of truth for retrieval, agent and endpoint defaults so the
//! same values are not duplicated across crates.

/// Retrieval and ranking defaults
pub mod retrieval {
    /// Documents returned by the hybrid retriever
    pub const TOP_K_RETRIEVE: usize = 10;

    /// Documents kept after re-ranking
    pub const TOP_K_RERANK: usize = 5;

    /// RRF weight for the lexical (BM25) source
    pub const LEXICAL_WEIGHT: f64 = 0.4;

    /// RRF weight for the vector source
    pub const VECTOR_WEIGHT: f64 = 0.6;

    /// RRF smoothing constant; large enough to avoid rank-1 dominance
    pub const RRF_K0: usize = 60;

    /// Citation excerpt length (characters)
    pub const EXCERPT_LEN: usize = 220;
}

/// Agent pipeline defaults
pub mod agent {
    /// Hard cap on executor tool-loop iterations
    pub const MAX_ITERATIONS: usize = 6;

    /// Verdict confidence below which a bare "answer" recommendation
    /// is overridden to "ask_clarify"
    pub const CONFIDENCE_THRESHOLD: f64 = 0.55;
}

/// Default collaborator endpoints
pub mod endpoints {
    /// Qdrant vector store
    pub const QDRANT_DEFAULT: &str = "http://localhost:6334";

    /// Demo store API (hours / inventory / appointments)
    pub const STORE_API_DEFAULT: &str = "http://localhost:8001";

    /// OpenAI-compatible chat completions endpoint
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";

    /// Ollama endpoint
    pub const OLLAMA_DEFAULT: &str = "http://localhost:11434";
}

/// Knowledge-base ingestion defaults
pub mod ingest {
    /// Chunk size in characters
    pub const CHUNK_SIZE: usize = 900;

    /// Overlap between consecutive chunks
    pub const CHUNK_OVERLAP: usize = 120;
}
