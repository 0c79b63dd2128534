//! Hybrid retriever
//!
//! Combines BM25 and dense search with weighted Reciprocal Rank Fusion:
//! each source contributes `weight / (k0 + rank)` per document, ranks
//! starting at 1. Duplicates across sources are collapsed on a
//! `source::content-digest` key so their contributions accumulate.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

use retail_assist_config::constants::retrieval;
use retail_assist_core::{Document, ScoredDocument};

use crate::embeddings::Embedder;
use crate::sparse_search::SparseIndex;
use crate::vector_store::VectorStore;
use crate::RagError;

/// Retriever configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Number of fused results to return (each leg also fetches this many)
    pub top_k: usize,
    /// RRF weight for the BM25 leg
    pub lexical_weight: f64,
    /// RRF weight for the dense leg
    pub vector_weight: f64,
    /// RRF smoothing constant
    pub rrf_k0: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: retrieval::TOP_K_RETRIEVE,
            lexical_weight: retrieval::LEXICAL_WEIGHT,
            vector_weight: retrieval::VECTOR_WEIGHT,
            rrf_k0: retrieval::RRF_K0,
        }
    }
}

impl From<&retail_assist_config::RagConfig> for RetrieverConfig {
    fn from(config: &retail_assist_config::RagConfig) -> Self {
        Self {
            top_k: config.top_k_retrieve,
            lexical_weight: config.lexical_weight,
            vector_weight: config.vector_weight,
            rrf_k0: config.rrf_k0,
        }
    }
}

/// Hybrid retriever combining sparse and dense search
pub struct HybridRetriever {
    config: RetrieverConfig,
    embedder: Arc<Embedder>,
    sparse_index: Arc<SparseIndex>,
    vector_store: Arc<VectorStore>,
}

impl HybridRetriever {
    pub fn new(
        config: RetrieverConfig,
        embedder: Arc<Embedder>,
        sparse_index: Arc<SparseIndex>,
        vector_store: Arc<VectorStore>,
    ) -> Self {
        Self {
            config,
            embedder,
            sparse_index,
            vector_store,
        }
    }

    /// Hybrid search with RRF fusion
    ///
    /// Returns at most `top_k` fused results, ordered by fused score with
    /// first-seen order breaking ties. An empty query short-circuits to an
    /// empty result without touching either index.
    pub async fn search(&self, query: &str) -> Result<Vec<ScoredDocument>, RagError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let top_k = self.config.top_k;

        // Both legs are CPU-bound, run them off the async executor in parallel
        let sparse_index = Arc::clone(&self.sparse_index);
        let sparse_query = query.to_string();
        let sparse_future =
            tokio::task::spawn_blocking(move || sparse_index.search(&sparse_query, Some(top_k)));

        let embedder = Arc::clone(&self.embedder);
        let embed_query = query.to_string();
        let embed_future = tokio::task::spawn_blocking(move || embedder.embed(&embed_query));

        let (sparse_result, embed_result) = tokio::join!(sparse_future, embed_future);

        let sparse_results = sparse_result
            .map_err(|e| RagError::Search(format!("Sparse search task failed: {}", e)))??;
        let query_embedding = embed_result
            .map_err(|e| RagError::Embedding(format!("Embedding task failed: {}", e)))??;

        let dense_results = self.vector_store.search(&query_embedding, top_k).await?;

        let lexical: Vec<Document> = sparse_results.into_iter().map(|r| r.document).collect();
        let vector: Vec<Document> = dense_results.into_iter().map(|r| r.document).collect();

        tracing::debug!(
            lexical = lexical.len(),
            vector = vector.len(),
            "fusing retrieval legs"
        );

        Ok(rrf_fuse(&self.config, &lexical, &vector))
    }
}

/// Weighted Reciprocal Rank Fusion over the two ranked legs
pub(crate) fn rrf_fuse(
    config: &RetrieverConfig,
    lexical: &[Document],
    vector: &[Document],
) -> Vec<ScoredDocument> {
    struct Fused {
        score: f64,
        first_seen: usize,
        document: Document,
    }

    let mut fused: HashMap<String, Fused> = HashMap::new();
    let mut next_seen = 0usize;

    for (weight, docs) in [
        (config.lexical_weight, lexical),
        (config.vector_weight, vector),
    ] {
        for (rank, doc) in docs.iter().enumerate() {
            let contribution = weight / (config.rrf_k0 + rank + 1) as f64;
            let key = dedup_key(doc);

            match fused.get_mut(&key) {
                Some(entry) => entry.score += contribution,
                None => {
                    fused.insert(
                        key,
                        Fused {
                            score: contribution,
                            first_seen: next_seen,
                            document: doc.clone(),
                        },
                    );
                    next_seen += 1;
                }
            }
        }
    }

    let mut ranked: Vec<Fused> = fused.into_values().collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.first_seen.cmp(&b.first_seen))
    });

    ranked
        .into_iter()
        .take(config.top_k)
        .map(|f| ScoredDocument::new(f.document, f.score as f32))
        .collect()
}

/// Cross-source dedup key: source plus a digest of whitespace-collapsed
/// content, so the same chunk returned by both legs accumulates one score.
pub(crate) fn dedup_key(doc: &Document) -> String {
    let normalized: String = doc
        .content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{}::{:x}", doc.source(), digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_ignores_whitespace_runs() {
        let a = Document::new("the return  window is\n14 days", "returns.md");
        let b = Document::new("the return window is 14 days", "returns.md");
        assert_eq!(dedup_key(&a), dedup_key(&b));
    }

    #[test]
    fn test_dedup_key_distinguishes_sources() {
        let a = Document::new("14 days", "returns.md");
        let b = Document::new("14 days", "pickup.md");
        assert_ne!(dedup_key(&a), dedup_key(&b));
    }

    #[test]
    fn test_rrf_overlap_ranks_first() {
        let config = RetrieverConfig::default();

        let shared = Document::new("pickup orders held 3 days", "pickup.md");
        let lex_only = Document::new("returns need a receipt", "returns.md");
        let vec_only = Document::new("store hours 9 to 5", "hours.md");

        let lexical = vec![lex_only.clone(), shared.clone()];
        let vector = vec![shared.clone(), vec_only.clone()];

        let fused = rrf_fuse(&config, &lexical, &vector);

        assert_eq!(fused.len(), 3);
        // shared: 0.4/62 + 0.6/61 beats lex_only (0.4/61) and vec_only (0.6/62)
        assert_eq!(fused[0].document, shared);
    }

    #[test]
    fn test_rrf_rank_starts_at_one() {
        let config = RetrieverConfig::default();
        let doc = Document::new("only one", "a.md");

        let fused = rrf_fuse(&config, &[doc], &[]);
        assert_eq!(fused.len(), 1);
        let expected = 0.4 / 61.0;
        assert!((fused[0].score as f64 - expected).abs() < 1e-6);
    }

    #[test]
    fn test_rrf_weights_favor_vector_leg() {
        let config = RetrieverConfig::default();

        let a = Document::new("doc a", "a.md");
        let b = Document::new("doc b", "b.md");

        // Same rank in different legs: vector weight 0.6 beats lexical 0.4
        let fused = rrf_fuse(&config, &[a.clone()], &[b.clone()]);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].document, b);
    }

    #[test]
    fn test_rrf_tie_break_is_first_seen() {
        // Equal weights make every same-rank pair an exact tie
        let config = RetrieverConfig {
            lexical_weight: 0.5,
            vector_weight: 0.5,
            ..Default::default()
        };

        let a = Document::new("doc a", "a.md");
        let b = Document::new("doc b", "b.md");

        let fused = rrf_fuse(&config, &[a.clone()], &[b.clone()]);
        assert_eq!(fused[0].document, a);
        assert_eq!(fused[1].document, b);
    }

    #[test]
    fn test_rrf_truncates_to_top_k() {
        let config = RetrieverConfig {
            top_k: 2,
            ..Default::default()
        };

        let docs: Vec<Document> = (0..5)
            .map(|i| Document::new(format!("doc {}", i), format!("s{}.md", i)))
            .collect();
        let fused = rrf_fuse(&config, &docs, &[]);
        assert_eq!(fused.len(), 2);
    }
}
