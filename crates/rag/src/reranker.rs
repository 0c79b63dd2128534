//! Cross-encoder reranker with pass-through fallback
//!
//! The ONNX cross-encoder is loaded lazily on first use and at most once.
//! When the model cannot be loaded (missing files, build without the `onnx`
//! feature) reranking degrades to a pass-through that keeps the fused order
//! and zeroes the scores, so retrieval keeps working without the model.

use once_cell::sync::OnceCell;
use std::sync::Arc;

#[cfg(feature = "onnx")]
use ndarray::Array2;
#[cfg(feature = "onnx")]
use ort::{session::builder::GraphOptimizationLevel, session::Session, value::Tensor};
#[cfg(feature = "onnx")]
use tokenizers::Tokenizer;

use retail_assist_config::constants::retrieval;
use retail_assist_core::ScoredDocument;

use crate::RagError;

/// Reranker configuration
#[derive(Debug, Clone)]
pub struct RerankerConfig {
    /// ONNX model path; fallback pass-through when unset
    pub model_path: Option<String>,
    /// Tokenizer path
    pub tokenizer_path: Option<String>,
    /// Maximum sequence length for query/document pairs
    pub max_seq_len: usize,
    /// Number of results kept after reranking
    pub top_k: usize,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            tokenizer_path: None,
            max_seq_len: 256,
            top_k: retrieval::TOP_K_RERANK,
        }
    }
}

impl From<&retail_assist_config::RagConfig> for RerankerConfig {
    fn from(config: &retail_assist_config::RagConfig) -> Self {
        Self {
            model_path: config.reranker_model_path.clone(),
            tokenizer_path: config.reranker_tokenizer_path.clone(),
            max_seq_len: 256,
            top_k: config.top_k_rerank,
        }
    }
}

/// Lazily-loaded cross-encoder reranker
pub struct CrossEncoderReranker {
    config: RerankerConfig,
    /// `None` inside the cell records a failed load; the load is attempted
    /// at most once per process.
    model: OnceCell<Option<Arc<CrossEncoderModel>>>,
}

impl CrossEncoderReranker {
    pub fn new(config: RerankerConfig) -> Self {
        Self {
            config,
            model: OnceCell::new(),
        }
    }

    /// Rerank fused results by cross-encoder relevance
    ///
    /// Returns at most `top_k` documents. With no usable model the first
    /// `top_k` inputs come back in their original order with score 0.0.
    /// Empty input returns empty without triggering a model load.
    pub fn rerank(&self, query: &str, docs: Vec<ScoredDocument>) -> Vec<ScoredDocument> {
        if docs.is_empty() {
            return Vec::new();
        }

        let model = match self.model() {
            Some(model) => Arc::clone(model),
            None => return pass_through(docs, self.config.top_k),
        };

        let texts: Vec<&str> = docs.iter().map(|d| d.document.content.as_str()).collect();
        let scores = match model.score_pairs(query, &texts) {
            Ok(scores) => scores,
            Err(e) => {
                tracing::warn!(error = %e, "cross-encoder scoring failed, passing fused order through");
                return pass_through(docs, self.config.top_k);
            }
        };

        let mut scored: Vec<ScoredDocument> = docs
            .into_iter()
            .zip(scores)
            .map(|(d, score)| ScoredDocument::new(d.document, score))
            .collect();

        // Stable sort keeps the fused order for equal scores
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.config.top_k);
        scored
    }

    fn model(&self) -> Option<&Arc<CrossEncoderModel>> {
        self.model
            .get_or_init(|| match CrossEncoderModel::load(&self.config) {
                Ok(model) => Some(Arc::new(model)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "cross-encoder unavailable, reranking falls back to pass-through"
                    );
                    None
                }
            })
            .as_ref()
    }
}

fn pass_through(docs: Vec<ScoredDocument>, top_k: usize) -> Vec<ScoredDocument> {
    docs.into_iter()
        .take(top_k)
        .map(|d| ScoredDocument::new(d.document, 0.0))
        .collect()
}

/// ONNX cross-encoder session
#[cfg(feature = "onnx")]
struct CrossEncoderModel {
    session: Session,
    tokenizer: Tokenizer,
    max_seq_len: usize,
}

#[cfg(feature = "onnx")]
impl CrossEncoderModel {
    fn load(config: &RerankerConfig) -> Result<Self, RagError> {
        let model_path = config
            .model_path
            .as_ref()
            .ok_or_else(|| RagError::Model("No reranker model path configured".to_string()))?;
        let tokenizer_path = config
            .tokenizer_path
            .as_ref()
            .ok_or_else(|| RagError::Model("No reranker tokenizer path configured".to_string()))?;

        let session = Session::builder()
            .map_err(|e| RagError::Model(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RagError::Model(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| RagError::Model(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| RagError::Model(e.to_string()))?;

        let tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(|e| RagError::Model(e.to_string()))?;

        Ok(Self {
            session,
            tokenizer,
            max_seq_len: config.max_seq_len,
        })
    }

    /// Score (query, document) pairs; higher = more relevant
    fn score_pairs(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>, RagError> {
        let pairs: Vec<(String, String)> = texts
            .iter()
            .map(|t| (query.to_string(), t.to_string()))
            .collect();

        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        let batch_size = encodings.len();
        let mut input_ids = vec![0i64; batch_size * self.max_seq_len];
        let mut attention_mask = vec![0i64; batch_size * self.max_seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();

            let len = ids.len().min(self.max_seq_len);
            let offset = i * self.max_seq_len;

            for j in 0..len {
                input_ids[offset + j] = ids[j] as i64;
                attention_mask[offset + j] = mask[j] as i64;
            }
        }

        let input_ids = Array2::from_shape_vec((batch_size, self.max_seq_len), input_ids)
            .map_err(|e| RagError::Reranker(e.to_string()))?;
        let attention_mask = Array2::from_shape_vec((batch_size, self.max_seq_len), attention_mask)
            .map_err(|e| RagError::Reranker(e.to_string()))?;

        let input_ids_tensor =
            Tensor::from_array(input_ids).map_err(|e| RagError::Model(e.to_string()))?;
        let attention_mask_tensor =
            Tensor::from_array(attention_mask).map_err(|e| RagError::Model(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
            ])
            .map_err(|e| RagError::Model(e.to_string()))?;

        let (shape, logits) = outputs
            .get("logits")
            .ok_or_else(|| RagError::Model("Missing output tensor: logits".to_string()))?
            .try_extract_tensor::<f32>()
            .map_err(|e| RagError::Model(e.to_string()))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let stride = if dims.len() == 2 { dims[1] } else { 1 };

        Ok((0..batch_size)
            .map(|i| logits.get(i * stride).copied().unwrap_or(0.0))
            .collect())
    }
}

/// Stub when ONNX is disabled; every load fails into the pass-through path
#[cfg(not(feature = "onnx"))]
struct CrossEncoderModel;

#[cfg(not(feature = "onnx"))]
impl CrossEncoderModel {
    fn load(_config: &RerankerConfig) -> Result<Self, RagError> {
        Err(RagError::Model(
            "Built without the onnx feature".to_string(),
        ))
    }

    fn score_pairs(&self, _query: &str, _texts: &[&str]) -> Result<Vec<f32>, RagError> {
        Err(RagError::Model(
            "Built without the onnx feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retail_assist_core::Document;

    fn scored(content: &str, source: &str, score: f32) -> ScoredDocument {
        ScoredDocument::new(Document::new(content, source), score)
    }

    #[test]
    fn test_empty_input_returns_empty() {
        let reranker = CrossEncoderReranker::new(RerankerConfig::default());
        assert!(reranker.rerank("anything", Vec::new()).is_empty());
        // Empty input must not trigger a load attempt
        assert!(reranker.model.get().is_none());
    }

    #[test]
    fn test_fallback_keeps_order_and_zeroes_scores() {
        let reranker = CrossEncoderReranker::new(RerankerConfig::default());

        let docs = vec![
            scored("first", "a.md", 0.9),
            scored("second", "b.md", 0.8),
            scored("third", "c.md", 0.7),
        ];

        let reranked = reranker.rerank("return policy", docs);

        assert_eq!(reranked.len(), 3);
        assert_eq!(reranked[0].document.source(), "a.md");
        assert_eq!(reranked[1].document.source(), "b.md");
        assert_eq!(reranked[2].document.source(), "c.md");
        assert!(reranked.iter().all(|d| d.score == 0.0));
    }

    #[test]
    fn test_fallback_truncates_to_top_k() {
        let config = RerankerConfig {
            top_k: 2,
            ..Default::default()
        };
        let reranker = CrossEncoderReranker::new(config);

        let docs = (0..5)
            .map(|i| scored(&format!("doc {}", i), &format!("s{}.md", i), 1.0))
            .collect();

        let reranked = reranker.rerank("query", docs);
        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].document.source(), "s0.md");
    }

    #[test]
    fn test_load_is_attempted_once() {
        let reranker = CrossEncoderReranker::new(RerankerConfig::default());
        reranker.rerank("query", vec![scored("doc", "a.md", 1.0)]);
        // Failed load is cached as None
        assert!(matches!(reranker.model.get(), Some(None)));
        reranker.rerank("query", vec![scored("doc", "a.md", 1.0)]);
    }
}
