//! Text embeddings
//!
//! Dense embeddings for semantic search. The ONNX-backed [`Embedder`] is
//! compiled in behind the `onnx` feature; without it (and in tests) the
//! deterministic [`SimpleEmbedder`] stands in so the rest of the stack
//! works end to end.

#[cfg(feature = "onnx")]
use std::path::Path;

#[cfg(feature = "onnx")]
use ndarray::Array2;
#[cfg(feature = "onnx")]
use ort::{session::builder::GraphOptimizationLevel, session::Session, value::Tensor};
#[cfg(feature = "onnx")]
use tokenizers::Tokenizer;

use crate::RagError;

/// Embedding configuration
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Maximum sequence length
    pub max_seq_len: usize,
    /// Embedding dimension
    pub embedding_dim: usize,
    /// L2-normalize embeddings
    pub normalize: bool,
    /// Batch size for bulk embedding
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            max_seq_len: 512,
            embedding_dim: 384,
            normalize: true,
            batch_size: 32,
        }
    }
}

/// Text embedder backed by an ONNX sentence-transformer
#[cfg(feature = "onnx")]
pub struct Embedder {
    session: Session,
    tokenizer: Tokenizer,
    config: EmbeddingConfig,
}

#[cfg(feature = "onnx")]
impl Embedder {
    /// Create a new embedder
    pub fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        config: EmbeddingConfig,
    ) -> Result<Self, RagError> {
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
            config,
        })
    }

    /// Embed a single text
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let embeddings = self.embed_batch(&[text])?;
        Ok(embeddings.into_iter().next().unwrap_or_default())
    }

    /// Embed multiple texts
    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.config.batch_size) {
            all_embeddings.extend(self.embed_batch_internal(chunk)?);
        }

        Ok(all_embeddings)
    }

    fn embed_batch_internal(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let mut input_ids = vec![0i64; batch_size * self.config.max_seq_len];
        let mut attention_mask = vec![0i64; batch_size * self.config.max_seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();

            let len = ids.len().min(self.config.max_seq_len);
            let offset = i * self.config.max_seq_len;

            for j in 0..len {
                input_ids[offset + j] = ids[j] as i64;
                attention_mask[offset + j] = mask[j] as i64;
            }
        }

        let input_ids = Array2::from_shape_vec((batch_size, self.config.max_seq_len), input_ids)
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        let attention_mask =
            Array2::from_shape_vec((batch_size, self.config.max_seq_len), attention_mask)
                .map_err(|e| RagError::Embedding(e.to_string()))?;

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

        let (shape, hidden_data) = outputs
            .get("last_hidden_state")
            .ok_or_else(|| RagError::Model("Missing output tensor: last_hidden_state".to_string()))?
            .try_extract_tensor::<f32>()
            .map_err(|e| RagError::Model(e.to_string()))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let (tensor_batch, tensor_seq_len, tensor_hidden_dim) = if dims.len() == 3 {
            (dims[0], dims[1], dims[2])
        } else {
            return Err(RagError::Model(format!(
                "Unexpected tensor shape: {:?}",
                dims
            )));
        };

        // Mean-pool over the real (unpadded) tokens
        let mut embeddings = Vec::with_capacity(batch_size);

        for i in 0..batch_size.min(tensor_batch) {
            let seq_len = encodings[i]
                .get_ids()
                .len()
                .min(self.config.max_seq_len)
                .min(tensor_seq_len);
            let mut embedding = vec![0.0f32; self.config.embedding_dim];

            for j in 0..seq_len {
                for (k, v) in embedding
                    .iter_mut()
                    .enumerate()
                    .take(tensor_hidden_dim)
                {
                    let idx = i * tensor_seq_len * tensor_hidden_dim + j * tensor_hidden_dim + k;
                    if idx < hidden_data.len() {
                        *v += hidden_data[idx];
                    }
                }
            }

            for v in &mut embedding {
                *v /= seq_len as f32;
            }

            if self.config.normalize {
                normalize_in_place(&mut embedding);
            }

            embeddings.push(embedding);
        }

        Ok(embeddings)
    }

    /// Get embedding dimension
    pub fn dim(&self) -> usize {
        self.config.embedding_dim
    }
}

/// Embedder stub when ONNX is disabled; delegates to [`SimpleEmbedder`]
#[cfg(not(feature = "onnx"))]
pub struct Embedder {
    inner: SimpleEmbedder,
}

#[cfg(not(feature = "onnx"))]
impl Embedder {
    pub fn new(
        _model_path: impl AsRef<std::path::Path>,
        _tokenizer_path: impl AsRef<std::path::Path>,
        config: EmbeddingConfig,
    ) -> Result<Self, RagError> {
        Ok(Self {
            inner: SimpleEmbedder::new(config),
        })
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        Ok(self.inner.embed(text))
    }

    pub fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.inner.embed(t)).collect())
    }

    pub fn dim(&self) -> usize {
        self.inner.dim()
    }
}

fn normalize_in_place(embedding: &mut [f32]) {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in embedding {
            *v /= norm;
        }
    }
}

/// Deterministic hash-projection embedder (no model required)
pub struct SimpleEmbedder {
    config: EmbeddingConfig,
}

impl SimpleEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    /// Project characters into a fixed-size bag-of-positions vector
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.config.embedding_dim];

        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % self.config.embedding_dim;
            embedding[idx] += 1.0;
        }

        if self.config.normalize {
            normalize_in_place(&mut embedding);
        }

        embedding
    }

    pub fn dim(&self) -> usize {
        self.config.embedding_dim
    }
}
