//! Knowledge-base ingestion
//!
//! Splits markdown policy documents into overlapping chunks and indexes
//! them into both retrieval legs (Qdrant + Tantivy).

use std::path::Path;
use std::sync::Arc;

use retail_assist_config::constants::ingest;
use retail_assist_core::Document;

use crate::embeddings::Embedder;
use crate::sparse_search::SparseIndex;
use crate::vector_store::VectorStore;
use crate::RagError;

/// Chunking configuration
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap carried between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: ingest::CHUNK_SIZE,
            chunk_overlap: ingest::CHUNK_OVERLAP,
        }
    }
}

/// Split text into overlapping chunks, preferring paragraph and line breaks
///
/// Splits on blank lines first and re-packs paragraphs up to `chunk_size`;
/// paragraphs longer than a chunk fall back to a character window with
/// `chunk_overlap` carried between windows.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().count() <= config.chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if current.chars().count() + paragraph.chars().count() + 2 > config.chunk_size
            && !current.is_empty()
        {
            chunks.push(std::mem::take(&mut current));
        }

        if paragraph.chars().count() > config.chunk_size {
            chunks.extend(split_by_window(paragraph, config));
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn split_by_window(text: &str, config: &ChunkConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = config.chunk_size.saturating_sub(config.chunk_overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Ingests knowledge files into both retrieval indexes
pub struct KnowledgeIngestor {
    embedder: Arc<Embedder>,
    vector_store: Arc<VectorStore>,
    sparse_index: Arc<SparseIndex>,
    chunking: ChunkConfig,
}

impl KnowledgeIngestor {
    pub fn new(
        embedder: Arc<Embedder>,
        vector_store: Arc<VectorStore>,
        sparse_index: Arc<SparseIndex>,
        chunking: ChunkConfig,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            sparse_index,
            chunking,
        }
    }

    /// Ingest every `.md` file under a directory (recursive)
    ///
    /// Returns the number of chunks indexed.
    pub async fn ingest_dir(&self, dir: impl AsRef<Path>) -> Result<usize, RagError> {
        let mut documents = Vec::new();
        collect_markdown(dir.as_ref(), &mut documents)?;

        if documents.is_empty() {
            tracing::warn!(dir = %dir.as_ref().display(), "no markdown files found to ingest");
            return Ok(0);
        }

        self.ingest_documents(documents).await
    }

    /// Chunk, embed and index pre-loaded documents
    pub async fn ingest_documents(&self, documents: Vec<Document>) -> Result<usize, RagError> {
        let mut chunks = Vec::new();
        for doc in documents {
            for piece in chunk_text(&doc.content, &self.chunking) {
                chunks.push(Document {
                    content: piece,
                    metadata: doc.metadata.clone(),
                });
            }
        }

        if chunks.is_empty() {
            return Ok(0);
        }

        let embedder = Arc::clone(&self.embedder);
        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
            embedder.embed_batch(&refs)
        })
        .await
        .map_err(|e| RagError::Embedding(format!("Embedding task failed: {}", e)))??;

        self.vector_store.ensure_collection().await?;
        self.vector_store.upsert(&chunks, &embeddings).await?;

        let sparse_index = Arc::clone(&self.sparse_index);
        let sparse_chunks = chunks.clone();
        tokio::task::spawn_blocking(move || sparse_index.index_documents(&sparse_chunks))
            .await
            .map_err(|e| RagError::Index(format!("Indexing task failed: {}", e)))??;

        tracing::info!(chunks = chunks.len(), "knowledge base indexed");
        Ok(chunks.len())
    }
}

fn collect_markdown(dir: &Path, out: &mut Vec<Document>) -> Result<(), RagError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| RagError::Ingest(format!("{}: {}", dir.display(), e)))?;

    for entry in entries {
        let entry = entry.map_err(|e| RagError::Ingest(e.to_string()))?;
        let path = entry.path();

        if path.is_dir() {
            collect_markdown(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| RagError::Ingest(format!("{}: {}", path.display(), e)))?;
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string());
            out.push(Document::new(content, source));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Returns accepted within 14 days.", &ChunkConfig::default());
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("   \n ", &ChunkConfig::default()).is_empty());
    }

    #[test]
    fn test_long_text_respects_size_and_overlap() {
        let config = ChunkConfig {
            chunk_size: 100,
            chunk_overlap: 20,
        };
        let text = "x".repeat(350);
        let chunks = chunk_text(&text, &config);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        // Consecutive windows share the overlap
        assert_eq!(&chunks[0][80..], &chunks[1][..20]);
    }

    #[test]
    fn test_paragraphs_pack_into_chunks() {
        let config = ChunkConfig {
            chunk_size: 50,
            chunk_overlap: 10,
        };
        let text = "First paragraph here.\n\nSecond paragraph here.\n\nThird paragraph here.";
        let chunks = chunk_text(text, &config);

        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
    }
}
