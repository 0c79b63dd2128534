//! Vector store using Qdrant
//!
//! Dense vector storage and similarity search over knowledge-base chunks.

use qdrant_client::{
    qdrant::{
        CreateCollectionBuilder, Distance, PointStruct, ScrollPointsBuilder,
        SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    },
    Qdrant,
};
use std::collections::HashMap;

use retail_assist_config::constants::endpoints;
use retail_assist_core::Document;

use crate::RagError;

/// Vector store configuration
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    /// Qdrant endpoint
    pub endpoint: String,
    /// Collection name
    pub collection: String,
    /// Vector dimension
    pub vector_dim: usize,
    /// API key (optional)
    pub api_key: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::QDRANT_DEFAULT.to_string(),
            collection: "retail_kb".to_string(),
            vector_dim: 384,
            api_key: None,
        }
    }
}

/// Search result from the vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// Similarity score
    pub score: f32,
    /// Stored chunk
    pub document: Document,
}

/// Vector store client
pub struct VectorStore {
    client: Qdrant,
    config: VectorStoreConfig,
}

impl VectorStore {
    /// Create a new vector store connection
    pub async fn new(config: VectorStoreConfig) -> Result<Self, RagError> {
        let mut builder = Qdrant::from_url(&config.endpoint);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create the collection if it does not exist
    pub async fn ensure_collection(&self) -> Result<(), RagError> {
        let exists = self
            .client
            .collection_exists(&self.config.collection)
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.config.collection).vectors_config(
                        VectorParamsBuilder::new(self.config.vector_dim as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;

            tracing::info!(collection = %self.config.collection, "created Qdrant collection");
        }

        Ok(())
    }

    /// Insert chunks with their embeddings
    pub async fn upsert(
        &self,
        documents: &[Document],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError> {
        if documents.len() != embeddings.len() {
            return Err(RagError::VectorStore(
                "Document and embedding count mismatch".to_string(),
            ));
        }

        let points: Vec<PointStruct> = documents
            .iter()
            .zip(embeddings.iter())
            .map(|(doc, emb)| {
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
                payload.insert("text".to_string(), doc.content.clone().into());
                for (key, value) in &doc.metadata {
                    payload.insert(key.clone(), value.clone().into());
                }

                PointStruct::new(
                    uuid::Uuid::new_v4().to_string(),
                    emb.clone(),
                    payload,
                )
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.config.collection, points).wait(true))
            .await
            .map_err(|e| RagError::VectorStore(e.to_string()))?;

        Ok(())
    }

    /// Similarity search
    pub async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorSearchResult>, RagError> {
        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(
                    &self.config.collection,
                    embedding.to_vec(),
                    top_k as u64,
                )
                .with_payload(true),
            )
            .await
            .map_err(|e| RagError::Search(e.to_string()))?;

        let results = response
            .result
            .into_iter()
            .map(|point| {
                let document = payload_to_document(point.payload);
                VectorSearchResult {
                    score: point.score,
                    document,
                }
            })
            .collect();

        Ok(results)
    }

    /// Fetch every stored chunk, used to rebuild the BM25 corpus at startup
    pub async fn scroll_all(&self) -> Result<Vec<Document>, RagError> {
        let mut documents = Vec::new();
        let mut offset = None;

        loop {
            let mut builder = ScrollPointsBuilder::new(&self.config.collection)
                .limit(256)
                .with_payload(true);
            if let Some(next) = offset.take() {
                builder = builder.offset(next);
            }

            let response = self
                .client
                .scroll(builder)
                .await
                .map_err(|e| RagError::VectorStore(e.to_string()))?;

            for point in response.result {
                documents.push(payload_to_document(point.payload));
            }

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(documents)
    }

    /// Collection name
    pub fn collection(&self) -> &str {
        &self.config.collection
    }
}

fn payload_to_document(payload: HashMap<String, qdrant_client::qdrant::Value>) -> Document {
    let mut content = String::new();
    let mut metadata = HashMap::new();

    for (key, value) in payload {
        if let Some(qdrant_client::qdrant::value::Kind::StringValue(s)) = value.kind {
            if key == "text" {
                content = s;
            } else {
                metadata.insert(key, s);
            }
        }
    }

    Document { content, metadata }
}
