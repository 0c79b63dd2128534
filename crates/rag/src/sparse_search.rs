//! Sparse search using Tantivy (BM25)
//!
//! Keyword-based leg of hybrid retrieval. The index is rebuilt from the
//! vector store's chunks at startup, so it lives in RAM by default.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use tantivy::{
    collector::TopDocs,
    query::QueryParser,
    schema::{Field, OwnedValue, Schema, TextFieldIndexing, TextOptions, STORED, STRING},
    tokenizer::{Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, TextAnalyzer},
    Index, IndexReader, IndexWriter, TantivyDocument,
};

use retail_assist_core::Document;

use crate::RagError;

/// Sparse search configuration
#[derive(Debug, Clone)]
pub struct SparseConfig {
    /// Index path (RAM if None)
    pub index_path: Option<String>,
    /// Default number of results
    pub top_k: usize,
    /// Enable English stemming
    pub stemming: bool,
}

impl Default for SparseConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            top_k: retail_assist_config::constants::retrieval::TOP_K_RETRIEVE,
            stemming: true,
        }
    }
}

/// Sparse search result
#[derive(Debug, Clone)]
pub struct SparseResult {
    /// BM25 score
    pub score: f32,
    /// Stored chunk
    pub document: Document,
}

/// BM25 index over knowledge-base chunks
pub struct SparseIndex {
    index: Index,
    reader: IndexReader,
    writer: RwLock<Option<IndexWriter>>,
    text_field: Field,
    source_field: Field,
    category_field: Field,
    config: SparseConfig,
}

impl SparseIndex {
    /// Create a new sparse index
    pub fn new(config: SparseConfig) -> Result<Self, RagError> {
        let mut schema_builder = Schema::builder();

        let text_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer("retail_en")
                    .set_index_option(tantivy::schema::IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();

        let text_field = schema_builder.add_text_field("text", text_options);
        let source_field = schema_builder.add_text_field("source", STRING | STORED);
        let category_field = schema_builder.add_text_field("category", STRING | STORED);

        let schema = schema_builder.build();

        let index = if let Some(ref path) = config.index_path {
            let dir = tantivy::directory::MmapDirectory::open(Path::new(path))
                .map_err(|e| RagError::Index(e.to_string()))?;
            Index::open_or_create(dir, schema).map_err(|e| RagError::Index(e.to_string()))?
        } else {
            Index::create_in_ram(schema)
        };

        index
            .tokenizers()
            .register("retail_en", Self::build_tokenizer(&config));

        let reader = index.reader().map_err(|e| RagError::Index(e.to_string()))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| RagError::Index(e.to_string()))?;

        Ok(Self {
            index,
            reader,
            writer: RwLock::new(Some(writer)),
            text_field,
            source_field,
            category_field,
            config,
        })
    }

    fn build_tokenizer(config: &SparseConfig) -> TextAnalyzer {
        let base = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(100))
            .filter(LowerCaser);

        if config.stemming {
            base.filter(Stemmer::new(Language::English)).build()
        } else {
            base.build()
        }
    }

    /// Index chunks
    pub fn index_documents(&self, documents: &[Document]) -> Result<(), RagError> {
        let mut writer = self.writer.write();
        let writer = writer
            .as_mut()
            .ok_or_else(|| RagError::Index("Writer not available".to_string()))?;

        for doc in documents {
            let mut tantivy_doc = TantivyDocument::default();

            tantivy_doc.add_text(self.text_field, &doc.content);
            tantivy_doc.add_text(self.source_field, doc.source());
            if let Some(category) = doc.metadata.get("category") {
                tantivy_doc.add_text(self.category_field, category);
            }

            writer
                .add_document(tantivy_doc)
                .map_err(|e| RagError::Index(e.to_string()))?;
        }

        writer
            .commit()
            .map_err(|e| RagError::Index(e.to_string()))?;

        self.reader
            .reload()
            .map_err(|e| RagError::Index(e.to_string()))?;

        Ok(())
    }

    /// Search using BM25
    pub fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<SparseResult>, RagError> {
        let k = top_k.unwrap_or(self.config.top_k);

        let searcher = self.reader.searcher();
        let query_parser = QueryParser::for_index(&self.index, vec![self.text_field]);

        // parse_query_lenient tolerates punctuation in raw user questions
        let (query, _errors) = query_parser.parse_query_lenient(query);

        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(k))
            .map_err(|e| RagError::Search(e.to_string()))?;

        let mut results = Vec::with_capacity(top_docs.len());

        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| RagError::Search(e.to_string()))?;

            let content = stored_text(&doc, self.text_field);
            let source = stored_text(&doc, self.source_field);

            let mut metadata = HashMap::new();
            metadata.insert("source".to_string(), source);
            let category = stored_text(&doc, self.category_field);
            if !category.is_empty() {
                metadata.insert("category".to_string(), category);
            }

            results.push(SparseResult {
                score,
                document: Document { content, metadata },
            });
        }

        Ok(results)
    }

    /// Number of indexed chunks
    pub fn doc_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

fn stored_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| match v {
            OwnedValue::Str(s) => Some(s.as_str()),
            _ => None,
        })
        .unwrap_or("")
        .to_string()
}
