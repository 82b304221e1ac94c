// In-memory vector search over chunked documents

use super::document_processor::Document;
use super::embedder::{cosine_similarity, HashingEmbedder};
use super::text_chunker::chunk_text;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document_id: String,
    pub source: String,
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
struct IndexedChunk {
    id: String,
    source: String,
    text: String,
    embedding: Vec<f32>,
}

/// Cosine-similarity index; built once, then shared read-only.
pub struct VectorIndex {
    embedder: HashingEmbedder,
    chunk_size: usize,
    chunk_overlap: usize,
    chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    pub fn new(embedder: HashingEmbedder, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            embedder,
            chunk_size,
            chunk_overlap,
            chunks: Vec::new(),
        }
    }

    pub fn from_config(config: &crate::config::RetrievalConfig) -> Self {
        Self::new(
            HashingEmbedder::new(config.embedding_dimensions),
            config.chunk_size,
            config.chunk_overlap,
        )
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk and embed a document; returns the number of chunks added.
    pub fn add_document(&mut self, document: &Document) -> usize {
        let pieces = chunk_text(&document.text, self.chunk_size, self.chunk_overlap);
        let added = pieces.len();

        for (position, text) in pieces.into_iter().enumerate() {
            let mut hasher = Sha256::new();
            hasher.update(document.source.as_bytes());
            hasher.update(position.to_le_bytes());
            hasher.update(text.as_bytes());
            let id = hex::encode(&hasher.finalize()[..8]);

            let embedding = self.embedder.embed(&text);
            self.chunks.push(IndexedChunk {
                id,
                source: document.source.clone(),
                text,
                embedding,
            });
        }

        debug!(source = %document.source, chunks = added, "Indexed document");
        added
    }

    pub fn add_documents<'a>(
        &mut self,
        documents: impl IntoIterator<Item = &'a Document>,
    ) -> usize {
        documents.into_iter().map(|d| self.add_document(d)).sum()
    }

    /// Best `limit` chunks with a positive similarity, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let query_embedding = self.embedder.embed(query);

        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|chunk| (cosine_similarity(&query_embedding, &chunk.embedding), chunk))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(limit)
            .map(|(score, chunk)| SearchResult {
                document_id: chunk.id.clone(),
                source: chunk.source.clone(),
                text: chunk.text.clone(),
                score: f64::from(score),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source: &str, text: &str) -> Document {
        Document {
            source: source.to_string(),
            text: text.to_string(),
        }
    }

    fn index() -> VectorIndex {
        let mut index = VectorIndex::new(HashingEmbedder::new(1024), 200, 20);
        index.add_documents(&[
            doc("france.txt", "Paris is the capital of France."),
            doc("germany.txt", "Berlin is the capital of Germany."),
            doc("biology.txt", "Mitochondria produce ATP for the cell."),
        ]);
        index
    }

    #[test]
    fn test_search_ranks_best_match_first() {
        let results = index().search("What is the capital of France?", 5);

        assert!(!results.is_empty());
        assert_eq!(results[0].source, "france.txt");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_search_respects_limit() {
        let results = index().search("capital", 1);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_empty_index_and_unrelated_query() {
        let empty = VectorIndex::new(HashingEmbedder::new(64), 200, 20);
        assert!(empty.is_empty());
        assert!(empty.search("anything", 5).is_empty());
        assert!(index().search("", 5).is_empty());
    }

    #[test]
    fn test_chunk_ids_are_stable() {
        let a = index();
        let b = index();
        let ids_a: Vec<_> = a.search("capital", 3).into_iter().map(|r| r.document_id).collect();
        let ids_b: Vec<_> = b.search("capital", 3).into_iter().map(|r| r.document_id).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(a.len(), 3);
    }
}
