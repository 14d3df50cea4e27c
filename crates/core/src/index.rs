use crate::error::IndexError;
use crate::models::{Chunk, RetrievedChunk};
use crate::traits::Embedder;
use std::cmp::Ordering;
use tracing::info;

#[derive(Debug)]
pub struct VectorIndex {
    embedder: String,
    dimensions: usize,
    entries: Vec<IndexedChunk>,
}

#[derive(Debug)]
struct IndexedChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

impl VectorIndex {
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::Build(
                "document produced no text to index".to_string(),
            ));
        }

        let texts = chunks
            .iter()
            .map(|chunk| chunk.text.clone())
            .collect::<Vec<_>>();
        let vectors = embedder.embed_batch(&texts).await?;

        let index = Self::from_vectors(embedder.name(), chunks, vectors, embedder.dimensions())?;
        info!(
            embedder = embedder.name(),
            chunk_count = index.len(),
            dimensions = index.dimensions,
            "vector index built"
        );
        Ok(index)
    }

    pub fn from_vectors(
        embedder: &str,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
        dimensions: usize,
    ) -> Result<Self, IndexError> {
        if chunks.len() != vectors.len() {
            return Err(IndexError::Build(format!(
                "embedding count {} doesn't match chunk count {}",
                vectors.len(),
                chunks.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                if vector.len() != dimensions {
                    return Err(IndexError::Build(format!(
                        "embedding dimension {} != {}",
                        vector.len(),
                        dimensions
                    )));
                }
                Ok(IndexedChunk { chunk, vector })
            })
            .collect::<Result<Vec<_>, IndexError>>()?;

        Ok(Self {
            embedder: embedder.to_string(),
            dimensions,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Best first; equal scores keep document order.
    pub fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, IndexError> {
        if query_vector.len() != self.dimensions {
            return Err(IndexError::Embedding {
                backend: self.embedder.clone(),
                details: format!(
                    "query vector dim {} is not {}",
                    query_vector.len(),
                    self.dimensions
                ),
            });
        }

        let mut scored = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(&entry.vector, query_vector)))
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| {
            right
                .1
                .partial_cmp(&left.1)
                .unwrap_or(Ordering::Equal)
                .then(left.0.cmp(&right.0))
        });

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(position, score)| RetrievedChunk {
                chunk: self.entries[position].chunk.clone(),
                score,
            })
            .collect())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::models::SourceMetadata;
    use async_trait::async_trait;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            text: text.to_string(),
            metadata: SourceMetadata::default(),
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
            Err(IndexError::Embedding {
                backend: "failing".to_string(),
                details: "backend unavailable".to_string(),
            })
        }
    }

    #[test]
    fn search_orders_by_similarity_and_truncates() -> Result<(), IndexError> {
        let index = VectorIndex::from_vectors(
            "fixed",
            vec![chunk("a", "a"), chunk("b", "b"), chunk("c", "c")],
            vec![vec![1.0, 0.0], vec![0.6, 0.8], vec![0.0, 1.0]],
            2,
        )?;

        let hits = index.search(&[0.0, 1.0], 2)?;

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.chunk_id, "c");
        assert_eq!(hits[1].chunk.chunk_id, "b");
        Ok(())
    }

    #[test]
    fn ties_keep_document_order() -> Result<(), IndexError> {
        let index = VectorIndex::from_vectors(
            "fixed",
            vec![chunk("first", "x"), chunk("second", "x"), chunk("third", "x")],
            vec![vec![1.0, 0.0]; 3],
            2,
        )?;

        let ids = index
            .search(&[1.0, 0.0], 2)?
            .into_iter()
            .map(|hit| hit.chunk.chunk_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["first", "second"]);
        Ok(())
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let result = VectorIndex::from_vectors("fixed", vec![chunk("a", "a")], vec![vec![1.0]], 2);
        assert!(matches!(result, Err(IndexError::Build(_))));

        let result = VectorIndex::from_vectors("fixed", vec![chunk("a", "a")], Vec::new(), 2);
        assert!(matches!(result, Err(IndexError::Build(_))));
    }

    #[test]
    fn query_of_wrong_dimension_is_an_embedding_error() -> Result<(), IndexError> {
        let index =
            VectorIndex::from_vectors("fixed", vec![chunk("a", "a")], vec![vec![1.0, 0.0]], 2)?;

        match index.search(&[1.0, 0.0, 0.0], 3) {
            Err(IndexError::Embedding { backend, details }) => {
                assert_eq!(backend, "fixed");
                assert!(details.contains("dim 3"));
            }
            other => panic!("expected embedding error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn empty_input_cannot_be_indexed() {
        let result = VectorIndex::build(Vec::new(), &CharacterNgramEmbedder::default()).await;
        assert!(matches!(result, Err(IndexError::Build(_))));
    }

    #[tokio::test]
    async fn embedding_failure_is_surfaced_unchanged() {
        let result = VectorIndex::build(vec![chunk("a", "text")], &FailingEmbedder).await;
        match result {
            Err(IndexError::Embedding { backend, details }) => {
                assert_eq!(backend, "failing");
                assert_eq!(details, "backend unavailable");
            }
            other => panic!("expected embedding error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn repeated_queries_return_the_same_chunks() -> Result<(), IndexError> {
        let embedder = CharacterNgramEmbedder::default();
        let chunks = vec![
            chunk("parks", "istanbul spent 5 million tl on parks."),
            chunk("roads", "road maintenance budget was increased."),
            chunk("water", "water network renewal continued in 2024."),
            chunk("metro", "two new metro lines opened."),
        ];
        let index = VectorIndex::build(chunks, &embedder).await?;
        let query = embedder.embed_text("parks budget");

        let first = index.search(&query, 3)?;
        let second = index.search(&query, 3)?;

        let ids = |hits: &[RetrievedChunk]| {
            hits.iter()
                .map(|hit| hit.chunk.chunk_id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.len(), 3);
        Ok(())
    }
}
