use crate::chunking::ChunkingConfig;
use crate::index::VectorIndex;
use crate::ingest::{prepare_document, PreparedDocument};
use crate::normalize::normalize_text;
use crate::prompt::{build_context, render_prompt};
use crate::traits::{Embedder, LanguageModel};
use crate::{Answer, DocumentFingerprint, PipelineOptions, RagError, RetrievedChunk};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub struct RagPipeline<E, L>
where
    E: Embedder,
    L: LanguageModel,
{
    document: DocumentFingerprint,
    index: VectorIndex,
    embedder: Arc<E>,
    model: Arc<L>,
    options: PipelineOptions,
}

impl<E, L> RagPipeline<E, L>
where
    E: Embedder,
    L: LanguageModel,
{
    pub async fn build(
        path: &Path,
        embedder: Arc<E>,
        model: Arc<L>,
        options: PipelineOptions,
    ) -> Result<Self, RagError> {
        options.validate()?;
        let prepared = prepare_document(path, ChunkingConfig::from(&options))?;
        Self::from_prepared(prepared, embedder, model, options).await
    }

    pub async fn from_prepared(
        prepared: PreparedDocument,
        embedder: Arc<E>,
        model: Arc<L>,
        options: PipelineOptions,
    ) -> Result<Self, RagError> {
        options.validate()?;
        let PreparedDocument { fingerprint, chunks } = prepared;
        let index = VectorIndex::build(chunks, embedder.as_ref()).await?;

        info!(
            document = %fingerprint.file_name,
            chunk_count = index.len(),
            model = model.model_name(),
            "pipeline ready"
        );

        Ok(Self {
            document: fingerprint,
            index,
            embedder,
            model,
            options,
        })
    }

    pub fn document(&self) -> &DocumentFingerprint {
        &self.document
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Top-k chunks for `query`, which is normalized first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>, RagError> {
        self.search_normalized(&normalize_query(query)?).await
    }

    pub async fn answer(&self, query: &str) -> Result<Answer, RagError> {
        let normalized = normalize_query(query)?;
        let sources = self.search_normalized(&normalized).await?;

        let prompt = render_prompt(&build_context(&sources), &normalized);
        debug!(
            query = %normalized,
            hits = sources.len(),
            prompt_len = prompt.len(),
            "sending prompt"
        );

        let text = self
            .model
            .generate(&prompt, &self.options.generation)
            .await?;

        Ok(Answer { text, sources })
    }

    async fn search_normalized(&self, normalized: &str) -> Result<Vec<RetrievedChunk>, RagError> {
        let query_vector = self.embedder.embed(normalized).await?;
        Ok(self.index.search(&query_vector, self.options.top_k)?)
    }
}

fn normalize_query(query: &str) -> Result<String, RagError> {
    let normalized = normalize_text(query);
    if normalized.is_empty() {
        return Err(RagError::EmptyQuery);
    }
    Ok(normalized)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::GenerationError;
    use crate::models::GenerationOptions;
    use crate::prompt::NOT_FOUND_ANSWER;
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Answers from the context block only: echoes the first context line that
    /// shares a word with the question, otherwise gives the not-found reply.
    #[derive(Default)]
    pub(crate) struct ContextEchoModel {
        pub prompts: Mutex<Vec<String>>,
        pub keywords: Vec<(&'static str, &'static str)>,
    }

    impl ContextEchoModel {
        pub(crate) fn with_keywords(keywords: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                keywords,
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ContextEchoModel {
        fn model_name(&self) -> &str {
            "context-echo"
        }

        async fn generate(
            &self,
            prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, GenerationError> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }

            let context = prompt
                .split("Bağlam:\n")
                .nth(1)
                .and_then(|rest| rest.split("\n\nSoru: ").next())
                .unwrap_or_default();
            let question = prompt
                .split("Soru: ")
                .nth(1)
                .and_then(|rest| rest.split("\n\nCevap:").next())
                .unwrap_or_default();

            for (question_word, context_word) in &self.keywords {
                if question.contains(question_word) && context.contains(context_word) {
                    return Ok(format!("Rapora göre: {context}"));
                }
            }
            Ok(NOT_FOUND_ANSWER.to_string())
        }
    }

    pub(crate) struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        fn model_name(&self) -> &str {
            "failing"
        }

        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, GenerationError> {
            Err(GenerationError::BackendResponse {
                backend: "failing".to_string(),
                details: "503 Service Unavailable: overloaded".to_string(),
            })
        }
    }

    pub(crate) fn budget_model() -> ContextEchoModel {
        ContextEchoModel::with_keywords(vec![("butce", "million")])
    }

    #[tokio::test]
    async fn answers_from_document_and_refuses_unrelated_questions(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("rapor.txt");
        fs::write(&path, "Istanbul spent 5 million TL on parks.")?;

        let pipeline = RagPipeline::build(
            &path,
            Arc::new(CharacterNgramEmbedder::default()),
            Arc::new(budget_model()),
            PipelineOptions::default(),
        )
        .await?;

        let answer = pipeline.answer("Bütçe ne kadar?").await?;
        assert!(answer.text.contains("5 million"));
        assert_eq!(answer.sources.len(), 1);

        let unrelated = pipeline.answer("Ay'a kaç roket gönderildi?").await?;
        assert_eq!(unrelated.text, NOT_FOUND_ANSWER);
        Ok(())
    }

    #[tokio::test]
    async fn prompt_uses_normalized_query_and_top_three_chunks(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("rapor.txt");
        let text = (0..6)
            .map(|i| format!("Bölüm {i}: Çalışma özeti."))
            .collect::<Vec<_>>()
            .join(" ");
        fs::write(&path, text)?;

        let model = Arc::new(budget_model());
        let options = PipelineOptions {
            chunk_size: 30,
            chunk_overlap: 5,
            ..Default::default()
        };
        let pipeline = RagPipeline::build(
            &path,
            Arc::new(CharacterNgramEmbedder::default()),
            Arc::clone(&model),
            options,
        )
        .await?;
        assert!(pipeline.index().len() > 3);

        let answer = pipeline.answer("  ÇALIŞMA Özeti?  ").await?;
        assert_eq!(answer.sources.len(), 3);

        let prompts = model.prompts.lock().map_err(|_| "poisoned")?;
        assert!(prompts[0].contains("Soru: calisma ozeti?\n\n"));
        Ok(())
    }

    #[tokio::test]
    async fn retrieval_is_stable_across_calls() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("rapor.txt");
        fs::write(
            &path,
            "Parklar için 5 milyon TL harcandı. Metro hattı açıldı. Su şebekesi yenilendi. \
             Otobüs filosu büyütüldü. Bisiklet yolları uzatıldı.",
        )?;

        let options = PipelineOptions {
            chunk_size: 40,
            chunk_overlap: 10,
            ..Default::default()
        };
        let pipeline = RagPipeline::build(
            &path,
            Arc::new(CharacterNgramEmbedder::default()),
            Arc::new(budget_model()),
            options,
        )
        .await?;

        let first = pipeline.retrieve("Metro hattı").await?;
        let second = pipeline.retrieve("metro hatti").await?;
        let ids = |hits: &[RetrievedChunk]| {
            hits.iter()
                .map(|hit| hit.chunk.chunk_id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
        Ok(())
    }

    #[derive(Default)]
    struct RecordingEmbedder {
        inner: CharacterNgramEmbedder,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Embedder for RecordingEmbedder {
        fn name(&self) -> &str {
            "recording"
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }

        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> Result<Vec<Vec<f32>>, crate::error::IndexError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.extend(texts.iter().cloned());
            }
            self.inner.embed_batch(texts).await
        }
    }

    #[tokio::test]
    async fn query_is_embedded_in_normalized_form() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("rapor.txt");
        fs::write(&path, "Istanbul spent 5 million TL on parks.")?;

        let embedder = Arc::new(RecordingEmbedder::default());
        let pipeline = RagPipeline::build(
            &path,
            Arc::clone(&embedder),
            Arc::new(budget_model()),
            PipelineOptions::default(),
        )
        .await?;

        pipeline.answer("  BÜTÇE ne kadar?  ").await?;

        let seen = embedder.seen.lock().map_err(|_| "poisoned")?;
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], "butce ne kadar?");
        Ok(())
    }

    #[tokio::test]
    async fn blank_query_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("rapor.txt");
        fs::write(&path, "Istanbul spent 5 million TL on parks.")?;

        let pipeline = RagPipeline::build(
            &path,
            Arc::new(CharacterNgramEmbedder::default()),
            Arc::new(budget_model()),
            PipelineOptions::default(),
        )
        .await?;

        assert!(matches!(pipeline.answer("   ").await, Err(RagError::EmptyQuery)));
        Ok(())
    }

    #[tokio::test]
    async fn model_failure_is_a_generation_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("rapor.txt");
        fs::write(&path, "Istanbul spent 5 million TL on parks.")?;

        let pipeline = RagPipeline::build(
            &path,
            Arc::new(CharacterNgramEmbedder::default()),
            Arc::new(FailingModel),
            PipelineOptions::default(),
        )
        .await?;

        let result = pipeline.answer("Bütçe ne kadar?").await;
        assert!(matches!(result, Err(RagError::Generation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn zero_top_k_fails_before_indexing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("rapor.txt");
        fs::write(&path, "Istanbul spent 5 million TL on parks.")?;

        let embedder = Arc::new(RecordingEmbedder::default());
        let options = PipelineOptions {
            top_k: 0,
            ..Default::default()
        };
        let result =
            RagPipeline::build(&path, Arc::clone(&embedder), Arc::new(budget_model()), options)
                .await;

        assert!(matches!(result, Err(RagError::InvalidOptions(_))));
        assert!(embedder.seen.lock().map_err(|_| "poisoned")?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn empty_document_fails_at_index_build() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("bos.txt");
        fs::write(&path, "\n\n")?;

        let result = RagPipeline::build(
            &path,
            Arc::new(CharacterNgramEmbedder::default()),
            Arc::new(budget_model()),
            PipelineOptions::default(),
        )
        .await;
        assert!(matches!(result, Err(RagError::Index(_))));
        Ok(())
    }
}
