use crate::chunking::ChunkingConfig;
use crate::ingest::{prepare_document, DocumentFormat};
use crate::pipeline::RagPipeline;
use crate::traits::{Embedder, LanguageModel};
use crate::{
    Answer, Conversation, DocumentFingerprint, IngestError, PipelineOptions, RagError, Role,
};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const GREETING: &str = "RAG zinciri kuruldu. Lütfen raporunuzla ilgili sorularınızı sorun.";

pub fn build_failure_message(error: &RagError) -> String {
    format!("❌ Model hazırlanırken bir hata oluştu: {error}")
}

pub fn answer_failure_message(error: &RagError) -> String {
    format!("❌ Yanıt üretirken bir hata oluştu: {error}")
}

#[derive(Debug, Clone)]
pub enum Reply {
    Answer(Answer),
    /// Displayable message; already recorded in the conversation.
    Failed(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Self::Answer(answer) => &answer.text,
            Self::Failed(message) => message,
        }
    }
}

pub struct Session<E, L>
where
    E: Embedder,
    L: LanguageModel,
{
    id: Uuid,
    embedder: Arc<E>,
    model: Arc<L>,
    options: PipelineOptions,
    pipeline: Option<RagPipeline<E, L>>,
    conversation: Conversation,
}

impl<E, L> Session<E, L>
where
    E: Embedder,
    L: LanguageModel,
{
    pub fn new(embedder: Arc<E>, model: Arc<L>, options: PipelineOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            embedder,
            model,
            options,
            pipeline: None,
            conversation: Conversation::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn document(&self) -> Option<&DocumentFingerprint> {
        self.pipeline.as_ref().map(RagPipeline::document)
    }

    pub fn pipeline(&self) -> Option<&RagPipeline<E, L>> {
        self.pipeline.as_ref()
    }

    pub fn reset(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            info!(session = %self.id, document = %pipeline.document().file_name, "session reset");
        }
        self.conversation = Conversation::default();
    }

    /// A failed build leaves no document loaded.
    pub async fn replace_with_file(
        &mut self,
        path: &Path,
    ) -> Result<&DocumentFingerprint, RagError> {
        self.reset();
        let pipeline = RagPipeline::build(
            path,
            Arc::clone(&self.embedder),
            Arc::clone(&self.model),
            self.options.clone(),
        )
        .await?;
        Ok(self.activate(pipeline))
    }

    pub async fn replace_with_upload(
        &mut self,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<&DocumentFingerprint, RagError> {
        self.reset();

        let format = DocumentFormat::from_path(Path::new(file_name))?;
        let suffix = match format {
            DocumentFormat::Pdf => ".pdf",
            DocumentFormat::Text => ".txt",
        };

        let mut upload = tempfile::Builder::new()
            .prefix("docqa-upload-")
            .suffix(suffix)
            .tempfile()
            .map_err(IngestError::Io)?;
        upload.write_all(bytes).map_err(IngestError::Io)?;
        upload.flush().map_err(IngestError::Io)?;

        let mut prepared =
            prepare_document(upload.path(), ChunkingConfig::from(&self.options))?;
        prepared.fingerprint.file_name = file_name.to_string();
        for chunk in &mut prepared.chunks {
            chunk.metadata.source_path = file_name.to_string();
        }

        let built = RagPipeline::from_prepared(
            prepared,
            Arc::clone(&self.embedder),
            Arc::clone(&self.model),
            self.options.clone(),
        )
        .await;

        if let Err(error) = upload.close() {
            warn!(session = %self.id, %error, "failed to remove temporary upload");
        }

        Ok(self.activate(built?))
    }

    fn activate(&mut self, pipeline: RagPipeline<E, L>) -> &DocumentFingerprint {
        info!(
            session = %self.id,
            document = %pipeline.document().file_name,
            chunks = pipeline.index().len(),
            "document activated"
        );
        self.conversation.push(Role::Assistant, GREETING);
        self.pipeline.insert(pipeline).document()
    }

    pub async fn ask(&mut self, query: &str) -> Reply {
        self.conversation.push(Role::User, query);

        let result = match &self.pipeline {
            Some(pipeline) => pipeline.answer(query).await,
            None => Err(RagError::NoActiveDocument),
        };

        match result {
            Ok(answer) => {
                self.conversation.push(Role::Assistant, answer.text.clone());
                Reply::Answer(answer)
            }
            Err(error) => {
                warn!(session = %self.id, %error, "question failed");
                let message = answer_failure_message(&error);
                self.conversation.push(Role::Assistant, message.clone());
                Reply::Failed(message)
            }
        }
    }
}
