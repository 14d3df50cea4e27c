use crate::error::RagError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of chunks handed to the language model for each question.
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_id: String,
    pub file_name: String,
    pub source_path: String,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceMetadata {
    pub source_path: String,
    /// 1-based page number, present for PDF pages only.
    pub page: Option<u32>,
    pub chunk_index: Option<u64>,
    pub start_char: Option<usize>,
}

impl SourceMetadata {
    pub fn locator(&self) -> String {
        match self.page {
            Some(page) => format!("{} (page {page})", self.source_path),
            None => self.source_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub metadata: SourceMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub metadata: SourceMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<RetrievedChunk>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn push(&mut self, role: Role, content: impl Into<String>) -> &ChatTurn {
        self.turns.push(ChatTurn::new(role, content));
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub generation: GenerationOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
            top_k: DEFAULT_TOP_K,
            generation: GenerationOptions::default(),
        }
    }
}

impl PipelineOptions {
    pub fn validate(&self) -> Result<(), RagError> {
        if self.top_k == 0 {
            return Err(RagError::InvalidOptions(
                "top_k must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
