use crate::error::IngestError;
use crate::models::{Chunk, PipelineOptions, Segment, SourceMetadata};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::from(&PipelineOptions::default())
    }
}

impl From<&PipelineOptions> for ChunkingConfig {
    fn from(value: &PipelineOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            overlap: value.chunk_overlap,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fixed-size character windows over `text`, each starting `chunk_size - overlap`
/// characters after the previous one. Returns `(start_char, window)` pairs.
pub fn window_chars(text: &str, config: ChunkingConfig) -> Vec<(usize, String)> {
    let chars: Vec<char> = text.chars().collect();
    let mut windows = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        windows.push((start, chars[start..end].iter().collect()));
        if end == chars.len() {
            break;
        }
        start += config.step();
    }

    windows
}

pub fn split_segments(
    document_id: &str,
    segments: &[Segment],
    config: ChunkingConfig,
) -> Result<Vec<Chunk>, IngestError> {
    config.validate()?;

    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for segment in segments {
        let collapsed = normalize_whitespace(&segment.text);

        for (start_char, text) in window_chars(&collapsed, config) {
            if text.trim().is_empty() {
                continue;
            }

            let metadata = SourceMetadata {
                chunk_index: Some(cursor),
                start_char: Some(start_char),
                ..segment.metadata.clone()
            };

            chunks.push(Chunk {
                chunk_id: make_chunk_id(document_id, metadata.page, cursor, &text),
                text,
                metadata,
            });
            cursor = cursor.saturating_add(1);
        }
    }

    Ok(chunks)
}

fn make_chunk_id(document_id: &str, page: Option<u32>, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(page.unwrap_or(0).to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
