use crate::chunking::{split_segments, ChunkingConfig};
use crate::extractor::{LopdfParser, PlainTextParser};
use crate::normalize::normalize_text;
use crate::traits::DocumentParser;
use crate::{Chunk, DocumentFingerprint, IngestError, Segment};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Text,
}

impl DocumentFormat {
    /// Extension only; the file is not touched.
    pub fn from_path(path: &Path) -> Result<Self, IngestError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        if extension.eq_ignore_ascii_case("pdf") {
            Ok(Self::Pdf)
        } else if extension.eq_ignore_ascii_case("txt") {
            Ok(Self::Text)
        } else {
            Err(IngestError::UnsupportedFormat {
                extension: extension.to_string(),
                allowed: SUPPORTED_EXTENSIONS
                    .iter()
                    .map(|ext| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        }
    }

    fn parser(self) -> Box<dyn DocumentParser> {
        match self {
            Self::Pdf => Box::new(LopdfParser),
            Self::Text => Box::new(PlainTextParser),
        }
    }
}

pub fn load_document(path: &Path) -> Result<Vec<Segment>, IngestError> {
    let format = DocumentFormat::from_path(path)?;
    format.parser().parse(path)
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub fingerprint: DocumentFingerprint,
    pub chunks: Vec<Chunk>,
}

pub fn prepare_document(
    path: &Path,
    config: ChunkingConfig,
) -> Result<PreparedDocument, IngestError> {
    DocumentFormat::from_path(path)?;
    config.validate()?;

    let fingerprint = build_document_fingerprint(path)?;
    let segments = load_document(path)?;
    let chunks = split_segments(&fingerprint.document_id, &segments, config)?
        .into_iter()
        .filter_map(|chunk| {
            let text = normalize_text(&chunk.text);
            if text.is_empty() {
                None
            } else {
                Some(Chunk { text, ..chunk })
            }
        })
        .collect::<Vec<_>>();

    debug!(
        path = %path.display(),
        segments = segments.len(),
        chunks = chunks.len(),
        "document prepared"
    );

    Ok(PreparedDocument {
        fingerprint,
        chunks,
    })
}

fn build_document_fingerprint(path: &Path) -> Result<DocumentFingerprint, IngestError> {
    let checksum = digest_file(path)?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
        })?;

    Ok(DocumentFingerprint {
        document_id: generate_document_id(path, &checksum),
        file_name: name.to_string(),
        source_path: path.to_string_lossy().to_string(),
        checksum,
        ingested_at: Utc::now(),
    })
}

fn generate_document_id(path: &Path, checksum: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(checksum.as_bytes());
    format!("{:x}", hasher.finalize())
}
