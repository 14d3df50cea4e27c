use crate::error::IngestError;
use crate::models::{Segment, SourceMetadata};
use crate::traits::DocumentParser;
use lopdf::Document;
use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfParser;

impl DocumentParser for LopdfParser {
    fn parse(&self, path: &Path) -> Result<Vec<Segment>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;
        let hyphen_break = Regex::new(r"(\p{L})-\r?\n(\p{L})")?;
        let source_path = path.to_string_lossy().to_string();

        let mut segments = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if text.trim().is_empty() {
                continue;
            }

            segments.push(Segment {
                text: hyphen_break.replace_all(&text, "$1$2").into_owned(),
                metadata: SourceMetadata {
                    source_path: source_path.clone(),
                    page: Some(page_no),
                    ..Default::default()
                },
            });
        }

        if segments.is_empty() {
            return Err(IngestError::PdfParse(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(segments)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn parse(&self, path: &Path) -> Result<Vec<Segment>, IngestError> {
        let bytes = fs::read(path)?;
        let text = String::from_utf8(bytes)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![Segment {
            text,
            metadata: SourceMetadata {
                source_path: path.to_string_lossy().to_string(),
                ..Default::default()
            },
        }])
    }
}
