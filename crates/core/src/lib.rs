pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod session;
pub mod traits;

pub use chunking::{normalize_whitespace, split_segments, ChunkingConfig};
pub use config::GeminiConfig;
pub use embeddings::{CharacterNgramEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{ConfigError, GenerationError, IndexError, IngestError, RagError};
pub use extractor::{LopdfParser, PlainTextParser};
pub use index::VectorIndex;
pub use ingest::{
    digest_file, load_document, prepare_document, DocumentFormat, PreparedDocument,
    SUPPORTED_EXTENSIONS,
};
pub use models::{
    Answer, ChatTurn, Chunk, Conversation, DocumentFingerprint, GenerationOptions,
    PipelineOptions, RetrievedChunk, Role, Segment, SourceMetadata, DEFAULT_TOP_K,
};
pub use normalize::normalize_text;
pub use pipeline::RagPipeline;
pub use prompt::NOT_FOUND_ANSWER;
pub use providers::GeminiClient;
pub use session::{Reply, Session, GREETING};
pub use traits::{DocumentParser, Embedder, LanguageModel};
