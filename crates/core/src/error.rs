use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported file format '{extension}', allowed formats: {allowed}")]
    UnsupportedFormat { extension: String, allowed: String },

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding request to {backend} failed: {details}")]
    Embedding { backend: String, details: String },

    #[error("index build failed: {0}")]
    Build(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("language model returned no text")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {details}")]
    InvalidValue { name: &'static str, details: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum RagError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no document is loaded")]
    NoActiveDocument,

    #[error("query is empty")]
    EmptyQuery,

    #[error("invalid pipeline options: {0}")]
    InvalidOptions(String),
}

pub type Result<T, E = RagError> = std::result::Result<T, E>;
