use async_trait::async_trait;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use docqa_core::config::API_KEY_VAR;
use docqa_core::session::build_failure_message;
use docqa_core::{
    CharacterNgramEmbedder, Embedder, GeminiClient, GeminiConfig, IndexError, PipelineOptions,
    RagError, Reply, RetrievedChunk, Role, Session, DEFAULT_TOP_K,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa", version, about = "Ask questions about a PDF or text document")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Target chunk length in characters
    #[arg(long, env = "DOCQA_CHUNK_SIZE", default_value = "800")]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, env = "DOCQA_CHUNK_OVERLAP", default_value = "100")]
    chunk_overlap: usize,

    /// Chunks passed to the model per question
    #[arg(long, env = "DOCQA_TOP_K", default_value_t = DEFAULT_TOP_K, value_parser = parse_top_k)]
    top_k: usize,

    /// Embedding backend
    #[arg(long, env = "DOCQA_EMBEDDER", value_enum, default_value_t = EmbedderKind::Gemini)]
    embedder: EmbedderKind,

    /// Print retrieved chunks under each answer
    #[arg(long, default_value_t = false)]
    show_sources: bool,
}

fn parse_top_k(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(value) => Ok(value),
        Err(error) => Err(error.to_string()),
    }
}

#[derive(Subcommand)]
enum Command {
    /// Index a document and answer a single question.
    Ask {
        /// Path to a .pdf or .txt file.
        #[arg(long)]
        file: PathBuf,
        /// Question to answer from the document.
        #[arg(long)]
        question: String,
    },
    /// Interactive chat over a document. Commands: :load <path>, :reset, :history, :quit
    Chat {
        /// Document to load on start.
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EmbedderKind {
    /// Gemini embedding endpoint
    Gemini,
    /// Offline character n-gram embedder
    Local,
}

/// Embedding backend chosen at startup.
enum CliEmbedder {
    Gemini(GeminiClient),
    Local(CharacterNgramEmbedder),
}

#[async_trait]
impl Embedder for CliEmbedder {
    fn name(&self) -> &str {
        match self {
            Self::Gemini(client) => Embedder::name(client),
            Self::Local(local) => local.name(),
        }
    }

    fn dimensions(&self) -> usize {
        match self {
            Self::Gemini(client) => Embedder::dimensions(client),
            Self::Local(local) => local.dimensions(),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IndexError> {
        match self {
            Self::Gemini(client) => client.embed_batch(texts).await,
            Self::Local(local) => local.embed_batch(texts).await,
        }
    }
}

type ChatSession = Session<CliEmbedder, GeminiClient>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = GeminiConfig::from_env().map_err(|error| {
        anyhow::anyhow!("❌ Lütfen `{API_KEY_VAR}` ortam değişkenini ayarlayın. ({error})")
    })?;

    let client = GeminiClient::new(config);
    let embedder = match cli.embedder {
        EmbedderKind::Gemini => CliEmbedder::Gemini(client.clone()),
        EmbedderKind::Local => CliEmbedder::Local(CharacterNgramEmbedder::default()),
    };

    let options = PipelineOptions {
        chunk_size: cli.chunk_size,
        chunk_overlap: cli.chunk_overlap,
        top_k: cli.top_k,
        ..Default::default()
    };

    let mut session: ChatSession = Session::new(Arc::new(embedder), Arc::new(client), options);
    info!(
        version = app_version,
        session = %session.id(),
        started_at = %Utc::now().to_rfc3339(),
        "docqa boot"
    );

    match cli.command {
        Command::Ask { file, question } => {
            load(&mut session, &file)
                .await
                .map_err(|error| anyhow::anyhow!(build_failure_message(&error)))?;

            let reply = session.ask(&question).await;
            print_reply(&reply, cli.show_sources);
            if let Reply::Failed(_) = reply {
                std::process::exit(1);
            }
        }
        Command::Chat { file } => {
            if let Some(file) = file {
                if let Err(error) = load(&mut session, &file).await {
                    println!("{}", build_failure_message(&error));
                }
            } else {
                println!("⬆️ Lütfen .pdf veya .txt dosyasını yükleyin (:load <dosya>).");
            }
            chat_loop(&mut session, cli.show_sources).await?;
        }
    }

    Ok(())
}

async fn load(session: &mut ChatSession, path: &Path) -> Result<(), RagError> {
    println!("🔧 Metin bölünüyor, embedding oluşturuluyor ve model hazırlanıyor...");
    let document = session.replace_with_file(path).await?;
    println!("✅ Dosya başarıyla yüklendi: {}", document.file_name);
    println!("🚀 Model başarıyla hazırlandı! Artık sorular sorabilirsiniz.");
    Ok(())
}

async fn chat_loop(session: &mut ChatSession, show_sources: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    if let Some(turn) = session.conversation().turns().last() {
        println!("assistant> {}", turn.content);
    }

    loop {
        stdout.write_all(b"soru> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').unwrap_or((line, "")) {
            (":quit", _) | (":q", _) => break,
            (":reset", _) => {
                session.reset();
                println!("ℹ️ Oturum sıfırlandı.");
            }
            (":history", _) => {
                for turn in session.conversation().turns() {
                    let role = match turn.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    };
                    println!("[{}] {role}> {}", turn.created_at.format("%H:%M:%S"), turn.content);
                }
            }
            (":load", path) => {
                let path = path.trim();
                if path.is_empty() {
                    println!("kullanım: :load <dosya>");
                    continue;
                }
                match load(session, Path::new(path)).await {
                    Ok(()) => {
                        if let Some(turn) = session.conversation().turns().last() {
                            println!("assistant> {}", turn.content);
                        }
                    }
                    Err(error) => {
                        warn!(%error, "document load failed");
                        println!("{}", build_failure_message(&error));
                    }
                }
            }
            _ => {
                let reply = session.ask(line).await;
                print_reply(&reply, show_sources);
            }
        }
    }

    Ok(())
}

fn print_reply(reply: &Reply, show_sources: bool) {
    println!("assistant> {}", reply.text());
    if let (Reply::Answer(answer), true) = (reply, show_sources) {
        print_sources(&answer.sources);
    }
}

fn print_sources(sources: &[RetrievedChunk]) {
    for (rank, hit) in sources.iter().enumerate() {
        println!(
            "  [{}] score={:.4} {}",
            rank + 1,
            hit.score,
            hit.chunk.metadata.locator()
        );
        let preview = hit.chunk.text.chars().take(160).collect::<String>();
        println!("      {preview}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_must_be_positive() {
        assert!(Cli::try_parse_from(["docqa", "--top-k", "0", "chat"]).is_err());

        let cli = Cli::try_parse_from(["docqa", "--top-k", "5", "chat"]);
        assert!(matches!(cli, Ok(Cli { top_k: 5, .. })));
    }
}
