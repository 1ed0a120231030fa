use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vellum::cli::{Cli, Commands, ConfigAction};
use vellum::config::{Config, ConfigValidator};
use vellum::embedding::{EmbeddingProvider, FastEmbedProvider, HashingEmbedder};
use vellum::engine::Engine;
use vellum::error::{Result, VellumError};
use vellum::generation::{ExtractiveGenerator, GenerativeProvider};

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse_args();
    let runtime = tokio::runtime::Runtime::new().map_err(|e| VellumError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;

    match cli.command {
        Commands::Ask {
            question,
            root,
            top_k,
            json,
        } => {
            let mut config = Config::load_or_default(cli.config.as_deref())?;
            if let Some(k) = top_k {
                config.retrieval.top_k = k;
            }
            let engine = build_engine(config)?;
            runtime.block_on(cmd_ask(&engine, &root, &question, json))?;
        }
        Commands::Search {
            query,
            root,
            limit,
            json,
        } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            let engine = build_engine(config)?;
            runtime.block_on(cmd_search(&engine, &root, &query, limit, json))?;
        }
        Commands::Sources { root } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            let engine = build_engine(config)?;
            runtime.block_on(cmd_sources(&engine, &root))?;
        }
        Commands::Stats { root, json } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            let engine = build_engine(config)?;
            runtime.block_on(cmd_stats(&engine, &root, json))?;
        }
        Commands::Chat { root } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            let engine = build_engine(config)?;
            runtime.block_on(cmd_chat(&engine, &root))?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vellum=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

/// Resolve the configured providers and assemble the engine.
fn build_engine(config: Config) -> Result<Engine> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embedding.provider.as_str() {
        "fastembed" => Arc::new(
            FastEmbedProvider::new(&config.embedding.model)
                .map_err(|e| VellumError::Provider(e.to_string()))?,
        ),
        _ => Arc::new(HashingEmbedder::new(config.embedding.dimension)),
    };

    let generator: Arc<dyn GenerativeProvider> = Arc::new(
        ExtractiveGenerator::new().map_err(|e| VellumError::Provider(e.to_string()))?,
    );

    Engine::new(config, embedder, generator)
}

async fn cmd_ask(engine: &Engine, root: &Path, question: &str, json: bool) -> Result<()> {
    engine.build(root).await?;
    let answer = engine.ask(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer).map_err(anyhow::Error::from)?);
        return Ok(());
    }

    println!("{}", answer.text);
    if !answer.citations.is_empty() {
        println!("\nSources:");
        for source in &answer.citations {
            println!("  - {}", source);
        }
    }
    Ok(())
}

async fn cmd_search(
    engine: &Engine,
    root: &Path,
    query: &str,
    limit: usize,
    json: bool,
) -> Result<()> {
    engine.build(root).await?;
    let results = engine.search(query, limit).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).map_err(anyhow::Error::from)?
        );
        return Ok(());
    }

    if results.is_empty() {
        println!("No matching chunks.");
        return Ok(());
    }
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. {} (score: {:.4})",
            rank + 1,
            result.chunk.chunk_id(),
            result.score
        );
        println!("   {}", result.preview(100));
    }
    Ok(())
}

async fn cmd_sources(engine: &Engine, root: &Path) -> Result<()> {
    engine.build(root).await?;
    for source in engine.sources().await {
        println!("{}", source);
    }
    Ok(())
}

async fn cmd_stats(engine: &Engine, root: &Path, json: bool) -> Result<()> {
    engine.build(root).await?;
    let stats = engine.stats().await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).map_err(anyhow::Error::from)?
        );
        return Ok(());
    }

    println!("Index statistics");
    println!("================");
    println!("Generation:  {}", stats.generation);
    println!("Built:       {}", stats.built_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Documents:   {}", stats.documents);
    println!("Chunks:      {}", stats.chunks);
    println!("Dimension:   {}", stats.dimension);
    println!("Fingerprint: {}", stats.fingerprint);
    Ok(())
}

async fn cmd_chat(engine: &Engine, root: &Path) -> Result<()> {
    let stats = engine.build(root).await?;
    println!(
        "Indexed {} documents ({} chunks). Ask away; /refresh re-indexes, /quit exits.",
        stats.documents, stats.chunks
    );

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush().map_err(|e| VellumError::Io {
            source: e,
            context: "Failed to flush stdout".to_string(),
        })?;

        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line).map_err(|e| VellumError::Io {
            source: e,
            context: "Failed to read stdin".to_string(),
        })?;
        if read == 0 {
            break;
        }

        let input = line.trim();
        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/refresh" => {
                let stats = engine.refresh(root).await?;
                println!(
                    "Re-indexed: {} documents, {} chunks (generation {})",
                    stats.documents, stats.chunks, stats.generation
                );
            }
            "/sources" => {
                for source in engine.sources().await {
                    println!("  - {}", source);
                }
            }
            question => match engine.ask(question).await {
                Ok(answer) => {
                    println!("{}", answer.text);
                    if !answer.citations.is_empty() {
                        println!("[{}]", answer.citations.join(", "));
                    }
                }
                // Per-query failures stay per-query; the loop survives.
                Err(e) => println!("error: {}", e),
            },
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(p) => p,
                None => Config::default_path()?,
            };
            if path.exists() && !force {
                return Err(VellumError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| VellumError::Io {
                    source: e,
                    context: format!("Failed to create {}", parent.display()),
                })?;
            }
            Config::default().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigAction::Show => {
            let config = Config::load_or_default(config_path.as_deref())?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Validate => {
            let config = Config::load_or_default(config_path.as_deref())?;
            ConfigValidator::validate(&config)?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
