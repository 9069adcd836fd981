//! Model management commands for Ozette
//!
//! Commands for discovering models on the configured backend.

use crate::config::Config;
use crate::error::Result;
use crate::transport::{ChatTransport, OllamaTransport};

/// List models available on the backend
///
/// # Arguments
///
/// * `config` - Configuration containing the Ollama endpoint
///
/// # Examples
///
/// ```no_run
/// use ozette::commands::models::list_models;
/// use ozette::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// list_models(&Config::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn list_models(config: &Config) -> Result<()> {
    tracing::info!(host = %config.ollama.host, "listing models");

    let transport = OllamaTransport::new(&config.ollama)?;
    let models = transport.list_models().await?;

    if models.is_empty() {
        println!("No models available on {}", config.ollama.host);
        return Ok(());
    }

    println!("Models on {}:", config.ollama.host);
    for entry in models {
        let modified = entry
            .modified_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "  {:<40} {:>10}  {}",
            entry.name,
            format_size(entry.size),
            modified
        );
    }

    Ok(())
}

/// Render a byte count in a human-friendly unit
fn format_size(bytes: u64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else {
        format!("{} B", bytes as u64)
    }
}
