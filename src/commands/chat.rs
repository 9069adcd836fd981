//! Interactive chat mode handler
//!
//! Runs a readline-based loop that submits user input to a [`Session`]
//! and prints the response as it streams. Slash commands control the
//! active model, attachment staging, and statistics display without
//! leaving the loop.

use crate::annotate::split_reasoning;
use crate::attachments::{AttachmentPipeline, AttachmentStore, FsAttachmentStore, StagedFile};
use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::error::Result;
use crate::session::{Session, SessionUpdate};
use crate::stats::StatsSnapshot;
use crate::transport::{ChatTransport, OllamaTransport};
use colored::Colorize;
use futures::StreamExt;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::io::Write;
use std::sync::Arc;

/// A parsed slash command from the prompt line
#[derive(Debug, Clone, PartialEq, Eq)]
enum SlashCommand {
    /// Not a slash command; submit the line as a message
    None,
    Quit,
    Help,
    Stats,
    ListModels,
    SwitchModel(String),
    Attach(Vec<String>),
    Unknown(String),
}

fn parse_slash_command(line: &str) -> SlashCommand {
    let Some(rest) = line.strip_prefix('/') else {
        return SlashCommand::None;
    };

    let mut parts = rest.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let args: Vec<String> = parts.map(str::to_string).collect();

    match command {
        "quit" | "exit" | "q" => SlashCommand::Quit,
        "help" | "?" => SlashCommand::Help,
        "stats" => SlashCommand::Stats,
        "models" => SlashCommand::ListModels,
        "model" => match args.first() {
            Some(name) => SlashCommand::SwitchModel(name.clone()),
            None => SlashCommand::Unknown("/model needs a model name".to_string()),
        },
        "attach" => {
            if args.is_empty() {
                SlashCommand::Unknown("/attach needs at least one file path".to_string())
            } else {
                SlashCommand::Attach(args)
            }
        }
        other => SlashCommand::Unknown(format!("unknown command: /{}", other)),
    }
}

/// Start interactive chat mode
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
///
/// # Examples
///
/// ```
/// use ozette::commands::chat;
/// use ozette::config::Config;
///
/// // In application code:
/// // chat::run_chat(Config::default()).await?;
/// ```
pub async fn run_chat(config: Config) -> Result<()> {
    let transport = Arc::new(OllamaTransport::new(&config.ollama)?);

    let attachment_store: Arc<dyn AttachmentStore> = match &config.attachments.directory {
        Some(dir) => Arc::new(FsAttachmentStore::new(dir.clone())),
        None => Arc::new(FsAttachmentStore::default_location()?),
    };
    let mut pipeline = AttachmentPipeline::new(attachment_store, config.attachments.clone());

    let mut store = ConversationStore::new();
    let mut session = Session::new(transport.clone() as Arc<dyn ChatTransport>);
    let mut model = config.ollama.model.clone();
    let mut last_stats: Option<StatsSnapshot> = None;

    print_welcome(&model, transport.host());

    // Printer task: renders deltas as they stream in while the main loop
    // is awaiting settlement.
    let mut updates = session.updates();
    let printer = tokio::spawn(async move {
        while let Some(update) = updates.next().await {
            match update {
                SessionUpdate::Delta(text) => {
                    print!("{}", text);
                    let _ = std::io::stdout().flush();
                }
                SessionUpdate::Stats(_) => {}
                SessionUpdate::Settled(turn) => {
                    println!();
                    let parts = split_reasoning(&turn.content);
                    if parts.thinking.is_some() {
                        // The raw stream included the reasoning trace;
                        // repeat just the answer for easy reading.
                        println!("{}", "── answer ──".dimmed());
                        println!("{}", parts.visible);
                    }
                }
            }
        }
    });

    let mut rl = DefaultEditor::new()
        .map_err(|e| crate::error::OzetteError::Config(format!("readline init failed: {}", e)))?;

    loop {
        let prompt = format!("{} > ", model.cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                match parse_slash_command(trimmed) {
                    SlashCommand::Quit => break,
                    SlashCommand::Help => print_help(),
                    SlashCommand::Stats => match &last_stats {
                        Some(stats) => println!("{}", format_stats(stats)),
                        None => println!("No completed exchange yet"),
                    },
                    SlashCommand::ListModels => match transport.list_models().await {
                        Ok(models) => {
                            for entry in models {
                                let marker = if entry.name == model { "*" } else { " " };
                                println!("{} {}", marker, entry.name);
                            }
                        }
                        Err(e) => println!("{}", format!("could not list models: {}", e).red()),
                    },
                    SlashCommand::SwitchModel(name) => {
                        let history = store.switch_model(&name);
                        println!(
                            "Switched to {} ({} earlier turns)",
                            name.cyan(),
                            history.len()
                        );
                        model = name;
                    }
                    SlashCommand::Attach(paths) => {
                        stage_files(&mut pipeline, &paths).await;
                    }
                    SlashCommand::Unknown(message) => {
                        println!("{}", message.yellow());
                    }
                    SlashCommand::None => {
                        session.reset_cancellation();
                        let cancel = session.cancel_token();
                        let interrupt = tokio::spawn(async move {
                            if tokio::signal::ctrl_c().await.is_ok() {
                                cancel.cancel();
                            }
                        });

                        match session.submit(trimmed, &model, &mut store, &mut pipeline).await {
                            Ok(stats) => {
                                println!("{}", format_stats(&stats).dimmed());
                                last_stats = Some(stats);
                            }
                            Err(e) => println!("{}", format!("error: {}", e).red()),
                        }
                        interrupt.abort();
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                return Err(
                    crate::error::OzetteError::Config(format!("readline error: {}", e)).into(),
                )
            }
        }
    }

    printer.abort();
    println!("Goodbye!");
    Ok(())
}

/// Read the given paths and stage them for the next message
async fn stage_files(pipeline: &mut AttachmentPipeline, paths: &[String]) {
    let mut files = Vec::new();
    for path in paths {
        match StagedFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => println!("{}", format!("{}: {}", path, e).red()),
        }
    }

    let report = pipeline.stage(files).await;
    for attachment in &report.staged {
        println!(
            "Attached {} ({} bytes); it will ride along with your next message",
            attachment.display_name.green(),
            attachment.byte_size
        );
    }
    for (name, reason) in &report.failed {
        println!("{}", format!("{}: {}", name, reason).red());
    }
    if !pipeline.pending().is_empty() {
        println!("{} file(s) pending", pipeline.pending().len());
    }
}

fn format_stats(stats: &StatsSnapshot) -> String {
    format!(
        "{:.2} tok/s | input {} | output {} | total {} | {}",
        stats.tokens_per_second,
        stats.input_tokens,
        stats.output_tokens,
        stats.total_tokens,
        stats.model_name
    )
}

fn print_welcome(model: &str, host: &str) {
    println!("{}", "Ozette - streaming chat for Ollama".bold());
    println!("Model: {} | Host: {}", model.cyan(), host);
    println!("Type {} for commands, {} to leave\n", "/help".green(), "/quit".green());
}

fn print_help() {
    println!("Commands:");
    println!("  {}           show this help", "/help".green());
    println!("  {}          leave the session", "/quit".green());
    println!("  {}         show stats for the last exchange", "/stats".green());
    println!("  {}        list models on the backend", "/models".green());
    println!("  {}   switch the active model", "/model <name>".green());
    println!("  {}  stage files for the next message", "/attach <path>".green());
}
