//! Command-line interface definition for Ozette
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat and model listing.

use clap::{Parser, Subcommand};

/// Ozette - streaming chat client for Ollama
///
/// Drive a conversational session against an Ollama backend with live
/// token statistics and single-use document attachments.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ozette")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the Ollama host from config
    #[arg(long, env = "OZETTE_HOST")]
    pub host: Option<String>,

    /// Override the model from config
    #[arg(short, long)]
    pub model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for Ozette
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session (the default)
    Chat,

    /// Manage models on the backend
    Models {
        /// Model management subcommand
        #[command(subcommand)]
        command: ModelCommand,
    },
}

/// Model management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ModelCommand {
    /// List models available on the backend
    List,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
