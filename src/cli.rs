//! Command-line interface definition for chatshell
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot questions and
//! model listing.

use clap::{Parser, Subcommand};

/// chatshell - terminal chat client for hosted language models
///
/// Keeps several conversations in memory and sends them to a
/// text-generation API.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatshell")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for chatshell
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        /// Override the model from config
        #[arg(short, long)]
        model: Option<String>,

        /// Start in temporary mode
        #[arg(short, long)]
        temporary: bool,
    },

    /// Ask a single question and print the answer
    Ask {
        /// Question to send
        #[arg(short, long)]
        prompt: String,

        /// Override the model from config
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Inspect available models
    Models {
        /// Model subcommand
        #[command(subcommand)]
        command: ModelCommand,
    },
}

/// Model subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ModelCommand {
    /// List available models
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Model override given on the command line, if the command takes one
    pub fn model_override(&self) -> Option<&str> {
        match &self.command {
            Commands::Chat { model, .. } | Commands::Ask { model, .. } => model.as_deref(),
            Commands::Models { .. } => None,
        }
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            command: Commands::Chat {
                model: None,
                temporary: false,
            },
        }
    }
}
