//! Model listing commands for chatshell
//!
//! Lists the models the configured provider offers, either as a table or
//! as JSON for downstream tooling.

use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::providers::{self, CompletionService, ModelInfo};
use prettytable::{cell, row, Table};

/// List available models from the configured provider
///
/// # Arguments
///
/// * `config` - Configuration containing provider settings
/// * `json` - Print JSON instead of a table
///
/// # Errors
///
/// Returns error if the provider cannot be created or listing fails
///
/// # Examples
///
/// ```no_run
/// use chatshell::config::Config;
/// use chatshell::commands::models::list_models;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load("config/config.yaml", &Default::default())?;
/// list_models(&config, false).await?;
/// # Ok(())
/// # }
/// ```
pub async fn list_models(config: &Config, json: bool) -> Result<()> {
    let provider_type = &config.provider.provider_type;
    tracing::info!("Listing models from provider: {}", provider_type);

    let service = providers::create_service(&config.provider)?;
    print_models(service.as_ref(), provider_type, json).await
}

/// Fetch and print models from an existing service
///
/// # Errors
///
/// Returns error if listing or serialization fails
pub async fn print_models(
    service: &dyn CompletionService,
    provider_type: &str,
    json: bool,
) -> Result<()> {
    let models = service.list_models().await?;

    if json {
        output_models_json(&models)?;
    } else if models.is_empty() {
        println!("No models available from provider: {}", provider_type);
    } else {
        println!("\nAvailable models from {}:\n", provider_type);
        models_table(&models).printstd();
        println!();
    }

    Ok(())
}

/// Serialize a serializable value into pretty JSON string.
fn serialize_pretty<T: serde::Serialize + ?Sized>(
    value: &T,
) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Output models in JSON format
///
/// # Errors
///
/// Returns `ChatError::Serialization` if serialization fails
fn output_models_json(models: &[ModelInfo]) -> Result<()> {
    let json = serialize_pretty(models).map_err(ChatError::Serialization)?;
    println!("{}", json);
    Ok(())
}

fn format_limit(limit: Option<u32>) -> String {
    limit
        .map(|n| format!("{} tokens", n))
        .unwrap_or_else(|| "-".to_string())
}

/// Build the models table
fn models_table(models: &[ModelInfo]) -> Table {
    let mut table = Table::new();
    table.add_row(row![
        "Model Name",
        "Display Name",
        "Input Limit",
        "Output Limit",
        "Chat"
    ]);

    for model in models {
        table.add_row(row![
            model.name,
            model.display_name,
            format_limit(model.input_token_limit),
            format_limit(model.output_token_limit),
            if model.supports_generation() { "yes" } else { "no" }
        ]);
    }

    table
}
