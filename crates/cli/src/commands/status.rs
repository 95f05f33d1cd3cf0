//! `opentwin status`: stored content, personas and configuration.

use opentwin_agent::tutor::ScenarioCatalog;
use opentwin_config::AppConfig;
use opentwin_core::LlmClient;

use super::{CommandResult, open_content_store};

pub async fn run() -> CommandResult {
    let config = AppConfig::load()?;
    let store = open_content_store(&config).await?;

    println!("🦀 OpenTwin Status");
    println!("==================");
    let mut summary: Vec<(&str, String)> = config.summary().into_iter().collect();
    summary.sort();
    for (key, value) in summary {
        println!("  {:<18} {value}", format!("{key}:"));
    }
    println!("  {:<18} {}", "database:", config.storage.database_path().display());
    println!("  {:<18} {}", "tutor_model:", config.teacher.model);

    println!();
    println!("  Content items:  {}", store.content_count().await?);
    let personas = store.persona_names().await?;
    if personas.is_empty() {
        println!("  Personas:       none (run `opentwin analyze`)");
    } else {
        println!("  Personas:       {}", personas.join(", "));
    }

    match ScenarioCatalog::load(config.teacher.scenarios_file.as_deref()) {
        Ok(catalog) => {
            let stats = catalog.statistics();
            println!(
                "  Scenarios:      {} in {} categories",
                stats.total_scenarios,
                stats.by_category.len()
            );
        }
        Err(e) => println!("  Scenarios:      ⚠️  {e}"),
    }

    let config_path = AppConfig::config_dir().join("opentwin.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found at {}", config_path.display());
    } else {
        println!("\n  ⚠️  No config file, using defaults and environment");
    }
    if !config.has_api_key() {
        println!("  ⚠️  No API key for provider '{}'", config.llm.provider);
        return Ok(());
    }
    let llm = opentwin_providers::build_from_config(&config)?;
    println!("  {}", backend_health(llm.as_ref()).await);
    Ok(())
}

/// Status line for the LLM backend, with the advertised model count when known.
async fn backend_health(llm: &dyn LlmClient) -> String {
    let healthy = llm.health_check().await.unwrap_or(false);
    if !healthy {
        return format!("⚠️  {} backend unreachable or key rejected", llm.name());
    }
    match llm.list_models().await {
        Ok(models) if !models.is_empty() => format!(
            "✅ {} backend reachable ({} models, using {})",
            llm.name(),
            models.len(),
            llm.model()
        ),
        _ => format!("✅ {} backend reachable (using {})", llm.name(), llm.model()),
    }
}
