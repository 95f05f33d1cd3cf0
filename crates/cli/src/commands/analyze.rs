//! `opentwin analyze`: build and store a persona profile.

use opentwin_agent::persona::analyzer::PersonaAnalyzer;
use opentwin_config::AppConfig;

use super::{CommandResult, open_content_store};

pub async fn run(name: String) -> CommandResult {
    let config = AppConfig::load()?;
    let llm = opentwin_providers::build_from_config(&config)?;
    let store = open_content_store(&config).await?;

    let items = store.all_content().await?;
    if items.is_empty() {
        return Err("No content to analyze. Run `opentwin extract` first.".into());
    }

    println!("🧠 Analyzing {} item(s) for {name} with {}...", items.len(), llm.model());
    let profile = PersonaAnalyzer::new(llm).analyze_content(&items).await?;
    store.save_persona_profile(&name, &profile).await?;

    println!();
    println!("✅ Persona profile saved for {name}");
    for (label, text) in [
        ("Writing style", &profile.writing_style),
        ("Communication", &profile.communication_patterns),
        ("Topics", &profile.topics_themes),
        ("Decisions", &profile.decision_style),
    ] {
        println!("\n  {label}:");
        println!("    {}", preview(text, 200));
    }
    println!("\n   Next: opentwin chat --name \"{name}\"");
    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
