//! `opentwin query`: one question to the digital twin.

use opentwin_agent::ConversationMemory;
use opentwin_agent::persona::generator::{MAX_REFERENCES, ResponseGenerator};
use opentwin_config::AppConfig;
use opentwin_core::Role;

use super::{CommandResult, open_content_store, persona_system_prompt};

pub async fn run(query: String, name: String, no_memory: bool) -> CommandResult {
    let config = AppConfig::load()?;
    let llm = opentwin_providers::build_from_config(&config)?;
    let store = open_content_store(&config).await?;
    let system_prompt = persona_system_prompt(&store, &name).await?;

    let items = store.all_content().await?;
    let references = ResponseGenerator::find_relevant_context(&items, &query, MAX_REFERENCES);

    let mut memory =
        ConversationMemory::from_config(&name, &config.memory, &config.memory_dir_for(&name));
    memory.set_enabled(!no_memory);
    let context = memory
        .build_context(&query, 0, config.memory.max_memories)
        .await;

    let generator = ResponseGenerator::new(llm);
    let response = generator
        .generate_response(&query, &system_prompt, &references, Some(&context))
        .await?;

    memory.store_turn(Role::User, &query, None).await?;
    memory
        .store_turn(Role::Assistant, &response, Some(&query))
        .await?;

    println!();
    println!("💬 {name}:");
    println!();
    println!("{response}");
    println!();
    if !references.is_empty() {
        println!("   ({} reference(s) used)", references.len());
    }
    Ok(())
}
