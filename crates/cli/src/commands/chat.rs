//! `opentwin chat`: interactive conversation with a digital twin.

use opentwin_agent::persona::generator::{MAX_REFERENCES, ResponseGenerator};
use opentwin_agent::{ConversationMemory, TranscriptStore};
use opentwin_config::{AppConfig, slugify};
use opentwin_core::{Role, SessionId};

use super::{
    CommandResult, InputLines, is_exit_word, open_content_store, persona_system_prompt,
    prompt_line, stdin_lines,
};

const HELP: &str = "  /save   save the transcript\n  \
                    /clear  forget this conversation (long-term memory is kept)\n  \
                    /stats  memory statistics\n  \
                    /reset-memory  wipe long-term memory and this conversation\n  \
                    /help   this list\n  \
                    exit    leave";

pub async fn run(name: String, no_memory: bool) -> CommandResult {
    let config = AppConfig::load()?;
    let llm = opentwin_providers::build_from_config(&config)?;
    let store = open_content_store(&config).await?;
    let system_prompt = persona_system_prompt(&store, &name).await?;
    let items = store.all_content().await?;

    let mut memory =
        ConversationMemory::from_config(&name, &config.memory, &config.memory_dir_for(&name));
    memory.set_enabled(!no_memory);

    let session = SessionId::new();
    let transcripts =
        TranscriptStore::new(config.storage.data_dir.join(slugify(&name)).join("conversations"));
    let generator = ResponseGenerator::new(llm.clone());

    println!();
    println!("🦀 Chatting with the digital twin of {name}");
    println!("   Model:   {}", llm.model());
    println!(
        "   Memory:  {}",
        if memory.memory_enabled() { "on" } else { "off" }
    );
    println!("   Type /help for commands, 'exit' to leave.");
    println!();

    let mut lines: InputLines = stdin_lines();
    while let Some(input) = prompt_line(&mut lines, "You > ").await? {
        if input.is_empty() {
            continue;
        }
        if is_exit_word(&input) {
            break;
        }

        match input.as_str() {
            "/help" => println!("{HELP}\n"),
            "/clear" => {
                memory.clear_conversation();
                println!("  ✅ Conversation cleared\n");
            }
            "/stats" => {
                for (key, value) in memory.stats().await {
                    println!("  {key}: {value}");
                }
                println!();
            }
            "/reset-memory" => {
                let answer = prompt_line(&mut lines, "  Wipe all long-term memory? (yes/no) ").await?;
                let confirm = answer.is_some_and(|a| a.eq_ignore_ascii_case("yes"));
                match memory.reset_memory(confirm).await {
                    Ok(true) => println!("  ✅ Memory reset\n"),
                    Ok(false) if !confirm => println!("  Cancelled\n"),
                    Ok(false) => println!("  ⚠️  Memory is off for this session\n"),
                    Err(e) => println!("  ⚠️  {e}\n"),
                }
            }
            "/save" => {
                let title = format!("Conversation with {name}");
                let summary = format!("{} turn(s)", memory.log().len());
                match transcripts.save(&session, memory.log(), &title, &summary) {
                    Ok(path) => println!("  ✅ Saved to {}\n", path.display()),
                    Err(e) => println!("  ⚠️  {e}\n"),
                }
            }
            query => {
                let context = memory
                    .build_context(query, config.memory.max_turns, config.memory.max_memories)
                    .await;
                let references =
                    ResponseGenerator::find_relevant_context(&items, query, MAX_REFERENCES);

                match generator
                    .generate_response(query, &system_prompt, &references, Some(&context))
                    .await
                {
                    Ok(response) => {
                        println!("\n{name} > {response}\n");
                        memory.store_turn(Role::User, query, None).await?;
                        memory
                            .store_turn(Role::Assistant, &response, Some(query))
                            .await?;
                    }
                    Err(e) => eprintln!("  ❌ {e}\n"),
                }
            }
        }
    }

    if memory.failed_writes() > 0 {
        println!(
            "⚠️  {} memory write(s) failed this session",
            memory.failed_writes()
        );
    }
    println!("\n  Goodbye! 👋\n");
    Ok(())
}
