//! `opentwin voice-chat`: free conversation practice with the tutor.

use opentwin_agent::tutor::TutorSession;
use opentwin_config::AppConfig;

use super::tutor_loop::{self, VoiceIo};
use super::{CommandResult, tutor_llm};

pub async fn run(voice: Option<String>, text: bool, no_memory: bool) -> CommandResult {
    let mut config = AppConfig::load()?;
    if let Some(voice) = voice {
        config.voice.tts_voice = voice;
        config.validate()?;
    }

    let llm = tutor_llm(&config)?;
    let io = if text { None } else { Some(VoiceIo::from_config(&config)?) };
    let session = TutorSession::from_config(llm, &config, !no_memory)?;

    println!();
    println!("🦀 English practice with your AI teacher");
    println!("   Model:   {}", config.teacher.model);
    println!(
        "   Input:   {}",
        if io.is_some() { "voice" } else { "text" }
    );
    if io.is_some() {
        println!("   Voice:   {}", config.voice.tts_voice);
    }
    println!(
        "   Memory:  {}",
        if session.memory().memory_enabled() { "on" } else { "off" }
    );
    println!();

    let greeting = session.greeting();
    tutor_loop::run(session, io, greeting).await
}
