//! The interactive tutor loop driven by `voice-chat` and `scenario`.

use opentwin_agent::tutor::TutorSession;
use opentwin_config::AppConfig;
use opentwin_core::{Error, SpeechToText, TextToSpeech};
use opentwin_voice::{AudioPlayer, AudioRecorder, OpenAiSpeech, WhisperClient};
use tracing::warn;

use super::{CommandResult, InputLines, is_exit_word, prompt_line, stdin_lines};

const HELP: &str = "  /save      save the transcript now\n  \
                    /reset     start the conversation over\n  \
                    /stats     words and exchanges so far\n  \
                    /summary   what you talked about\n  \
                    /progress  scenario progress\n  \
                    /end       finish the scenario\n  \
                    /help      this list\n  \
                    exit       leave (the session is saved)";

/// Microphone in, speaker out.
pub struct VoiceIo {
    recorder: AudioRecorder,
    stt: Box<dyn SpeechToText>,
    tts: Box<dyn TextToSpeech>,
    player: AudioPlayer,
    record_seconds: u32,
}

impl VoiceIo {
    pub fn from_config(config: &AppConfig) -> Result<Self, opentwin_config::ConfigError> {
        let key = config.require_openai_key()?;
        Ok(Self {
            recorder: AudioRecorder::from_config(&config.voice),
            stt: Box::new(WhisperClient::from_config(key, &config.voice)),
            tts: Box::new(OpenAiSpeech::from_config(key, &config.voice)),
            player: AudioPlayer::new(),
            record_seconds: config.voice.record_seconds,
        })
    }

    async fn listen(&self) -> Result<String, opentwin_core::SpeechError> {
        println!("  🎤 Listening for {}s...", self.record_seconds);
        let recording = self.recorder.record_for(self.record_seconds).await?;
        self.stt.transcribe(recording.path()).await
    }

    async fn speak(&self, text: &str) {
        let spoken = match self.tts.synthesize(text).await {
            Ok(audio) => self.player.play_bytes(&audio).await,
            Err(e) => Err(e),
        };
        if let Err(e) = spoken {
            warn!(error = %e, "Could not speak reply");
        }
    }
}

/// Run the session until the student leaves, then save it if configured.
pub async fn run(mut session: TutorSession, voice: Option<VoiceIo>, opening: String) -> CommandResult {
    println!("{opening}\n");
    if let Some(io) = &voice {
        io.speak(&opening).await;
        println!("  Press Enter to speak, or type a message or command.");
    }
    println!("  Type /help for commands, 'exit' to leave.\n");

    let mut lines: InputLines = stdin_lines();
    loop {
        let Some(typed) = prompt_line(&mut lines, "You > ").await? else {
            break;
        };

        let input = match (&voice, typed.is_empty()) {
            (Some(io), true) => match io.listen().await {
                Ok(text) => {
                    println!("  You said: {text}");
                    text
                }
                Err(e) => {
                    warn!(error = %e, "Transcription failed");
                    show_error(&session, "transcription_error");
                    continue;
                }
            },
            (None, true) => continue,
            (_, false) => typed,
        };

        if is_exit_word(&input) {
            break;
        }

        if input.starts_with('/') {
            handle_command(&mut session, &input).await;
            continue;
        }

        match session.chat(&input).await {
            Ok(reply) => {
                println!("\nTeacher > {reply}\n");
                if let Some(io) = &voice {
                    io.speak(&reply).await;
                }
            }
            Err(Error::InvalidInput(_)) => show_error(&session, "empty_input"),
            Err(e) => {
                warn!(error = %e, "Tutor reply failed");
                show_error(&session, "api_error");
            }
        }
    }

    match session.finish().await {
        Ok(Some(path)) => println!("\n  ✅ Session saved to {}", path.display()),
        Ok(None) => {}
        Err(e) => eprintln!("\n  ⚠️  Could not save session: {e}"),
    }
    let stats = session.stats();
    println!(
        "  {} exchange(s), {} word(s) spoken by you. Goodbye! 👋\n",
        stats.total_exchanges, stats.student_words
    );
    Ok(())
}

async fn handle_command(session: &mut TutorSession, command: &str) {
    match command {
        "/help" => println!("{HELP}\n"),
        "/save" => match session.save().await {
            Ok(path) => println!("  ✅ Saved to {}\n", path.display()),
            Err(e) => println!("  ⚠️  {e}\n"),
        },
        "/reset" => {
            session.reset();
            println!("  ✅ Conversation reset\n\n{}\n", session.greeting());
        }
        "/stats" => {
            let stats = session.stats();
            println!("  Exchanges:      {}", stats.total_exchanges);
            println!("  Your words:     {}", stats.student_words);
            println!("  Teacher words:  {}", stats.teacher_words);
            println!("  Memory:         {}", if stats.memory_enabled { "on" } else { "off" });
            println!("  Model:          {}\n", stats.model);
        }
        "/summary" => println!("  {}\n", session.summary().await),
        "/progress" => match session.scenario_progress() {
            Some(p) => {
                println!("  Scenario:    {}", p.scenario);
                println!("  Character:   {}", p.ai_character);
                println!(
                    "  Exchanges:   {} (about {} min planned)",
                    p.exchanges_completed, p.estimated_duration_minutes
                );
                println!("  Vocabulary:  {}\n", p.vocabulary_focus.join(", "));
            }
            None => println!("  No scenario in progress.\n"),
        },
        "/end" => match session.end_scenario().await {
            Some(summary) => {
                println!("  🎉 Finished: {} ({} exchanges)", summary.scenario, summary.exchanges);
                println!("  Objectives:");
                for objective in &summary.learning_objectives {
                    println!("    - {objective}");
                }
                println!("  Vocabulary: {}", summary.vocabulary_practiced.join(", "));
                println!("  Summary: {}\n", summary.conversation_summary);
                if let Some(e) = session.prompts().encouragement() {
                    println!("  {e}\n");
                }
            }
            None => println!("  No scenario in progress.\n"),
        },
        other => println!("  Unknown command {other}. Type /help.\n"),
    }
}

fn show_error(session: &TutorSession, kind: &str) {
    let msg = session.prompts().error_message(kind);
    if msg.suggestion.is_empty() {
        println!("  ⚠️  {}\n", msg.message);
    } else {
        println!("  ⚠️  {} {}\n", msg.message, msg.suggestion);
    }
}
