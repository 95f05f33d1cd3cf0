//! Microphone capture and audio playback through system programs.
//!
//! Recording shells out to `arecord` (ALSA) or `rec` (SoX); playback tries
//! the usual players in order and uses the first one that works.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use opentwin_config::VoiceConfig;
use opentwin_core::SpeechError;
use tempfile::TempPath;
use tokio::process::Command;
use tracing::debug;

/// A recorded WAV file. Deleted when dropped.
pub struct Recording {
    path: TempPath,
}

impl Recording {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub struct AudioRecorder {
    program: String,
    sample_rate: u32,
    channels: u16,
}

impl AudioRecorder {
    pub fn new(program: impl Into<String>, sample_rate: u32, channels: u16) -> Self {
        Self { program: program.into(), sample_rate, channels }
    }

    pub fn from_config(config: &VoiceConfig) -> Self {
        Self::new(
            config.record_command.as_deref().unwrap_or("arecord"),
            config.sample_rate,
            config.channels,
        )
    }

    fn args(&self, output: &Path, seconds: u32) -> Vec<String> {
        let out = output.display().to_string();
        let rate = self.sample_rate.to_string();
        let channels = self.channels.to_string();
        if self.program.ends_with("rec") && !self.program.ends_with("arecord") {
            // SoX: rec -q -r 16000 -c 1 out.wav trim 0 N
            vec![
                "-q".into(),
                "-r".into(),
                rate,
                "-c".into(),
                channels,
                out,
                "trim".into(),
                "0".into(),
                seconds.to_string(),
            ]
        } else {
            vec![
                "-q".into(),
                "-f".into(),
                "S16_LE".into(),
                "-r".into(),
                rate,
                "-c".into(),
                channels,
                "-d".into(),
                seconds.to_string(),
                out,
            ]
        }
    }

    fn temp_wav() -> Result<TempPath, SpeechError> {
        tempfile::Builder::new()
            .prefix("opentwin-")
            .suffix(".wav")
            .tempfile()
            .map(|f| f.into_temp_path())
            .map_err(|e| SpeechError::Recording(format!("cannot create temp file: {e}")))
    }

    fn command(&self, output: &Path, seconds: u32) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args(output, seconds))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Record for a fixed number of seconds.
    pub async fn record_for(&self, seconds: u32) -> Result<Recording, SpeechError> {
        let path = Self::temp_wav()?;
        debug!(program = %self.program, seconds, "Recording");

        let output = self
            .command(&path, seconds)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(SpeechError::Recording(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(Recording { path })
    }

    fn spawn_error(&self, e: std::io::Error) -> SpeechError {
        if e.kind() == ErrorKind::NotFound {
            SpeechError::Recording(format!(
                "'{}' not found; install alsa-utils or sox, or set record_command",
                self.program
            ))
        } else {
            SpeechError::Recording(e.to_string())
        }
    }
}

const MACOS_PLAYERS: &[(&str, &[&str])] = &[("afplay", &[])];

const UNIX_PLAYERS: &[(&str, &[&str])] = &[
    ("mpg123", &["-q"]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
    ("aplay", &["-q"]),
    ("paplay", &[]),
];

/// Plays encoded audio through the first available system player.
pub struct AudioPlayer {
    candidates: Vec<(String, Vec<String>)>,
}

impl Default for AudioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlayer {
    pub fn new() -> Self {
        if cfg!(target_os = "macos") {
            Self::with_candidates(MACOS_PLAYERS)
        } else {
            Self::with_candidates(UNIX_PLAYERS)
        }
    }

    pub fn with_candidates(list: &[(&str, &[&str])]) -> Self {
        let candidates = list
            .iter()
            .map(|(p, args)| (p.to_string(), args.iter().map(|a| a.to_string()).collect()))
            .collect();
        Self { candidates }
    }

    /// Write `audio` (MP3) to a temp file and play it.
    pub async fn play_bytes(&self, audio: &[u8]) -> Result<(), SpeechError> {
        let file = tempfile::Builder::new()
            .prefix("opentwin-")
            .suffix(".mp3")
            .tempfile()
            .map_err(|e| SpeechError::Playback(e.to_string()))?
            .into_temp_path();
        tokio::fs::write(&file, audio)
            .await
            .map_err(|e| SpeechError::Playback(e.to_string()))?;
        self.play_file(&file).await
    }

    pub async fn play_file(&self, path: &Path) -> Result<(), SpeechError> {
        for (program, args) in &self.candidates {
            let result = Command::new(program)
                .args(args)
                .arg(path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            match result {
                Ok(status) if status.success() => return Ok(()),
                Ok(status) => debug!(program, %status, "Player failed, trying next"),
                Err(e) => debug!(program, error = %e, "Player unavailable, trying next"),
            }
        }

        let tried: Vec<&str> = self.candidates.iter().map(|(p, _)| p.as_str()).collect();
        Err(SpeechError::NoPlayer(tried.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arecord_args() {
        let recorder = AudioRecorder::from_config(&VoiceConfig::default());
        let args = recorder.args(Path::new("/tmp/x.wav"), 5);
        assert_eq!(
            args,
            vec!["-q", "-f", "S16_LE", "-r", "16000", "-c", "1", "-d", "5", "/tmp/x.wav"]
        );
    }

    #[test]
    fn sox_args() {
        let recorder = AudioRecorder::new("rec", 16000, 1);
        let args = recorder.args(Path::new("/tmp/x.wav"), 3);
        assert_eq!(args, vec!["-q", "-r", "16000", "-c", "1", "/tmp/x.wav", "trim", "0", "3"]);
    }

    #[tokio::test]
    async fn missing_recorder_is_reported() {
        let recorder = AudioRecorder::new("opentwin-no-such-recorder", 16000, 1);
        let err = recorder.record_for(1).await.err().unwrap();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn no_player_lists_candidates() {
        const NO_ARGS: &[&str] = &[];
        let player = AudioPlayer::with_candidates(&[
            ("opentwin-no-player-a", NO_ARGS),
            ("opentwin-no-player-b", NO_ARGS),
        ]);
        let err = player.play_bytes(b"ID3").await.unwrap_err();
        assert!(matches!(err, SpeechError::NoPlayer(ref list) if list.contains("opentwin-no-player-b")));
    }

    #[test]
    fn recording_removes_file_on_drop() {
        let path = AudioRecorder::temp_wav().unwrap();
        let kept = path.to_path_buf();
        let recording = Recording { path };
        assert!(recording.path().exists());
        drop(recording);
        assert!(!kept.exists());
    }
}
