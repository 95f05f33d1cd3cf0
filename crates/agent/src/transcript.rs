//! Session transcripts on disk.
//!
//! A transcript is written to a temporary file in the target directory and
//! then renamed into place without clobbering. A failure at any point before
//! the rename leaves nothing behind.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use opentwin_core::{PersistenceError, SessionId};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::conversation::ConversationLog;

const RULE: &str = "==================================================";

/// Upper bound on `-N` suffixes tried when names collide.
const MAX_SUFFIX: usize = 1000;

/// Writes transcripts into one directory.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save `log` as `<session-id>_<YYYYmmdd_HHMMSS>.txt`.
    ///
    /// Never overwrites: if the name is taken, `-1`, `-2`, … is appended.
    pub fn save(
        &self,
        session_id: &SessionId,
        log: &ConversationLog,
        title: &str,
        summary: &str,
    ) -> Result<PathBuf, PersistenceError> {
        self.save_with(session_id, log, title, summary, |file, text| {
            file.write_all(text.as_bytes())
        })
    }

    fn save_with<F>(
        &self,
        session_id: &SessionId,
        log: &ConversationLog,
        title: &str,
        summary: &str,
        write: F,
    ) -> Result<PathBuf, PersistenceError>
    where
        F: FnOnce(&mut std::fs::File, &str) -> io::Result<()>,
    {
        if log.is_empty() {
            return Err(PersistenceError::EmptySession);
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| self.io_error(&self.dir, e))?;

        let text = render(session_id, log, title, summary);
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| self.io_error(&self.dir, e))?;
        let tmp_path = tmp.path().to_path_buf();
        write(tmp.as_file_mut(), &text).map_err(|e| self.io_error(&tmp_path, e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(&tmp_path, e))?;

        let stem = format!(
            "{}_{}",
            session_id.as_str(),
            Local::now().format("%Y%m%d_%H%M%S")
        );

        for attempt in 0..=MAX_SUFFIX {
            let name = if attempt == 0 {
                format!("{stem}.txt")
            } else {
                format!("{stem}-{attempt}.txt")
            };
            let target = self.dir.join(name);
            match tmp.persist_noclobber(&target) {
                Ok(_) => {
                    info!(path = %target.display(), turns = log.len(), "Transcript saved");
                    return Ok(target);
                }
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %target.display(), "Transcript name taken, trying next suffix");
                    tmp = e.file;
                }
                Err(e) => return Err(self.io_error(&target, e.error)),
            }
        }

        Err(self.io_error(
            &self.dir,
            io::Error::new(io::ErrorKind::AlreadyExists, "no free transcript name"),
        ))
    }

    fn io_error(&self, path: &Path, source: io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Transcript text: header, one line per turn, summary block.
fn render(session_id: &SessionId, log: &ConversationLog, title: &str, summary: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "Session: {session_id}");
    let _ = writeln!(out, "Date: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "{RULE}");
    out.push('\n');

    for turn in log {
        let _ = writeln!(
            out,
            "{} {}: {}",
            turn.timestamp.to_rfc3339(),
            turn.role,
            fold_newlines(&turn.content)
        );
    }

    out.push('\n');
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Session Summary:");
    let _ = writeln!(out, "{}", summary.trim_end());
    out
}

fn fold_newlines(text: &str) -> String {
    text.split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentwin_core::ConversationTurn;

    fn sample_log() -> ConversationLog {
        let mut log = ConversationLog::new();
        log.append(ConversationTurn::user("Hi")).unwrap();
        log.append(ConversationTurn::assistant("Hello!\nHow are you?"))
            .unwrap();
        log
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn saves_named_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path());
        let id = SessionId::from("abc");

        let path = store
            .save(&id, &sample_log(), "English Teaching Session", "Greetings.")
            .unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("abc_"));
        assert!(name.ends_with(".txt"));
        // abc_YYYYmmdd_HHMMSS.txt
        assert_eq!(name.len(), "abc_".len() + 15 + ".txt".len());
        assert_eq!(files_in(dir.path()), vec![path]);
    }

    #[test]
    fn transcript_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path());
        let log = sample_log();
        let path = store
            .save(&SessionId::from("s1"), &log, "Chat with Jerome Powell", "Said hello.")
            .unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with(RULE));
        assert!(text.contains("Chat with Jerome Powell\nSession: s1\nDate: "));

        let first = format!("{} user: Hi\n", log.turns()[0].timestamp.to_rfc3339());
        let second = format!(
            "{} assistant: Hello! How are you?\n",
            log.turns()[1].timestamp.to_rfc3339()
        );
        assert!(text.contains(&first));
        assert!(text.contains(&second));
        assert!(text.ends_with("Session Summary:\nSaid hello.\n"));
    }

    #[test]
    fn empty_log_rejected_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path());
        let err = store
            .save(&SessionId::new(), &ConversationLog::new(), "t", "s")
            .unwrap_err();
        assert!(matches!(err, PersistenceError::EmptySession));
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn repeated_saves_never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path());
        let id = SessionId::from("same");
        let log = sample_log();

        let paths: Vec<PathBuf> = (0..3)
            .map(|i| store.save(&id, &log, "t", &format!("summary {i}")).unwrap())
            .collect();

        assert_eq!(files_in(dir.path()).len(), 3);
        for (i, path) in paths.iter().enumerate() {
            let text = std::fs::read_to_string(path).unwrap();
            assert!(text.contains(&format!("summary {i}")));
        }
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TranscriptStore::new(dir.path());

        let err = store
            .save_with(&SessionId::from("crash"), &sample_log(), "t", "s", |file, text| {
                file.write_all(&text.as_bytes()[..text.len() / 2])?;
                Err(io::Error::other("simulated crash"))
            })
            .unwrap_err();

        assert!(matches!(err, PersistenceError::Io { .. }));
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("conversations");
        let store = TranscriptStore::new(&nested);
        let path = store.save(&SessionId::new(), &sample_log(), "t", "s").unwrap();
        assert!(path.starts_with(&nested));
        assert_eq!(store.dir(), nested.as_path());
    }

    #[test]
    fn fold_newlines_joins_lines() {
        assert_eq!(fold_newlines("a\nb\r\nc"), "a b c");
        assert_eq!(fold_newlines("single"), "single");
    }
}
