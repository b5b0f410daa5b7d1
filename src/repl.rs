//! The interactive front end: prompt, completion, history and the startup
//! script.

use crate::completion::{Vocabulary, VocabularyHelper};
use crate::env::Environment;
use crate::session::Session;
use rustyline::config::{CompletionType, Config as EditorConfig};
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the per-user startup script in the home directory.
pub const STARTUP_SCRIPT: &str = ".tshrc";

/// Name of the per-user history file in the home directory.
pub const HISTORY_FILE: &str = ".tsh-history";

pub fn startup_script_path(env: &Environment) -> Option<PathBuf> {
    env.home_dir().map(|home| home.join(STARTUP_SCRIPT))
}

pub fn history_path(env: &Environment) -> Option<PathBuf> {
    env.home_dir().map(|home| home.join(HISTORY_FILE))
}

/// Result of asking the editor for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// The user abandoned the current line (Ctrl-C).
    Interrupted,
    /// End of input (Ctrl-D).
    Eof,
}

/// What the interactive loop needs from a terminal line editor.
pub trait LineEditor {
    /// Read one line, offering `vocab` for completion.
    fn read_line(&mut self, prompt: &str, vocab: Vocabulary) -> anyhow::Result<ReadOutcome>;

    /// Append `line` to the history and persist it.
    fn record(&mut self, line: &str) -> anyhow::Result<()>;
}

/// [`LineEditor`] backed by `rustyline`, with a bounded history file.
pub struct RustylineEditor {
    editor: Editor<VocabularyHelper, FileHistory>,
    history_file: Option<PathBuf>,
}

impl RustylineEditor {
    /// Create an editor keeping at most `history_size` lines. Without a usable
    /// `history_file` the session runs without persistent history.
    pub fn new(history_size: usize, history_file: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = EditorConfig::builder()
            .max_history_size(history_size)?
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();
        let mut editor = Editor::<VocabularyHelper, FileHistory>::with_config(config)?;
        editor.set_helper(Some(VocabularyHelper::default()));

        let history_file = history_file.and_then(|path| open_history(&mut editor, path));
        Ok(Self {
            editor,
            history_file,
        })
    }

    pub fn history_file(&self) -> Option<&Path> {
        self.history_file.as_deref()
    }
}

/// Make sure `path` is writable (creating it if needed) and load whatever it
/// holds. Returns `None` when history cannot be persisted.
fn open_history(
    editor: &mut Editor<VocabularyHelper, FileHistory>,
    path: PathBuf,
) -> Option<PathBuf> {
    let existed = path.exists();
    if let Err(e) = OpenOptions::new().create(true).append(true).open(&path) {
        tracing::warn!(
            "tsh: Warning: Could not open `{}' for writing: {}",
            path.display(),
            e
        );
        return None;
    }
    if !existed {
        tracing::info!("tsh: `{}' created.", path.display());
        return Some(path);
    }
    let non_empty = fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
    if non_empty {
        if let Err(e) = editor.load_history(&path) {
            tracing::warn!("tsh: Warning: Could not load `{}': {}", path.display(), e);
        }
    }
    Some(path)
}

impl LineEditor for RustylineEditor {
    fn read_line(&mut self, prompt: &str, vocab: Vocabulary) -> anyhow::Result<ReadOutcome> {
        if let Some(helper) = self.editor.helper_mut() {
            helper.set_vocabulary(vocab);
        }
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(e.into()),
        }
    }

    fn record(&mut self, line: &str) -> anyhow::Result<()> {
        self.editor.add_history_entry(line)?;
        if let Some(path) = &self.history_file {
            self.editor.save_history(path)?;
        }
        Ok(())
    }
}

/// Run the startup script, if there is one, through the session.
///
/// A missing script is skipped silently; an unreadable one is a warning.
pub fn run_startup_script(session: &mut Session, path: &Path, out: &mut dyn Write) {
    if !path.is_file() {
        return;
    }
    if let Err(e) = session.execute_file(path, out) {
        tracing::warn!("tsh: Warning: {:#}", e);
    }
}

/// The prompt shown before each line.
pub fn prompt(session: &Session) -> String {
    format!("{} tsh> ", session.current_dir().display())
}

/// Prompt for lines and execute them until `exit` or end of input.
///
/// Each accepted line is recorded in the history before it runs, so a command
/// that brings the process down is still remembered.
pub fn run_interactive<E: LineEditor>(
    session: &mut Session,
    editor: &mut E,
    startup_script: Option<&Path>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    if let Some(path) = startup_script {
        run_startup_script(session, path, out);
    }

    loop {
        let vocab = session.completions();
        let line = match editor.read_line(&prompt(session), vocab)? {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Interrupted => continue,
            ReadOutcome::Eof => {
                writeln!(out, "exit")?;
                break;
            }
        };
        if line.trim() == "exit" {
            break;
        }
        if !line.trim().is_empty() {
            if let Err(e) = editor.record(&line) {
                tracing::warn!("tsh: Warning: could not save history: {:#}", e);
            }
        }
        if let Err(e) = session.execute(&line, out) {
            tracing::warn!("tsh: {}", e);
        }
        out.flush()?;
    }
    Ok(())
}
