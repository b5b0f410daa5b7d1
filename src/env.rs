use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Process environment as seen by a session.
///
/// `vars` is handed to every spawned child; `current_dir` is the directory
/// commands run in. `cd` keeps `current_dir` and the process working
/// directory in sync.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variables visible to executed commands (e.g. PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The working directory for command execution.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process variables and working directory.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Environment with no variables, rooted at `current_dir`.
    pub fn empty(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: current_dir.into(),
        }
    }

    /// Get the value of a variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override a variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// The user's home directory: `$HOME` if set, otherwise the platform default.
    pub fn home_dir(&self) -> Option<PathBuf> {
        match self.get_var("HOME") {
            Some(home) if !home.is_empty() => Some(PathBuf::from(home)),
            _ => dirs::home_dir(),
        }
    }

    /// Expand a leading `~` or `~/` to the home directory.
    pub fn expand_tilde(&self, path: &str) -> Option<PathBuf> {
        if path == "~" {
            return self.home_dir();
        }
        match path.strip_prefix("~/") {
            Some(rest) => self.home_dir().map(|home| home.join(rest)),
            None => Some(PathBuf::from(path)),
        }
    }

    /// Resolve `path` against the current directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }

    /// Name of the user running the session.
    pub fn user_name(&self) -> Option<&str> {
        self.get_var("USER").or_else(|| self.get_var("LOGNAME"))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_var() {
        let mut env = Environment::empty("/");
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);
        env.set_var("KEY", "VALUE");
        assert_eq!(env.get_var("KEY"), Some("VALUE"));
    }

    #[test]
    fn reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    fn tilde_expands_to_home() {
        let mut env = Environment::empty("/");
        env.set_var("HOME", "/home/someone");
        assert_eq!(env.expand_tilde("~"), Some(PathBuf::from("/home/someone")));
        assert_eq!(
            env.expand_tilde("~/src"),
            Some(PathBuf::from("/home/someone/src"))
        );
        assert_eq!(env.expand_tilde("~other"), Some(PathBuf::from("~other")));
        assert_eq!(env.expand_tilde("/tmp"), Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn resolves_relative_paths_against_current_dir() {
        let env = Environment::empty("/var");
        assert_eq!(env.resolve(Path::new("log")), PathBuf::from("/var/log"));
        assert_eq!(env.resolve(Path::new("/etc")), PathBuf::from("/etc"));
    }

    #[test]
    fn user_name_falls_back_to_logname() {
        let mut env = Environment::empty("/");
        assert_eq!(env.user_name(), None);
        env.set_var("LOGNAME", "bob");
        assert_eq!(env.user_name(), Some("bob"));
        env.set_var("USER", "alice");
        assert_eq!(env.user_name(), Some("alice"));
    }
}
