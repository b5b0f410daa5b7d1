use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Default location of the policy file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/tsh.toml";

/// Default number of lines kept in the history file.
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Which commands outside the builtins a session may run.
///
/// Built once at startup and never mutated; the session owns its copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    allowed_external: BTreeSet<String>,
    allow_subshell: bool,
}

impl Policy {
    pub fn new<I, S>(allowed_external: I, allow_subshell: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_external: allowed_external.into_iter().map(Into::into).collect(),
            allow_subshell,
        }
    }

    /// Policy that only lets builtins run.
    pub fn builtins_only() -> Self {
        Self::default()
    }

    pub fn is_allowed(&self, cmd: &str) -> bool {
        self.allowed_external.contains(cmd)
    }

    pub fn allow_subshell(&self) -> bool {
        self.allow_subshell
    }

    /// Allow-listed program names in sorted order.
    pub fn allowed_external(&self) -> impl Iterator<Item = &str> {
        self.allowed_external.iter().map(String::as_str)
    }
}

/// On-disk shape of the policy file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub allowed_external: Vec<String>,
    pub allow_subshell: bool,
    pub history_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allowed_external: Vec::new(),
            allow_subshell: false,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

impl Config {
    /// Parse a config from TOML text. `path` is only used for error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.history_size == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Load the config, falling back to the restrictive default on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("tsh: Warning: {}", e);
                Self::default()
            }
        }
    }

    pub fn policy(&self) -> Policy {
        Policy::new(self.allowed_external.iter().cloned(), self.allow_subshell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_config() {
        let text = r#"
            allowed_external = ["ls", "cat"]
            allow_subshell = true
            history_size = 10
        "#;
        let config = Config::parse(text, Path::new("test.toml")).unwrap();
        assert_eq!(config.history_size, 10);
        let policy = config.policy();
        assert!(policy.is_allowed("ls"));
        assert!(policy.is_allowed("cat"));
        assert!(!policy.is_allowed("rm"));
        assert!(policy.allow_subshell());
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = Config::parse("", Path::new("empty.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.policy(), Policy::builtins_only());
    }

    #[test]
    fn rejects_unknown_keys_and_zero_history() {
        assert!(matches!(
            Config::parse("allow_exec = []", Path::new("x.toml")),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            Config::parse("history_size = 0", Path::new("x.toml")),
            Err(ConfigError::ZeroHistory)
        ));
    }

    #[test]
    fn unreadable_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("missing.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "allowed_external = [\"date\"]").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.allowed_external, vec!["date".to_string()]);
        assert!(!config.allow_subshell);
    }

    #[test]
    fn allowed_external_is_sorted_and_deduplicated() {
        let policy = Policy::new(["vi", "ls", "vi"], false);
        let names: Vec<_> = policy.allowed_external().collect();
        assert_eq!(names, vec!["ls", "vi"]);
    }
}
