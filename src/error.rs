use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a builtin handler.
///
/// Usage and missing-directory failures are shown to the user as they are;
/// every other kind is reported as a generic error for the whole line. The
/// variant itself is kept in the dispatch outcome.
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("cd: `{0}' No such directory")]
    NoSuchDirectory(String),

    #[error("could not determine the current user")]
    UnknownUser,

    #[error("unalias: `{0}' not found")]
    NoSuchAlias(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BuiltinError {
    /// Whether the message is meant for the user rather than collapsed into
    /// the generic per-line error.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Usage(_) | Self::NoSuchDirectory(_))
    }
}

/// Failure to load the policy file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not open `{path}' for reading: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config `{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("history_size must be greater than zero")]
    ZeroHistory,
}
