//! A restricted, policy-gated command interpreter.
//!
//! Every line goes through the same path: it is split into a command name and
//! an argument string, aliases are resolved, and the result is dispatched to
//! one of three trust tiers, tried in a fixed order:
//!
//! 1. a builtin implemented in Rust (see [`builtin`]),
//! 2. an allow-listed external program spawned directly, without any shell
//!    interpretation of its arguments,
//! 3. the host shell, only when the [`Policy`] enables the subshell escape.
//!
//! Anything else is denied. The main entry point is [`Session`]; the
//! interactive front end lives in [`repl`].

pub mod alias;
pub mod builtin;
pub mod completion;
pub mod config;
pub mod env;
pub mod error;
pub mod external;
pub mod repl;
pub mod selftest;
pub mod session;
pub mod split;

#[cfg(test)]
mod testing;

pub use config::{Config, Policy};
pub use session::{Outcome, Session};
pub use split::split_line;

/// Version string reported by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
