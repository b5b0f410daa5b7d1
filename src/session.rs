use crate::alias::AliasTable;
use crate::builtin::{Builtin, BuiltinContext};
use crate::completion::Vocabulary;
use crate::config::Policy;
use crate::env::Environment;
use crate::error::BuiltinError;
use crate::external::{ExitCode, Spawner, SystemSpawner};
use crate::split::split_line;
use anyhow::Context;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// How many times an alias may expand into another alias before the line is
/// rejected as a loop.
pub const MAX_ALIAS_DEPTH: usize = 16;

/// What happened to one line.
#[derive(Debug)]
pub enum Outcome {
    /// Blank or comment line; nothing ran.
    Empty,
    /// A builtin ran. Failures have already been reported to the user.
    Builtin {
        builtin: Builtin,
        result: Result<(), BuiltinError>,
    },
    /// An allow-listed program was launched directly.
    External {
        program: String,
        status: io::Result<ExitCode>,
    },
    /// The line was handed to the host shell.
    Subshell { status: io::Result<ExitCode> },
    /// No tier accepted the command.
    Denied { command: String },
    /// Alias expansion did not terminate.
    AliasLoop { name: String },
}

impl Outcome {
    /// Whether the line reached any dispatch tier at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }
}

/// One interpreter instance: its environment, aliases and policy.
///
/// All input, interactive or scripted, goes through [`Session::execute`].
pub struct Session {
    env: Environment,
    aliases: AliasTable,
    policy: Policy,
    spawner: Box<dyn Spawner>,
}

impl Session {
    /// Session over the current process environment that launches real
    /// processes.
    pub fn new(policy: Policy) -> Self {
        Self::with_spawner(policy, Environment::new(), Box::new(SystemSpawner))
    }

    pub fn with_spawner(policy: Policy, env: Environment, spawner: Box<dyn Spawner>) -> Self {
        Self {
            env,
            aliases: AliasTable::new(),
            policy,
            spawner,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn current_dir(&self) -> &Path {
        &self.env.current_dir
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Builtins (with `exit`), allow-listed programs and aliases.
    pub fn commands(&self) -> Vocabulary {
        Vocabulary::commands(&self.policy, &self.aliases)
    }

    /// Everything offered for completion at the next prompt: [`Self::commands`]
    /// plus the entries of the current directory.
    pub fn completions(&self) -> Vocabulary {
        let mut vocab = self.commands();
        vocab.add_dir_entries(&self.env.current_dir);
        vocab
    }

    /// Resolve aliases in `line` and dispatch it.
    ///
    /// An alias whose expansion starts with its own name is expanded once and
    /// dispatched directly; any other alias is expanded and resolved again, up
    /// to [`MAX_ALIAS_DEPTH`] times.
    pub fn execute(&mut self, line: &str, out: &mut dyn Write) -> io::Result<Outcome> {
        self.execute_at(line, 0, out)
    }

    fn execute_at(&mut self, line: &str, depth: usize, out: &mut dyn Write) -> io::Result<Outcome> {
        let (cmd, args) = split_line(line);
        if cmd.is_empty() {
            return Ok(Outcome::Empty);
        }
        let Some(expansion) = self.aliases.get(cmd) else {
            return self.raw_dispatch(line, out);
        };
        let refers_to_itself = split_line(expansion).0 == cmd;
        let new_line = format!("{} {}", expansion, args);
        tracing::debug!("tsh: alias `{}' expands to `{}'", cmd, new_line.trim_end());

        if refers_to_itself {
            return self.raw_dispatch(&new_line, out);
        }
        if depth >= MAX_ALIAS_DEPTH {
            writeln!(out, "tsh: alias loop detected at `{}'.", cmd)?;
            return Ok(Outcome::AliasLoop {
                name: cmd.to_string(),
            });
        }
        self.execute_at(&new_line, depth + 1, out)
    }

    /// Dispatch a line whose aliases are already resolved.
    ///
    /// Tiers are tried in order: builtin, allow-listed program, host shell
    /// (only if the policy allows it), denial.
    pub fn raw_dispatch(&mut self, line: &str, out: &mut dyn Write) -> io::Result<Outcome> {
        let line = line.trim();
        let (cmd, args) = split_line(line);
        if cmd.is_empty() {
            return Ok(Outcome::Empty);
        }

        if let Some(builtin) = Builtin::lookup(cmd) {
            tracing::debug!("tsh: executing: {} (shell builtin)", line);
            let mut ctx = BuiltinContext {
                env: &mut self.env,
                aliases: &mut self.aliases,
                policy: &self.policy,
            };
            let result = builtin.run(args, out, &mut ctx);
            if let Err(e) = &result {
                if e.is_user_facing() {
                    writeln!(out, "tsh: {}", e)?;
                } else {
                    tracing::debug!("tsh: {} failed: {}", builtin.name(), e);
                    writeln!(out, "tsh: Error in line `{}'.", line)?;
                }
            }
            return Ok(Outcome::Builtin { builtin, result });
        }

        if self.policy.is_allowed(cmd) {
            tracing::debug!("tsh: executing: {} (spawn)", line);
            let argv: Vec<&str> = line.split_whitespace().skip(1).collect();
            let status = self.spawner.spawn(cmd, &argv, &self.env);
            if let Err(e) = &status {
                writeln!(out, "tsh: {}: {}", cmd, e)?;
            }
            return Ok(Outcome::External {
                program: cmd.to_string(),
                status,
            });
        }

        if self.policy.allow_subshell() {
            tracing::debug!("tsh: executing: {} (on subshell)", line);
            let status = self.spawner.run_shell(line, &self.env);
            if let Err(e) = &status {
                writeln!(out, "tsh: subshell: {}", e)?;
            }
            return Ok(Outcome::Subshell { status });
        }

        tracing::debug!("tsh: denied: {}", line);
        writeln!(out, "tsh: `{}' Permission denied.", line)?;
        Ok(Outcome::Denied {
            command: cmd.to_string(),
        })
    }

    /// Execute every line of `reader`. Returns how many lines reached dispatch.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD, so one bad line
    /// does not stop the rest of the script.
    pub fn execute_reader(
        &mut self,
        mut reader: impl BufRead,
        out: &mut dyn Write,
    ) -> anyhow::Result<usize> {
        let mut dispatched = 0;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let raw = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            let line = String::from_utf8_lossy(raw);
            if !self.execute(&line, out)?.is_empty() {
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    /// Execute a script file line by line through [`Session::execute`].
    pub fn execute_file(&mut self, path: &Path, out: &mut dyn Write) -> anyhow::Result<usize> {
        tracing::info!("tsh: executing file `{}'", path.display());
        let file = File::open(path)
            .with_context(|| format!("Could not open `{}' for reading.", path.display()))?;
        self.execute_reader(BufReader::new(file), out)
    }
}
