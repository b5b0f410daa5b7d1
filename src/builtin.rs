use crate::alias::AliasTable;
use crate::completion::Vocabulary;
use crate::config::Policy;
use crate::env::Environment;
use crate::error::BuiltinError;
use argh::{EarlyExit, FromArgs};
use regex::Regex;
use std::env;
use std::fs;
use std::io::Write;
use std::sync::LazyLock;

/// Session state a builtin may read or change.
pub struct BuiltinContext<'a> {
    pub env: &'a mut Environment,
    pub aliases: &'a mut AliasTable,
    pub policy: &'a Policy,
}

/// Every command implemented inside the interpreter.
///
/// Lookup is a plain `match` on the name, so the set is fixed at compile time
/// and a builtin always wins over an external program of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Builtin {
    Alias,
    Cd,
    Commands,
    Dt,
    Pwd,
    Unalias,
    Whoami,
}

impl Builtin {
    pub const ALL: [Builtin; 7] = [
        Builtin::Alias,
        Builtin::Cd,
        Builtin::Commands,
        Builtin::Dt,
        Builtin::Pwd,
        Builtin::Unalias,
        Builtin::Whoami,
    ];

    /// Extra names a builtin answers to.
    pub const SYNONYMS: [(&'static str, Builtin); 1] = [("ud", Builtin::Whoami)];

    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "alias" => Some(Builtin::Alias),
            "cd" => Some(Builtin::Cd),
            "commands" => Some(Builtin::Commands),
            "dt" => Some(Builtin::Dt),
            "pwd" => Some(Builtin::Pwd),
            "unalias" => Some(Builtin::Unalias),
            "whoami" => Some(Builtin::Whoami),
            _ => Self::SYNONYMS
                .iter()
                .find(|(synonym, _)| *synonym == name)
                .map(|&(_, builtin)| builtin),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Alias => "alias",
            Builtin::Cd => "cd",
            Builtin::Commands => "commands",
            Builtin::Dt => "dt",
            Builtin::Pwd => "pwd",
            Builtin::Unalias => "unalias",
            Builtin::Whoami => "whoami",
        }
    }

    pub fn usage(self) -> &'static str {
        match self {
            Builtin::Alias => "alias [name='value']",
            Builtin::Cd => "cd [path]",
            Builtin::Commands => "commands",
            Builtin::Dt => "dt",
            Builtin::Pwd => "pwd",
            Builtin::Unalias => "unalias name",
            Builtin::Whoami => "whoami",
        }
    }

    /// Run the builtin with its trimmed argument string.
    pub fn run(
        self,
        args: &str,
        out: &mut dyn Write,
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<(), BuiltinError> {
        match self {
            Builtin::Alias => alias(args, out, ctx.aliases),
            Builtin::Unalias => unalias(args, ctx.aliases),
            Builtin::Cd => cd(args, ctx),
            Builtin::Commands => parse_and_run::<Commands>(args, out, ctx),
            Builtin::Dt => parse_and_run::<Dt>(args, out, ctx),
            Builtin::Pwd => parse_and_run::<Pwd>(args, out, ctx),
            Builtin::Whoami => parse_and_run::<Whoami>(args, out, ctx),
        }
    }
}

/// Builtins whose arguments are parsed with [`argh`].
trait BuiltinCommand: Sized + FromArgs {
    const BUILTIN: Builtin;

    fn execute(
        self,
        out: &mut dyn Write,
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<(), BuiltinError>;
}

fn parse_and_run<T: BuiltinCommand>(
    args: &str,
    out: &mut dyn Write,
    ctx: &mut BuiltinContext<'_>,
) -> Result<(), BuiltinError> {
    let argv: Vec<&str> = args.split_whitespace().collect();
    match T::from_args(&[T::BUILTIN.name()], &argv) {
        Ok(cmd) => cmd.execute(out, ctx),
        // `--help` and friends: argh already rendered the text.
        Err(EarlyExit {
            output,
            status: Ok(()),
        }) => {
            out.write_all(output.as_bytes())?;
            Ok(())
        }
        Err(EarlyExit { status: Err(()), .. }) => Err(BuiltinError::Usage(T::BUILTIN.usage())),
    }
}

static ALIAS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\S+)='([^']+)')?$").expect("invalid regex"));
static UNALIAS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)$").expect("invalid regex"));
static CD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)?$").expect("invalid regex"));

fn alias(args: &str, out: &mut dyn Write, aliases: &mut AliasTable) -> Result<(), BuiltinError> {
    let caps = ALIAS_PATTERN
        .captures(args)
        .ok_or(BuiltinError::Usage(Builtin::Alias.usage()))?;
    match (caps.get(1), caps.get(2)) {
        (Some(name), Some(value)) => {
            aliases.insert(name.as_str(), value.as_str());
            tracing::debug!("tsh: alias {} -> {}", name.as_str(), value.as_str());
        }
        _ => {
            for (name, value) in aliases.iter() {
                writeln!(out, "alias {}='{}'", name, value)?;
            }
        }
    }
    Ok(())
}

fn unalias(args: &str, aliases: &mut AliasTable) -> Result<(), BuiltinError> {
    let name = UNALIAS_PATTERN
        .captures(args)
        .and_then(|caps| caps.get(1))
        .ok_or(BuiltinError::Usage(Builtin::Unalias.usage()))?
        .as_str();
    aliases
        .remove(name)
        .map(|_| ())
        .ok_or_else(|| BuiltinError::NoSuchAlias(name.to_string()))
}

/// Change the working directory. Defaults to the home directory; `~`
/// expands to it.
///
/// The path is taken as a single token, so names such as `help` or `-x` are
/// directories like any other.
fn cd(args: &str, ctx: &mut BuiltinContext<'_>) -> Result<(), BuiltinError> {
    let caps = CD_PATTERN
        .captures(args)
        .ok_or(BuiltinError::Usage(Builtin::Cd.usage()))?;
    let shown = caps.get(1).map_or("~", |m| m.as_str()).to_string();
    let not_found = || BuiltinError::NoSuchDirectory(shown.clone());

    let target = ctx.env.expand_tilde(&shown).ok_or_else(not_found)?;
    let new_dir = ctx.env.resolve(&target);
    let canonical = fs::canonicalize(&new_dir).map_err(|_| not_found())?;
    if !canonical.is_dir() {
        return Err(not_found());
    }
    env::set_current_dir(&canonical).map_err(|_| not_found())?;
    tracing::debug!("tsh: cd {}", canonical.display());
    ctx.env.current_dir = canonical;
    Ok(())
}

#[derive(FromArgs)]
/// Print the current working directory.
struct Pwd {}

impl BuiltinCommand for Pwd {
    const BUILTIN: Builtin = Builtin::Pwd;

    fn execute(
        self,
        out: &mut dyn Write,
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<(), BuiltinError> {
        writeln!(out, "{}", ctx.env.current_dir.display())?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// List builtins, allowed programs and aliases.
struct Commands {}

impl BuiltinCommand for Commands {
    const BUILTIN: Builtin = Builtin::Commands;

    fn execute(
        self,
        out: &mut dyn Write,
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<(), BuiltinError> {
        let vocab = Vocabulary::commands(ctx.policy, ctx.aliases);
        for (name, provenance) in vocab.entries() {
            writeln!(out, "    {:<15} {}", name, provenance)?;
        }
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print the local date and time as YYYYMMDDhhmmss.
struct Dt {}

impl BuiltinCommand for Dt {
    const BUILTIN: Builtin = Builtin::Dt;

    fn execute(
        self,
        out: &mut dyn Write,
        _ctx: &mut BuiltinContext<'_>,
    ) -> Result<(), BuiltinError> {
        writeln!(out, "{}", chrono::Local::now().format("%Y%m%d%H%M%S"))?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// Print the name of the current user.
struct Whoami {}

impl BuiltinCommand for Whoami {
    const BUILTIN: Builtin = Builtin::Whoami;

    fn execute(
        self,
        out: &mut dyn Write,
        ctx: &mut BuiltinContext<'_>,
    ) -> Result<(), BuiltinError> {
        let user = ctx.env.user_name().ok_or(BuiltinError::UnknownUser)?;
        writeln!(out, "User = {}", user)?;
        Ok(())
    }
}
