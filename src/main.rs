use argh::FromArgs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tsh::config::{Config, DEFAULT_CONFIG_PATH};
use tsh::repl::{self, RustylineEditor};
use tsh::{selftest, Session, VERSION};

#[derive(FromArgs)]
/// Restricted shell: runs builtins, allow-listed programs and, if the policy
/// permits, lines on the host shell. Without FILE it runs interactively.
#[argh(help_triggers("-h", "--help"))]
struct Args {
    #[argh(switch, short = 't')]
    /// perform some tests and exit.
    test: bool,

    #[argh(switch, short = 'v')]
    /// be verbose (mostly for debugging).
    verbose: bool,

    #[argh(switch)]
    /// print version number and exit.
    version: bool,

    #[argh(option, short = 'c', default = "PathBuf::from(DEFAULT_CONFIG_PATH)")]
    /// policy file to read (default: /etc/tsh.toml).
    config: PathBuf,

    #[argh(positional, greedy)]
    /// script to execute instead of reading from the terminal.
    files: Vec<String>,
}

const USAGE: &str = "Usage: tsh [-h] [-t] [-v] [--version] [-c <config>] [file]";

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stdout)
        .without_time()
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();

    if args.version {
        println!("tsh: version {}", VERSION);
        return ExitCode::SUCCESS;
    }

    init_tracing(args.verbose);

    if args.test {
        return match selftest::run(&mut io::stdout()) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(e) => {
                eprintln!("tsh: {:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    if args.files.len() > 1 {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    }

    let config = Config::load_or_default(&args.config);
    let policy = config.policy();
    tracing::info!(
        "tsh: allowed_external = {:?}",
        policy.allowed_external().collect::<Vec<_>>()
    );
    tracing::info!("tsh: allow_subshell = {}", policy.allow_subshell());

    let mut session = Session::new(policy);
    let result = match args.files.first() {
        Some(file) => session
            .execute_file(Path::new(file), &mut io::stdout())
            .map(|_| ()),
        None => interactive(&mut session, config.history_size),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("{}", failure_message(&e));
            ExitCode::FAILURE
        }
    }
}

/// Only the outermost context is shown; the cause goes to the debug log.
fn failure_message(e: &anyhow::Error) -> String {
    tracing::debug!("tsh: {:#}", e);
    format!("tsh: {}", e)
}

fn interactive(session: &mut Session, history_size: usize) -> anyhow::Result<()> {
    let mut editor = RustylineEditor::new(history_size, repl::history_path(session.env()))?;
    let startup = repl::startup_script_path(session.env());
    repl::run_interactive(
        session,
        &mut editor,
        startup.as_deref(),
        &mut io::stdout(),
    )
}
