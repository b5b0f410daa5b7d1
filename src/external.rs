use crate::env::Environment;
use std::cell::RefCell;
use std::io;
use std::process::{Command, ExitStatus};
use std::rc::Rc;

/// Conventional process exit code: 0 for success, anything else for failure.
pub type ExitCode = i32;

/// Launches processes on behalf of the dispatcher.
///
/// The two methods are the only places where the interpreter hands control to
/// another program. [`Spawner::run_shell`] is the subshell escape: it passes
/// the line on untouched and the host shell does all interpretation.
pub trait Spawner {
    /// Run `program` directly with `args`, without any shell in between, and
    /// wait for it to finish.
    fn spawn(&mut self, program: &str, args: &[&str], env: &Environment) -> io::Result<ExitCode>;

    /// Run `line` verbatim through the host shell and wait for it to finish.
    fn run_shell(&mut self, line: &str, env: &Environment) -> io::Result<ExitCode>;
}

/// Spawner backed by real child processes with inherited stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl Spawner for SystemSpawner {
    fn spawn(&mut self, program: &str, args: &[&str], env: &Environment) -> io::Result<ExitCode> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        wait(cmd, env)
    }

    fn run_shell(&mut self, line: &str, env: &Environment) -> io::Result<ExitCode> {
        wait(shell_command(line), env)
    }
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(not(unix))]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(line);
    cmd
}

fn wait(mut cmd: Command, env: &Environment) -> io::Result<ExitCode> {
    let exit_status = cmd
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir)
        .status()?;
    match exit_status.code() {
        Some(x) => Ok(x),
        None => Ok(terminated_by_signal(exit_status)),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = exit_status.signal() {
        128 + signal
    } else if exit_status.core_dumped() {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    -1
}

/// A process launch observed by [`RecordingSpawner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpawnRecord {
    Direct { program: String, args: Vec<String> },
    Shell(String),
}

/// Spawner that records launches instead of running anything.
///
/// Used by the self-test and by unit tests to check which tier a line
/// reached without touching the host.
pub struct RecordingSpawner {
    records: Rc<RefCell<Vec<SpawnRecord>>>,
    exit_code: ExitCode,
}

impl RecordingSpawner {
    /// Create a spawner and return a handle to its records.
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<SpawnRecord>>>) {
        let records = Rc::new(RefCell::new(Vec::new()));
        let spawner = Self {
            records: records.clone(),
            exit_code: 0,
        };
        (spawner, records)
    }

    /// Exit code every recorded launch reports.
    pub fn exiting_with(mut self, exit_code: ExitCode) -> Self {
        self.exit_code = exit_code;
        self
    }
}

impl Spawner for RecordingSpawner {
    fn spawn(&mut self, program: &str, args: &[&str], _env: &Environment) -> io::Result<ExitCode> {
        self.records.borrow_mut().push(SpawnRecord::Direct {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        Ok(self.exit_code)
    }

    fn run_shell(&mut self, line: &str, _env: &Environment) -> io::Result<ExitCode> {
        self.records
            .borrow_mut()
            .push(SpawnRecord::Shell(line.to_string()));
        Ok(self.exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn spawns_program_and_reports_exit_code() {
        let env = Environment::new();
        let mut spawner = SystemSpawner;
        assert_eq!(spawner.spawn("true", &[], &env).unwrap(), 0);
        assert_eq!(spawner.spawn("false", &[], &env).unwrap(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn direct_spawn_does_not_expand_globs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        let mut env = Environment::new();
        env.current_dir = dir.path().to_path_buf();
        let mut spawner = SystemSpawner;
        // Expanded, this would compare `a.txt` with itself and fail.
        let code = spawner.spawn("test", &["*.txt", "!=", "a.txt"], &env).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    #[cfg(unix)]
    fn shell_interprets_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = Environment::new();
        env.current_dir = dir.path().to_path_buf();
        let mut spawner = SystemSpawner;
        let code = spawner.run_shell("echo hi > out.txt && exit 3", &env).unwrap();
        assert_eq!(code, 3);
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "hi\n");
    }

    #[test]
    fn missing_program_is_an_error() {
        let env = Environment::new();
        let mut spawner = SystemSpawner;
        let err = spawner
            .spawn("definitely-not-a-real-program-tsh", &[], &env)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn recording_spawner_records_launches() {
        let (mut spawner, records) = RecordingSpawner::with_handle();
        let env = Environment::empty("/");
        spawner.spawn("ls", &["-l"], &env).unwrap();
        spawner.run_shell("ls | wc", &env).unwrap();
        assert_eq!(
            *records.borrow(),
            vec![
                SpawnRecord::Direct {
                    program: "ls".into(),
                    args: vec!["-l".into()]
                },
                SpawnRecord::Shell("ls | wc".into()),
            ]
        );
    }
}
