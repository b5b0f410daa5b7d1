//! Checks run by `tsh --test` against a scratch session that never launches
//! real processes.

use crate::builtin::Builtin;
use crate::config::Policy;
use crate::env::Environment;
use crate::external::{RecordingSpawner, SpawnRecord};
use crate::session::{Outcome, Session};
use crate::split::split_line;
use anyhow::{ensure, Result};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

type Check = fn() -> Result<()>;

const CHECKS: &[(&str, Check)] = &[
    ("split", check_split),
    ("alias round trip", check_alias_round_trip),
    ("self alias", check_self_alias),
    ("builtin priority", check_builtin_priority),
    ("denial", check_denial),
    ("alias loop", check_alias_loop),
    ("failure isolation", check_failure_isolation),
];

/// Run every check, reporting failures to `out`. Returns whether all passed.
pub fn run(out: &mut dyn Write) -> Result<bool> {
    writeln!(out, "tsh: Performing tests ...")?;
    let mut failed = 0;
    for (name, check) in CHECKS {
        if let Err(e) = check() {
            failed += 1;
            writeln!(out, "tsh: test `{}' failed: {}", name, e)?;
        }
    }
    writeln!(
        out,
        "tsh: {} passed, {} failed",
        CHECKS.len() - failed,
        failed
    )?;
    Ok(failed == 0)
}

fn scratch(policy: Policy) -> (Session, Rc<RefCell<Vec<SpawnRecord>>>) {
    let (spawner, records) = RecordingSpawner::with_handle();
    let env = Environment::empty(std::env::temp_dir());
    (Session::with_spawner(policy, env, Box::new(spawner)), records)
}

fn exec(session: &mut Session, line: &str) -> Result<(Outcome, String)> {
    let mut out = Vec::new();
    let outcome = session.execute(line, &mut out)?;
    Ok((outcome, String::from_utf8(out)?))
}

fn check_split() -> Result<()> {
    ensure!(split_line(" ls  -l /usr ") == ("ls", "-l /usr"));
    ensure!(split_line(" ls  ") == ("ls", ""));
    ensure!(split_line("  # comment") == ("", ""));
    Ok(())
}

fn check_alias_round_trip() -> Result<()> {
    let (mut sh, _) = scratch(Policy::builtins_only());
    exec(&mut sh, "alias ls='ls -l'")?;
    let (_, listing) = exec(&mut sh, "alias")?;
    ensure!(listing == "alias ls='ls -l'\n", "listing was {:?}", listing);
    exec(&mut sh, "unalias ls")?;
    ensure!(sh.aliases().is_empty(), "alias survived unalias");
    Ok(())
}

fn check_self_alias() -> Result<()> {
    let (mut sh, records) = scratch(Policy::new(["ls"], false));
    exec(&mut sh, "alias ls='ls -l'")?;
    exec(&mut sh, "ls")?;
    let expected = vec![SpawnRecord::Direct {
        program: "ls".into(),
        args: vec!["-l".into()],
    }];
    ensure!(*records.borrow() == expected, "got {:?}", records.borrow());
    Ok(())
}

fn check_builtin_priority() -> Result<()> {
    let (mut sh, records) = scratch(Policy::new(["pwd"], true));
    let (outcome, _) = exec(&mut sh, "pwd")?;
    ensure!(
        matches!(
            outcome,
            Outcome::Builtin {
                builtin: Builtin::Pwd,
                ..
            }
        ),
        "got {:?}",
        outcome
    );
    ensure!(records.borrow().is_empty(), "a process was spawned");
    Ok(())
}

fn check_denial() -> Result<()> {
    let (mut sh, records) = scratch(Policy::builtins_only());
    let (outcome, out) = exec(&mut sh, "rm -rf /")?;
    ensure!(matches!(outcome, Outcome::Denied { .. }), "got {:?}", outcome);
    ensure!(out.contains("Permission denied"), "output was {:?}", out);
    ensure!(records.borrow().is_empty(), "a process was spawned");
    Ok(())
}

fn check_alias_loop() -> Result<()> {
    let (mut sh, records) = scratch(Policy::new(["a"], true));
    exec(&mut sh, "alias a='b'")?;
    exec(&mut sh, "alias b='a'")?;
    let (outcome, _) = exec(&mut sh, "a")?;
    ensure!(
        matches!(outcome, Outcome::AliasLoop { .. }),
        "got {:?}",
        outcome
    );
    ensure!(records.borrow().is_empty(), "a process was spawned");
    Ok(())
}

fn check_failure_isolation() -> Result<()> {
    let (mut sh, _) = scratch(Policy::builtins_only());
    let (_, out) = exec(&mut sh, "unalias missing")?;
    ensure!(out.starts_with("tsh: Error in line"), "output was {:?}", out);
    let (outcome, _) = exec(&mut sh, "alias x='pwd'")?;
    ensure!(
        matches!(outcome, Outcome::Builtin { result: Ok(()), .. }),
        "got {:?}",
        outcome
    );
    Ok(())
}
