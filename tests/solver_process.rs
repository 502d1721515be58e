//! Subprocess handling of `ClingoSolver`, driven by shell scripts standing in for clingo.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use savant::config::SolverConfig;
use savant::error::SavantError;
use savant::solver::{AspSolver, ClingoSolver, SolveStatus};
use tempfile::TempDir;

// Serializes script creation and spawning; exec of a file another thread's
// fork still holds open for writing fails with ETXTBSY.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

fn fake_clingo(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("clingo");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn solver(path: &Path, timeout_ms: u64) -> ClingoSolver {
    ClingoSolver::new(&SolverConfig {
        clingo_path: path.to_string_lossy().into_owned(),
        timeout_ms,
        extra_args: Vec::new(),
    })
}

#[tokio::test]
async fn program_reaches_stdin_and_json_is_decoded() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.lp");
    let script = fake_clingo(
        dir.path(),
        &format!(
            r#"cat > "{}"
printf '%s\n' '{{"Result": "SATISFIABLE", "Call": [{{"Witnesses": [{{"Value": ["b", "a"]}}]}}], "Models": {{"Number": 1, "More": "no"}}}}'
exit 10"#,
            input.display()
        ),
    );

    let outcome = solver(&script, 5_000).solve("a.\nb.\n#show.\n").await.unwrap();
    assert_eq!(outcome.status, SolveStatus::Satisfiable);
    assert_eq!(outcome.render(), "a\nb");
    assert_eq!(std::fs::read_to_string(&input).unwrap(), "a.\nb.\n#show.\n");
}

#[tokio::test]
async fn error_exit_reports_code_and_stderr() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let script = fake_clingo(
        dir.path(),
        "echo '*** ERROR: (clingo): unknown option' >&2\nexit 65",
    );
    let solver = solver(&script, 5_000);

    // The script never reads its input, small or large
    for program in ["a.".to_string(), "a.\n".repeat(200_000)] {
        let err = solver.solve(&program).await.unwrap_err();
        match &err {
            SavantError::Solver { message } => {
                assert!(message.contains("65"), "{}", message);
                assert!(message.contains("unknown option"), "{}", message);
            }
            other => panic!("expected solver error, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn out_of_memory_exit_is_a_failure() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let script = fake_clingo(dir.path(), "cat > /dev/null\nexit 33");

    let err = solver(&script, 5_000).solve("a.").await.unwrap_err();
    assert!(matches!(err, SavantError::Solver { .. }));
    assert!(err.to_string().contains("no diagnostics"), "{}", err);
}

#[tokio::test]
async fn killed_by_signal_is_a_failure() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let script = fake_clingo(dir.path(), "cat > /dev/null\nkill -9 $$");

    let err = solver(&script, 5_000).solve("a.").await.unwrap_err();
    match err {
        SavantError::Solver { message } => assert!(message.contains("signal"), "{}", message),
        other => panic!("expected solver error, got {:?}", other),
    }
}

#[tokio::test]
async fn hung_solver_times_out() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let script = fake_clingo(dir.path(), "exec sleep 30");

    let started = Instant::now();
    let err = solver(&script, 100).solve("a.").await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(10));
    match err {
        SavantError::Timeout {
            operation,
            timeout_ms,
        } => {
            assert_eq!(operation, "clingo");
            assert_eq!(timeout_ms, 2_100);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}
