//! External answer-set solver (clingo) invoked as a subprocess with JSON output.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::SolverConfig;
use crate::error::{Result, SavantError};

const STDERR_CAP_BYTES: usize = 10 * 1024;
const TIMEOUT_GRACE_MS: u64 = 2_000;

#[async_trait]
pub trait AspSolver: Send + Sync {
    async fn solve(&self, program: &str) -> Result<SolveOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Satisfiable,
    Unsatisfiable,
    OptimumFound,
    Unknown,
}

impl SolveStatus {
    fn from_clingo(result: &str) -> Self {
        match result.trim() {
            "SATISFIABLE" => Self::Satisfiable,
            "UNSATISFIABLE" => Self::Unsatisfiable,
            "OPTIMUM FOUND" => Self::OptimumFound,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Satisfiable => "SATISFIABLE",
            Self::Unsatisfiable => "UNSATISFIABLE",
            Self::OptimumFound => "OPTIMUM FOUND",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// One answer set as reported by the solver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Model {
    pub atoms: Vec<String>,
    pub costs: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Last reported model; under optimization this is the best one found
    pub model: Option<Model>,
    pub models_found: u64,
    pub optimal: bool,
}

impl SolveOutcome {
    /// Human-readable solution text
    pub fn render(&self) -> String {
        let Some(model) = &self.model else {
            return "No solution found".to_string();
        };

        let mut atoms = model.atoms.clone();
        atoms.sort();
        let mut out = if atoms.is_empty() {
            "(no atoms shown)".to_string()
        } else {
            atoms.join("\n")
        };
        if !model.costs.is_empty() {
            let costs = model
                .costs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!("\nOptimization: {}", costs));
            if self.optimal {
                out.push_str(" (optimal)");
            }
        }
        out
    }
}

#[derive(Deserialize)]
struct ClingoWitness {
    #[serde(rename = "Value", default)]
    value: Vec<String>,
    #[serde(rename = "Costs", default)]
    costs: Vec<i64>,
}

#[derive(Deserialize)]
struct ClingoCall {
    #[serde(rename = "Witnesses", default)]
    witnesses: Vec<ClingoWitness>,
}

#[derive(Deserialize)]
struct ClingoModels {
    #[serde(rename = "Number", default)]
    number: u64,
    #[serde(rename = "Optimum", default)]
    optimum: Option<String>,
}

#[derive(Deserialize)]
struct ClingoOutput {
    #[serde(rename = "Result")]
    result: String,
    #[serde(rename = "Call", default)]
    call: Vec<ClingoCall>,
    #[serde(rename = "Models", default)]
    models: Option<ClingoModels>,
}

/// Decode `clingo --outf=2` output
pub fn parse_clingo_json(stdout: &str) -> Result<SolveOutcome> {
    let output: ClingoOutput = serde_json::from_str(stdout).map_err(|e| SavantError::Solver {
        message: format!("Failed to decode clingo output: {}", e),
    })?;

    let status = SolveStatus::from_clingo(&output.result);
    let model = output
        .call
        .into_iter()
        .flat_map(|c| c.witnesses)
        .last()
        .map(|w| Model {
            atoms: w.value,
            costs: w.costs,
        });
    let (models_found, optimum) = match output.models {
        Some(m) => (m.number, m.optimum.as_deref() == Some("yes")),
        None => (u64::from(model.is_some()), false),
    };

    Ok(SolveOutcome {
        status,
        model,
        models_found,
        optimal: optimum || status == SolveStatus::OptimumFound,
    })
}

/// Clingo exit codes combine 1 (interrupted), 10 (sat), 20 (exhausted); 33 and 65+ are failures.
fn is_failure_exit(code: Option<i32>) -> bool {
    match code {
        Some(c) => c == 33 || c >= 65,
        None => true,
    }
}

fn cap_stderr(bytes: &[u8]) -> String {
    let capped = &bytes[..bytes.len().min(STDERR_CAP_BYTES)];
    String::from_utf8_lossy(capped).trim().to_string()
}

#[derive(Debug, Clone)]
pub struct ClingoSolver {
    binary: String,
    timeout: Duration,
    extra_args: Vec<String>,
}

impl ClingoSolver {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            binary: config.clingo_path.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            extra_args: config.extra_args.clone(),
        }
    }

    pub fn args(&self) -> Vec<String> {
        let secs = self.timeout.as_millis().div_ceil(1000).max(1);
        let mut args = vec!["--outf=2".to_string(), format!("--time-limit={}", secs)];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    pub fn check_available(&self) -> bool {
        std::process::Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl AspSolver for ClingoSolver {
    async fn solve(&self, program: &str) -> Result<SolveOutcome> {
        debug!(binary = %self.binary, bytes = program.len(), "starting clingo");

        let mut child = Command::new(&self.binary)
            .args(self.args())
            .kill_on_drop(true)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SavantError::Solver {
                    message: format!(
                        "clingo executable '{}' not found; install clingo or set SAVANT_CLINGO_PATH",
                        self.binary
                    ),
                },
                _ => SavantError::Solver {
                    message: format!("failed to start clingo: {}", e),
                },
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| SavantError::Solver {
            message: "clingo stdin unavailable".into(),
        })?;
        // Fed from its own task so a solver that exits early is judged by its exit status
        let input = program.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            let written = stdin.write_all(&input).await;
            drop(stdin);
            written
        });

        let limit = self.timeout + Duration::from_millis(TIMEOUT_GRACE_MS);
        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| SavantError::Timeout {
                operation: "clingo".into(),
                timeout_ms: limit.as_millis() as u64,
            })??;

        let code = output.status.code();
        let stderr = cap_stderr(&output.stderr);
        if !stderr.is_empty() {
            warn!(exit_code = ?code, "clingo stderr: {}", stderr);
        }
        if is_failure_exit(code) {
            return Err(SavantError::Solver {
                message: format!(
                    "clingo exited with {}: {}",
                    code.map_or("signal".to_string(), |c| c.to_string()),
                    if stderr.is_empty() { "no diagnostics" } else { stderr.as_str() }
                ),
            });
        }

        match writer.await {
            Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e.into()),
            Ok(Err(_)) => debug!("clingo closed stdin before reading the whole program"),
            Ok(Ok(())) => {}
            Err(e) => {
                return Err(SavantError::Internal {
                    message: format!("clingo input task failed: {}", e),
                });
            }
        }

        let outcome = parse_clingo_json(&String::from_utf8_lossy(&output.stdout))?;
        info!(
            status = %outcome.status,
            models = outcome.models_found,
            "clingo finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTIMUM: &str = r#"{
      "Solver": "clingo version 5.6.2",
      "Input": ["stdin"],
      "Call": [{"Witnesses": [
        {"Value": ["selected(t1)"], "Costs": [-5]},
        {"Value": ["selected(t3)", "selected(t1)"], "Costs": [-12]}
      ]}],
      "Result": "OPTIMUM FOUND",
      "Models": {"Number": 2, "More": "no", "Optimum": "yes", "Optimal": 1, "Costs": [-12]},
      "Calls": 1,
      "Time": {"Total": 0.002, "Solve": 0.0, "Model": 0.0, "Unsat": 0.0, "CPU": 0.002}
    }"#;

    #[test]
    fn last_witness_is_the_reported_model() {
        let outcome = parse_clingo_json(OPTIMUM).unwrap();
        assert_eq!(outcome.status, SolveStatus::OptimumFound);
        assert_eq!(outcome.models_found, 2);
        assert!(outcome.optimal);
        let model = outcome.model.as_ref().unwrap();
        assert_eq!(model.costs, vec![-12]);
        assert_eq!(
            outcome.render(),
            "selected(t1)\nselected(t3)\nOptimization: -12 (optimal)"
        );
    }

    #[test]
    fn unsatisfiable_has_no_solution() {
        let outcome = parse_clingo_json(
            r#"{"Call": [{}], "Result": "UNSATISFIABLE", "Models": {"Number": 0, "More": "no"}}"#,
        )
        .unwrap();
        assert_eq!(outcome.status, SolveStatus::Unsatisfiable);
        assert!(outcome.model.is_none());
        assert_eq!(outcome.render(), "No solution found");
    }

    #[test]
    fn satisfiable_without_shown_atoms() {
        let outcome = parse_clingo_json(
            r#"{"Call": [{"Witnesses": [{"Value": []}]}], "Result": "SATISFIABLE", "Models": {"Number": 1, "More": "yes"}}"#,
        )
        .unwrap();
        assert!(!outcome.optimal);
        assert_eq!(outcome.render(), "(no atoms shown)");
    }

    #[test]
    fn garbage_output_is_a_solver_error() {
        let err = parse_clingo_json("*** ERROR: (clingo): parsing failed").unwrap_err();
        assert!(matches!(err, SavantError::Solver { .. }));
    }

    #[test]
    fn exit_codes() {
        for ok in [0, 10, 11, 20, 30, 31] {
            assert!(!is_failure_exit(Some(ok)), "{ok}");
        }
        for bad in [33, 65, 128] {
            assert!(is_failure_exit(Some(bad)), "{bad}");
        }
        assert!(is_failure_exit(None));
    }

    #[test]
    fn args_round_time_limit_up() {
        let solver = ClingoSolver::new(&SolverConfig {
            clingo_path: "clingo".into(),
            timeout_ms: 1500,
            extra_args: vec!["--parallel-mode=2".into()],
        });
        assert_eq!(
            solver.args(),
            vec!["--outf=2", "--time-limit=2", "--parallel-mode=2"]
        );
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let solver = ClingoSolver::new(&SolverConfig {
            clingo_path: "/nonexistent/clingo-binary".into(),
            ..SolverConfig::default()
        });
        let err = solver.solve("a.").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
