//! End-to-end problem solving: pipeline → components → program → solver → solution.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::clients::LanguageModel;
use crate::error::{Result, SavantError};
use crate::pipeline::{InteractiveProblemSolver, PipelineOutcome};
use crate::program::{ProgramComponents, build_solver_input};
use crate::solver::AspSolver;

/// Result of parsing a problem description into program components
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    NeedsMoreInfo(Vec<String>),
    Parsed(ProgramComponents),
}

/// What front ends show the user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolveResponse {
    NeedsMoreInfo { questions: Vec<String> },
    Solved { solution: String, program: String },
    Failed { error: String },
}

impl SolveResponse {
    pub fn needs_more_info(&self) -> bool {
        matches!(self, SolveResponse::NeedsMoreInfo { .. })
    }

    pub fn questions(&self) -> &[String] {
        match self {
            SolveResponse::NeedsMoreInfo { questions } => questions,
            _ => &[],
        }
    }

    pub fn solution(&self) -> Option<&str> {
        match self {
            SolveResponse::Solved { solution, .. } => Some(solution),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SolveResponse::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Anything that can turn a problem description into a response
#[async_trait]
pub trait Solve: Send + Sync {
    async fn solve(&self, problem_description: &str, additional_info: &str) -> SolveResponse;
}

#[derive(Clone)]
pub struct ProblemSolver {
    pipeline: InteractiveProblemSolver,
    solver: Arc<dyn AspSolver>,
}

impl ProblemSolver {
    pub fn new(model: Arc<dyn LanguageModel>, solver: Arc<dyn AspSolver>) -> Self {
        Self {
            pipeline: InteractiveProblemSolver::new(model),
            solver,
        }
    }

    /// Validate and parse the optimization problem with the prompt pipeline
    pub async fn validate_and_parse_problem(
        &self,
        description: &str,
        additional_info: Option<&str>,
    ) -> Result<ParseOutcome> {
        match self.pipeline.forward(description, additional_info).await {
            Ok(PipelineOutcome::NeedsMoreInfo { questions, .. }) => {
                Ok(ParseOutcome::NeedsMoreInfo(questions))
            }
            Ok(PipelineOutcome::Program {
                program_components, ..
            }) => Ok(ParseOutcome::Parsed(ProgramComponents::from_llm_output(
                &program_components,
            )?)),
            Err(e @ SavantError::ProblemRejected { .. }) => Err(e),
            Err(e) => Err(SavantError::Pipeline {
                message: format!("Error in prompt pipeline: {}", e),
            }),
        }
    }

    /// Solve an optimization problem given its description. Never fails; errors become `Failed`.
    pub async fn solve_optimization_problem(
        &self,
        problem_description: &str,
        additional_info: Option<&str>,
    ) -> SolveResponse {
        let components = match self
            .validate_and_parse_problem(problem_description, additional_info)
            .await
        {
            Ok(ParseOutcome::NeedsMoreInfo(questions)) => {
                return SolveResponse::NeedsMoreInfo { questions };
            }
            Ok(ParseOutcome::Parsed(components)) => components,
            Err(e) => {
                error!("problem parsing failed: {}", e);
                return SolveResponse::Failed {
                    error: e.to_string(),
                };
            }
        };

        match self.run_solver(&components).await {
            Ok((solution, program)) => SolveResponse::Solved { solution, program },
            Err(e) => {
                error!("solving failed: {}", e);
                SolveResponse::Failed {
                    error: format!("Error solving optimization problem: {}", e),
                }
            }
        }
    }

    async fn run_solver(&self, components: &ProgramComponents) -> Result<(String, String)> {
        let (unifier, program) = build_solver_input(components)?;
        debug!(predicates = ?unifier.describe(), "declared predicates");
        info!(
            predicates = unifier.predicates().len(),
            facts = components.facts.len(),
            "solving assembled program"
        );
        let outcome = self.solver.solve(&program).await?;
        Ok((outcome.render(), program))
    }
}

#[async_trait]
impl Solve for ProblemSolver {
    async fn solve(&self, problem_description: &str, additional_info: &str) -> SolveResponse {
        let info = Some(additional_info).filter(|s| !s.trim().is_empty());
        self.solve_optimization_problem(problem_description, info)
            .await
    }
}
