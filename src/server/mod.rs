//! Server module containing the SavantServer implementation

use std::sync::Arc;

use crate::clients::create_model;
use crate::config::Config;
use crate::error::Result;
use crate::service::{ProblemSolver, Solve};
use crate::solver::ClingoSolver;

// Submodules
pub mod router;

/// MCP server exposing the optimization solver as tools
#[derive(Clone)]
pub struct SavantServer {
    pub solver: Arc<dyn Solve>,
    pub config: Arc<Config>,
}

impl SavantServer {
    /// Build the production stack: configured language model plus clingo
    pub fn new(config: Config) -> Result<Self> {
        let model = create_model(&config)?;
        let clingo = ClingoSolver::new(&config.solver);
        if !clingo.check_available() {
            tracing::warn!(
                "clingo not found at '{}'; solving will fail until it is installed",
                config.solver.clingo_path
            );
        }
        let solver = ProblemSolver::new(model, Arc::new(clingo));
        Ok(Self::with_solver(config, Arc::new(solver)))
    }

    pub fn with_solver(config: Config, solver: Arc<dyn Solve>) -> Self {
        Self {
            solver,
            config: Arc::new(config),
        }
    }
}
