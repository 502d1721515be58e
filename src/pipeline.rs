//! The fixed prompt pipeline: refine → validate → identify gaps → analyze → generate.

use std::sync::Arc;

use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::clients::LanguageModel;
use crate::error::{Result, SavantError};
use crate::signatures::{
    GAP_IDENTIFICATION, PROBLEM_ANALYSIS, PROBLEM_REFINEMENT, PROBLEM_VALIDATION,
    PROGRAM_GENERATION, Predictor,
};

/// What the pipeline produced for one problem description
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The description has gaps the user can fill
    NeedsMoreInfo {
        questions: Vec<String>,
        gaps: Vec<String>,
    },
    /// Raw program components as returned by the generation step
    Program {
        problem_description: String,
        validation_reason: String,
        analysis: String,
        program_components: String,
    },
}

/// Solves optimization problems with interactive gap filling
#[derive(Clone)]
pub struct InteractiveProblemSolver {
    model: Arc<dyn LanguageModel>,
}

impl InteractiveProblemSolver {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn forward(
        &self,
        problem_description: &str,
        additional_info: Option<&str>,
    ) -> Result<PipelineOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id, model = self.model.model_name());
        self.run(problem_description, additional_info)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        problem_description: &str,
        additional_info: Option<&str>,
    ) -> Result<PipelineOutcome> {
        let model = self.model.as_ref();
        let mut problem = problem_description.to_string();

        if let Some(info) = additional_info.map(str::trim).filter(|s| !s.is_empty()) {
            debug!("refining problem with additional information");
            let refinement = Predictor::new(&PROBLEM_REFINEMENT, model)
                .call(&[("original_problem", problem.as_str()), ("additional_info", info)])
                .await?;
            problem = refinement.get("refined_problem")?.to_string();
        }

        let validation = Predictor::new(&PROBLEM_VALIDATION, model)
            .call(&[("problem_description", problem.as_str())])
            .await?;

        if !validation.flag("is_valid")? {
            let gap_check = Predictor::new(&GAP_IDENTIFICATION, model)
                .call(&[("problem_description", problem.as_str())])
                .await?;

            if gap_check.flag("has_gaps")? {
                let questions = gap_check.list("questions")?;
                info!(questions = questions.len(), "problem needs more information");
                return Ok(PipelineOutcome::NeedsMoreInfo {
                    questions,
                    gaps: gap_check.list("gaps")?,
                });
            }

            return Err(SavantError::ProblemRejected {
                reason: validation.get("reason")?.to_string(),
            });
        }

        let analysis = Predictor::new(&PROBLEM_ANALYSIS, model)
            .call(&[("problem_description", problem.as_str())])
            .await?;
        let analysis_text = analysis.get("analysis")?.to_string();

        let program = Predictor::new(&PROGRAM_GENERATION, model)
            .call(&[("analysis", analysis_text.as_str())])
            .await?;

        info!("program components generated");
        Ok(PipelineOutcome::Program {
            problem_description: problem,
            validation_reason: validation.get("reason")?.to_string(),
            analysis: analysis_text,
            program_components: program.get("program_components")?.to_string(),
        })
    }
}
