//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use savant::clients::ScriptedModel;
use savant::error::{Result, SavantError};
use savant::service::{Solve, SolveResponse};
use savant::solver::{AspSolver, Model, SolveOutcome, SolveStatus};

/// A model reply with one section per output field
pub fn reply(fields: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (name, value) in fields {
        out.push_str(&format!("[[ ## {} ## ]]\n{}\n\n", name, value));
    }
    out.push_str("[[ ## completed ## ]]");
    out
}

pub fn valid(reason: &str) -> String {
    reply(&[("is_valid", "True"), ("reason", reason)])
}

pub fn invalid(reason: &str) -> String {
    reply(&[("is_valid", "False"), ("reason", reason)])
}

pub fn gaps(has_gaps: bool, questions: &[&str]) -> String {
    let flag = if has_gaps { "True" } else { "False" };
    let list = serde_json::to_string(questions).unwrap();
    reply(&[("has_gaps", flag), ("gaps", &list), ("questions", &list)])
}

pub fn analysis(text: &str) -> String {
    reply(&[("analysis", text)])
}

pub fn components(json: &str) -> String {
    reply(&[("program_components", json)])
}

pub fn refined(text: &str) -> String {
    reply(&[("refined_problem", text)])
}

pub const KNAPSACK: &str = r##"{
  "predicates": [
    {"name": "Item", "fields": {"name": "ConstantField", "weight": "IntegerField", "value": "IntegerField"}},
    {"name": "Capacity", "fields": {"limit": "IntegerField"}},
    {"name": "Selected", "fields": {"name": "ConstantField"}}
  ],
  "facts": ["item(a,3,4)", "item(b,4,5)", "item(c,2,3)", "capacity(5)"],
  "constraints": [
    "{ selected(I) } :- item(I,_,_).",
    ":- capacity(C), #sum { W,I : selected(I), item(I,W,_) } > C."
  ],
  "optimize": "#maximize { V,I : selected(I), item(I,_,V) }."
}"##;

/// Scripted replies for a problem that goes straight through the pipeline
pub fn happy_path(components_json: &str) -> ScriptedModel {
    ScriptedModel::new([
        valid("A small knapsack instance."),
        analysis("Items with weights and values, one capacity, maximize value."),
        components(components_json),
    ])
}

/// Records programs and answers with a fixed outcome
pub struct FakeSolver {
    pub outcome: std::result::Result<SolveOutcome, String>,
    pub programs: Mutex<Vec<String>>,
}

impl FakeSolver {
    pub fn returning(outcome: SolveOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(outcome),
            programs: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(message.to_string()),
            programs: Mutex::new(Vec::new()),
        })
    }

    pub fn programs(&self) -> Vec<String> {
        self.programs.lock().unwrap().clone()
    }
}

#[async_trait]
impl AspSolver for FakeSolver {
    async fn solve(&self, program: &str) -> Result<SolveOutcome> {
        self.programs.lock().unwrap().push(program.to_string());
        self.outcome.clone().map_err(|message| SavantError::Solver { message })
    }
}

pub fn optimum(atoms: &[&str], cost: i64) -> SolveOutcome {
    SolveOutcome {
        status: SolveStatus::OptimumFound,
        model: Some(Model {
            atoms: atoms.iter().map(|s| s.to_string()).collect(),
            costs: vec![cost],
        }),
        models_found: 2,
        optimal: true,
    }
}

/// Front-end double: hands out queued responses and records the calls
pub struct QueuedSolve {
    responses: Mutex<Vec<SolveResponse>>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl QueuedSolve {
    pub fn new(mut responses: Vec<SolveResponse>) -> Arc<Self> {
        responses.reverse();
        Arc::new(Self {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Solve for QueuedSolve {
    async fn solve(&self, problem_description: &str, additional_info: &str) -> SolveResponse {
        self.calls
            .lock()
            .unwrap()
            .push((problem_description.to_string(), additional_info.to_string()));
        self.responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(SolveResponse::Failed {
                error: "no response queued".into(),
            })
    }
}

pub fn needs(questions: &[&str]) -> SolveResponse {
    SolveResponse::NeedsMoreInfo {
        questions: questions.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn solved(solution: &str) -> SolveResponse {
    SolveResponse::Solved {
        solution: solution.to_string(),
        program: "#show.\n".to_string(),
    }
}
