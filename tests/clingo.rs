//! Runs the real solver. Enabled with `--features clingo_integration`; each test
//! skips when clingo is not on PATH.
#![cfg(feature = "clingo_integration")]

mod common;

use std::sync::Arc;

use common::*;
use savant::config::SolverConfig;
use savant::program::{ProgramComponents, build_solver_input};
use savant::service::ProblemSolver;
use savant::solver::{AspSolver, ClingoSolver, SolveStatus};

fn clingo() -> Option<ClingoSolver> {
    let solver = ClingoSolver::new(&SolverConfig::default());
    if solver.check_available() {
        Some(solver)
    } else {
        eprintln!("clingo not available, skipping");
        None
    }
}

#[tokio::test]
async fn knapsack_optimum() {
    let Some(solver) = clingo() else { return };
    let components = ProgramComponents::from_llm_output(KNAPSACK).unwrap();
    let (_, program) = build_solver_input(&components).unwrap();

    let outcome = solver.solve(&program).await.unwrap();
    assert_eq!(outcome.status, SolveStatus::OptimumFound);
    let rendered = outcome.render();
    assert!(rendered.contains("selected(a)"), "{}", rendered);
    assert!(rendered.contains("selected(c)"), "{}", rendered);
    assert!(!rendered.contains("selected(b)"), "{}", rendered);
    assert!(rendered.ends_with("Optimization: -7 (optimal)"), "{}", rendered);
}

#[tokio::test]
async fn unsatisfiable_program() {
    let Some(solver) = clingo() else { return };
    let outcome = solver.solve("a.\n:- a.\n").await.unwrap();
    assert_eq!(outcome.status, SolveStatus::Unsatisfiable);
    assert_eq!(outcome.render(), "No solution found");
}

#[tokio::test]
async fn syntax_errors_are_solver_errors() {
    let Some(solver) = clingo() else { return };
    let err = solver.solve("this is not asp").await.unwrap_err();
    assert!(err.to_string().starts_with("Solver error:"), "{}", err);
}

#[tokio::test]
async fn full_service_with_clingo() {
    let Some(solver) = clingo() else { return };
    let service = ProblemSolver::new(Arc::new(happy_path(KNAPSACK)), Arc::new(solver));
    let response = service.solve_optimization_problem("Pack a bag.", None).await;
    let solution = response.solution().unwrap();
    assert!(solution.contains("selected(a)"));
}
