mod engine;
mod solver;
mod types;

pub use engine::{HORIZON_MONTHS, run_simulation, summarize};
pub use solver::{
    BudgetSolveConfig, BudgetSolveIteration, BudgetSolveResult, solve_required_budget,
};
pub use types::{Debt, PlanSummary, SimulationResult};
