use super::engine::{HORIZON_MONTHS, run_simulation};
use super::types::Debt;

#[derive(Debug, Clone, Copy)]
pub struct BudgetSolveConfig {
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BudgetSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_budget: f64,
    pub months_to_payoff: u32,
    pub meets_target: bool,
}

#[derive(Debug, Clone)]
pub struct BudgetSolveResult {
    pub target_months: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_budget: Option<f64>,
    pub achieved_months: Option<u32>,
    pub iterations: Vec<BudgetSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Bisects for the smallest monthly budget that clears every debt within
/// `target_months`. The predicate is monotone in the budget: extra cash can
/// only retire balances sooner, so a single bracket search suffices.
pub fn solve_required_budget(
    debts: &[Debt],
    config: BudgetSolveConfig,
) -> Result<BudgetSolveResult, String> {
    validate_config(debts, config)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_meets = meets_target(debts, config.search_min, config.target_months);
    let high_meets = meets_target(debts, config.search_max, config.target_months);

    let mut solved_budget = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_meets {
        solved_budget = Some(config.search_min);
        converged = true;
        feasible = true;
        message = "Already meets target at lower budget bound.".to_string();
    } else if !high_meets {
        feasible = false;
        message = "No feasible budget found within the search bounds.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let result = run_simulation(debts, mid);
            let meets =
                result.is_debt_free() && result.months_to_payoff <= config.target_months;
            iterations.push(BudgetSolveIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_budget: mid,
                months_to_payoff: result.months_to_payoff,
                meets_target: meets,
            });

            if meets {
                hi = mid;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                solved_budget = Some(hi);
                break;
            }
        }
        if solved_budget.is_none() {
            solved_budget = Some(hi);
        }
        feasible = true;
        message = if converged {
            "Solved required monthly budget.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate."
                .to_string()
        };
    }

    let achieved_months =
        solved_budget.map(|budget| run_simulation(debts, budget).months_to_payoff);

    Ok(BudgetSolveResult {
        target_months: config.target_months,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_budget,
        achieved_months,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn meets_target(debts: &[Debt], budget: f64, target_months: u32) -> bool {
    let result = run_simulation(debts, budget);
    result.is_debt_free() && result.months_to_payoff <= target_months
}

fn validate_config(debts: &[Debt], config: BudgetSolveConfig) -> Result<(), String> {
    if debts.is_empty() {
        return Err("debts must not be empty".to_string());
    }
    if config.target_months == 0 || config.target_months > HORIZON_MONTHS {
        return Err(format!(
            "target_months must be between 1 and {HORIZON_MONTHS}"
        ));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err("search bounds must be finite".to_string());
    }
    if config.search_max <= config.search_min {
        return Err("search_max must be greater than search_min".to_string());
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err("tolerance must be > 0".to_string());
    }
    if config.max_iterations == 0 {
        return Err("max_iterations must be > 0".to_string());
    }
    Ok(())
}
