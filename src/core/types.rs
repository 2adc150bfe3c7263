use serde::Serialize;

/// A single liability. `name` is display-only and need not be unique;
/// `annual_rate` is a percentage (18.0 means 18% APR).
#[derive(Debug, Clone, PartialEq)]
pub struct Debt {
    pub name: String,
    pub balance: f64,
    pub annual_rate: f64,
    pub min_payment: f64,
}

/// Outcome of one payoff projection. `history` holds the total remaining
/// balance at the end of each simulated month, so `history.len() ==
/// months_to_payoff as usize` always.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub months_to_payoff: u32,
    pub history: Vec<f64>,
}

impl SimulationResult {
    /// True only when the projection actually drove the total balance to
    /// zero. An empty history (no debts to project) stays false so callers
    /// never present "debt free today" without a real projection.
    pub fn is_debt_free(&self) -> bool {
        self.history.last().is_some_and(|balance| *balance <= 0.0)
    }
}

/// Headline figures for a debt plan under a given budget. `average_rate`
/// is the plain arithmetic mean of the rates, not balance-weighted.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub total_balance: f64,
    pub average_rate: f64,
    pub total_min_payment: f64,
    pub monthly_surplus: f64,
}
