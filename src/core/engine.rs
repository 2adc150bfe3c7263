use super::types::{Debt, PlanSummary, SimulationResult};

/// Hard simulation horizon: 30 years of monthly steps. A plan that is still
/// carrying a balance after this many months is reported as-is rather than
/// iterated further.
pub const HORIZON_MONTHS: u32 = 360;

#[derive(Debug, Clone)]
struct MonthTracePoint {
    balances: Vec<f64>,
    total: f64,
}

/// Projects month-by-month payoff of `debts` under a fixed `monthly_budget`:
/// minimum payments on every debt first, then all surplus cash into the
/// highest-rate debt with a remaining balance. Total over its inputs:
/// degenerate budgets are simulated faithfully, never rejected. The
/// caller's debt list is never mutated.
pub fn run_simulation(debts: &[Debt], monthly_budget: f64) -> SimulationResult {
    simulate_plan(debts, monthly_budget, None)
}

/// Headline plan figures: total liability, mean rate, total of the minimum
/// payments, and the monthly surplus left over from the budget.
pub fn summarize(debts: &[Debt], monthly_budget: f64) -> PlanSummary {
    let total_min_payment: f64 = debts.iter().map(|debt| debt.min_payment).sum();
    let average_rate = if debts.is_empty() {
        0.0
    } else {
        debts.iter().map(|debt| debt.annual_rate).sum::<f64>() / debts.len() as f64
    };

    PlanSummary {
        total_balance: total_balance(debts),
        average_rate,
        total_min_payment,
        monthly_surplus: monthly_budget - total_min_payment,
    }
}

fn simulate_plan(
    debts: &[Debt],
    monthly_budget: f64,
    mut trace: Option<&mut Vec<MonthTracePoint>>,
) -> SimulationResult {
    if debts.is_empty() {
        return SimulationResult {
            months_to_payoff: 0,
            history: Vec::new(),
        };
    }

    let mut working = avalanche_order(debts);
    let mut history = Vec::new();
    let mut months = 0_u32;

    while total_balance(&working) > 0.0 && months < HORIZON_MONTHS {
        months += 1;
        let mut available_cash = monthly_budget;

        // Minimums first. Interest accrues before the payment, the payment
        // never exceeds the balance, and available_cash may go negative
        // when the budget does not cover the minimums.
        for debt in working.iter_mut() {
            let interest = debt.balance * (debt.annual_rate / 100.0) / 12.0;
            debt.balance += interest;
            let payment = debt.balance.min(debt.min_payment);
            debt.balance -= payment;
            available_cash -= payment;
        }

        // Second pass: surplus attacks the highest rate first.
        for debt in working.iter_mut() {
            if debt.balance > 0.0 && available_cash > 0.0 {
                let extra = debt.balance.min(available_cash);
                debt.balance -= extra;
                available_cash -= extra;
            }
        }

        let total = total_balance(&working);
        history.push(total);
        if let Some(trace_rows) = trace.as_deref_mut() {
            trace_rows.push(MonthTracePoint {
                balances: working.iter().map(|debt| debt.balance).collect(),
                total,
            });
        }
    }

    SimulationResult {
        months_to_payoff: months,
        history,
    }
}

// Stable sort, so equally-priced debts keep their relative input order.
fn avalanche_order(debts: &[Debt]) -> Vec<Debt> {
    let mut working = debts.to_vec();
    working.sort_by(|a, b| b.annual_rate.total_cmp(&a.annual_rate));
    working
}

fn total_balance(debts: &[Debt]) -> f64 {
    debts.iter().map(|debt| debt.balance).sum()
}
