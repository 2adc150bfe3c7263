use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    BudgetSolveConfig, BudgetSolveResult, Debt, PlanSummary, SimulationResult, run_simulation,
    solve_required_budget, summarize,
};
use crate::ingest::{ImportMode, ImportOptions, extract_debt};

// Average Gregorian month. The projected calendar date has always been
// computed as now + months * 30.44 days; keep the constant so dates stay
// stable for existing callers.
const AVERAGE_MONTH_DAYS: f64 = 30.44;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliImportMode {
    SumNegatives,
    SumAllFlipSign,
}

impl From<CliImportMode> for ImportMode {
    fn from(value: CliImportMode) -> Self {
        match value {
            CliImportMode::SumNegatives => ImportMode::SumNegatives,
            CliImportMode::SumAllFlipSign => ImportMode::SumAllFlipSign,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiImportMode {
    #[serde(alias = "sumNegatives", alias = "sum_negatives", alias = "standard-bank")]
    SumNegatives,
    #[serde(
        alias = "sumAllFlipSign",
        alias = "sum_all_flip_sign",
        alias = "credit-card"
    )]
    SumAllFlipSign,
}

impl From<ApiImportMode> for CliImportMode {
    fn from(value: ApiImportMode) -> Self {
        match value {
            ApiImportMode::SumNegatives => CliImportMode::SumNegatives,
            ApiImportMode::SumAllFlipSign => CliImportMode::SumAllFlipSign,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DebtPayload {
    name: Option<String>,
    balance: Option<f64>,
    annual_rate: Option<f64>,
    min_payment: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    monthly_budget: Option<f64>,
    debts: Option<Vec<DebtPayload>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    debts: Option<Vec<DebtPayload>>,
    target_months: Option<u32>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ImportQuery {
    column: Option<String>,
    mode: Option<ApiImportMode>,
    file_name: Option<String>,
    assumed_rate: Option<f64>,
    min_payment_ratio: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "payoff",
    about = "Avalanche-method debt payoff simulator (monthly projection + HTTP API)"
)]
struct Cli {
    #[arg(long, default_value_t = 1_000.0, help = "Monthly repayment budget")]
    monthly_budget: f64,
    #[arg(
        long,
        value_enum,
        default_value_t = CliImportMode::SumNegatives,
        help = "CSV logic mode: sum negatives (bank) or sum all and flip sign (credit card)"
    )]
    import_mode: CliImportMode,
    #[arg(
        long,
        default_value_t = 18.0,
        help = "Annual interest rate assumed for imported balances in percent"
    )]
    import_rate: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Minimum payment assumed for imported balances as percent of balance"
    )]
    import_min_ratio: f64,
    #[arg(
        long,
        default_value_t = 60,
        help = "Default payoff target in months for budget solving"
    )]
    solve_target_months: u32,
}

#[derive(Debug)]
struct SimulationRequest {
    debts: Vec<Debt>,
    monthly_budget: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    months_to_payoff: u32,
    years: u32,
    months: u32,
    debt_free: bool,
    payoff_date: Option<String>,
    budget_covers_minimums: bool,
    monthly_budget: f64,
    summary: PlanSummary,
    history: Vec<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveIterationBody {
    iteration: u32,
    lower_bound: f64,
    upper_bound: f64,
    candidate_budget: f64,
    months_to_payoff: u32,
    meets_target: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    target_months: u32,
    solved_budget: Option<f64>,
    achieved_months: Option<u32>,
    converged: bool,
    feasible: bool,
    message: String,
    iterations: Vec<SolveIterationBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebtBody {
    name: String,
    balance: f64,
    annual_rate: f64,
    min_payment: f64,
}

impl From<Debt> for DebtBody {
    fn from(debt: Debt) -> Self {
        Self {
            name: debt.name,
            balance: debt.balance,
            annual_rate: debt.annual_rate,
            min_payment: debt.min_payment,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    debt: DebtBody,
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    service: &'static str,
    version: &'static str,
    endpoints: [&'static str; 3],
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_debts(payloads: Vec<DebtPayload>) -> Result<Vec<Debt>, String> {
    let mut debts = Vec::with_capacity(payloads.len());
    for (index, payload) in payloads.into_iter().enumerate() {
        let debt = Debt {
            name: payload
                .name
                .unwrap_or_else(|| format!("Account {}", index + 1)),
            balance: payload.balance.unwrap_or(0.0),
            annual_rate: payload.annual_rate.unwrap_or(0.0),
            min_payment: payload.min_payment.unwrap_or(0.0),
        };
        for (field, value) in [
            ("balance", debt.balance),
            ("annualRate", debt.annual_rate),
            ("minPayment", debt.min_payment),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!(
                    "{field} for '{}' must be finite and >= 0",
                    debt.name
                ));
            }
        }
        debts.push(debt);
    }
    Ok(debts)
}

fn build_simulation_request(
    payload: SimulatePayload,
    defaults: &Cli,
) -> Result<SimulationRequest, String> {
    let monthly_budget = payload.monthly_budget.unwrap_or(defaults.monthly_budget);
    if !monthly_budget.is_finite() {
        return Err("monthlyBudget must be finite".to_string());
    }

    Ok(SimulationRequest {
        debts: build_debts(payload.debts.unwrap_or_default())?,
        monthly_budget,
    })
}

fn build_solve_request(
    payload: SolvePayload,
    defaults: &Cli,
) -> Result<(Vec<Debt>, BudgetSolveConfig), String> {
    let debts = build_debts(payload.debts.unwrap_or_default())?;
    let config = BudgetSolveConfig {
        target_months: payload
            .target_months
            .unwrap_or(defaults.solve_target_months),
        search_min: payload.search_min.unwrap_or(0.0),
        search_max: payload.search_max.unwrap_or(50_000.0),
        tolerance: payload.tolerance.unwrap_or(1.0),
        max_iterations: payload.max_iterations.unwrap_or(48),
    };
    Ok((debts, config))
}

fn import_options_from_query(query: ImportQuery, defaults: &Cli) -> ImportOptions {
    let mut options = ImportOptions {
        mode: defaults.import_mode.into(),
        assumed_annual_rate: defaults.import_rate,
        min_payment_ratio: defaults.import_min_ratio,
        ..ImportOptions::default()
    };
    if let Some(v) = query.column {
        options.amount_column = v;
    }
    if let Some(v) = query.mode {
        options.mode = CliImportMode::from(v).into();
    }
    if let Some(v) = query.file_name {
        options.source_name = v;
    }
    if let Some(v) = query.assumed_rate {
        options.assumed_annual_rate = v;
    }
    if let Some(v) = query.min_payment_ratio {
        options.min_payment_ratio = v;
    }
    options
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/solve", post(solve_handler))
        .route("/api/import", post(import_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Payoff HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> Response {
    json_response(
        StatusCode::OK,
        ServiceInfo {
            service: "payoff",
            version: env!("CARGO_PKG_VERSION"),
            endpoints: ["/api/simulate", "/api/solve", "/api/import"],
        },
    )
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match build_simulation_request(payload, &default_cli_for_api()) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let result = run_simulation(&request.debts, request.monthly_budget);
    let response = build_simulate_response(&request, &result, Utc::now());
    json_response(StatusCode::OK, response)
}

async fn solve_handler(Json(payload): Json<SolvePayload>) -> Response {
    let (debts, config) = match build_solve_request(payload, &default_cli_for_api()) {
        Ok(parts) => parts,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match solve_required_budget(&debts, config) {
        Ok(result) => json_response(StatusCode::OK, build_solve_response(result)),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

async fn import_handler(Query(query): Query<ImportQuery>, body: String) -> Response {
    let options = import_options_from_query(query, &default_cli_for_api());
    match extract_debt(body.as_bytes(), &options) {
        Ok(debt) => json_response(StatusCode::OK, ImportResponse { debt: debt.into() }),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn build_simulate_response(
    request: &SimulationRequest,
    result: &SimulationResult,
    now: DateTime<Utc>,
) -> SimulateResponse {
    let summary = summarize(&request.debts, request.monthly_budget);
    let debt_free = result.is_debt_free();
    SimulateResponse {
        months_to_payoff: result.months_to_payoff,
        years: result.months_to_payoff / 12,
        months: result.months_to_payoff % 12,
        debt_free,
        payoff_date: debt_free.then(|| payoff_month_label(now, result.months_to_payoff)),
        budget_covers_minimums: summary.monthly_surplus >= 0.0,
        monthly_budget: request.monthly_budget,
        summary,
        history: result.history.clone(),
    }
}

fn build_solve_response(result: BudgetSolveResult) -> SolveResponse {
    SolveResponse {
        target_months: result.target_months,
        solved_budget: result.solved_budget,
        achieved_months: result.achieved_months,
        converged: result.converged,
        feasible: result.feasible,
        message: result.message,
        iterations: result
            .iterations
            .iter()
            .map(|it| SolveIterationBody {
                iteration: it.iteration,
                lower_bound: it.lower_bound,
                upper_bound: it.upper_bound,
                candidate_budget: it.candidate_budget,
                months_to_payoff: it.months_to_payoff,
                meets_target: it.meets_target,
            })
            .collect(),
    }
}

fn payoff_month_label(now: DateTime<Utc>, months: u32) -> String {
    let seconds = (months as f64 * AVERAGE_MONTH_DAYS * SECONDS_PER_DAY).round() as i64;
    (now + Duration::seconds(seconds)).format("%B %Y").to_string()
}

fn default_cli_for_api() -> Cli {
    Cli {
        monthly_budget: 1_000.0,
        import_mode: CliImportMode::SumNegatives,
        import_rate: 18.0,
        import_min_ratio: 3.0,
        solve_target_months: 60,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn simulate_request_from_json(json: &str) -> Result<SimulationRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    build_simulation_request(payload, &default_cli_for_api())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn simulate_request_from_json_parses_web_keys() {
        let json = r#"{
          "monthlyBudget": 750,
          "debts": [
            {"name": "Visa", "balance": 2500, "annualRate": 19.9, "minPayment": 75},
            {"balance": 1000}
          ]
        }"#;
        let request = simulate_request_from_json(json).expect("json should parse");

        assert_approx(request.monthly_budget, 750.0);
        assert_eq!(request.debts.len(), 2);
        assert_eq!(request.debts[0].name, "Visa");
        assert_approx(request.debts[0].annual_rate, 19.9);
        assert_eq!(request.debts[1].name, "Account 2");
        assert_approx(request.debts[1].annual_rate, 0.0);
        assert_approx(request.debts[1].min_payment, 0.0);
    }

    #[test]
    fn simulate_request_applies_default_budget() {
        let request = simulate_request_from_json("{}").expect("empty payload is valid");
        assert_approx(request.monthly_budget, 1_000.0);
        assert!(request.debts.is_empty());
    }

    #[test]
    fn simulate_request_rejects_negative_balance() {
        let json = r#"{"debts": [{"name": "Bad", "balance": -5}]}"#;
        let err = simulate_request_from_json(json).expect_err("must reject negative balance");
        assert!(err.contains("balance"));
        assert!(err.contains("Bad"));
    }

    #[test]
    fn simulate_request_rejects_non_finite_budget() {
        let payload = SimulatePayload {
            monthly_budget: Some(f64::NAN),
            debts: None,
        };
        let err = build_simulation_request(payload, &default_cli_for_api())
            .expect_err("must reject NaN budget");
        assert!(err.contains("monthlyBudget"));
    }

    #[test]
    fn payoff_month_label_uses_average_month_length() {
        assert_eq!(payoff_month_label(fixed_now(), 0), "January 2024");
        assert_eq!(payoff_month_label(fixed_now(), 1), "February 2024");
        // 12 * 30.44 days = 365.28 days, landing on 14 January 2025.
        assert_eq!(payoff_month_label(fixed_now(), 12), "January 2025");
    }

    #[test]
    fn simulate_response_reports_payoff_date_and_breakdown() {
        let request = SimulationRequest {
            debts: vec![Debt {
                name: "Loan".to_string(),
                balance: 1_200.0,
                annual_rate: 0.0,
                min_payment: 0.0,
            }],
            monthly_budget: 100.0,
        };
        let result = run_simulation(&request.debts, request.monthly_budget);
        let response = build_simulate_response(&request, &result, fixed_now());

        assert_eq!(response.months_to_payoff, 12);
        assert_eq!(response.years, 1);
        assert_eq!(response.months, 0);
        assert!(response.debt_free);
        assert_eq!(response.payoff_date.as_deref(), Some("January 2025"));
        assert!(response.budget_covers_minimums);
        assert_approx(response.summary.total_balance, 1_200.0);
        assert_eq!(response.history.len(), 12);
    }

    #[test]
    fn simulate_response_flags_budget_below_minimums() {
        let request = SimulationRequest {
            debts: vec![Debt {
                name: "Card".to_string(),
                balance: 1_000.0,
                annual_rate: 24.0,
                min_payment: 500.0,
            }],
            monthly_budget: 100.0,
        };
        let result = run_simulation(&request.debts, request.monthly_budget);
        let response = build_simulate_response(&request, &result, fixed_now());

        assert!(!response.budget_covers_minimums);
        assert_approx(response.summary.monthly_surplus, -400.0);
    }

    #[test]
    fn simulate_response_for_empty_plan_has_no_payoff_date() {
        let request = SimulationRequest {
            debts: Vec::new(),
            monthly_budget: 500.0,
        };
        let result = run_simulation(&request.debts, request.monthly_budget);
        let response = build_simulate_response(&request, &result, fixed_now());

        assert_eq!(response.months_to_payoff, 0);
        assert!(!response.debt_free);
        assert!(response.payoff_date.is_none());
        assert!(response.history.is_empty());
    }

    #[test]
    fn solve_payload_json_parses_and_solves() {
        let json = r#"{
          "debts": [{"name": "Loan", "balance": 1200, "annualRate": 0, "minPayment": 0}],
          "targetMonths": 12,
          "searchMax": 1000,
          "tolerance": 0.5
        }"#;
        let payload = serde_json::from_str::<SolvePayload>(json).expect("json should parse");
        let (debts, config) =
            build_solve_request(payload, &default_cli_for_api()).expect("valid request");
        assert_eq!(config.target_months, 12);
        assert_approx(config.search_max, 1_000.0);
        assert_eq!(config.max_iterations, 48);

        let result = solve_required_budget(&debts, config).expect("must solve");
        assert!(result.feasible);
        let solved = result.solved_budget.expect("budget expected");
        assert!(
            (solved - 100.0).abs() <= config.tolerance + 0.5,
            "expected ~100, got {solved}"
        );
    }

    #[test]
    fn import_query_overrides_map_onto_options() {
        let query = ImportQuery {
            column: Some("Value".to_string()),
            mode: Some(ApiImportMode::SumAllFlipSign),
            file_name: Some("visa_feb.csv".to_string()),
            assumed_rate: None,
            min_payment_ratio: Some(5.0),
        };
        let options = import_options_from_query(query, &default_cli_for_api());

        assert_eq!(options.amount_column, "Value");
        assert_eq!(options.mode, ImportMode::SumAllFlipSign);
        assert_eq!(options.source_name, "visa_feb.csv");
        assert_approx(options.assumed_annual_rate, 18.0);
        assert_approx(options.min_payment_ratio, 5.0);
    }

    #[test]
    fn import_mode_aliases_parse() {
        for raw in [
            "\"sum-negatives\"",
            "\"sumNegatives\"",
            "\"standard-bank\"",
        ] {
            let mode = serde_json::from_str::<ApiImportMode>(raw).expect("alias should parse");
            assert_eq!(mode, ApiImportMode::SumNegatives);
        }
        for raw in [
            "\"sum-all-flip-sign\"",
            "\"sumAllFlipSign\"",
            "\"credit-card\"",
        ] {
            let mode = serde_json::from_str::<ApiImportMode>(raw).expect("alias should parse");
            assert_eq!(mode, ApiImportMode::SumAllFlipSign);
        }
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let request = simulate_request_from_json(
            r#"{"monthlyBudget": 300, "debts": [{"name": "Card", "balance": 900, "annualRate": 12, "minPayment": 25}]}"#,
        )
        .expect("valid request");
        let result = run_simulation(&request.debts, request.monthly_budget);
        let response = build_simulate_response(&request, &result, fixed_now());

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"monthsToPayoff\""));
        assert!(json.contains("\"payoffDate\""));
        assert!(json.contains("\"budgetCoversMinimums\""));
        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"totalBalance\""));
        assert!(json.contains("\"averageRate\""));
        assert!(json.contains("\"history\""));
    }
}
