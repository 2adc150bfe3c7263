use crate::core::Debt;

/// How to turn a statement's amount column into a single owed balance.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ImportMode {
    /// Standard bank statement: outflows are negative, so the balance is
    /// the absolute sum of the negative amounts only.
    SumNegatives,
    /// Credit-card statement: spending shows positive, so sum every row
    /// and flip the sign.
    SumAllFlipSign,
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub amount_column: String,
    pub mode: ImportMode,
    pub assumed_annual_rate: f64,
    pub min_payment_ratio: f64,
    pub source_name: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            amount_column: "Amount".to_string(),
            mode: ImportMode::SumNegatives,
            assumed_annual_rate: 18.0,
            min_payment_ratio: 3.0,
            source_name: "upload".to_string(),
        }
    }
}

/// Derives a single debt record from raw CSV statement data.
///
/// Cells that fail to parse as a number count as zero (coercion, not
/// rejection). A missing amount column or an extracted balance of zero, or
/// a net credit, is an error, since there is nothing to repay.
pub fn extract_debt(data: &[u8], options: &ImportOptions) -> Result<Debt, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| format!("Error parsing data: {e}"))?;
    let Some(column_index) = headers.iter().position(|h| h == options.amount_column) else {
        return Err(format!(
            "Column '{}' not found in CSV header",
            options.amount_column
        ));
    };

    let mut negative_total = 0.0;
    let mut full_total = 0.0;
    for record in reader.records() {
        let record = record.map_err(|e| format!("Error parsing data: {e}"))?;
        let value = record
            .get(column_index)
            .and_then(|raw| raw.parse::<f64>().ok())
            .unwrap_or(0.0);
        full_total += value;
        if value < 0.0 {
            negative_total += value;
        }
    }

    let balance = match options.mode {
        ImportMode::SumNegatives => negative_total.abs(),
        ImportMode::SumAllFlipSign => full_total.abs(),
    };

    if balance <= 0.0 {
        return Err(
            "No debt detected. Ensure you picked the correct column or logic mode.".to_string(),
        );
    }

    Ok(Debt {
        name: derived_name(&options.source_name),
        balance,
        annual_rate: options.assumed_annual_rate,
        min_payment: balance * options.min_payment_ratio / 100.0,
    })
}

fn derived_name(source_name: &str) -> String {
    let prefix: String = source_name.chars().take(5).collect();
    format!("Imported_{prefix}")
}
