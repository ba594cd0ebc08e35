//! Portfolio aggregation over the cohort summary table.
//!
//! The aggregations are computed once after loading and rendered into the
//! text block the assistant receives with every request.

use crate::analysis::format::{format_amount, format_cell, format_columns};
use crate::data::CohortTable;
use crate::models::CohortRow;

/// Highest rank included in the "top cohorts" selection.
pub const TOP_RANK_CUTOFF: f64 = 3.0;

/// Portfolio-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PortfolioTotals {
    pub disbursed: f64,
    pub received: f64,
    pub outstanding: f64,
}

/// The projection of a top-ranked cohort handed to the assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct TopCohort {
    pub cohort: String,
    pub loan_recovery_rate_pct: Option<f64>,
    pub loss_rate: Option<f64>,
}

impl From<&CohortRow> for TopCohort {
    fn from(row: &CohortRow) -> Self {
        Self {
            cohort: row.cohort.clone(),
            loan_recovery_rate_pct: row.loan_recovery_rate_pct,
            loss_rate: row.loss_rate,
        }
    }
}

/// Column sums; missing and non-finite cells count as zero and an empty
/// table sums to zero.
pub fn portfolio_totals(rows: &[CohortRow]) -> PortfolioTotals {
    rows.iter().fold(PortfolioTotals::default(), |acc, row| PortfolioTotals {
        disbursed: acc.disbursed + finite_or_zero(row.total_loans_disbursed),
        received: acc.received + finite_or_zero(row.total_loans_received),
        outstanding: acc.outstanding + finite_or_zero(row.total_outstanding_loans),
    })
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Rows ranked at or above `cutoff`, in source order.
///
/// Ties are all kept, unranked rows are never selected, and fewer than
/// `cutoff` qualifying rows simply returns what exists. Ranks are compared
/// as written, so fractional and negative ranks qualify too.
pub fn top_ranked(rows: &[CohortRow], cutoff: f64) -> Vec<TopCohort> {
    rows.iter()
        .filter(|row| row.portfolio_rank.is_some_and(|rank| rank <= cutoff))
        .map(TopCohort::from)
        .collect()
}

/// Render the top cohorts as an aligned table.
pub fn format_top_cohorts(top: &[TopCohort]) -> String {
    let rows: Vec<Vec<String>> = top
        .iter()
        .map(|c| {
            vec![
                c.cohort.clone(),
                format_cell(c.loan_recovery_rate_pct),
                format_cell(c.loss_rate),
            ]
        })
        .collect();

    format_columns(&["cohort", "loan_recovery_rate_pct", "loss_rate"], &rows)
}

/// Build the loan section of the assistant's context.
///
/// Returns an empty string when no table is loaded.
pub fn loan_context(table: Option<&CohortTable>) -> String {
    let Some(table) = table else {
        return String::new();
    };

    let totals = portfolio_totals(&table.rows);
    let top = top_ranked(&table.rows, TOP_RANK_CUTOFF);

    let mut lines = Vec::new();
    lines.push("PRE-CALCULATED LOAN AGGREGATIONS:".to_string());
    lines.push(format!(
        "- Total Overall Disbursed: GHS {}",
        format_amount(totals.disbursed)
    ));
    lines.push(format!(
        "- Total Overall Received: GHS {}",
        format_amount(totals.received)
    ));
    lines.push(format!(
        "- Total Overall Outstanding: GHS {}",
        format_amount(totals.outstanding)
    ));
    lines.push(String::new());
    lines.push("TOP 3 BEST PERFORMING COHORTS:".to_string());
    lines.push(format_top_cohorts(&top));

    lines.join("\n")
}
