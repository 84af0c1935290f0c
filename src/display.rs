//! Values derived from fetched records at render time. Nothing here is
//! persisted or sent back to the server.

use serde::Serialize;

use crate::model::{CategoryTotal, Goal, Loan, LoanDirection, Transaction, TransactionKind};

/// Shown instead of the expense chart when there is nothing to plot.
pub const EMPTY_CHART_MESSAGE: &str = "No expense data to display yet.";

/// Slice colours, assigned in order and reused once exhausted.
pub const CHART_PALETTE: [&str; 6] = [
    "#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF", "#FF9F40",
];

/// `₹1234.50`, `-₹12.00`
pub fn format_currency(amount: f64, symbol: &str) -> String {
    if amount < 0.0 {
        format!("-{}{:.2}", symbol, amount.abs())
    } else {
        format!("{}{:.2}", symbol, amount)
    }
}

/// Amount column of the transaction list, e.g. `- ₹150.00`.
pub fn format_transaction_amount(transaction: &Transaction, symbol: &str) -> String {
    let sign = match transaction.kind {
        TransactionKind::Income => '+',
        TransactionKind::Expense => '-',
    };
    format!("{} {}", sign, format_currency(transaction.amount.abs(), symbol))
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Saved share of a goal in percent, rounded to one decimal.
///
/// A non-positive or non-finite target yields 0.0. Values above 100 are kept so
/// an over-funded goal still reports how far past its target it is.
pub fn goal_progress(goal: &Goal) -> f64 {
    if !goal.target_amount.is_finite() || goal.target_amount <= 0.0 {
        return 0.0;
    }
    let pct = goal.current_amount / goal.target_amount * 100.0;
    if !pct.is_finite() {
        return 0.0;
    }
    round_one_decimal(pct)
}

/// Progress bar fill in percent: [`goal_progress`] clamped to `[0, 100]`.
pub fn goal_bar_width(goal: &Goal) -> f64 {
    goal_progress(goal).clamp(0.0, 100.0)
}

/// Loans split by direction tag. Every loan lands in exactly one side and
/// server order is kept within each side.
#[derive(Debug, Default)]
pub struct LoanPartition<'a> {
    pub borrowed: Vec<&'a Loan>,
    pub lent: Vec<&'a Loan>,
}

impl<'a> LoanPartition<'a> {
    pub fn new(loans: &'a [Loan]) -> Self {
        let (borrowed, lent): (Vec<&Loan>, Vec<&Loan>) = loans
            .iter()
            .partition(|l| l.direction == LoanDirection::Borrowed);
        Self { borrowed, lent }
    }

    /// Outstanding amount the user owes.
    pub fn total_owed(&self) -> f64 {
        self.borrowed.iter().map(|l| l.remaining).sum()
    }

    /// Outstanding amount owed to the user.
    pub fn total_owed_to_user(&self) -> f64 {
        self.lent.iter().map(|l| l.remaining).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub label: String,
    pub value: f64,
    pub color: &'static str,
}

/// Expense-by-category chart, or the placeholder when there is no data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExpenseChart {
    Series(Vec<ChartSlice>),
    Placeholder(&'static str),
}

impl ExpenseChart {
    pub fn from_totals(totals: &[CategoryTotal]) -> Self {
        if totals.is_empty() {
            return Self::Placeholder(EMPTY_CHART_MESSAGE);
        }
        let slices = totals
            .iter()
            .enumerate()
            .map(|(i, row)| ChartSlice {
                label: row.category.clone(),
                value: row.total,
                color: CHART_PALETTE[i % CHART_PALETTE.len()],
            })
            .collect();
        Self::Series(slices)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }

    /// Share of each slice in percent, rounded to one decimal.
    pub fn shares(&self) -> Vec<(String, f64)> {
        let Self::Series(slices) = self else {
            return Vec::new();
        };
        let total: f64 = slices.iter().map(|s| s.value).sum();
        slices
            .iter()
            .map(|s| {
                let pct = if total > 0.0 {
                    round_one_decimal(s.value / total * 100.0)
                } else {
                    0.0
                };
                (s.label.clone(), pct)
            })
            .collect()
    }
}
