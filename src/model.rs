//! Records exchanged with the finance API, plus the client-side drafts used to
//! create them.
//!
//! Every record here is a read-through copy of server state. Drafts are the
//! only values the client owns.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer credential proving an authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

// Never print the token itself.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// Whether a transaction adds to or draws from the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub description: String,
    /// Non-negative magnitude; direction comes from `kind`.
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub date: NaiveDateTime,
    pub category: Category,
}

impl Transaction {
    /// Effect on the balance: positive for income, negative for expense.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Income => self.amount.abs(),
            TransactionKind::Expense => -self.amount.abs(),
        }
    }
}

/// Who owes whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoanDirection {
    /// Money the user owes.
    #[default]
    Borrowed,
    /// Money owed to the user.
    Lent,
}

impl LoanDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Borrowed => "borrowed",
            Self::Lent => "lent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: i64,
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub paid: f64,
    /// Computed by the server; the client never re-derives it.
    pub remaining: f64,
    #[serde(rename = "type")]
    pub direction: LoanDirection,
    pub date_taken: NaiveDate,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub total_debt: f64,
    pub total_lent_outstanding: f64,
}

/// One row of the expense-by-category chart endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

// ============= Drafts =============

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionDraft {
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category_id: Option<i64>,
}

impl TransactionDraft {
    /// Blank draft pointing at `category_id`.
    pub fn with_category(category_id: Option<i64>) -> Self {
        Self {
            category_id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanDraft {
    pub name: String,
    pub amount: f64,
    pub paid: f64,
    #[serde(rename = "type")]
    pub direction: LoanDirection,
    pub date_taken: NaiveDate,
    pub source: String,
}

impl LoanDraft {
    pub fn new(date_taken: NaiveDate) -> Self {
        Self {
            name: String::new(),
            amount: 0.0,
            paid: 0.0,
            direction: LoanDirection::Borrowed,
            date_taken,
            source: String::new(),
        }
    }
}

impl Default for LoanDraft {
    fn default() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GoalDraft {
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
}
