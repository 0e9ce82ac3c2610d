use serde::{Deserialize, Serialize};

use super::category::TransactionType;
use super::money::Money;

/// An imported bank statement row, as seen by the allocation rules.
///
/// Text fields are optional because bank exports leave them blank freely.
/// `expense_id` / `income_id` point at the bookkeeping row the transaction
/// has already been allocated to, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransaction {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Signed amount: negative leaves the account, positive arrives.
    pub amount: Money,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub expense_id: Option<i64>,
    #[serde(default)]
    pub income_id: Option<i64>,
}

impl BankTransaction {
    pub fn new(amount: Money) -> Self {
        BankTransaction {
            amount,
            ..Default::default()
        }
    }

    pub fn direction(&self) -> TransactionType {
        if self.amount.is_negative() {
            TransactionType::Expense
        } else {
            TransactionType::Income
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.expense_id.is_some() || self.income_id.is_some()
    }
}
