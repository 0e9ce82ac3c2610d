use rentbook_core::ExpenseTypeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rule::{AllocationRule, RuleId};
use crate::validation::{validate_rule, ValidationErrors};

#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Rule {rule_id} is invalid: {errors}")]
    Invalid {
        rule_id: RuleId,
        errors: ValidationErrors,
    },
}

/// Expense types a loan payment is split into.
///
/// A rule whose expense type is `payment_expense_type_id` is a loan rule: its
/// transactions are booked as principal, interest and handling fee instead of
/// a single expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSplitConfig {
    pub payment_expense_type_id: ExpenseTypeId,
    pub principal_expense_type_id: ExpenseTypeId,
    pub interest_expense_type_id: ExpenseTypeId,
    pub handling_fee_expense_type_id: ExpenseTypeId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    #[serde(default)]
    pub loan_split: Option<LoanSplitConfig>,
}

impl AllocationConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleSetError> {
        Ok(toml::from_str(toml_content)?)
    }

    pub fn with_loan_split(loan_split: LoanSplitConfig) -> Self {
        Self {
            loan_split: Some(loan_split),
        }
    }

    pub fn is_loan_payment_type(&self, expense_type_id: ExpenseTypeId) -> bool {
        self.loan_split
            .is_some_and(|l| l.payment_expense_type_id == expense_type_id)
    }
}

/// A property's rules as stored in a TOML (`[[rules]]`) or JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<AllocationRule>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonRuleSet {
    Wrapped(RuleSet),
    Bare(Vec<AllocationRule>),
}

impl RuleSet {
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleSetError> {
        let set: RuleSet = toml::from_str(toml_content)?;
        set.validate()?;
        Ok(set)
    }

    /// Accepts either `{"rules": [...]}` or a bare array of rules.
    pub fn from_json(json_content: &str) -> Result<Self, RuleSetError> {
        let set = match serde_json::from_str::<JsonRuleSet>(json_content) {
            Ok(JsonRuleSet::Wrapped(set)) => set,
            Ok(JsonRuleSet::Bare(rules)) => RuleSet { rules },
            // Re-parse strictly to surface a useful error message.
            Err(_) => serde_json::from_str::<RuleSet>(json_content)?,
        };
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<(), RuleSetError> {
        for rule in &self.rules {
            validate_rule(rule).map_err(|errors| RuleSetError::Invalid {
                rule_id: rule.id,
                errors,
            })?;
        }
        Ok(())
    }

    pub fn into_rules(self) -> Vec<AllocationRule> {
        self.rules
    }
}
