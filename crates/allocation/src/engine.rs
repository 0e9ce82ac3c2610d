use rentbook_core::{BankTransaction, Money, PropertyId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{AllocationConfig, LoanSplitConfig};
use crate::loan::parse_loan_payment_message;
use crate::resolver::{resolve, Resolution};
use crate::rule::{AllocationRule, RuleId, RuleTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostingType {
    Expense,
    Income,
    LoanPrincipal,
    LoanInterest,
    LoanHandlingFee,
}

/// One bookkeeping row the caller should write for an allocated transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Posting {
    #[serde(rename = "type")]
    pub posting_type: PostingType,
    /// Expense or income type id, depending on `posting_type`.
    pub type_id: i64,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AllocationOutcome {
    Allocated {
        matched_rule_id: RuleId,
        postings: Vec<Posting>,
    },
    /// Needs a human: several rules tie at the winning priority.
    Conflicting { candidate_rule_ids: Vec<RuleId> },
    NoMatch,
    /// Already linked to an expense or income row.
    Skipped,
    /// Matched a loan rule but the message could not be split.
    LoanSplitFailed { matched_rule_id: RuleId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AllocationStatus {
    Allocated,
    Conflicting,
    NoMatch,
    Skipped,
    LoanSplitFailed,
}

impl AllocationOutcome {
    pub fn status(&self) -> AllocationStatus {
        match self {
            AllocationOutcome::Allocated { .. } => AllocationStatus::Allocated,
            AllocationOutcome::Conflicting { .. } => AllocationStatus::Conflicting,
            AllocationOutcome::NoMatch => AllocationStatus::NoMatch,
            AllocationOutcome::Skipped => AllocationStatus::Skipped,
            AllocationOutcome::LoanSplitFailed { .. } => AllocationStatus::LoanSplitFailed,
        }
    }

    pub fn matched_rule_id(&self) -> Option<RuleId> {
        match self {
            AllocationOutcome::Allocated { matched_rule_id, .. }
            | AllocationOutcome::LoanSplitFailed { matched_rule_id } => Some(*matched_rule_id),
            _ => None,
        }
    }
}

/// A prepared rule set plus the configuration needed to act on matches.
#[derive(Debug, Clone)]
pub struct AllocationEngine {
    rules: Vec<AllocationRule>,
    config: AllocationConfig,
}

impl AllocationEngine {
    pub fn new(rules: Vec<AllocationRule>, config: AllocationConfig) -> Self {
        let mut rules = rules;
        rules.sort_by_key(AllocationRule::precedence);
        Self { rules, config }
    }

    /// Like [`AllocationEngine::new`] but keeps only rules owned by `property_id`.
    pub fn for_property(
        property_id: PropertyId,
        rules: Vec<AllocationRule>,
        config: AllocationConfig,
    ) -> Self {
        let owned = rules
            .into_iter()
            .filter(|r| r.property_id == property_id)
            .collect();
        Self::new(owned, config)
    }

    pub fn rules(&self) -> &[AllocationRule] {
        &self.rules
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    pub fn resolve(&self, tx: &BankTransaction) -> Resolution<'_> {
        resolve(&self.rules, tx)
    }

    pub fn allocate(&self, tx: &BankTransaction) -> AllocationOutcome {
        if tx.is_allocated() {
            tracing::debug!("Transaction {:?} already allocated, skipping", tx.id);
            return AllocationOutcome::Skipped;
        }

        match self.resolve(tx) {
            Resolution::NoMatch => AllocationOutcome::NoMatch,
            Resolution::Conflict(rules) => {
                let candidate_rule_ids: Vec<RuleId> = rules.iter().map(|r| r.id).collect();
                tracing::debug!(
                    "Transaction {:?} matches tied rules {:?}",
                    tx.id,
                    candidate_rule_ids
                );
                AllocationOutcome::Conflicting { candidate_rule_ids }
            }
            Resolution::Matched(rule) => {
                tracing::debug!("Transaction {:?} matched rule {} ({})", tx.id, rule.id, rule.name);
                self.book(rule, tx)
            }
        }
    }

    /// Outcomes for every transaction, in input order.
    pub fn apply_rules(&self, transactions: &[BankTransaction]) -> Vec<AllocationOutcome> {
        let outcomes: Vec<AllocationOutcome> =
            transactions.iter().map(|tx| self.allocate(tx)).collect();
        tracing::info!("Allocation run: {}", AllocationSummary::from_outcomes(&outcomes));
        outcomes
    }

    fn book(&self, rule: &AllocationRule, tx: &BankTransaction) -> AllocationOutcome {
        let amount = tx.amount.abs();
        let (posting_type, type_id) = match rule.target {
            RuleTarget::Expense { expense_type_id } => {
                if self.config.is_loan_payment_type(expense_type_id) {
                    if let Some(loan) = &self.config.loan_split {
                        return split_loan_payment(rule, tx, loan);
                    }
                }
                (PostingType::Expense, expense_type_id.0)
            }
            RuleTarget::Income { income_type_id } => (PostingType::Income, income_type_id.0),
        };

        AllocationOutcome::Allocated {
            matched_rule_id: rule.id,
            postings: vec![Posting {
                posting_type,
                type_id,
                amount,
            }],
        }
    }
}

fn split_loan_payment(
    rule: &AllocationRule,
    tx: &BankTransaction,
    loan: &LoanSplitConfig,
) -> AllocationOutcome {
    let Some(components) = tx.message.as_deref().and_then(parse_loan_payment_message) else {
        tracing::warn!(
            "Transaction {:?} matched loan rule {} but its message has no loan breakdown",
            tx.id,
            rule.id
        );
        return AllocationOutcome::LoanSplitFailed {
            matched_rule_id: rule.id,
        };
    };

    let Some(total) = components.total_payment() else {
        tracing::warn!(
            "Transaction {:?} matched loan rule {} but its loan amounts overflow",
            tx.id,
            rule.id
        );
        return AllocationOutcome::LoanSplitFailed {
            matched_rule_id: rule.id,
        };
    };
    if total != tx.amount.abs() {
        tracing::warn!(
            "Transaction {:?}: loan breakdown totals {} but amount is {}",
            tx.id,
            total,
            tx.amount.abs()
        );
    }

    AllocationOutcome::Allocated {
        matched_rule_id: rule.id,
        postings: vec![
            Posting {
                posting_type: PostingType::LoanPrincipal,
                type_id: loan.principal_expense_type_id.0,
                amount: components.principal,
            },
            Posting {
                posting_type: PostingType::LoanInterest,
                type_id: loan.interest_expense_type_id.0,
                amount: components.interest,
            },
            Posting {
                posting_type: PostingType::LoanHandlingFee,
                type_id: loan.handling_fee_expense_type_id.0,
                amount: components.handling_fee,
            },
        ],
    }
}

/// One-shot form of [`AllocationEngine::apply_rules`].
pub fn apply_rules(
    transactions: &[BankTransaction],
    rules: &[AllocationRule],
    config: &AllocationConfig,
) -> Vec<AllocationOutcome> {
    AllocationEngine::new(rules.to_vec(), config.clone()).apply_rules(transactions)
}

/// Count of outcomes per status for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSummary {
    pub allocated: usize,
    pub conflicting: usize,
    pub no_match: usize,
    pub skipped: usize,
    pub loan_split_failed: usize,
}

impl AllocationSummary {
    pub fn from_outcomes(outcomes: &[AllocationOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome.status() {
                AllocationStatus::Allocated => summary.allocated += 1,
                AllocationStatus::Conflicting => summary.conflicting += 1,
                AllocationStatus::NoMatch => summary.no_match += 1,
                AllocationStatus::Skipped => summary.skipped += 1,
                AllocationStatus::LoanSplitFailed => summary.loan_split_failed += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.allocated + self.conflicting + self.no_match + self.skipped + self.loan_split_failed
    }

    /// Outcomes that need someone to look at them.
    pub fn needs_attention(&self) -> usize {
        self.conflicting + self.loan_split_failed
    }
}

impl fmt::Display for AllocationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} allocated, {} conflicting, {} unmatched, {} skipped, {} loan split failures",
            self.allocated, self.conflicting, self.no_match, self.skipped, self.loan_split_failed
        )
    }
}
