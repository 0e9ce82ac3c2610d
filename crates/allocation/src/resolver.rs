use rentbook_core::BankTransaction;

use crate::rule::{AllocationRule, RuleId};

/// Result of picking a rule for one transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    Matched(&'a AllocationRule),
    /// Two or more rules share the lowest matching priority. Listed in
    /// (priority, id) order.
    Conflict(Vec<&'a AllocationRule>),
    NoMatch,
}

impl Resolution<'_> {
    pub fn candidate_ids(&self) -> Vec<RuleId> {
        match self {
            Resolution::Matched(rule) => vec![rule.id],
            Resolution::Conflict(rules) => rules.iter().map(|r| r.id).collect(),
            Resolution::NoMatch => vec![],
        }
    }
}

/// Selects the rule that applies to `tx`.
///
/// Only active rules of the transaction's direction take part. Among the
/// matching ones the lowest priority wins; a tie at that priority is a
/// conflict and is never broken silently. The outcome does not depend on the
/// order of `rules`.
pub fn resolve<'a>(rules: &'a [AllocationRule], tx: &BankTransaction) -> Resolution<'a> {
    let direction = tx.direction();
    let mut candidates: Vec<&AllocationRule> = rules
        .iter()
        .filter(|r| r.is_active && r.transaction_type() == direction)
        .filter(|r| r.matches(tx))
        .collect();
    candidates.sort_by_key(|r| r.precedence());

    match candidates.as_slice() {
        [] => Resolution::NoMatch,
        [only] => Resolution::Matched(*only),
        [first, second, ..] if first.priority < second.priority => Resolution::Matched(*first),
        [first, ..] => {
            let tied = first.priority;
            Resolution::Conflict(
                candidates
                    .iter()
                    .take_while(|r| r.priority == tied)
                    .copied()
                    .collect(),
            )
        }
    }
}
