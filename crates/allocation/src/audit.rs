use std::collections::BTreeMap;

use rentbook_core::{PropertyId, TransactionType};
use serde::Serialize;

use crate::rule::{AllocationRule, RuleId};

/// Active rules of one property and direction that share a priority. Any
/// transaction matched by two of them resolves to a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityTie {
    pub property_id: PropertyId,
    pub transaction_type: TransactionType,
    pub priority: i32,
    pub rule_ids: Vec<RuleId>,
}

pub fn find_priority_ties(rules: &[AllocationRule]) -> Vec<PriorityTie> {
    let mut groups: BTreeMap<(PropertyId, TransactionType, i32), Vec<RuleId>> = BTreeMap::new();
    for rule in rules.iter().filter(|r| r.is_active) {
        groups
            .entry((rule.property_id, rule.transaction_type(), rule.priority))
            .or_default()
            .push(rule.id);
    }

    groups
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|((property_id, transaction_type, priority), mut rule_ids)| {
            rule_ids.sort();
            PriorityTie {
                property_id,
                transaction_type,
                priority,
                rule_ids,
            }
        })
        .collect()
}
