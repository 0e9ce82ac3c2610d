use rentbook_core::{BankTransaction, ExpenseTypeId, IncomeTypeId, PropertyId, TransactionType};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::condition::AllocationCondition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub i64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category a rule books into. The variant fixes the transaction direction,
/// so an expense rule can never carry an income type and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "transactionType", rename_all = "UPPERCASE")]
pub enum RuleTarget {
    Expense {
        #[serde(rename = "expenseTypeId")]
        expense_type_id: ExpenseTypeId,
    },
    Income {
        #[serde(rename = "incomeTypeId")]
        income_type_id: IncomeTypeId,
    },
}

impl RuleTarget {
    pub fn transaction_type(self) -> TransactionType {
        match self {
            RuleTarget::Expense { .. } => TransactionType::Expense,
            RuleTarget::Income { .. } => TransactionType::Income,
        }
    }

    /// Raw id of the expense or income type.
    pub fn type_id(self) -> i64 {
        match self {
            RuleTarget::Expense { expense_type_id } => expense_type_id.0,
            RuleTarget::Income { income_type_id } => income_type_id.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRule {
    pub id: RuleId,
    pub name: String,
    pub property_id: PropertyId,
    /// Lower value takes precedence.
    #[serde(default)]
    pub priority: i32,
    #[serde(flatten)]
    pub target: RuleTarget,
    pub conditions: Vec<AllocationCondition>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl AllocationRule {
    pub fn transaction_type(&self) -> TransactionType {
        self.target.transaction_type()
    }

    /// Sort key: priority ascending, then id ascending.
    pub fn precedence(&self) -> (i32, RuleId) {
        (self.priority, self.id)
    }

    /// True when the rule is active, has at least one condition and every
    /// condition holds for `tx`.
    pub fn matches(&self, tx: &BankTransaction) -> bool {
        self.is_active
            && !self.conditions.is_empty()
            && self.conditions.iter().all(|c| c.evaluate(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ConditionField, ConditionOperator};
    use rentbook_core::Money;
    use rust_decimal::Decimal;

    fn rent_rule() -> AllocationRule {
        AllocationRule {
            id: RuleId(1),
            name: "Rent".to_string(),
            property_id: PropertyId(10),
            priority: 0,
            target: RuleTarget::Income {
                income_type_id: IncomeTypeId(1),
            },
            conditions: vec![AllocationCondition::new(
                ConditionField::Description,
                ConditionOperator::Contains,
                "rent",
            )],
            is_active: true,
        }
    }

    fn tx(desc: &str, cents: i64) -> BankTransaction {
        BankTransaction {
            description: Some(desc.to_string()),
            ..BankTransaction::new(Money::from_cents(cents))
        }
    }

    #[test]
    fn matches_description_contains() {
        let rule = rent_rule();
        assert!(rule.matches(&tx("Monthly rent payment", 85000)));
        assert!(!rule.matches(&tx("Utility bill", 85000)));
    }

    #[test]
    fn inactive_rule_never_matches() {
        let rule = AllocationRule {
            is_active: false,
            ..rent_rule()
        };
        assert!(!rule.matches(&tx("Monthly rent payment", 85000)));
    }

    #[test]
    fn empty_conditions_never_match() {
        let rule = AllocationRule {
            conditions: vec![],
            ..rent_rule()
        };
        assert!(!rule.matches(&tx("Monthly rent payment", 85000)));
    }

    #[test]
    fn all_conditions_must_hold() {
        let mut rule = rent_rule();
        rule.conditions.push(AllocationCondition::new(
            ConditionField::Amount,
            ConditionOperator::GreaterThan,
            Decimal::from(500),
        ));
        assert!(rule.matches(&tx("Monthly rent payment", 85000)));
        assert!(!rule.matches(&tx("Monthly rent payment", 40000)));
    }

    #[test]
    fn target_fixes_direction() {
        let expense = RuleTarget::Expense {
            expense_type_id: ExpenseTypeId(4),
        };
        assert_eq!(expense.transaction_type(), TransactionType::Expense);
        assert_eq!(expense.type_id(), 4);
        assert_eq!(rent_rule().transaction_type(), TransactionType::Income);
    }

    #[test]
    fn deserializes_wire_shape() {
        let json = r#"{
            "id": 3,
            "name": "Vastike",
            "propertyId": 10,
            "priority": 2,
            "transactionType": "EXPENSE",
            "expenseTypeId": 7,
            "incomeTypeId": null,
            "conditions": [
                {"field": "receiver", "operator": "contains", "value": "As Oy"}
            ],
            "isActive": true
        }"#;
        let rule: AllocationRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.id, RuleId(3));
        assert_eq!(
            rule.target,
            RuleTarget::Expense {
                expense_type_id: ExpenseTypeId(7)
            }
        );
        assert_eq!(rule.conditions.len(), 1);
    }

    #[test]
    fn is_active_defaults_to_true() {
        let json = r#"{"id": 1, "name": "x", "propertyId": 1, "transactionType": "INCOME",
            "incomeTypeId": 2, "conditions": []}"#;
        let rule: AllocationRule = serde_json::from_str(json).unwrap();
        assert!(rule.is_active);
        assert_eq!(rule.priority, 0);
    }

    #[test]
    fn serializes_flat() {
        let value = serde_json::to_value(rent_rule()).unwrap();
        assert_eq!(value["transactionType"], "INCOME");
        assert_eq!(value["incomeTypeId"], 1);
        assert!(value.get("expenseTypeId").is_none());
    }
}
