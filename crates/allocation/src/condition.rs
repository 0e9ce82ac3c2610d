use rentbook_core::{try_parse_finnish_number, BankTransaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionField {
    Sender,
    Receiver,
    Description,
    Amount,
}

impl ConditionField {
    pub fn is_numeric(self) -> bool {
        matches!(self, ConditionField::Amount)
    }
}

impl fmt::Display for ConditionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionField::Sender => write!(f, "sender"),
            ConditionField::Receiver => write!(f, "receiver"),
            ConditionField::Description => write!(f, "description"),
            ConditionField::Amount => write!(f, "amount"),
        }
    }
}

impl std::str::FromStr for ConditionField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sender" => Ok(ConditionField::Sender),
            "receiver" => Ok(ConditionField::Receiver),
            "description" => Ok(ConditionField::Description),
            "amount" => Ok(ConditionField::Amount),
            other => Err(format!("Unknown condition field: '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
}

impl ConditionOperator {
    /// Whether this operator is meaningful for `field`.
    ///
    /// `equals` works on every field, `contains` only on text fields and the
    /// ordering operators only on `amount`.
    pub fn supports(self, field: ConditionField) -> bool {
        match self {
            ConditionOperator::Equals => true,
            ConditionOperator::Contains => !field.is_numeric(),
            ConditionOperator::GreaterThan | ConditionOperator::LessThan => field.is_numeric(),
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionOperator::Equals => write!(f, "equals"),
            ConditionOperator::Contains => write!(f, "contains"),
            ConditionOperator::GreaterThan => write!(f, "greaterThan"),
            ConditionOperator::LessThan => write!(f, "lessThan"),
        }
    }
}

impl std::str::FromStr for ConditionOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(ConditionOperator::Equals),
            "contains" => Ok(ConditionOperator::Contains),
            "greaterThan" => Ok(ConditionOperator::GreaterThan),
            "lessThan" => Ok(ConditionOperator::LessThan),
            other => Err(format!("Unknown condition operator: '{other}'")),
        }
    }
}

/// Comparison operand. Text is tried first so that JSON strings never turn
/// into numbers by accident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Text(String),
    Number(Decimal),
}

impl ConditionValue {
    /// Numeric reading of the operand. Text is parsed as a Finnish number.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            ConditionValue::Number(n) => Some(*n),
            ConditionValue::Text(s) => try_parse_finnish_number(s),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConditionValue::Text(s) => Some(s),
            ConditionValue::Number(_) => None,
        }
    }
}

impl From<&str> for ConditionValue {
    fn from(s: &str) -> Self {
        ConditionValue::Text(s.to_string())
    }
}

impl From<Decimal> for ConditionValue {
    fn from(n: Decimal) -> Self {
        ConditionValue::Number(n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationCondition {
    pub field: ConditionField,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
}

impl AllocationCondition {
    pub fn new(
        field: ConditionField,
        operator: ConditionOperator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        AllocationCondition {
            field,
            operator,
            value: value.into(),
        }
    }

    pub fn evaluate(&self, tx: &BankTransaction) -> bool {
        evaluate(self, tx)
    }
}

/// Tests one condition against a transaction.
///
/// `amount` conditions compare against the absolute transaction amount, so
/// operands are written as positive numbers for both income and expenses; a
/// rule such as "amount lessThan 0" never matches. Direction is decided by the
/// rule's transaction type instead.
///
/// Anything that cannot be compared (a missing field, an operator the field
/// does not support, a non-numeric operand for `amount`) is a non-match.
pub fn evaluate(condition: &AllocationCondition, tx: &BankTransaction) -> bool {
    if !condition.operator.supports(condition.field) {
        return false;
    }

    match condition.field {
        ConditionField::Amount => match condition.value.as_number() {
            Some(expected) => compare_amount(condition.operator, tx.amount.as_decimal().abs(), expected),
            None => false,
        },
        ConditionField::Sender => compare_text(condition, tx.sender.as_deref()),
        ConditionField::Receiver => compare_text(condition, tx.receiver.as_deref()),
        ConditionField::Description => compare_text(condition, tx.description.as_deref()),
    }
}

fn compare_amount(operator: ConditionOperator, actual: Decimal, expected: Decimal) -> bool {
    match operator {
        ConditionOperator::Equals => actual == expected,
        ConditionOperator::GreaterThan => actual > expected,
        ConditionOperator::LessThan => actual < expected,
        ConditionOperator::Contains => false,
    }
}

fn compare_text(condition: &AllocationCondition, actual: Option<&str>) -> bool {
    let (Some(actual), Some(expected)) = (actual, condition.value.as_text()) else {
        return false;
    };

    match condition.operator {
        ConditionOperator::Equals => actual == expected,
        ConditionOperator::Contains => {
            !expected.is_empty() && actual.to_lowercase().contains(&expected.to_lowercase())
        }
        ConditionOperator::GreaterThan | ConditionOperator::LessThan => false,
    }
}
