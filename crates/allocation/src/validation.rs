use std::collections::BTreeMap;
use std::fmt;

use rentbook_core::{ExpenseTypeId, IncomeTypeId, PropertyId, TransactionType};
use serde::{Deserialize, Serialize};

use crate::condition::{AllocationCondition, ConditionField, ConditionOperator, ConditionValue};
use crate::rule::{AllocationRule, RuleId, RuleTarget};

/// Field path (e.g. `conditions[1].operator`) to the problems found there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Checks a typed rule: non-empty name, non-negative priority, at least one
/// condition, and every condition well-formed for its field.
pub fn validate_rule(rule: &AllocationRule) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_name(&rule.name, &mut errors);
    check_priority(rule.priority, &mut errors);
    check_condition_count(rule.conditions.len(), &mut errors);
    for (index, condition) in rule.conditions.iter().enumerate() {
        check_condition(index, condition, &mut errors);
    }
    errors.into_result(())
}

fn check_name(name: &str, errors: &mut ValidationErrors) {
    if name.trim().is_empty() {
        errors.add("name", "must not be empty");
    }
}

fn check_priority(priority: i32, errors: &mut ValidationErrors) {
    if priority < 0 {
        errors.add("priority", "must be zero or greater");
    }
}

fn check_condition_count(count: usize, errors: &mut ValidationErrors) {
    if count == 0 {
        errors.add("conditions", "at least one condition is required");
    }
}

fn check_condition(index: usize, condition: &AllocationCondition, errors: &mut ValidationErrors) {
    let field = condition.field;

    if !condition.operator.supports(field) {
        errors.add(
            format!("conditions[{index}].operator"),
            format!("'{}' is not supported for field '{field}'", condition.operator),
        );
    }

    let value_path = format!("conditions[{index}].value");
    match (&condition.value, field.is_numeric()) {
        (ConditionValue::Number(_), true) => {}
        (ConditionValue::Text(_), true) => {
            if condition.value.as_number().is_none() {
                errors.add(value_path, "must be a number");
            }
        }
        (ConditionValue::Text(text), false) => {
            if text.trim().is_empty() {
                errors.add(value_path, "must not be empty");
            }
        }
        (ConditionValue::Number(_), false) => {
            errors.add(value_path, format!("must be text for field '{field}'"));
        }
    }
}

/// Loosely-typed rule as submitted by a client. Turned into an
/// [`AllocationRule`] by [`AllocationRuleInput::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AllocationRuleInput {
    pub name: Option<String>,
    pub property_id: Option<PropertyId>,
    pub priority: Option<i32>,
    pub transaction_type: Option<String>,
    pub expense_type_id: Option<ExpenseTypeId>,
    pub income_type_id: Option<IncomeTypeId>,
    pub conditions: Vec<ConditionInput>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionInput {
    pub field: Option<String>,
    pub operator: Option<String>,
    pub value: Option<ConditionValue>,
}

impl AllocationRuleInput {
    /// Validates every field and, if all are well-formed, builds the rule
    /// under the store-assigned `id`. All problems are reported at once.
    pub fn validate(self, id: RuleId) -> Result<AllocationRule, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = self.name.unwrap_or_default();
        check_name(&name, &mut errors);

        let priority = self.priority.unwrap_or(0);
        check_priority(priority, &mut errors);

        if self.property_id.is_none() {
            errors.add("propertyId", "is required");
        }

        let target = parse_target(
            self.transaction_type.as_deref(),
            self.expense_type_id,
            self.income_type_id,
            &mut errors,
        );

        check_condition_count(self.conditions.len(), &mut errors);
        let conditions: Vec<AllocationCondition> = self
            .conditions
            .into_iter()
            .enumerate()
            .filter_map(|(index, input)| parse_condition(index, input, &mut errors))
            .collect();

        match (self.property_id, target) {
            (Some(property_id), Some(target)) if errors.is_empty() => Ok(AllocationRule {
                id,
                name,
                property_id,
                priority,
                target,
                conditions,
                is_active: self.is_active.unwrap_or(true),
            }),
            _ => Err(errors),
        }
    }
}

fn parse_target(
    transaction_type: Option<&str>,
    expense_type_id: Option<ExpenseTypeId>,
    income_type_id: Option<IncomeTypeId>,
    errors: &mut ValidationErrors,
) -> Option<RuleTarget> {
    let transaction_type = match transaction_type.map(str::parse::<TransactionType>) {
        None => {
            errors.add("transactionType", "is required");
            return None;
        }
        Some(Err(e)) => {
            errors.add("transactionType", e.to_string());
            return None;
        }
        Some(Ok(t)) => t,
    };

    match transaction_type {
        TransactionType::Expense => {
            if income_type_id.is_some() {
                errors.add("incomeTypeId", "must be empty for EXPENSE rules");
            }
            match expense_type_id {
                Some(expense_type_id) => Some(RuleTarget::Expense { expense_type_id }),
                None => {
                    errors.add("expenseTypeId", "is required for EXPENSE rules");
                    None
                }
            }
        }
        TransactionType::Income => {
            if expense_type_id.is_some() {
                errors.add("expenseTypeId", "must be empty for INCOME rules");
            }
            match income_type_id {
                Some(income_type_id) => Some(RuleTarget::Income { income_type_id }),
                None => {
                    errors.add("incomeTypeId", "is required for INCOME rules");
                    None
                }
            }
        }
    }
}

fn parse_condition(
    index: usize,
    input: ConditionInput,
    errors: &mut ValidationErrors,
) -> Option<AllocationCondition> {
    let field = parse_required::<ConditionField>(index, "field", input.field.as_deref(), errors);
    let operator =
        parse_required::<ConditionOperator>(index, "operator", input.operator.as_deref(), errors);
    if input.value.is_none() {
        errors.add(format!("conditions[{index}].value"), "is required");
    }

    let condition = AllocationCondition {
        field: field?,
        operator: operator?,
        value: input.value?,
    };
    check_condition(index, &condition, errors);
    Some(condition)
}

fn parse_required<T>(
    index: usize,
    name: &str,
    raw: Option<&str>,
    errors: &mut ValidationErrors,
) -> Option<T>
where
    T: std::str::FromStr<Err = String>,
{
    let path = format!("conditions[{index}].{name}");
    match raw.map(str::parse::<T>) {
        None => {
            errors.add(path, "is required");
            None
        }
        Some(Err(e)) => {
            errors.add(path, e);
            None
        }
        Some(Ok(value)) => Some(value),
    }
}
