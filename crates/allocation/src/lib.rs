pub mod audit;
pub mod condition;
pub mod config;
pub mod engine;
pub mod loan;
pub mod resolver;
pub mod rule;
pub mod validation;

pub use audit::{find_priority_ties, PriorityTie};
pub use condition::{evaluate, AllocationCondition, ConditionField, ConditionOperator, ConditionValue};
pub use config::{AllocationConfig, LoanSplitConfig, RuleSet, RuleSetError};
pub use engine::{
    apply_rules, AllocationEngine, AllocationOutcome, AllocationStatus, AllocationSummary,
    Posting, PostingType,
};
pub use loan::{is_loan_payment_message, parse_loan_payment_message, LoanPaymentComponents};
pub use resolver::{resolve, Resolution};
pub use rule::{AllocationRule, RuleId, RuleTarget};
pub use validation::{validate_rule, AllocationRuleInput, ConditionInput, ValidationErrors};

pub mod allocate {
    use crate::*;

    pub fn create_engine_from_toml(
        rules_toml: &str,
        config_toml: &str,
    ) -> Result<AllocationEngine, RuleSetError> {
        let rules = RuleSet::from_toml(rules_toml)?.into_rules();
        let config = AllocationConfig::from_toml(config_toml)?;
        Ok(AllocationEngine::new(rules, config))
    }

    pub fn create_property_engine(
        property_id: rentbook_core::PropertyId,
        rules: RuleSet,
        config: AllocationConfig,
    ) -> AllocationEngine {
        AllocationEngine::for_property(property_id, rules.into_rules(), config)
    }
}
