use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rentbook_allocation::allocate::create_property_engine;
use rentbook_allocation::{
    find_priority_ties, AllocationConfig, AllocationEngine, AllocationOutcome, AllocationSummary,
    RuleSet,
};
use rentbook_core::{BankTransaction, PropertyId};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rentbook-allocate", about = "Apply allocation rules to bank transactions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate a JSON batch of transactions and print the outcomes as JSON
    Run {
        /// Rule file (.toml or .json)
        #[arg(long)]
        rules: PathBuf,
        /// JSON array of transactions
        #[arg(long)]
        transactions: PathBuf,
        /// Engine configuration (.toml), e.g. the loan split expense types
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only use rules owned by this property
        #[arg(long)]
        property: Option<i64>,
    },
    /// Validate a rule file and report priority ties
    Check {
        #[arg(long)]
        rules: PathBuf,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeRow {
    transaction_id: Option<i64>,
    outcome: AllocationOutcome,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            rules,
            transactions,
            config,
            property,
        } => run(&rules, &transactions, config.as_deref(), property.map(PropertyId)),
        Commands::Check { rules } => check(&rules),
    };

    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_rules(path: &Path) -> Result<RuleSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules from {}", path.display()))?;
    let is_json = path.extension().and_then(|x| x.to_str()) == Some("json");
    let set = if is_json {
        RuleSet::from_json(&content)
    } else {
        RuleSet::from_toml(&content)
    };
    set.with_context(|| format!("Invalid rule file {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<AllocationConfig> {
    let Some(path) = path else {
        return Ok(AllocationConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    AllocationConfig::from_toml(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

fn run(
    rules_path: &Path,
    transactions_path: &Path,
    config_path: Option<&Path>,
    property: Option<PropertyId>,
) -> Result<String> {
    let rules = load_rules(rules_path)?;
    let config = load_config(config_path)?;

    let content = std::fs::read_to_string(transactions_path).with_context(|| {
        format!("Failed to read transactions from {}", transactions_path.display())
    })?;
    let transactions: Vec<BankTransaction> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid transaction file {}", transactions_path.display()))?;

    let engine = match property {
        Some(property_id) => create_property_engine(property_id, rules, config),
        None => AllocationEngine::new(rules.into_rules(), config),
    };
    tracing::info!(
        "Allocating {} transactions against {} rules",
        transactions.len(),
        engine.rules().len()
    );

    let outcomes = engine.apply_rules(&transactions);
    let summary = AllocationSummary::from_outcomes(&outcomes);
    if summary.needs_attention() > 0 {
        tracing::warn!("{} transactions need manual allocation", summary.needs_attention());
    }

    let rows: Vec<OutcomeRow> = transactions
        .iter()
        .zip(outcomes)
        .map(|(tx, outcome)| OutcomeRow {
            transaction_id: tx.id,
            outcome,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

fn check(rules_path: &Path) -> Result<String> {
    let set = load_rules(rules_path)?;
    let ties = find_priority_ties(&set.rules);

    let mut report = format!("{} rules OK", set.rules.len());
    for tie in &ties {
        let ids: Vec<String> = tie.rule_ids.iter().map(ToString::to_string).collect();
        report.push_str(&format!(
            "\nwarning: property {} {} rules [{}] share priority {}",
            tie.property_id,
            tie.transaction_type,
            ids.join(", "),
            tie.priority
        ));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const RULES_JSON: &str = r#"[
        {"id": 1, "name": "Vuokra", "propertyId": 1, "priority": 0, "transactionType": "INCOME",
         "incomeTypeId": 1, "conditions": [{"field": "description", "operator": "contains", "value": "vuokra"}]},
        {"id": 2, "name": "Laina", "propertyId": 1, "priority": 0, "transactionType": "EXPENSE",
         "expenseTypeId": 20, "conditions": [{"field": "receiver", "operator": "equals", "value": "Osuuspankki"}]},
        {"id": 3, "name": "Toinen kohde", "propertyId": 2, "priority": 0, "transactionType": "INCOME",
         "incomeTypeId": 1, "conditions": [{"field": "description", "operator": "contains", "value": "vuokra"}]}
    ]"#;

    const TRANSACTIONS_JSON: &str = r#"[
        {"id": 10, "description": "Vuokra maaliskuu", "amount": 850},
        {"id": 11, "receiver": "Osuuspankki", "amount": -600,
         "message": "Lyhennys 500,00 euroa Korko 100,00 euroa Jäljellä 50 000,00 euroa"}
    ]"#;

    const CONFIG_TOML: &str = r#"
[loan_split]
payment_expense_type_id = 20
principal_expense_type_id = 21
interest_expense_type_id = 22
handling_fee_expense_type_id = 23
"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn run_prints_outcomes_per_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let rules = write(dir.path(), "rules.json", RULES_JSON);
        let txs = write(dir.path(), "txs.json", TRANSACTIONS_JSON);
        let config = write(dir.path(), "allocation.toml", CONFIG_TOML);

        let output = run(&rules, &txs, Some(&config), Some(PropertyId(1))).unwrap();
        let rows: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(rows[0]["transactionId"], 10);
        assert_eq!(rows[0]["outcome"]["status"], "allocated");
        assert_eq!(rows[0]["outcome"]["matchedRuleId"], 1);
        assert_eq!(rows[1]["outcome"]["postings"].as_array().unwrap().len(), 3);
        assert_eq!(rows[1]["outcome"]["postings"][0]["type"], "loanPrincipal");
    }

    #[test]
    fn run_without_property_filter_sees_conflicting_income_rules() {
        let dir = tempfile::tempdir().unwrap();
        let rules = write(dir.path(), "rules.json", RULES_JSON);
        let txs = write(dir.path(), "txs.json", TRANSACTIONS_JSON);

        let output = run(&rules, &txs, None, None).unwrap();
        let rows: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(rows[0]["outcome"]["status"], "conflicting");
        // No loan config: the loan rule books a single expense.
        assert_eq!(rows[1]["outcome"]["postings"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn check_reports_ties() {
        let dir = tempfile::tempdir().unwrap();
        let rules = write(
            dir.path(),
            "rules.toml",
            r#"
[[rules]]
id = 1
name = "a"
propertyId = 1
transactionType = "EXPENSE"
expenseTypeId = 5
conditions = [{ field = "description", operator = "contains", value = "a" }]

[[rules]]
id = 2
name = "b"
propertyId = 1
transactionType = "EXPENSE"
expenseTypeId = 6
conditions = [{ field = "description", operator = "contains", value = "b" }]
"#,
        );

        let report = check(&rules).unwrap();
        assert_eq!(
            report,
            "2 rules OK\nwarning: property 1 EXPENSE rules [1, 2] share priority 0"
        );
    }

    #[test]
    fn check_fails_on_invalid_rule() {
        let dir = tempfile::tempdir().unwrap();
        let rules = write(
            dir.path(),
            "rules.json",
            r#"[{"id": 7, "name": "", "propertyId": 1, "transactionType": "INCOME",
                 "incomeTypeId": 1, "conditions": []}]"#,
        );
        let err = check(&rules).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("Rule 7 is invalid"), "{message}");
        assert!(message.contains("name: must not be empty"), "{message}");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = check(Path::new("/nonexistent/rules.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read rules"));
    }
}
