use std::collections::BTreeSet;

use epmforge_core::{
    DependencyRule, Dimension, GenerationConfig, GenerationSettings, RuleType,
};
use epmforge_generate::GenerationEngine;

fn dimension(name: &str, members: &[&str]) -> Dimension {
    Dimension {
        name: name.to_string(),
        members: members.iter().map(|member| member.to_string()).collect(),
    }
}

fn calculation(target: &str, formula: &str) -> DependencyRule {
    DependencyRule {
        rule_type: RuleType::Calculation,
        formula: Some(formula.to_string()),
        target: Some(target.to_string()),
        involved_dimensions: vec!["Account".to_string()],
        parameters: None,
    }
}

fn config(
    dimensions: Vec<Dimension>,
    dependencies: Vec<DependencyRule>,
    num_records: u64,
    sparsity: f64,
) -> GenerationConfig {
    GenerationConfig {
        model_type: "FinancialPlanning".to_string(),
        dimensions,
        dependencies,
        settings: GenerationSettings {
            num_records,
            sparsity,
            data_patterns: None,
            random_seed: Some(42),
        },
    }
}

#[test]
fn dense_request_covers_the_full_space_exactly_once() {
    let config = config(
        vec![
            dimension("Region", &["North", "South"]),
            dimension("Product", &["P1", "P2", "P3"]),
        ],
        Vec::new(),
        6,
        0.0,
    );

    let outcome = GenerationEngine::new().run(&config).expect("generation runs");
    assert_eq!(outcome.report.rows_generated, 6);
    assert_eq!(outcome.report.total_possible, 6);

    let combos: BTreeSet<(String, String)> = outcome
        .rows()
        .iter()
        .map(|row| {
            (
                row["Region"].as_str().expect("Region is text").to_string(),
                row["Product"].as_str().expect("Product is text").to_string(),
            )
        })
        .collect();
    assert_eq!(combos.len(), 6, "every combination appears exactly once");
}

#[test]
fn sparsity_limits_the_record_target_to_distinct_combinations() {
    let members: Vec<String> = (0..10).map(|index| format!("M{index}")).collect();
    let member_refs: Vec<&str> = members.iter().map(String::as_str).collect();
    let config = config(
        vec![
            dimension("Region", &member_refs),
            dimension("Product", &member_refs),
        ],
        Vec::new(),
        50,
        0.9,
    );

    let outcome = GenerationEngine::new().run(&config).expect("generation runs");
    assert_eq!(outcome.report.rows_generated, 10);
    assert!(
        outcome
            .issues
            .iter()
            .any(|issue| issue.contains("reducing target to 10"))
    );

    let combos: BTreeSet<(String, String)> = outcome
        .rows()
        .iter()
        .map(|row| {
            (
                row["Region"].as_str().expect("Region is text").to_string(),
                row["Product"].as_str().expect("Product is text").to_string(),
            )
        })
        .collect();
    assert_eq!(combos.len(), 10, "sampled combinations are distinct");
}

#[test]
fn derived_measures_satisfy_their_formula() {
    let config = config(
        vec![dimension("Region", &["North", "South", "East", "West"])],
        vec![calculation("Revenue", "Revenue = Price * Quantity")],
        4,
        0.0,
    );

    let outcome = GenerationEngine::new().run(&config).expect("generation runs");
    assert!(
        outcome.issues.is_empty(),
        "validator should confirm the rule: {:?}",
        outcome.issues
    );
    assert_eq!(outcome.report.rules_applied, 1);

    for row in outcome.rows() {
        let price = row["Price"].as_f64().expect("Price is numeric");
        let quantity = row["Quantity"].as_f64().expect("Quantity is numeric");
        let revenue = row["Revenue"].as_f64().expect("Revenue is numeric");
        let expected = (price * quantity * 100.0).round() / 100.0;
        assert!(
            (revenue - expected).abs() < 1e-9,
            "row {row} violates the formula"
        );
    }
}

#[test]
fn classification_fills_operands_randomly_and_targets_from_rules() {
    let config = config(
        vec![dimension("Account", &["Actual", "Budget"])],
        vec![calculation("Margin", "Margin = Revenue - COGS")],
        2,
        0.0,
    );

    let outcome = GenerationEngine::new().run(&config).expect("generation runs");
    let names = outcome.frame.column_names();
    assert_eq!(
        names,
        [
            "Account".to_string(),
            "COGS".to_string(),
            "Margin".to_string(),
            "Revenue".to_string(),
        ],
        "dimensions first, then measures lexicographically"
    );
}

#[test]
fn no_rules_yields_the_default_value_measure() {
    let config = config(
        vec![dimension("Region", &["North", "South"])],
        Vec::new(),
        2,
        0.0,
    );

    let outcome = GenerationEngine::new().run(&config).expect("generation runs");
    for row in outcome.rows() {
        let value = row["Value"].as_f64().expect("Value is numeric");
        assert!((100.0..=10000.0).contains(&value));
    }
}

#[test]
fn seeded_runs_are_reproducible() {
    let make = || {
        config(
            vec![
                dimension("Region", &["North", "South", "East"]),
                dimension("Product", &["P1", "P2", "P3", "P4"]),
            ],
            vec![calculation("Revenue", "Revenue = Price * Quantity")],
            8,
            0.2,
        )
    };

    let first = GenerationEngine::new().run(&make()).expect("first run");
    let second = GenerationEngine::new().run(&make()).expect("second run");
    assert_eq!(first.rows(), second.rows());
    assert_eq!(first.issues, second.issues);
}

#[test]
fn header_only_mode_synthesizes_typed_columns() {
    let config = config(
        vec![
            dimension("Region", &[]),
            dimension("Revenue", &[]),
        ],
        Vec::new(),
        5,
        0.0,
    );

    let outcome = GenerationEngine::new().run(&config).expect("generation runs");
    assert!(outcome.report.header_only);
    assert_eq!(outcome.report.rows_generated, 5);

    for row in outcome.rows() {
        let region = row["Region"].as_str().expect("Region is text");
        assert!(["North", "South", "East", "West"].contains(&region));
        let revenue = row["Revenue"].as_f64().expect("Revenue is numeric");
        assert!((100.0..=10000.0).contains(&revenue));
    }
}

#[test]
fn header_only_mode_triggers_when_any_dimension_is_empty() {
    let config = config(
        vec![
            dimension("Region", &["North"]),
            dimension("Quarter", &[]),
        ],
        Vec::new(),
        3,
        0.0,
    );

    let outcome = GenerationEngine::new().run(&config).expect("generation runs");
    assert!(outcome.report.header_only);
    assert_eq!(outcome.report.rows_generated, 3);
}

#[test]
fn dropped_rules_surface_as_issues_and_generation_continues() {
    let mut broken = calculation("Margin", "Margin = Revenue - COGS");
    broken.formula = None;
    let config = config(
        vec![dimension("Region", &["North", "South"])],
        vec![broken],
        2,
        0.0,
    );

    let outcome = GenerationEngine::new().run(&config).expect("generation runs");
    assert_eq!(outcome.report.rows_generated, 2);
    assert!(
        outcome
            .issues
            .iter()
            .any(|issue| issue.contains("missing 'formula' or 'target'"))
    );
}

#[test]
fn empty_dimension_list_is_fatal() {
    let config = config(Vec::new(), Vec::new(), 2, 0.0);
    assert!(GenerationEngine::new().run(&config).is_err());
}

#[test]
fn patterned_measures_draw_from_the_narrow_range() {
    let mut config = config(
        vec![dimension("Region", &["North", "South"])],
        Vec::new(),
        2,
        0.0,
    );
    config.settings.data_patterns = Some(
        [(
            "Value".to_string(),
            epmforge_core::DataPattern::SeasonalPeakQ4,
        )]
        .into_iter()
        .collect(),
    );

    let outcome = GenerationEngine::new().run(&config).expect("generation runs");
    for row in outcome.rows() {
        let value = row["Value"].as_f64().expect("Value is numeric");
        assert!((500.0..=5000.0).contains(&value));
    }
}
